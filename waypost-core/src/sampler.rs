//! Periodic Inertial Sampling Thread
//!
//! ## Overview
//!
//! A single producer thread around an [`ImuDriver`]. Each tick it drains
//! the sensor's hardware FIFO, reads the latest accelerometer and
//! gyroscope counts, converts them to physical units, and appends one
//! [`ImuSample`] to the shared buffer. A full buffer drops the sample
//! and the tick completes normally — the logger is fire-and-forget on
//! the inertial side.
//!
//! The thread runs until [`SensorSampler::stop`] sets the shared stop
//! flag. Every exit path, including a driver fault mid-loop, closes the
//! sensor bus before the thread returns.
//!
//! ## Unit conversion
//!
//! The sensor reports signed counts at a configured resolution and
//! measurement range. With 16-bit resolution and a ±8 g range, one count
//! is 8 g / 32768; gyro counts scale the same way against the ±dps
//! range. [`ImuScale`] carries those constants and produces m/s² and
//! deg/s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, trace};

use crate::config::{IMU_BUS_ADDRESS, IMU_SAMPLE_PERIOD_MS, IMU_WARMUP_MS};
use crate::drivers::{ImuDriver, RawTriple};
use crate::errors::{ImuFault, SamplerError};
use crate::sample::{ImuSample, SampleBuffer};

/// Standard gravity, m/s² per g.
const STANDARD_GRAVITY: f32 = 9.80665;

/// Count-to-unit scaling constants for the configured sensor mode.
#[derive(Debug, Clone, Copy)]
pub struct ImuScale {
    /// ADC resolution in bits (counts span ±2^(bits-1)).
    pub resolution_bits: u32,
    /// Configured accelerometer range, ±g.
    pub accel_range_g: f32,
    /// Configured gyroscope range, ±deg/s.
    pub gyro_range_dps: f32,
}

impl Default for ImuScale {
    fn default() -> Self {
        Self {
            resolution_bits: 16,
            accel_range_g: 8.0,
            gyro_range_dps: 2000.0,
        }
    }
}

impl ImuScale {
    fn half_scale(&self) -> f32 {
        (1u64 << (self.resolution_bits - 1)) as f32
    }

    /// Convert one accelerometer count to m/s².
    pub fn accel_ms2(&self, counts: i16) -> f32 {
        counts as f32 / self.half_scale() * self.accel_range_g * STANDARD_GRAVITY
    }

    /// Convert one gyroscope count to deg/s.
    pub fn gyro_dps(&self, counts: i16) -> f32 {
        counts as f32 / self.half_scale() * self.gyro_range_dps
    }

    /// Convert a raw accelerometer triple to m/s² per axis.
    pub fn accel_triple(&self, raw: RawTriple) -> [f32; 3] {
        [
            self.accel_ms2(raw.x),
            self.accel_ms2(raw.y),
            self.accel_ms2(raw.z),
        ]
    }

    /// Convert a raw gyroscope triple to deg/s per axis.
    pub fn gyro_triple(&self, raw: RawTriple) -> [f32; 3] {
        [
            self.gyro_dps(raw.x),
            self.gyro_dps(raw.y),
            self.gyro_dps(raw.z),
        ]
    }
}

/// Sampling thread configuration.
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    /// Tick period between samples.
    pub period: Duration,
    /// Settling delay between sensor init and the first tick.
    pub warmup: Duration,
    /// Sensor bus address.
    pub bus_address: u8,
    /// Count-to-unit scaling.
    pub scale: ImuScale,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(IMU_SAMPLE_PERIOD_MS),
            warmup: Duration::from_millis(IMU_WARMUP_MS),
            bus_address: IMU_BUS_ADDRESS,
            scale: ImuScale::default(),
        }
    }
}

/// Handle to the running sampling thread.
///
/// Dropping the handle without calling [`stop`](Self::stop) leaves the
/// thread running detached; stop it for an orderly bus release.
#[derive(Debug)]
pub struct SensorSampler {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<(), ImuFault>>,
}

impl SensorSampler {
    /// Open the bus, initialize the sensor, and start the sampling
    /// thread as the buffer's single producer.
    ///
    /// Bus or sensor failures are reported synchronously, before any
    /// thread exists, and are local to the sampler: sibling subsystems
    /// keep running. A failed sensor init still closes the bus.
    pub fn spawn<I, const N: usize>(
        mut driver: I,
        buffer: Arc<SampleBuffer<N>>,
        config: SamplerConfig,
    ) -> Result<Self, SamplerError>
    where
        I: ImuDriver + Send + 'static,
    {
        driver.open_bus()?;
        if let Err(fault) = driver.init_sensor(config.bus_address) {
            let _ = driver.close_bus();
            return Err(fault.into());
        }

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let result = sample_loop(&mut driver, &buffer, &config, &thread_stop);
            // The bus is released on every exit path, fault included.
            let _ = driver.close_bus();
            if let Err(fault) = result {
                error!("sampling stopped on fault: {fault}");
            }
            result
        });

        Ok(Self { stop, handle })
    }

    /// Whether the sampling thread has exited (on fault or after stop).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the thread to stop and wait for it to exit, reporting any
    /// fault it died on.
    pub fn stop(self) -> Result<(), SamplerError> {
        self.stop.store(true, Ordering::Relaxed);
        match self.handle.join() {
            Ok(result) => result.map_err(SamplerError::Driver),
            Err(_) => Err(SamplerError::Panicked),
        }
    }
}

fn sample_loop<I: ImuDriver, const N: usize>(
    driver: &mut I,
    buffer: &SampleBuffer<N>,
    config: &SamplerConfig,
    stop: &AtomicBool,
) -> Result<(), ImuFault> {
    thread::sleep(config.warmup);

    let mut seq: u32 = 0;
    while !stop.load(Ordering::Relaxed) {
        driver.dequeue_fifo()?;
        let accel = driver.latest_accel()?;
        let gyro = driver.latest_gyro()?;

        let sample = ImuSample {
            accel: config.scale.accel_triple(accel),
            gyro: config.scale.gyro_triple(gyro),
            seq,
        };
        if !buffer.push(sample) {
            trace!("sample {seq} dropped, buffer full");
        }
        seq = seq.wrapping_add(1);

        thread::sleep(config.period);
    }
    Ok(())
}
