//! Sensor Bias Calibration
//!
//! Computes per-axis zero-offsets by averaging a batch of samples taken
//! while the device sits still. The calibrator is the buffer's consumer:
//! it blocks (condvar, bounded) until the sampling thread has produced
//! enough samples, then computes the means over exactly the samples
//! present at that moment and clears the buffer in the same lock
//! acquisition.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::errors::CalibrationError;
use crate::sample::{ImuSample, SampleBuffer};

/// Per-axis additive offsets derived from a batch of still samples,
/// plus how many samples the means were computed over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationBias {
    /// Mean acceleration per axis, m/s².
    pub accel: [f32; 3],
    /// Mean angular rate per axis, deg/s.
    pub gyro: [f32; 3],
    /// Number of samples averaged.
    pub samples: usize,
}

impl CalibrationBias {
    /// Arithmetic mean of each axis over the batch. `None` for an empty
    /// batch.
    pub fn from_samples(samples: &[ImuSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        // Accumulate in f64: 600 f32 additions lose digits otherwise.
        let mut accel = [0.0f64; 3];
        let mut gyro = [0.0f64; 3];
        for sample in samples {
            for axis in 0..3 {
                accel[axis] += f64::from(sample.accel[axis]);
                gyro[axis] += f64::from(sample.gyro[axis]);
            }
        }

        let n = samples.len() as f64;
        Some(Self {
            accel: accel.map(|sum| (sum / n) as f32),
            gyro: gyro.map(|sum| (sum / n) as f32),
            samples: samples.len(),
        })
    }

    /// Subtract the bias from a sample.
    pub fn apply(&self, sample: &ImuSample) -> ImuSample {
        let mut out = *sample;
        for axis in 0..3 {
            out.accel[axis] -= self.accel[axis];
            out.gyro[axis] -= self.gyro[axis];
        }
        out
    }
}

/// Buffer consumer: drains batches for reporting and computes the
/// calibration bias.
pub struct Calibrator<const N: usize> {
    buffer: Arc<SampleBuffer<N>>,
    bias: Option<CalibrationBias>,
}

impl<const N: usize> Calibrator<N> {
    /// Attach to the shared sample buffer.
    pub fn new(buffer: Arc<SampleBuffer<N>>) -> Self {
        Self { buffer, bias: None }
    }

    /// Copy out and clear the buffered samples, in append order.
    pub fn drain(&self) -> Vec<ImuSample> {
        self.buffer.drain()
    }

    /// Block until at least `target_count` samples are buffered, then
    /// compute per-axis means over exactly the samples present at that
    /// moment, store the result, and clear the buffer.
    ///
    /// Gives up with [`CalibrationError::Timeout`] once `timeout`
    /// elapses; the buffer keeps its contents in that case. A target
    /// larger than the buffer can hold is rejected outright instead of
    /// waiting forever.
    pub fn calibrate(
        &mut self,
        target_count: usize,
        timeout: Duration,
    ) -> Result<CalibrationBias, CalibrationError> {
        if target_count > N {
            return Err(CalibrationError::TargetExceedsCapacity {
                target: target_count,
                capacity: N,
            });
        }

        let batch = self.buffer.wait_drain(target_count.max(1), timeout)?;
        // wait_drain returned, so the batch is non-empty.
        let bias = CalibrationBias::from_samples(&batch)
            .ok_or(CalibrationError::Timeout(crate::errors::SampleWaitTimeout {
                needed: target_count,
                have: 0,
                waited_ms: timeout.as_millis() as u64,
            }))?;

        info!(
            "calibrated over {} samples: accel [{:.3} {:.3} {:.3}] m/s², gyro [{:.3} {:.3} {:.3}] deg/s",
            bias.samples,
            bias.accel[0],
            bias.accel[1],
            bias.accel[2],
            bias.gyro[0],
            bias.gyro[1],
            bias.gyro[2],
        );
        self.bias = Some(bias);
        Ok(bias)
    }

    /// The most recent calibration result, if any.
    pub fn bias(&self) -> Option<CalibrationBias> {
        self.bias
    }
}
