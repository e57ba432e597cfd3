//! Top-Level Logger Runtime
//!
//! ## Overview
//!
//! Ties the three subsystems together the way the device runs them: the
//! sampling thread produces inertial samples in the background, the main
//! thread brings the modem up (optional), opens position acquisition,
//! and then loops — next fix, emit the payload, drain the inertial
//! batch. Teardown runs on every exit path in a fixed order: close the
//! acquisition, stop the sampler, cascade the modem down.
//!
//! A failed IMU is local to the sampler; the runtime keeps logging
//! positions without inertial batches. A failed acquisition ends the
//! run, but teardown still releases every resource the other
//! subsystems hold. The emit loop and the
//! sampling thread both observe a shared [`ShutdownToken`], so another
//! thread (a signal handler, a supervisor) can stop the device without
//! unbounded waits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::calibration::{CalibrationBias, Calibrator};
use crate::config::REPORT_INTERVAL_MS;
use crate::connection::{ConnectionLifecycle, ConnectionState};
use crate::drivers::{GnssDriver, ModemDriver};
use crate::errors::{CalibrationError, LoggerError};
use crate::gnss::{PositionAcquisition, PositionFix};
use crate::report::{PositionReport, Sink};
use crate::sample::SampleBuffer;
use crate::sampler::SensorSampler;

/// Cooperative stop flag shared between the runtime and its threads.
#[derive(Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    /// A fresh, unrequested token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent; safe from any thread.
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Top-level driver for the location logger.
///
/// Built from the acquisition and sink, then optionally extended with a
/// connection lifecycle and a running sampler. `run` owns the control
/// flow from bring-up to teardown.
pub struct LocationLogger<M, G, S, const N: usize>
where
    M: ModemDriver,
    G: GnssDriver,
    S: Sink,
{
    lifecycle: Option<ConnectionLifecycle<M>>,
    acquisition: PositionAcquisition<G>,
    sampler: Option<SensorSampler>,
    buffer: Arc<SampleBuffer<N>>,
    calibrator: Calibrator<N>,
    sink: S,
    shutdown: ShutdownToken,
    report_interval: Duration,
}

impl<M, G, S, const N: usize> LocationLogger<M, G, S, N>
where
    M: ModemDriver,
    G: GnssDriver,
    S: Sink,
{
    /// Assemble a logger around an acquisition, a sink, and the shared
    /// sample buffer.
    pub fn new(acquisition: PositionAcquisition<G>, sink: S, buffer: Arc<SampleBuffer<N>>) -> Self {
        Self {
            lifecycle: None,
            acquisition,
            sampler: None,
            calibrator: Calibrator::new(Arc::clone(&buffer)),
            buffer,
            sink,
            shutdown: ShutdownToken::new(),
            report_interval: Duration::from_millis(REPORT_INTERVAL_MS),
        }
    }

    /// Run the connection lifecycle before acquiring fixes and tear it
    /// down afterwards.
    pub fn with_lifecycle(mut self, lifecycle: ConnectionLifecycle<M>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Adopt a running sampling thread; the runtime drains its batches
    /// and stops it during teardown.
    pub fn with_sampler(mut self, sampler: SensorSampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Set the pause between delivered reports.
    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Token another thread can use to stop the run loop.
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Block until the buffer holds `target_count` samples and compute
    /// the sensor bias. Call after spawning the sampler, before `run`.
    pub fn calibrate(
        &mut self,
        target_count: usize,
        timeout: Duration,
    ) -> Result<CalibrationBias, CalibrationError> {
        self.calibrator.calibrate(target_count, timeout)
    }

    /// Bring everything up, loop fixes to the sink until shutdown or a
    /// non-retryable error, then tear everything down. Teardown runs on
    /// every exit path.
    pub fn run(&mut self) -> Result<(), LoggerError> {
        let result = self.run_inner();
        self.teardown();
        result
    }

    fn run_inner(&mut self) -> Result<(), LoggerError> {
        if let Some(lifecycle) = self.lifecycle.as_mut() {
            let from = lifecycle.state();
            lifecycle.begin(from, ConnectionState::PdnConnected)?;
            match lifecycle.imsi() {
                Ok(imsi) => info!("connected as subscriber {imsi}"),
                Err(err) => warn!("imsi query failed: {err}"),
            }
        }

        self.acquisition.open()?;

        let first = loop {
            if self.shutdown.is_requested() {
                return Ok(());
            }
            match self.acquisition.await_first_fix() {
                Ok(fix) => break fix,
                Err(err) if err.is_retryable() => {
                    warn!("still waiting for first fix: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        };
        self.emit(&first);

        while !self.shutdown.is_requested() {
            match self.acquisition.next() {
                Ok(fix) if fix.valid => {
                    self.emit(&fix);
                    self.drain_inertial();
                    self.pause();
                }
                Ok(_) => debug!("no positioning data this cycle"),
                Err(err) if err.is_retryable() => {
                    warn!("retryable acquisition error: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Delivery is fire-and-forget: a sink failure is logged, never
    /// fatal to the acquisition loop.
    fn emit(&mut self, fix: &PositionFix) {
        let Some(report) = PositionReport::from_fix(fix) else {
            return;
        };
        match self.sink.deliver(&report) {
            Ok(()) => debug!("delivered {:?}", report),
            Err(err) => warn!("delivery failed: {err}"),
        }
    }

    fn drain_inertial(&mut self) {
        if self.sampler.is_none() {
            return;
        }
        let batch = self.calibrator.drain();
        if batch.is_empty() {
            return;
        }
        debug!(
            "drained {} inertial samples ({} dropped so far)",
            batch.len(),
            self.buffer.dropped()
        );
        if let (Some(bias), Some(last)) = (self.calibrator.bias(), batch.last()) {
            let corrected = bias.apply(last);
            debug!(
                "latest corrected sample: accel [{:.3} {:.3} {:.3}] m/s²",
                corrected.accel[0], corrected.accel[1], corrected.accel[2]
            );
        }
    }

    /// Sleep the report interval in slices so a shutdown request is
    /// honored promptly.
    fn pause(&self) {
        const SLICE: Duration = Duration::from_millis(100);
        let mut remaining = self.report_interval;
        while !self.shutdown.is_requested() && !remaining.is_zero() {
            let step = remaining.min(SLICE);
            thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
    }

    /// Ordered teardown: acquisition first (stop the notification
    /// source), sampler second, modem cascade last. Each step is
    /// best-effort so the later ones always run.
    fn teardown(&mut self) {
        if let Err(err) = self.acquisition.close() {
            warn!("acquisition close failed: {err}");
        }
        if let Some(sampler) = self.sampler.take() {
            if let Err(err) = sampler.stop() {
                warn!("sampler stop failed: {err}");
            }
        }
        if let Some(lifecycle) = self.lifecycle.as_mut() {
            let from = lifecycle.state();
            if from > ConnectionState::Uninitialized {
                if let Err(err) = lifecycle.end(from, ConnectionState::Uninitialized) {
                    warn!("modem teardown reported: {err}");
                }
            }
        }
        info!("logger stopped");
    }
}
