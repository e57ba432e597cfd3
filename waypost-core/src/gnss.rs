//! Satellite Fix Acquisition
//!
//! ## Overview
//!
//! A blocking acquisition loop around a [`GnssDriver`]:
//!
//! ```text
//! Closed → open() → Open → await_first_fix() → Acquiring → close() → Closed
//! ```
//!
//! `open()` performs four sub-steps (acquire handle, subscribe to
//! fix-ready notifications, apply parameters, start positioning). A
//! failure at any sub-step rolls back everything done so far before
//! returning, so no partial-open state can leak a descriptor or a
//! dangling subscription.
//!
//! Fixes arrive by notification. [`PositionAcquisition::next`] blocks on
//! one notification and returns the decoded report whether or not the
//! receiver resolved a position; [`PositionAcquisition::await_first_fix`]
//! loops, discarding invalid fixes, until the first valid one. A short
//! read surfaces as a retryable [`AcquisitionError::ReadMismatch`] — the
//! record will be whole again on the next notification.

use std::time::Duration;

use log::{debug, info, warn};

use crate::config::{FIX_INTERVAL_MS, FIX_WAIT_TIMEOUT_MS};
use crate::drivers::{ConstellationMask, GnssDriver, RawNavReport, StartMode, FIX_MODE_INVALID};
use crate::errors::{AcquisitionError, AcquisitionResult, GnssFault};

/// One satellite position solution. Immutable once decoded.
///
/// `valid` gates whether the coordinates are meaningful: an invalid fix
/// still carries whatever the receiver last held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    /// Latitude, degrees.
    pub latitude: f64,
    /// Longitude, degrees.
    pub longitude: f64,
    /// Altitude above the ellipsoid, meters.
    pub altitude: f64,
    /// Speed over ground, m/s.
    pub velocity: f32,
    /// Course over ground, degrees.
    pub heading: f32,
    /// Whether the receiver resolved a position this cycle.
    pub valid: bool,
}

impl PositionFix {
    /// Decode a raw navigation record.
    pub fn from_raw(raw: &RawNavReport) -> Self {
        Self {
            latitude: raw.latitude,
            longitude: raw.longitude,
            altitude: raw.altitude,
            velocity: raw.velocity,
            heading: raw.direction,
            valid: raw.fix_mode != FIX_MODE_INVALID,
        }
    }
}

/// Acquisition loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionState {
    /// No device handle held.
    #[default]
    Closed,
    /// Handle held, positioning started, no valid fix yet.
    Open,
    /// At least one valid fix observed.
    Acquiring,
}

/// Acquisition parameters applied during `open()`.
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionConfig {
    /// Position notify cycle, milliseconds.
    pub interval_ms: u32,
    /// Constellations the receiver should track.
    pub constellations: ConstellationMask,
    /// Hot or cold start.
    pub start_mode: StartMode,
    /// Bound on each fix-ready wait.
    pub wait_timeout: Duration,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            interval_ms: FIX_INTERVAL_MS,
            constellations: ConstellationMask::GPS | ConstellationMask::GLONASS,
            start_mode: StartMode::Hot,
            wait_timeout: Duration::from_millis(FIX_WAIT_TIMEOUT_MS),
        }
    }
}

/// Blocking fix-acquisition loop around a [`GnssDriver`].
///
/// Owns the driver exclusively. [`Drop`] closes the device if the caller
/// did not, so a descriptor never outlives the acquisition on any exit
/// path.
pub struct PositionAcquisition<G: GnssDriver> {
    driver: G,
    config: AcquisitionConfig,
    state: AcquisitionState,
}

impl<G: GnssDriver> PositionAcquisition<G> {
    /// Wrap a receiver driver. The acquisition starts `Closed`.
    pub fn new(driver: G, config: AcquisitionConfig) -> Self {
        Self {
            driver,
            config,
            state: AcquisitionState::Closed,
        }
    }

    /// Current acquisition state.
    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Acquire the device, subscribe to fix-ready notifications, apply
    /// the acquisition parameters, and start positioning.
    ///
    /// Any sub-step failure rolls back everything done so far (cancel
    /// the subscription, close the handle) before returning — no
    /// partial-open state leaks.
    pub fn open(&mut self) -> AcquisitionResult<()> {
        self.driver.open().map_err(AcquisitionError::Open)?;

        if let Err(fault) = self.open_steps() {
            warn!("acquisition open failed ({fault}), rolling back");
            self.rollback();
            return Err(AcquisitionError::Open(fault));
        }

        info!("positioning started");
        self.state = AcquisitionState::Open;
        Ok(())
    }

    /// Block until the first valid fix, discarding invalid ones.
    ///
    /// Never returns an invalid fix. Each individual wait is bounded by
    /// the configured timeout; a timeout surfaces as a retryable
    /// notification error rather than blocking forever.
    pub fn await_first_fix(&mut self) -> AcquisitionResult<PositionFix> {
        loop {
            let fix = self.next()?;
            if fix.valid {
                info!("first position contact");
                self.state = AcquisitionState::Acquiring;
                return Ok(fix);
            }
            debug!("no positioning data yet, discarding");
        }
    }

    /// Block on the next fix-ready notification and read one report.
    ///
    /// Returns the decoded fix whether or not it is valid; the caller
    /// checks `valid`. A short read is retryable: re-issue on the next
    /// notification.
    pub fn next(&mut self) -> AcquisitionResult<PositionFix> {
        if self.state == AcquisitionState::Closed {
            return Err(AcquisitionError::NotOpen);
        }

        self.driver
            .wait_ready(self.config.wait_timeout)
            .map_err(AcquisitionError::Notification)?;

        let raw = self.driver.read_report().map_err(|fault| match fault {
            GnssFault::ShortRead { expected, actual } => {
                AcquisitionError::ReadMismatch { expected, actual }
            }
            other => AcquisitionError::Driver(other),
        })?;

        Ok(PositionFix::from_raw(&raw))
    }

    /// Cancel the subscription, stop positioning, and release the
    /// handle. Best-effort and idempotent: each step runs regardless of
    /// earlier failures, and closing an already-closed acquisition is a
    /// no-op.
    pub fn close(&mut self) -> AcquisitionResult<()> {
        if self.state == AcquisitionState::Closed {
            return Ok(());
        }

        let mut last_failure = None;
        if let Err(fault) = self.driver.cancel_notification() {
            warn!("cancel notification failed ({fault}), continuing");
            last_failure = Some(fault);
        }
        if let Err(fault) = self.driver.stop() {
            warn!("positioning stop failed ({fault}), continuing");
            last_failure = Some(fault);
        }
        if let Err(fault) = self.driver.close() {
            warn!("device close failed ({fault})");
            last_failure = Some(fault);
        }

        self.state = AcquisitionState::Closed;
        info!("positioning stopped");
        match last_failure {
            None => Ok(()),
            Some(fault) => Err(AcquisitionError::Driver(fault)),
        }
    }

    /// Sub-steps after the handle is held; the caller rolls back if any
    /// of them fail.
    fn open_steps(&mut self) -> Result<(), GnssFault> {
        self.driver.register_notification()?;
        self.driver.set_interval(self.config.interval_ms)?;
        self.driver.select_constellations(self.config.constellations)?;
        self.driver.start(self.config.start_mode)
    }

    fn rollback(&mut self) {
        // Failure here is already a failure path; release what we can.
        let _ = self.driver.cancel_notification();
        let _ = self.driver.close();
        self.state = AcquisitionState::Closed;
    }
}

impl<G: GnssDriver> Drop for PositionAcquisition<G> {
    fn drop(&mut self) {
        if self.state != AcquisitionState::Closed {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(fix_mode: u8) -> RawNavReport {
        RawNavReport {
            fix_mode,
            latitude: 35.681,
            longitude: 139.767,
            altitude: 41.5,
            velocity: 1.2,
            direction: 270.0,
        }
    }

    #[test]
    fn fix_validity_follows_fix_mode() {
        assert!(!PositionFix::from_raw(&raw(FIX_MODE_INVALID)).valid);
        assert!(PositionFix::from_raw(&raw(2)).valid);
        assert!(PositionFix::from_raw(&raw(3)).valid);
    }

    #[test]
    fn decoded_fields_carry_through() {
        let fix = PositionFix::from_raw(&raw(3));
        assert_eq!(fix.latitude, 35.681);
        assert_eq!(fix.longitude, 139.767);
        assert_eq!(fix.altitude, 41.5);
        assert_eq!(fix.velocity, 1.2);
        assert_eq!(fix.heading, 270.0);
    }

    #[test]
    fn constellation_mask_combines() {
        let mask = ConstellationMask::GPS | ConstellationMask::GLONASS;
        assert!(mask.contains(ConstellationMask::GPS));
        assert!(mask.contains(ConstellationMask::GLONASS));
        assert!(!mask.contains(ConstellationMask::QZSS));
    }
}
