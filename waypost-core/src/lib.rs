//! Concurrency and state-management core for the waypost location logger
//!
//! Coordinates the three subsystems of an embedded location-logging
//! device:
//!
//! - an ordered bring-up/teardown state machine for the cellular modem
//!   ([`connection`]),
//! - a blocking, notification-driven satellite fix acquisition loop
//!   ([`gnss`]),
//! - a producer/consumer inertial sampling pipeline with calibration
//!   ([`sampler`], [`sample`], [`calibration`]).
//!
//! Hardware is reached only through the capability traits in
//! [`drivers`]; board support crates implement them, tests mock them.
//! The [`runtime`] module ties the subsystems together the way the
//! device runs them.
//!
//! Key constraints:
//! - Preemptive threads: one sampling thread plus the control thread.
//!   The bounded sample buffer is the only cross-thread structure.
//! - Asymmetric failure policy: bring-up fails fast, teardown is
//!   best-effort, and handles never leak on an error path.
//! - Every blocking wait is bounded and the run loop is cancellable.
//!
//! ```no_run
//! use std::sync::Arc;
//! use waypost_core::{
//!     AcquisitionConfig, PositionAcquisition, SampleBuffer, SAMPLE_BUFFER_CAPACITY,
//! };
//! # use std::time::Duration;
//! # use waypost_core::drivers::{ConstellationMask, RawNavReport, StartMode};
//! # use waypost_core::errors::GnssFault;
//! # struct Receiver;
//! # impl waypost_core::GnssDriver for Receiver {
//! #     fn open(&mut self) -> Result<(), GnssFault> { Ok(()) }
//! #     fn set_interval(&mut self, _: u32) -> Result<(), GnssFault> { Ok(()) }
//! #     fn select_constellations(&mut self, _: ConstellationMask) -> Result<(), GnssFault> { Ok(()) }
//! #     fn register_notification(&mut self) -> Result<(), GnssFault> { Ok(()) }
//! #     fn cancel_notification(&mut self) -> Result<(), GnssFault> { Ok(()) }
//! #     fn start(&mut self, _: StartMode) -> Result<(), GnssFault> { Ok(()) }
//! #     fn stop(&mut self) -> Result<(), GnssFault> { Ok(()) }
//! #     fn wait_ready(&mut self, _: Duration) -> Result<(), GnssFault> { Ok(()) }
//! #     fn read_report(&mut self) -> Result<RawNavReport, GnssFault> { Err(GnssFault::NotifyTimeout) }
//! #     fn close(&mut self) -> Result<(), GnssFault> { Ok(()) }
//! # }
//!
//! let buffer: Arc<SampleBuffer<SAMPLE_BUFFER_CAPACITY>> = Arc::new(SampleBuffer::new());
//! let mut acquisition = PositionAcquisition::new(Receiver, AcquisitionConfig::default());
//!
//! acquisition.open()?;
//! let fix = acquisition.await_first_fix()?;
//! println!("{} {}", fix.latitude, fix.longitude);
//! acquisition.close()?;
//! # Ok::<(), waypost_core::AcquisitionError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod calibration;
pub mod config;
pub mod connection;
pub mod drivers;
pub mod errors;
pub mod gnss;
pub mod report;
pub mod runtime;
pub mod sample;
pub mod sampler;

pub use calibration::{CalibrationBias, Calibrator};
pub use config::SAMPLE_BUFFER_CAPACITY;
pub use connection::{ConnectionLifecycle, ConnectionState, LifecycleConfig, ModemSession};
pub use drivers::{
    ApnConfig, ConstellationMask, GnssDriver, ImuDriver, ModemDriver, SessionId, StartMode,
};
pub use errors::{
    AcquisitionError, CalibrationError, ErrorClass, LifecycleError, LoggerError, SamplerError,
};
pub use gnss::{AcquisitionConfig, AcquisitionState, PositionAcquisition, PositionFix};
pub use report::{PositionReport, Sink};
pub use runtime::{LocationLogger, ShutdownToken};
pub use sample::{ImuSample, SampleBuffer};
pub use sampler::{ImuScale, SamplerConfig, SensorSampler};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
