//! Error Types for the Logger Subsystems
//!
//! ## Design Philosophy
//!
//! Each subsystem gets its own error enum so a caller always knows which
//! device a failure belongs to. Driver-level faults (`ModemFault`,
//! `GnssFault`, `ImuFault`) describe what the hardware reported; the
//! component-level errors (`LifecycleError`, `AcquisitionError`, ...) add
//! the context a caller needs to decide whether to retry, degrade, or
//! abort: which transition failed, whether the error is retryable, how
//! long a wait ran before giving up.
//!
//! ## Failure classes
//!
//! Modem bring-up distinguishes three classes (see [`ErrorClass`]):
//!
//! - `AlreadyInState`: the modem is already where we asked it to go.
//!   Benign, the sequence continues.
//! - `TransientProtocol`: the driver reported a protocol error that needs
//!   a secondary diagnostic lookup before it can be classified.
//! - `Fatal`: aborts the bring-up sequence at the failing step.
//!
//! Teardown never aborts: every step runs and the last failure is
//! reported in aggregate. GNSS short reads are retryable; a sample-buffer
//! overflow is not an error at all (the sample is dropped and counted).

use thiserror::Error;

use crate::connection::ConnectionState;

/// Classification of a modem bring-up failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The modem already reached the requested state; continue.
    AlreadyInState,
    /// Protocol error that needs the secondary diagnostic to classify.
    TransientProtocol,
    /// Genuine failure; the bring-up sequence stops here.
    Fatal,
}

/// Secondary diagnostic code queried from the modem after a protocol error.
///
/// Mirrors the result-code register the radio firmware exposes: a protocol
/// error whose diagnostic reads `AlreadyConnected` is not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// The requested connection already exists.
    AlreadyConnected,
    /// The firmware rejected the operation as unsupported.
    NotSupported,
    /// The firmware rejected a parameter.
    InvalidParameter,
    /// Any other firmware result code.
    Code(i32),
}

/// Fault reported by the modem driver for a single operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemFault {
    /// Operation was already performed (EALREADY-class result).
    #[error("operation already performed")]
    Already,
    /// The network side is down.
    #[error("network is down")]
    NetworkDown,
    /// A previous operation is still in progress.
    #[error("operation in progress")]
    InProgress,
    /// Protocol error; query the diagnostic to classify it.
    #[error("protocol error (diagnostic lookup required)")]
    Protocol,
    /// Any other device error code.
    #[error("device error {0}")]
    Device(i32),
}

/// Result alias for connection lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Error from the connection bring-up/teardown state machine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// A bring-up or teardown step failed. `from` is the last state the
    /// modem held, `to` the state the failing action targeted.
    #[error("transition {from}->{to} failed: {fault}")]
    StepFailed {
        /// State the modem held when the step started.
        from: ConnectionState,
        /// State the failing action was driving toward.
        to: ConnectionState,
        /// What the driver reported.
        fault: ModemFault,
    },
    /// The restart notification never fired after power-on.
    #[error("modem restart notification not received within {waited_ms} ms")]
    RestartTimeout {
        /// How long the lifecycle waited before giving up.
        waited_ms: u64,
    },
    /// A query outside the state machine (IMSI lookup) failed.
    #[error("modem query failed: {0}")]
    Query(ModemFault),
    /// `begin` requires `from <= to`; `end` requires `from >= to`.
    #[error("invalid state range {from}->{to}")]
    InvalidRange {
        /// Requested starting state.
        from: ConnectionState,
        /// Requested target state.
        to: ConnectionState,
    },
}

/// Fault reported by the GNSS driver for a single operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GnssFault {
    /// The receiver device could not be opened.
    #[error("device open failed (errno {errno})")]
    DeviceOpen {
        /// OS-level error code from the open attempt.
        errno: i32,
    },
    /// A control command (interval, constellation, start, stop) failed.
    #[error("command {name} failed (code {code})")]
    Command {
        /// Which command failed.
        name: &'static str,
        /// Driver-reported code.
        code: i32,
    },
    /// The fix-ready notification machinery failed.
    #[error("notification error (code {code})")]
    Notification {
        /// Driver-reported code.
        code: i32,
    },
    /// No fix-ready notification arrived in time.
    #[error("no fix-ready notification within the wait window")]
    NotifyTimeout,
    /// A report read returned the wrong number of bytes.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Size of a full navigation record.
        expected: usize,
        /// Bytes actually read.
        actual: usize,
    },
}

/// Result alias for position acquisition operations.
pub type AcquisitionResult<T> = Result<T, AcquisitionError>;

/// Error from the position acquisition loop.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionError {
    /// `open()` failed; everything done so far was rolled back.
    #[error("acquisition open failed: {0}")]
    Open(GnssFault),
    /// A report read did not match the expected record size. Retryable:
    /// re-issue the read on the next notification.
    #[error("report read mismatch: expected {expected} bytes, got {actual}")]
    ReadMismatch {
        /// Size of a full navigation record.
        expected: usize,
        /// Bytes actually read.
        actual: usize,
    },
    /// Waiting for the fix-ready notification failed or timed out.
    #[error("fix-ready wait failed: {0}")]
    Notification(GnssFault),
    /// Any other driver fault while acquiring.
    #[error("gnss driver fault: {0}")]
    Driver(GnssFault),
    /// The acquisition is not open.
    #[error("acquisition is not open")]
    NotOpen,
}

impl AcquisitionError {
    /// Whether the caller should simply re-issue the operation.
    ///
    /// Short reads and notification timeouts leave the receiver healthy;
    /// the next notification usually delivers a full record.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ReadMismatch { .. } | Self::Notification(GnssFault::NotifyTimeout)
        )
    }
}

/// Fault reported by the IMU driver for a single operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImuFault {
    /// The sensor bus could not be opened.
    #[error("bus open failed (errno {errno})")]
    BusOpen {
        /// OS-level error code from the open attempt.
        errno: i32,
    },
    /// Sensor initialization failed.
    #[error("sensor init failed (code {code})")]
    SensorInit {
        /// Driver-reported code.
        code: i32,
    },
    /// Draining the hardware FIFO failed.
    #[error("fifo dequeue failed (code {code})")]
    Fifo {
        /// Driver-reported code.
        code: i32,
    },
    /// Reading the latest values failed.
    #[error("sensor read failed (code {code})")]
    Read {
        /// Driver-reported code.
        code: i32,
    },
}

/// Error from the sampling thread. Local to the sampler: a failed IMU
/// never aborts the sibling subsystems.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerError {
    /// The IMU driver faulted.
    #[error(transparent)]
    Driver(#[from] ImuFault),
    /// The sampling thread panicked.
    #[error("sampling thread panicked")]
    Panicked,
}

/// The buffer never accumulated enough samples inside the wait window.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("buffer held {have} of {needed} samples after {waited_ms} ms")]
pub struct SampleWaitTimeout {
    /// Samples required before the wait completes.
    pub needed: usize,
    /// Samples present when the wait gave up.
    pub have: usize,
    /// Length of the wait window.
    pub waited_ms: u64,
}

/// Error from a calibration run.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// Not enough samples arrived in time.
    #[error(transparent)]
    Timeout(#[from] SampleWaitTimeout),
    /// The requested sample count can never fit in the buffer.
    #[error("target {target} exceeds buffer capacity {capacity}")]
    TargetExceedsCapacity {
        /// Requested sample count.
        target: usize,
        /// Buffer capacity.
        capacity: usize,
    },
}

/// Error reported by a delivery sink.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("delivery failed: {reason}")]
pub struct DeliveryError {
    /// Why the sink rejected or failed to deliver the payload.
    pub reason: &'static str,
}

/// Top-level error from the logger run loop.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerError {
    /// The connection lifecycle failed fatally.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// The acquisition failed non-retryably.
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
}
