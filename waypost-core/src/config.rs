//! Shared defaults for the logger subsystems.
//!
//! Values match the target hardware: a 50 ms inertial tick into a buffer
//! sized for 30 seconds of samples, a 1 Hz positioning cycle, and the
//! wait windows added around the firmware's asynchronous completions.

/// Inertial sampling tick period, milliseconds.
pub const IMU_SAMPLE_PERIOD_MS: u64 = 50;

/// Sample buffer capacity: 30 s of history at the 50 ms tick.
pub const SAMPLE_BUFFER_CAPACITY: usize = 600;

/// Settling delay between sensor init and the first tick, milliseconds.
pub const IMU_WARMUP_MS: u64 = 250;

/// Default inertial sensor bus address.
pub const IMU_BUS_ADDRESS: u8 = 0x68;

/// Positioning notify cycle, milliseconds.
pub const FIX_INTERVAL_MS: u32 = 1000;

/// How long one fix-ready wait may block, milliseconds.
pub const FIX_WAIT_TIMEOUT_MS: u64 = 30_000;

/// How long to wait for the modem restart notification, milliseconds.
pub const MODEM_RESTART_TIMEOUT_MS: u64 = 30_000;

/// Signal quality report period requested from the radio, seconds.
pub const QUALITY_REPORT_PERIOD_S: u32 = 60;

/// Pause between delivered position reports, milliseconds.
pub const REPORT_INTERVAL_MS: u64 = 5_000;
