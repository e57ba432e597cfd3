//! Collaborator Capability Traits
//!
//! ## Overview
//!
//! The core never talks to hardware directly. Each device is reached
//! through a capability trait that a board support crate (or a test mock)
//! implements:
//!
//! - [`ModemDriver`] — the cellular radio control surface
//! - [`GnssDriver`] — the satellite receiver control surface
//! - [`ImuDriver`] — the inertial sensor bus
//!
//! Each driver owns its handle exclusively: the modem handle belongs to
//! the connection lifecycle, the receiver handle to the acquisition, the
//! sensor bus to the sampling thread. No handle crosses threads.
//!
//! The operation sets mirror what the radio/receiver/sensor firmware
//! actually exposes, so a real board implementation is a thin shim. Faults
//! are reported through the per-device enums in [`crate::errors`].

use std::time::Duration;

use crate::errors::{Diagnostic, GnssFault, ImuFault, ModemFault};

// ---------------------------------------------------------------------------
// Modem
// ---------------------------------------------------------------------------

/// Identifier of an activated packet-data session.
pub type SessionId = u8;

/// IP stack requested for the packet-data session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpType {
    /// IPv4 only.
    V4,
    /// IPv6 only.
    V6,
    /// Dual stack.
    #[default]
    V4V6,
}

/// Authentication scheme for the packet-data session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    /// No authentication.
    None,
    /// Password Authentication Protocol.
    Pap,
    /// Challenge-Handshake Authentication Protocol.
    #[default]
    Chap,
}

/// Access point configuration for PDN activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApnConfig {
    /// Access point name.
    pub apn: String,
    /// Account user name, if the carrier requires one.
    pub user_name: Option<String>,
    /// Account password, if the carrier requires one.
    pub password: Option<String>,
    /// Requested IP stack.
    pub ip_type: IpType,
    /// Authentication scheme.
    pub auth_type: AuthType,
}

impl ApnConfig {
    /// Configuration for the named access point with default IP/auth.
    pub fn new(apn: impl Into<String>) -> Self {
        Self {
            apn: apn.into(),
            user_name: None,
            password: None,
            ip_type: IpType::default(),
            auth_type: AuthType::default(),
        }
    }

    /// Set the account credentials.
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_name = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Set the requested IP stack.
    pub fn ip_type(mut self, ip_type: IpType) -> Self {
        self.ip_type = ip_type;
        self
    }

    /// Set the authentication scheme.
    pub fn auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }
}

/// Registration status snapshot pushed by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetInfo {
    /// Network registration state reported by the radio.
    pub status: u8,
    /// Number of active packet-data sessions.
    pub pdn_count: u8,
}

/// Signal quality snapshot pushed by the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalQuality {
    /// Received signal strength indicator, dBm.
    pub rssi: i16,
    /// Reference signal received power, dBm.
    pub rsrp: i16,
    /// Reference signal received quality, dB.
    pub rsrq: i16,
    /// Signal to interference-plus-noise ratio, dB.
    pub sinr: i16,
}

/// One-shot callback fired when the modem finishes its power-on restart.
/// The argument is the firmware's restart reason code.
pub type RestartHook = Box<dyn FnOnce(u32) + Send>;

/// Optional telemetry subscriptions registered before radio-on.
#[derive(Default)]
pub struct TelemetryHooks {
    /// Called when the network pushes a registration status update.
    pub net_info: Option<Box<dyn FnMut(NetInfo) + Send>>,
    /// Called on each periodic signal quality report.
    pub quality: Option<Box<dyn FnMut(SignalQuality) + Send>>,
}

/// Control surface of the cellular modem.
///
/// Operations are synchronous except `power_on`, which completes
/// asynchronously: the firmware restarts and fires the registered hook
/// once it has settled. The lifecycle converts that callback into a
/// bounded wait.
pub trait ModemDriver {
    /// Bring up the modem driver stack.
    fn initialize(&mut self) -> Result<(), ModemFault>;

    /// Power the radio hardware on. `on_restart` fires once the firmware
    /// has finished restarting; power-on is not complete until then.
    fn power_on(&mut self, on_restart: RestartHook) -> Result<(), ModemFault>;

    /// Enable the radio and start network registration, with optional
    /// telemetry subscriptions.
    fn radio_on(&mut self, telemetry: TelemetryHooks) -> Result<(), ModemFault>;

    /// Negotiate a packet-data session with the carrier.
    fn activate_pdn(&mut self, apn: &ApnConfig) -> Result<SessionId, ModemFault>;

    /// Tear down the packet-data session.
    fn deactivate_pdn(&mut self, session: SessionId) -> Result<(), ModemFault>;

    /// Disable the radio.
    fn radio_off(&mut self) -> Result<(), ModemFault>;

    /// Power the radio hardware off.
    fn power_off(&mut self) -> Result<(), ModemFault>;

    /// Release the modem driver stack.
    fn finalize(&mut self) -> Result<(), ModemFault>;

    /// Read the subscriber identity from the SIM.
    fn imsi(&mut self) -> Result<String, ModemFault>;

    /// Secondary diagnostic for the most recent protocol error.
    fn last_diagnostic(&self) -> Diagnostic;
}

// ---------------------------------------------------------------------------
// GNSS
// ---------------------------------------------------------------------------

/// Satellite constellations the receiver may track, as a bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstellationMask(pub u32);

impl ConstellationMask {
    /// GPS (United States).
    pub const GPS: Self = Self(1 << 0);
    /// GLONASS (Russia).
    pub const GLONASS: Self = Self(1 << 1);
    /// QZSS L1-C/A (Japan, regional).
    pub const QZSS: Self = Self(1 << 2);

    /// Whether every constellation in `other` is enabled in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for ConstellationMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Positioning start mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartMode {
    /// Reuse ephemeris and almanac already held by the receiver.
    #[default]
    Hot,
    /// Discard receiver state and search from scratch.
    Cold,
}

/// Fix mode field of a navigation record. Anything other than
/// `INVALID` means the receiver resolved a position.
pub const FIX_MODE_INVALID: u8 = 0;

/// Raw navigation record as read from the receiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawNavReport {
    /// Fix mode: [`FIX_MODE_INVALID`], 2D, or 3D.
    pub fix_mode: u8,
    /// Latitude, degrees.
    pub latitude: f64,
    /// Longitude, degrees.
    pub longitude: f64,
    /// Altitude above the ellipsoid, meters.
    pub altitude: f64,
    /// Speed over ground, m/s.
    pub velocity: f32,
    /// Course over ground, degrees.
    pub direction: f32,
}

impl RawNavReport {
    /// Wire size of one full record; a read of any other size is a
    /// [`GnssFault::ShortRead`].
    pub const SIZE: usize = core::mem::size_of::<Self>();
}

/// Control surface of the satellite receiver.
///
/// The driver owns the device handle; `open`/`close` bracket its
/// lifetime. A fix-ready notification must be registered before `start`
/// and cancelled before `close`.
pub trait GnssDriver {
    /// Acquire the receiver device handle.
    fn open(&mut self) -> Result<(), GnssFault>;

    /// Set the position notify cycle, in milliseconds.
    fn set_interval(&mut self, interval_ms: u32) -> Result<(), GnssFault>;

    /// Select which constellations the receiver tracks.
    fn select_constellations(&mut self, mask: ConstellationMask) -> Result<(), GnssFault>;

    /// Subscribe to fix-ready notifications.
    fn register_notification(&mut self) -> Result<(), GnssFault>;

    /// Cancel the fix-ready subscription.
    fn cancel_notification(&mut self) -> Result<(), GnssFault>;

    /// Begin positioning.
    fn start(&mut self, mode: StartMode) -> Result<(), GnssFault>;

    /// Stop positioning.
    fn stop(&mut self) -> Result<(), GnssFault>;

    /// Block until the next fix-ready notification, or
    /// [`GnssFault::NotifyTimeout`] if none arrives within `timeout`.
    fn wait_ready(&mut self, timeout: Duration) -> Result<(), GnssFault>;

    /// Read one navigation record. A partial read reports
    /// [`GnssFault::ShortRead`] and leaves the receiver healthy.
    fn read_report(&mut self) -> Result<RawNavReport, GnssFault>;

    /// Release the receiver device handle.
    fn close(&mut self) -> Result<(), GnssFault>;
}

// ---------------------------------------------------------------------------
// IMU
// ---------------------------------------------------------------------------

/// One raw three-axis reading, in sensor counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTriple {
    /// X axis counts.
    pub x: i16,
    /// Y axis counts.
    pub y: i16,
    /// Z axis counts.
    pub z: i16,
}

/// Control surface of the inertial sensor.
///
/// The sensor buffers readings in a hardware FIFO; `dequeue_fifo` drains
/// it into the driver's latest-value registers, which `latest_accel` and
/// `latest_gyro` then report.
pub trait ImuDriver {
    /// Open the sensor bus.
    fn open_bus(&mut self) -> Result<(), ImuFault>;

    /// Initialize the sensor at the given bus address.
    fn init_sensor(&mut self, address: u8) -> Result<(), ImuFault>;

    /// Drain the hardware FIFO into the latest-value registers.
    fn dequeue_fifo(&mut self) -> Result<(), ImuFault>;

    /// Latest accelerometer reading, raw counts.
    fn latest_accel(&mut self) -> Result<RawTriple, ImuFault>;

    /// Latest gyroscope reading, raw counts.
    fn latest_gyro(&mut self) -> Result<RawTriple, ImuFault>;

    /// Close the sensor bus.
    fn close_bus(&mut self) -> Result<(), ImuFault>;
}
