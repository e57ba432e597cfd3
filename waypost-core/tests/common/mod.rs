//! Shared test support: scripted mock drivers and sinks.
//!
//! Each mock records the operations invoked on it into a shared call
//! log, and can be scripted to fail a single named operation, so tests
//! can assert both ordering and failure policy.

#![allow(dead_code)] // Each test binary uses a different subset.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use waypost_core::drivers::{
    ApnConfig, ConstellationMask, GnssDriver, ImuDriver, ModemDriver, NetInfo, RawNavReport,
    RawTriple, RestartHook, SessionId, SignalQuality, StartMode, TelemetryHooks,
};
use waypost_core::errors::{DeliveryError, Diagnostic, GnssFault, ImuFault, ModemFault};
use waypost_core::report::{PositionReport, Sink};

/// Operations invoked on a mock, in order.
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Snapshot a call log for assertions.
pub fn calls(log: &CallLog) -> Vec<&'static str> {
    log.lock().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Modem
// ---------------------------------------------------------------------------

/// Session id every successful PDN activation hands out.
pub const MOCK_SESSION_ID: SessionId = 7;

pub struct MockModem {
    log: CallLog,
    fail_on: Option<(&'static str, ModemFault)>,
    diagnostic: Diagnostic,
    suppress_restart: bool,
}

impl MockModem {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
            diagnostic: Diagnostic::Code(0),
            suppress_restart: false,
        }
    }

    /// Fail the named operation with the given fault.
    pub fn fail_on(mut self, op: &'static str, fault: ModemFault) -> Self {
        self.fail_on = Some((op, fault));
        self
    }

    /// Set the secondary diagnostic returned after a protocol error.
    pub fn diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostic = diagnostic;
        self
    }

    /// Never fire the restart hook, so power-on waits time out.
    pub fn suppress_restart(mut self) -> Self {
        self.suppress_restart = true;
        self
    }

    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.log)
    }

    fn record(&mut self, op: &'static str) -> Result<(), ModemFault> {
        self.log.lock().unwrap().push(op);
        match self.fail_on {
            Some((fail_op, fault)) if fail_op == op => Err(fault),
            _ => Ok(()),
        }
    }
}

impl ModemDriver for MockModem {
    fn initialize(&mut self) -> Result<(), ModemFault> {
        self.record("initialize")
    }

    fn power_on(&mut self, on_restart: RestartHook) -> Result<(), ModemFault> {
        self.record("power_on")?;
        if !self.suppress_restart {
            on_restart(1);
        }
        Ok(())
    }

    fn radio_on(&mut self, mut telemetry: TelemetryHooks) -> Result<(), ModemFault> {
        self.record("radio_on")?;
        if let Some(hook) = telemetry.net_info.as_mut() {
            hook(NetInfo {
                status: 1,
                pdn_count: 0,
            });
        }
        if let Some(hook) = telemetry.quality.as_mut() {
            hook(SignalQuality {
                rssi: -70,
                rsrp: -100,
                rsrq: -10,
                sinr: 12,
            });
        }
        Ok(())
    }

    fn activate_pdn(&mut self, _apn: &ApnConfig) -> Result<SessionId, ModemFault> {
        self.record("activate_pdn")?;
        Ok(MOCK_SESSION_ID)
    }

    fn deactivate_pdn(&mut self, _session: SessionId) -> Result<(), ModemFault> {
        self.record("deactivate_pdn")
    }

    fn radio_off(&mut self) -> Result<(), ModemFault> {
        self.record("radio_off")
    }

    fn power_off(&mut self) -> Result<(), ModemFault> {
        self.record("power_off")
    }

    fn finalize(&mut self) -> Result<(), ModemFault> {
        self.record("finalize")
    }

    fn imsi(&mut self) -> Result<String, ModemFault> {
        self.record("imsi")?;
        Ok("440103213800000".to_owned())
    }

    fn last_diagnostic(&self) -> Diagnostic {
        self.diagnostic
    }
}

// ---------------------------------------------------------------------------
// GNSS
// ---------------------------------------------------------------------------

/// One scripted receiver report.
#[derive(Clone, Copy)]
pub enum GnssScript {
    /// A resolved fix at the given coordinates.
    Valid(f64, f64),
    /// A report with no position solution.
    Invalid,
    /// A short read of the given size.
    Short(usize),
}

pub struct MockGnss {
    log: CallLog,
    fail_on: Option<(&'static str, GnssFault)>,
    reports: VecDeque<GnssScript>,
    closed: Arc<AtomicBool>,
}

impl MockGnss {
    pub fn new(reports: impl IntoIterator<Item = GnssScript>) -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
            reports: reports.into_iter().collect(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_on(mut self, op: &'static str, fault: GnssFault) -> Self {
        self.fail_on = Some((op, fault));
        self
    }

    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.log)
    }

    /// Flag flipped when `close` runs; survives the driver being moved
    /// into an acquisition.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    fn record(&mut self, op: &'static str) -> Result<(), GnssFault> {
        self.log.lock().unwrap().push(op);
        match self.fail_on {
            Some((fail_op, fault)) if fail_op == op => Err(fault),
            _ => Ok(()),
        }
    }
}

impl GnssDriver for MockGnss {
    fn open(&mut self) -> Result<(), GnssFault> {
        self.record("open")
    }

    fn set_interval(&mut self, _interval_ms: u32) -> Result<(), GnssFault> {
        self.record("set_interval")
    }

    fn select_constellations(&mut self, _mask: ConstellationMask) -> Result<(), GnssFault> {
        self.record("select_constellations")
    }

    fn register_notification(&mut self) -> Result<(), GnssFault> {
        self.record("register_notification")
    }

    fn cancel_notification(&mut self) -> Result<(), GnssFault> {
        self.record("cancel_notification")
    }

    fn start(&mut self, _mode: StartMode) -> Result<(), GnssFault> {
        self.record("start")
    }

    fn stop(&mut self) -> Result<(), GnssFault> {
        self.record("stop")
    }

    fn wait_ready(&mut self, _timeout: Duration) -> Result<(), GnssFault> {
        self.record("wait_ready")?;
        if self.reports.is_empty() {
            return Err(GnssFault::NotifyTimeout);
        }
        Ok(())
    }

    fn read_report(&mut self) -> Result<RawNavReport, GnssFault> {
        self.record("read_report")?;
        match self.reports.pop_front() {
            Some(GnssScript::Valid(lat, lng)) => Ok(RawNavReport {
                fix_mode: 3,
                latitude: lat,
                longitude: lng,
                altitude: 40.0,
                velocity: 0.5,
                direction: 90.0,
            }),
            Some(GnssScript::Invalid) => Ok(RawNavReport {
                fix_mode: 0,
                latitude: 0.0,
                longitude: 0.0,
                altitude: 0.0,
                velocity: 0.0,
                direction: 0.0,
            }),
            Some(GnssScript::Short(actual)) => Err(GnssFault::ShortRead {
                expected: RawNavReport::SIZE,
                actual,
            }),
            None => Err(GnssFault::NotifyTimeout),
        }
    }

    fn close(&mut self) -> Result<(), GnssFault> {
        self.closed.store(true, Ordering::Relaxed);
        self.record("close")
    }
}

// ---------------------------------------------------------------------------
// IMU
// ---------------------------------------------------------------------------

pub struct MockImu {
    log: CallLog,
    fail_on: Option<(&'static str, ImuFault)>,
    accel: RawTriple,
    gyro: RawTriple,
    closed: Arc<AtomicBool>,
}

impl MockImu {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
            // Roughly 1 g on z at the default ±8 g scale.
            accel: RawTriple { x: 0, y: 0, z: 4096 },
            gyro: RawTriple { x: 10, y: -10, z: 0 },
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_on(mut self, op: &'static str, fault: ImuFault) -> Self {
        self.fail_on = Some((op, fault));
        self
    }

    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.log)
    }

    /// Flag flipped when `close_bus` runs; survives the driver being
    /// moved into the sampling thread.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    fn record(&mut self, op: &'static str) -> Result<(), ImuFault> {
        self.log.lock().unwrap().push(op);
        match self.fail_on {
            Some((fail_op, fault)) if fail_op == op => Err(fault),
            _ => Ok(()),
        }
    }
}

impl ImuDriver for MockImu {
    fn open_bus(&mut self) -> Result<(), ImuFault> {
        self.record("open_bus")
    }

    fn init_sensor(&mut self, _address: u8) -> Result<(), ImuFault> {
        self.record("init_sensor")
    }

    fn dequeue_fifo(&mut self) -> Result<(), ImuFault> {
        self.record("dequeue_fifo")
    }

    fn latest_accel(&mut self) -> Result<RawTriple, ImuFault> {
        self.record("latest_accel")?;
        Ok(self.accel)
    }

    fn latest_gyro(&mut self) -> Result<RawTriple, ImuFault> {
        self.record("latest_gyro")?;
        Ok(self.gyro)
    }

    fn close_bus(&mut self) -> Result<(), ImuFault> {
        self.closed.store(true, Ordering::Relaxed);
        self.record("close_bus")
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

pub struct MemorySink {
    delivered: Arc<Mutex<Vec<PositionReport>>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            delivered: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            delivered: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    pub fn delivered(&self) -> Arc<Mutex<Vec<PositionReport>>> {
        Arc::clone(&self.delivered)
    }
}

impl Sink for MemorySink {
    fn deliver(&mut self, report: &PositionReport) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError {
                reason: "scripted failure",
            });
        }
        self.delivered.lock().unwrap().push(*report);
        Ok(())
    }
}
