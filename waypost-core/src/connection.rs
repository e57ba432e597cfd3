//! Cellular Connection Lifecycle
//!
//! ## Overview
//!
//! The modem moves through five ordered states:
//!
//! ```text
//! Uninitialized → Initialized → PoweredOn → RadioOn → PdnConnected
//!       0              1            2           3           4
//! ```
//!
//! [`ConnectionLifecycle::begin`] walks the bring-up actions for a state
//! range in increasing order and fails fast: the first fatal fault halts
//! the sequence, leaving the session at the last completed state.
//! [`ConnectionLifecycle::end`] walks the teardown actions in decreasing
//! order and is best-effort: a failing step is logged and the cascade
//! continues, so the modem handle is always released. That asymmetry is
//! deliberate — a half-connected modem is recoverable, a leaked handle is
//! not.
//!
//! ## Fault classification
//!
//! Bring-up faults are classified before they abort anything. An
//! `Already` result means the modem had previously reached the target
//! state and the sequence simply continues. A protocol error is only
//! transient until the secondary diagnostic is read: `AlreadyConnected`
//! reclassifies it as benign, anything else is fatal.
//!
//! ## Power-on settling
//!
//! Power-on completes asynchronously: the firmware restarts and fires a
//! registered callback once settled. The callback hands its reason code
//! to a one-shot channel and the lifecycle blocks on it with a bounded
//! timeout, so a dead modem surfaces as [`LifecycleError::RestartTimeout`]
//! instead of an unbounded wait.

use std::fmt;
use std::sync::mpsc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::{MODEM_RESTART_TIMEOUT_MS, QUALITY_REPORT_PERIOD_S};
use crate::drivers::{
    ApnConfig, ModemDriver, NetInfo, RestartHook, SessionId, SignalQuality, TelemetryHooks,
};
use crate::errors::{Diagnostic, ErrorClass, LifecycleError, LifecycleResult, ModemFault};

/// Ordered modem connection states. Transitions only ever move through
/// adjacent states; `begin`/`end` walk the range one state at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ConnectionState {
    /// Driver stack not initialized.
    #[default]
    Uninitialized = 0,
    /// Driver stack initialized, hardware off.
    Initialized = 1,
    /// Hardware powered and restart settled.
    PoweredOn = 2,
    /// Radio enabled, registered on the network.
    RadioOn = 3,
    /// Packet-data session active.
    PdnConnected = 4,
}

impl ConnectionState {
    /// All states in bring-up order.
    pub const ORDERED: [Self; 5] = [
        Self::Uninitialized,
        Self::Initialized,
        Self::PoweredOn,
        Self::RadioOn,
        Self::PdnConnected,
    ];

    /// The state below this one (saturating at `Uninitialized`).
    pub fn predecessor(self) -> Self {
        match self {
            Self::Uninitialized | Self::Initialized => Self::Uninitialized,
            Self::PoweredOn => Self::Initialized,
            Self::RadioOn => Self::PoweredOn,
            Self::PdnConnected => Self::RadioOn,
        }
    }

    /// The state above this one (saturating at `PdnConnected`).
    pub fn successor(self) -> Self {
        match self {
            Self::Uninitialized => Self::Initialized,
            Self::Initialized => Self::PoweredOn,
            Self::PoweredOn => Self::RadioOn,
            Self::RadioOn | Self::PdnConnected => Self::PdnConnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "Uninitialized",
            Self::Initialized => "Initialized",
            Self::PoweredOn => "PoweredOn",
            Self::RadioOn => "RadioOn",
            Self::PdnConnected => "PdnConnected",
        };
        f.write_str(name)
    }
}

/// First-pass classification of a bring-up fault, before any diagnostic
/// lookup. `Protocol` cannot be resolved here: it stays
/// [`ErrorClass::TransientProtocol`] until the secondary diagnostic says
/// whether the modem was merely already connected.
pub fn classify(fault: ModemFault) -> ErrorClass {
    match fault {
        ModemFault::Already => ErrorClass::AlreadyInState,
        ModemFault::Protocol => ErrorClass::TransientProtocol,
        _ => ErrorClass::Fatal,
    }
}

/// Lifecycle configuration: access point plus the wait/telemetry knobs.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Access point used for PDN activation.
    pub apn: ApnConfig,
    /// Bound on the power-on restart wait.
    pub restart_timeout: Duration,
    /// Subscribe to network/quality telemetry reports during radio-on.
    pub telemetry: bool,
}

impl LifecycleConfig {
    /// Configuration for the given access point with default waits.
    pub fn new(apn: ApnConfig) -> Self {
        Self {
            apn,
            restart_timeout: Duration::from_millis(MODEM_RESTART_TIMEOUT_MS),
            telemetry: true,
        }
    }

    /// Set the bound on the power-on restart wait.
    pub fn restart_timeout(mut self, timeout: Duration) -> Self {
        self.restart_timeout = timeout;
        self
    }

    /// Enable or disable the telemetry subscriptions.
    pub fn telemetry(mut self, enabled: bool) -> Self {
        self.telemetry = enabled;
        self
    }
}

/// Session context owned by the lifecycle: current state, the session
/// identifier (assigned only upon reaching `PdnConnected`), and the last
/// recorded error.
#[derive(Debug, Default)]
pub struct ModemSession {
    state: ConnectionState,
    session_id: Option<SessionId>,
    last_error: Option<LifecycleError>,
}

impl ModemSession {
    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Active packet-data session identifier, if connected.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Most recent lifecycle error, if any step has failed.
    pub fn last_error(&self) -> Option<LifecycleError> {
        self.last_error
    }
}

/// Ordered bring-up/teardown state machine around a [`ModemDriver`].
///
/// Owns the driver exclusively; no other thread touches the modem.
pub struct ConnectionLifecycle<M: ModemDriver> {
    driver: M,
    config: LifecycleConfig,
    session: ModemSession,
}

impl<M: ModemDriver> ConnectionLifecycle<M> {
    /// Wrap a modem driver. The session starts at `Uninitialized`.
    pub fn new(driver: M, config: LifecycleConfig) -> Self {
        Self {
            driver,
            config,
            session: ModemSession::default(),
        }
    }

    /// Session context: state, session id, last error.
    pub fn session(&self) -> &ModemSession {
        &self.session
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.session.state
    }

    /// Run the bring-up actions for every state in `(from, to]`, in
    /// increasing order. Fails fast: the first fatal fault halts the
    /// sequence, the session stays at the last completed state, and the
    /// error names the failing transition.
    pub fn begin(&mut self, from: ConnectionState, to: ConnectionState) -> LifecycleResult<()> {
        if from > to {
            return Err(LifecycleError::InvalidRange { from, to });
        }
        info!("modem bring-up {from} -> {to}");
        for target in ConnectionState::ORDERED {
            if target <= from || target > to {
                continue;
            }
            match self.bring_up(target) {
                Ok(()) => self.session.state = target,
                Err(err) => {
                    self.session.last_error = Some(err);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Run the teardown actions for every state in `[to, from)`, in
    /// decreasing order. Best-effort: a failing step is logged and the
    /// cascade continues so the modem handle is always released; the
    /// last failure encountered is reported once the cascade finishes.
    pub fn end(&mut self, from: ConnectionState, to: ConnectionState) -> LifecycleResult<()> {
        if from < to {
            return Err(LifecycleError::InvalidRange { from, to });
        }
        info!("modem teardown {from} -> {to}");
        let mut last_failure = None;
        for target in ConnectionState::ORDERED.into_iter().rev() {
            if target < to || target >= from {
                continue;
            }
            if let Err(err) = self.tear_down(target) {
                warn!("teardown step to {target} failed ({err}), continuing");
                last_failure = Some(err);
            }
            self.session.state = target;
        }
        if let Some(err) = last_failure {
            self.session.last_error = Some(err);
            return Err(err);
        }
        Ok(())
    }

    /// Read the subscriber identity from the SIM. Meaningful once the
    /// radio is on; useful for tagging uploaded payloads.
    pub fn imsi(&mut self) -> LifecycleResult<String> {
        self.driver.imsi().map_err(LifecycleError::Query)
    }

    fn bring_up(&mut self, target: ConnectionState) -> LifecycleResult<()> {
        debug!("bring-up step: {} -> {target}", target.predecessor());
        let outcome = match target {
            // No bring-up action targets the ground state.
            ConnectionState::Uninitialized => Ok(()),
            ConnectionState::Initialized => self.driver.initialize(),
            ConnectionState::PoweredOn => return self.power_on(),
            ConnectionState::RadioOn => self.radio_on(),
            ConnectionState::PdnConnected => self.activate_pdn(),
        };
        self.settle(target, outcome)
    }

    /// Resolve a step outcome against the fault taxonomy. Benign faults
    /// keep the sequence going; everything else becomes a `StepFailed`
    /// naming the transition.
    fn settle(&mut self, target: ConnectionState, outcome: Result<(), ModemFault>) -> LifecycleResult<()> {
        let fault = match outcome {
            Ok(()) => return Ok(()),
            Err(fault) => fault,
        };
        let class = match classify(fault) {
            ErrorClass::TransientProtocol => match self.driver.last_diagnostic() {
                Diagnostic::AlreadyConnected => ErrorClass::AlreadyInState,
                diag => {
                    warn!("protocol error diagnostic: {diag:?}");
                    ErrorClass::Fatal
                }
            },
            class => class,
        };
        match class {
            ErrorClass::AlreadyInState => {
                debug!("modem already past {target}, continuing");
                Ok(())
            }
            _ => Err(LifecycleError::StepFailed {
                from: target.predecessor(),
                to: target,
                fault,
            }),
        }
    }

    /// Power on and wait for the firmware restart to settle. The restart
    /// hook fires on the driver's callback thread; a one-shot channel
    /// carries it back here under a bounded timeout.
    fn power_on(&mut self) -> LifecycleResult<()> {
        let (tx, rx) = mpsc::sync_channel::<u32>(1);
        let hook: RestartHook = Box::new(move |reason| {
            let _ = tx.try_send(reason);
        });
        match self.driver.power_on(hook) {
            Ok(()) => {
                debug!("waiting for modem restart");
                match rx.recv_timeout(self.config.restart_timeout) {
                    Ok(reason) => {
                        debug!("modem restart settled (reason {reason})");
                        Ok(())
                    }
                    Err(_) => Err(LifecycleError::RestartTimeout {
                        waited_ms: self.config.restart_timeout.as_millis() as u64,
                    }),
                }
            }
            Err(fault) => self.settle(ConnectionState::PoweredOn, Err(fault)),
        }
    }

    fn radio_on(&mut self) -> Result<(), ModemFault> {
        let mut hooks = TelemetryHooks::default();
        if self.config.telemetry {
            hooks.net_info = Some(Box::new(|info: NetInfo| {
                debug!(
                    "network status {} ({} active pdn)",
                    info.status, info.pdn_count
                );
            }));
            hooks.quality = Some(Box::new(|q: SignalQuality| {
                debug!(
                    "rsrq {} dB (rssi {} dBm, rsrp {} dBm), sinr {} dB; next report in {QUALITY_REPORT_PERIOD_S} s",
                    q.rsrq, q.rssi, q.rsrp, q.sinr
                );
            }));
        }
        self.driver.radio_on(hooks)
    }

    fn activate_pdn(&mut self) -> Result<(), ModemFault> {
        let id = self.driver.activate_pdn(&self.config.apn)?;
        info!("packet data session {id} active");
        self.session.session_id = Some(id);
        Ok(())
    }

    fn tear_down(&mut self, target: ConnectionState) -> LifecycleResult<()> {
        debug!("teardown step: {} -> {target}", target.successor());
        let outcome = match target {
            ConnectionState::RadioOn => match self.session.session_id.take() {
                Some(id) => self.driver.deactivate_pdn(id),
                None => {
                    debug!("no packet data session to deactivate");
                    Ok(())
                }
            },
            ConnectionState::PoweredOn => self.driver.radio_off(),
            ConnectionState::Initialized => self.driver.power_off(),
            ConnectionState::Uninitialized => self.driver.finalize(),
            // Nothing sits above the connected state.
            ConnectionState::PdnConnected => Ok(()),
        };
        outcome.map_err(|fault| LifecycleError::StepFailed {
            from: target.successor(),
            to: target,
            fault,
        })
    }
}
