//! Phase switching supervisor for Triphase
//!
//! [`PhaseSwitcher`] owns all runtime state and the injected collaborator
//! handles (EVSE, meter, relay, digital-in). It is driven by three periodic
//! tasks on one tokio task (the 250 ms control tick, the 250 ms state
//! snapshot and the one-minute telemetry append) plus a command channel
//! through which external surfaces are marshalled. All control logic is
//! synchronous; nothing here blocks beyond the bounded collaborator calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::time::interval_at;

use crate::config::{Config, PhaseSwitcherConfig};
use crate::error::{Result, TriphaseError};
use crate::evse::{ChargerState, EvseLink, EvseStatus, Iec61851State};
use crate::hardware::{DigitalIn, QuadRelay, CHANNEL_COUNT};
use crate::history::SampleRing;
use crate::logging::{get_logger, StructuredLogger};
use crate::meter::PowerMeter;
use crate::selector::OperatingMode;

mod contactor;
mod outputs;
mod sequencer;
mod snapshot;
pub mod types;

pub use types::{HistoryView, SequencerState, StateSnapshot, SwitcherCommand};

/// `now >= since + seconds`, saturating; the standing idiom for every dwell
/// and watchdog comparison in this module.
pub(crate) fn elapsed(now: Instant, since: Instant, seconds: u32) -> bool {
    now.saturating_duration_since(since) >= Duration::from_secs(seconds as u64)
}

/// Supervisory controller selecting between one-, two- and three-phase
/// charging by actuating external line contactors.
pub struct PhaseSwitcher {
    /// Live (edit) configuration
    config: Config,
    /// Where config edits are persisted; `None` disables persistence
    config_path: Option<std::path::PathBuf>,
    /// Snapshot captured at start / explicit reload; governs the session
    in_use: PhaseSwitcherConfig,
    enabled: bool,
    operating_mode: OperatingMode,

    evse: Box<dyn EvseLink + Send>,
    relay: Box<dyn QuadRelay + Send>,
    digital_in: Box<dyn DigitalIn + Send>,
    meter: Box<dyn PowerMeter + Send>,

    logger: StructuredLogger,
    debug: bool,

    sequencer_state: SequencerState,
    last_sequencer_state: SequencerState,
    charger_state: ChargerState,
    iec61851_state: Iec61851State,
    auto_start_charging: bool,
    last_evse_status: Option<EvseStatus>,

    available_charging_power: u16,
    requested_phases: u8,
    requested_phases_pending: u8,
    last_requested_phases_pending: u8,
    quick_charging_active: bool,
    contactor_error: bool,

    last_state_change: Instant,
    last_phase_request_change: Instant,
    /// Next time the sequencer may re-issue an EVSE start/stop command
    evse_command_deadline: Option<Instant>,
    button_pressed_since: Instant,
    quick_charge_button_latched: bool,
    /// Per-phase timestamps of the last commanded == observed contactor match
    contactor_ok_since: [Instant; CHANNEL_COUNT],

    requested_power_history: SampleRing,
    charging_power_history: SampleRing,
    active_phases_history: SampleRing,

    commands_rx: mpsc::UnboundedReceiver<SwitcherCommand>,
    snapshot_tx: watch::Sender<Arc<StateSnapshot>>,
    history_tx: watch::Sender<Arc<HistoryView>>,
    config_tx: watch::Sender<Arc<Config>>,
}

impl PhaseSwitcher {
    /// Create a new switcher instance.
    ///
    /// Probes the relay, digital-in and meter collaborators once; any
    /// failure disables the module for this boot (the caller gets the error
    /// and must not schedule the switcher).
    pub fn new(
        config: Config,
        evse: Box<dyn EvseLink + Send>,
        mut relay: Box<dyn QuadRelay + Send>,
        mut digital_in: Box<dyn DigitalIn + Send>,
        meter: Box<dyn PowerMeter + Send>,
        commands_rx: mpsc::UnboundedReceiver<SwitcherCommand>,
    ) -> Result<Self> {
        let logger = get_logger("switcher");

        if let Err(e) = relay.read() {
            logger.error(&format!(
                "Quad relay read failed ({}), disabling phase switcher support",
                e
            ));
            return Err(TriphaseError::hardware("quad relay not reachable"));
        }
        if let Err(e) = digital_in.read() {
            logger.error(&format!(
                "Digital in read failed ({}), disabling phase switcher support",
                e
            ));
            return Err(TriphaseError::hardware("digital in not reachable"));
        }
        if !meter.available() {
            logger.error("Energy meter not available, disabling phase switcher module");
            return Err(TriphaseError::meter("energy meter not available"));
        }

        let in_use = config.phase_switcher.clamped();
        let enabled = in_use.enabled;
        let operating_mode = in_use.operating_mode;

        let now = Instant::now();
        let (snapshot_tx, _) = watch::channel(Arc::new(StateSnapshot::default()));
        let (history_tx, _) = watch::channel(Arc::new(HistoryView::default()));
        let (config_tx, _) = watch::channel(Arc::new(config.clone()));

        let mut switcher = Self {
            config,
            config_path: None,
            in_use,
            enabled,
            operating_mode,
            evse,
            relay,
            digital_in,
            meter,
            logger,
            debug: false,
            sequencer_state: SequencerState::Inactive,
            last_sequencer_state: SequencerState::Inactive,
            charger_state: ChargerState::NotConnected,
            iec61851_state: Iec61851State::A,
            auto_start_charging: false,
            last_evse_status: None,
            available_charging_power: 0,
            requested_phases: 0,
            requested_phases_pending: 0,
            last_requested_phases_pending: 0,
            quick_charging_active: false,
            contactor_error: false,
            last_state_change: now,
            last_phase_request_change: now,
            evse_command_deadline: None,
            button_pressed_since: now,
            quick_charge_button_latched: false,
            contactor_ok_since: [now; CHANNEL_COUNT],
            requested_power_history: SampleRing::new(),
            charging_power_history: SampleRing::new(),
            active_phases_history: SampleRing::new(),
            commands_rx,
            snapshot_tx,
            history_tx,
            config_tx,
        };
        switcher.publish_history();
        Ok(switcher)
    }

    /// Persist config edits to `path` (the original load location).
    pub fn with_config_path<P: Into<std::path::PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Subscribe to published state snapshots.
    pub fn snapshot_rx(&self) -> watch::Receiver<Arc<StateSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe to the rendered telemetry history.
    pub fn history_rx(&self) -> watch::Receiver<Arc<HistoryView>> {
        self.history_tx.subscribe()
    }

    /// Subscribe to the live configuration.
    pub fn config_rx(&self) -> watch::Receiver<Arc<Config>> {
        self.config_tx.subscribe()
    }

    /// Run the switcher until every command sender is dropped.
    pub async fn run(mut self) -> Result<()> {
        self.logger.info("Starting phase switcher main loop");

        let tick_period = Duration::from_millis(self.config.tick_interval_ms);
        let start = tokio::time::Instant::now();
        let mut control = interval_at(start, tick_period);
        let mut publish = interval_at(start + Duration::from_millis(10), tick_period);
        let mut telemetry = interval_at(
            start + Duration::from_millis(20),
            Duration::from_secs(crate::history::HISTORY_MINUTE_INTERVAL as u64 * 60),
        );

        loop {
            tokio::select! {
                biased;
                _ = control.tick() => {
                    self.tick(Instant::now());
                }
                _ = publish.tick() => {
                    self.publish_state(Instant::now());
                }
                _ = telemetry.tick() => {
                    self.update_history();
                }
                cmd = self.commands_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd, Instant::now()),
                        None => break,
                    }
                }
            }
        }

        self.logger.info("Phase switcher shutdown complete");
        Ok(())
    }

    /// One 250 ms control tick: button, sequencer, outputs, contactor audit,
    /// strictly in that order. A failed EVSE poll skips the whole tick; the
    /// relay monoflops then expire on their own within their pulse width.
    pub fn tick(&mut self, now: Instant) {
        let status = match self.evse.status() {
            Ok(status) => status,
            Err(e) => {
                self.logger.debug(&format!("EVSE status unavailable: {}", e));
                self.last_evse_status = None;
                return;
            }
        };
        self.last_evse_status = Some(status);

        self.handle_button(&status, now);
        self.handle_evse(&status, now);
        self.write_outputs(&status);
        self.contactor_check(&status, now);
    }

    /// Apply one marshalled external command.
    pub fn handle_command(&mut self, cmd: SwitcherCommand, now: Instant) {
        match cmd {
            SwitcherCommand::SetAvailableChargingPower(power) => {
                if self.enabled && !self.quick_charging_active {
                    self.set_available_charging_power(power, now);
                } else {
                    self.logger.debug(
                        "Available charging power update rejected (disabled or quick charging)",
                    );
                }
            }
            SwitcherCommand::StartQuickCharging => {
                self.start_quick_charging();
            }
            SwitcherCommand::SetDebug(on) => {
                self.debug = on;
                if on {
                    self.logger.info("Enabling debug mode");
                    self.update_history();
                } else {
                    self.logger.info("Disabling debug mode");
                }
            }
            SwitcherCommand::UpdateConfig(section) => {
                self.config.phase_switcher = section.clamped();
                self.config_tx.send_replace(Arc::new(self.config.clone()));
                if let Some(path) = &self.config_path {
                    if let Err(e) = self.config.save_to_file(path) {
                        self.logger
                            .warn(&format!("Failed to persist configuration: {}", e));
                    }
                }
                self.logger
                    .info("Configuration updated; takes effect on reload");
            }
            SwitcherCommand::ReloadConfig => {
                self.in_use = self.config.phase_switcher.clamped();
                self.enabled = self.in_use.enabled;
                self.operating_mode = self.in_use.operating_mode;
                self.logger.info(&format!(
                    "Configuration reloaded: enabled={}, operating_mode={:?}",
                    self.enabled, self.operating_mode
                ));
            }
        }
    }

    pub fn sequencer_state(&self) -> SequencerState {
        self.sequencer_state
    }

    pub fn requested_phases(&self) -> u8 {
        self.requested_phases
    }

    pub fn requested_phases_pending(&self) -> u8 {
        self.requested_phases_pending
    }

    pub fn available_charging_power(&self) -> u16 {
        self.available_charging_power
    }

    pub fn quick_charging_active(&self) -> bool {
        self.quick_charging_active
    }

    pub fn contactor_error(&self) -> bool {
        self.contactor_error
    }

    /// The configuration snapshot governing the current session.
    pub fn in_use_config(&self) -> &PhaseSwitcherConfig {
        &self.in_use
    }
}
