//! Shared test rig: a switcher wired to the loopback collaborators with a
//! synthetic clock, so scenarios run deterministically and instantly.

// Each test binary uses a different slice of the rig.
#![allow(dead_code)]

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use triphase::config::{Config, PhaseSwitcherConfig};
use triphase::evse::{ChargerState, Iec61851State, CONTACTOR_L1_CLOSED};
use triphase::selector::OperatingMode;
use triphase::sim::{SimDigitalIn, SimEvse, SimMeter, SimQuadRelay};
use triphase::switcher::{PhaseSwitcher, SwitcherCommand};

pub const TICK: Duration = Duration::from_millis(250);

pub struct Rig {
    pub switcher: PhaseSwitcher,
    pub evse: SimEvse,
    pub relay: SimQuadRelay,
    pub digital_in: SimDigitalIn,
    pub meter: SimMeter,
    #[allow(dead_code)]
    pub commands: mpsc::UnboundedSender<SwitcherCommand>,
    pub now: Instant,
}

/// A config with every timing parameter at the 10 s floor, so scenarios
/// elapse quickly.
pub fn fast_config(mode: OperatingMode, enabled: bool) -> PhaseSwitcherConfig {
    PhaseSwitcherConfig {
        enabled,
        operating_mode: mode,
        delay_time_more_phases: 10,
        delay_time_less_phases: 10,
        minimum_duration: 10,
        pause_time: 10,
    }
}

impl Rig {
    pub fn new(section: PhaseSwitcherConfig) -> Self {
        let evse = SimEvse::new();
        let relay = SimQuadRelay::new();
        let digital_in = SimDigitalIn::new();
        let meter = SimMeter::new();
        let (commands, commands_rx) = mpsc::unbounded_channel();

        let config = Config {
            phase_switcher: section,
            ..Config::default()
        };

        let switcher = PhaseSwitcher::new(
            config,
            Box::new(evse.clone()),
            Box::new(relay.clone()),
            Box::new(digital_in.clone()),
            Box::new(meter.clone()),
            commands_rx,
        )
        .expect("switcher construction");

        Self {
            switcher,
            evse,
            relay,
            digital_in,
            meter,
            commands,
            now: Instant::now(),
        }
    }

    pub fn tick(&mut self) {
        self.now += TICK;
        self.switcher.tick(self.now);
    }

    /// Advance synthetic time, ticking every 250 ms. Contactor feedback is
    /// NOT updated; use `run_for_synced` when the feedback should follow the
    /// relay outputs.
    pub fn run_for(&mut self, duration: Duration) {
        let ticks = (duration.as_millis() / TICK.as_millis()).max(1);
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Like `run_for`, but mirrors the relay outputs onto the contactor
    /// feedback paths before every tick (healthy contactors).
    pub fn run_for_synced(&mut self, duration: Duration) {
        let ticks = (duration.as_millis() / TICK.as_millis()).max(1);
        for _ in 0..ticks {
            self.sync_contactor_feedback();
            self.tick();
        }
    }

    pub fn set_power(&mut self, power: u16) {
        self.switcher
            .handle_command(SwitcherCommand::SetAvailableChargingPower(power), self.now);
    }

    pub fn command(&mut self, cmd: SwitcherCommand) {
        self.switcher.handle_command(cmd, self.now);
    }

    /// Mirror the commanded relay channels onto the contactor feedback paths
    /// (EVSE monitor for L1, digital inputs for L2/L3).
    pub fn sync_contactor_feedback(&mut self) {
        let channels = self.relay.channels();
        self.evse
            .set_contactor_state(if channels[1] { CONTACTOR_L1_CLOSED } else { 0 });
        self.digital_in.set_channel(2, channels[2]);
        self.digital_in.set_channel(3, channels[3]);
    }

    /// Plug in the vehicle: charge release pending, pilot in state B.
    pub fn connect_vehicle(&mut self) {
        self.evse
            .set_charger_state(ChargerState::WaitingForChargeRelease);
        self.evse.set_iec61851_state(Iec61851State::B);
    }

    /// The EVSE grants the charge and closes its internal contactor.
    pub fn evse_reports_charging(&mut self) {
        self.evse.set_charger_state(ChargerState::Charging);
        self.evse.set_iec61851_state(Iec61851State::C);
        self.evse.set_relay_output(true);
    }

    /// The EVSE ends the charge and opens its internal contactor.
    pub fn evse_reports_stopped(&mut self) {
        self.evse
            .set_charger_state(ChargerState::WaitingForChargeRelease);
        self.evse.set_iec61851_state(Iec61851State::B);
        self.evse.set_relay_output(false);
    }
}
