//! The sequencer state machine.
//!
//! Coordinates EVSE start/stop, phase changes, quick-charge requests and
//! contactor-fault response. Phase changes never happen in place: the
//! sequencer stops the EVSE, waits out the configured pause and restarts it
//! with the new phase count committed, so contactors only ever switch
//! de-energized.

use std::time::{Duration, Instant};

use crate::evse::{ChargerState, EvseStatus, Iec61851State};
use crate::selector::{self, MAX_CHARGE_CURRENT_MA};

use super::types::SequencerState;
use super::elapsed;

/// How long to wait before re-issuing an unanswered EVSE start or stop
/// command.
pub(crate) const EVSE_COMMAND_RETRY: Duration = Duration::from_secs(10);

/// Button hold time that triggers quick charging.
pub(crate) const QUICK_CHARGE_BUTTON_HOLD: Duration = Duration::from_secs(2);

impl super::PhaseSwitcher {
    /// Quick-charge button: one latched trigger per continuous press of at
    /// least [`QUICK_CHARGE_BUTTON_HOLD`].
    pub(crate) fn handle_button(&mut self, status: &EvseStatus, now: Instant) {
        if !status.button_pressed {
            self.button_pressed_since = now;
            self.quick_charge_button_latched = false;
        }

        if now.saturating_duration_since(self.button_pressed_since) >= QUICK_CHARGE_BUTTON_HOLD
            && !self.quick_charge_button_latched
        {
            self.start_quick_charging();
            self.quick_charge_button_latched = true;
        }
    }

    /// Sequencer entry point, evaluated every tick.
    ///
    /// The gate comes first: a disabled module, a disconnected vehicle or an
    /// EVSE error forces `Inactive` with no phases committed, before any
    /// state dispatch.
    pub(crate) fn handle_evse(&mut self, status: &EvseStatus, now: Instant) {
        self.charger_state = status.charger_state;
        self.iec61851_state = status.iec61851_state;
        self.auto_start_charging = status.auto_start_charging;

        if !self.enabled
            || matches!(
                self.charger_state,
                ChargerState::NotConnected | ChargerState::Error
            )
        {
            self.sequencer_state = SequencerState::Inactive;
            self.quick_charging_active = false;
            self.requested_phases = 0;
            return;
        }

        match self.sequencer_state {
            SequencerState::Inactive => self.state_inactive(),
            SequencerState::Standby => self.state_standby(now),
            SequencerState::CancellingEvseStart => self.state_cancelling_evse_start(now),
            SequencerState::WaitingForEvseStart => self.state_waiting_for_evse_start(now),
            SequencerState::Active => self.state_active(now),
            SequencerState::QuickCharging => self.state_quick_charging(now),
            SequencerState::WaitingForEvseStop => self.state_waiting_for_evse_stop(now),
            SequencerState::PausingWhileSwitching => self.state_pausing_while_switching(now),
            SequencerState::StoppedByEvse => self.state_stopped_by_evse(),
        }

        if self.last_sequencer_state != self.sequencer_state {
            if self.debug {
                self.logger.debug(&format!(
                    "Sequencer state changed to {:?}",
                    self.sequencer_state
                ));
            }
            self.last_state_change = now;
            self.evse_command_deadline = None;
            self.last_sequencer_state = self.sequencer_state;
        }
    }

    fn state_inactive(&mut self) {
        if self.charger_state == ChargerState::WaitingForChargeRelease
            && (self.auto_start_charging || self.iec61851_state == Iec61851State::B)
            && !self.contactor_error
        {
            self.logger
                .info("Vehicle connected, changing to standby state");
            self.sequencer_state = SequencerState::Standby;
        } else if matches!(
            self.charger_state,
            ChargerState::ReadyForCharging | ChargerState::Charging
        ) {
            self.logger.info(
                "Charging initiated by EVSE but requested power is not sufficient, requesting EVSE to stop charging",
            );
            self.sequencer_state = SequencerState::CancellingEvseStart;
        }
    }

    fn state_standby(&mut self, now: Instant) {
        if elapsed(
            now,
            self.last_phase_request_change,
            self.in_use.delay_time_more_phases,
        ) {
            if self.requested_phases_pending > 0 {
                self.logger.info("Requesting EVSE to start charging");
                if !self.quick_charging_active {
                    self.push_current(self.available_charging_power, self.requested_phases_pending);
                }
                self.sequencer_state = SequencerState::WaitingForEvseStart;
            }
            self.requested_phases = self.requested_phases_pending;
        } else if matches!(
            self.charger_state,
            ChargerState::ReadyForCharging | ChargerState::Charging
        ) {
            self.logger.info(
                "Charging initiated by EVSE but requested power is not sufficient, requesting EVSE to stop charging",
            );
            self.sequencer_state = SequencerState::CancellingEvseStart;
        }
    }

    fn state_cancelling_evse_start(&mut self, now: Instant) {
        if self.evse_command_due(now) {
            self.logger.info("Sending stop request to EVSE");
            if let Err(e) = self.evse.stop_charging() {
                self.logger.warn(&format!("EVSE stop command failed: {}", e));
            }
        }

        if !matches!(
            self.charger_state,
            ChargerState::ReadyForCharging | ChargerState::Charging
        ) {
            self.logger
                .info("Charging stopped by EVSE, changing to standby state");
            self.sequencer_state = SequencerState::Standby;
        }
    }

    fn state_waiting_for_evse_start(&mut self, now: Instant) {
        if self.evse_command_due(now) {
            self.logger.info("Sending start request to EVSE");
            if let Err(e) = self.evse.start_charging() {
                self.logger
                    .warn(&format!("EVSE start command failed: {}", e));
            }
        }

        if self.charger_state == ChargerState::Charging {
            if self.quick_charging_active {
                self.logger
                    .info("Charging started by EVSE, changing to quick charging state");
                self.sequencer_state = SequencerState::QuickCharging;
            } else {
                self.logger
                    .info("Charging started by EVSE, changing to active state");
                self.sequencer_state = SequencerState::Active;
            }
        }
    }

    /// Steady charging. The committed phase count never changes here; a
    /// granted phase-change request leaves through the stop/pause/restart
    /// path instead.
    fn state_active(&mut self, now: Instant) {
        let more_phases_requested = self.requested_phases_pending > self.requested_phases;
        let less_phases_requested = self.requested_phases_pending < self.requested_phases;

        let delay_for_more_elapsed = elapsed(
            now,
            self.last_phase_request_change,
            self.in_use.delay_time_more_phases,
        );
        let delay_for_less_elapsed = elapsed(
            now,
            self.last_phase_request_change,
            self.in_use.delay_time_less_phases,
        );
        let minimum_duration_elapsed =
            elapsed(now, self.last_state_change, self.in_use.minimum_duration);

        if ((more_phases_requested && delay_for_more_elapsed)
            || (less_phases_requested && delay_for_less_elapsed))
            && minimum_duration_elapsed
        {
            self.logger.info(&format!(
                "Change to {} phase charging requested while charging with {} phases, requesting EVSE to stop charging",
                self.requested_phases_pending, self.requested_phases
            ));
            self.sequencer_state = SequencerState::WaitingForEvseStop;
        } else if self.charger_state != ChargerState::Charging {
            self.logger
                .info("Charging stopped by EVSE, waiting for disconnect or quick charge request");
            self.sequencer_state = SequencerState::StoppedByEvse;
            self.quick_charging_active = false;
        }
    }

    fn state_quick_charging(&mut self, now: Instant) {
        if self.charger_state != ChargerState::Charging {
            self.logger
                .info("Charging stopped by EVSE, waiting for disconnect or quick charge request");
            // Fall back to power-budgeted phase selection
            self.set_available_charging_power(self.available_charging_power, now);
            self.sequencer_state = SequencerState::StoppedByEvse;
            self.quick_charging_active = false;
        }
    }

    fn state_waiting_for_evse_stop(&mut self, now: Instant) {
        if self.evse_command_due(now) {
            self.logger.info("Sending stop request to EVSE");
            if let Err(e) = self.evse.stop_charging() {
                self.logger.warn(&format!("EVSE stop command failed: {}", e));
            }
        }

        if self.charger_state != ChargerState::Charging {
            if self.requested_phases_pending != 0 && !self.contactor_error {
                self.logger
                    .info("EVSE stopped charging, waiting for pause time to elapse");
                self.sequencer_state = SequencerState::PausingWhileSwitching;
            } else {
                self.logger
                    .info("EVSE stopped charging, waiting for the vehicle to be disconnected");
                self.requested_phases = self.requested_phases_pending;
                self.sequencer_state = SequencerState::Standby;
            }
        }
    }

    fn state_pausing_while_switching(&mut self, now: Instant) {
        if elapsed(now, self.last_state_change, self.in_use.pause_time) {
            self.requested_phases = self.requested_phases_pending;
            self.logger.info(&format!(
                "Pause time elapsed, restarting charging with {} phases",
                self.requested_phases
            ));
            self.push_current(self.available_charging_power, self.requested_phases);
            self.sequencer_state = SequencerState::WaitingForEvseStart;
        }
    }

    fn state_stopped_by_evse(&mut self) {
        if self.quick_charging_active {
            self.logger
                .info("Quick charging initiated, changing to standby state");
            self.sequencer_state = SequencerState::Standby;
        } else if self.charger_state == ChargerState::Charging {
            self.logger
                .info("Charging started by EVSE, changing to active state");
            self.sequencer_state = SequencerState::Active;
        }
        self.requested_phases = self.requested_phases_pending;
    }

    /// True once per [`EVSE_COMMAND_RETRY`] window; arming happens on the
    /// first call after entering a commanded state (the deadline is cleared
    /// on every state change).
    fn evse_command_due(&mut self, now: Instant) -> bool {
        match self.evse_command_deadline {
            Some(deadline) if now < deadline => false,
            _ => {
                self.evse_command_deadline = Some(now + EVSE_COMMAND_RETRY);
                true
            }
        }
    }

    /// Apply a new available-power setpoint.
    ///
    /// `last_phase_request_change` is stamped only when the pending phase
    /// count differs from the previous invocation's pending count *and* from
    /// the committed count; repeated setpoints mapping to the same phase
    /// count therefore do not restart the dwell timers.
    pub(crate) fn set_available_charging_power(&mut self, power: u16, now: Instant) {
        self.available_charging_power = power;
        self.requested_phases_pending =
            selector::phases_for_power(self.operating_mode, power, self.requested_phases);

        if self.requested_phases_pending != self.last_requested_phases_pending {
            if self.requested_phases_pending != self.requested_phases {
                self.last_phase_request_change = now;
                self.logger.info(&format!(
                    "Available charging power {} W received, requesting {} phase(s) to be used",
                    power, self.requested_phases_pending
                ));
            }
            self.last_requested_phases_pending = self.requested_phases_pending;
        }

        self.push_current(power, self.requested_phases);
    }

    /// Derive and push the EVSE external current limit for `available_power`
    /// watts over `phases` phases.
    pub(crate) fn push_current(&mut self, available_power: u16, phases: u8) {
        let current_ma = selector::current_for_power_ma(available_power, phases);
        if let Err(e) = self.evse.set_external_current(current_ma) {
            self.logger
                .warn(&format!("EVSE external current update failed: {}", e));
        } else if self.debug {
            self.logger.debug(&format!(
                "Setting current for {} W charging power at {} phases to {:.2} A",
                available_power,
                phases,
                current_ma as f64 / 1000.0
            ));
        }
    }

    /// Operator-forced three-phase charging at maximum current. Honored only
    /// while enabled and idle (standby or stopped-by-EVSE); transported
    /// through the normal start path.
    pub(crate) fn start_quick_charging(&mut self) {
        if !self.enabled {
            return;
        }

        if matches!(
            self.sequencer_state,
            SequencerState::Standby | SequencerState::StoppedByEvse
        ) {
            self.logger.info("Quick charging requested");
            self.quick_charging_active = true;
            self.requested_phases_pending = 3;
            if let Err(e) = self.evse.set_external_current(MAX_CHARGE_CURRENT_MA) {
                self.logger
                    .warn(&format!("EVSE external current update failed: {}", e));
            }
        } else {
            self.logger
                .info("Quick charging request ignored because sequencer is not in standby state");
        }
    }
}
