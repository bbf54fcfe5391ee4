//! Contactor supervision.
//!
//! Audits commanded versus observed contactor state per phase, latches a
//! fault after the debounce window and forces the sequencer toward a safe
//! state while the fault stands.

use std::time::{Duration, Instant};

use crate::evse::{ChargerState, EvseStatus, CONTACTOR_L1_CLOSED};
use crate::hardware::CHANNEL_COUNT;

use super::types::SequencerState;

/// How long a commanded/observed mismatch may persist before it latches the
/// contactor fault.
pub(crate) const CONTACTOR_DEBOUNCE: Duration = Duration::from_secs(2);

impl super::PhaseSwitcher {
    /// Per-phase commanded-vs-observed audit, run at the end of every tick.
    ///
    /// Phase L1 feedback comes from the EVSE's own contactor monitor; L2/L3
    /// from the digital inputs. The latch clears only once the vehicle is
    /// disconnected and no per-phase check is failing on the current tick.
    pub(crate) fn contactor_check(&mut self, status: &EvseStatus, now: Instant) {
        let inputs = match self.digital_in.read() {
            Ok(v) => v,
            Err(e) => {
                self.logger.warn(&format!("Digital in read failed: {}", e));
                return;
            }
        };
        let outputs = match self.relay.read() {
            Ok(v) => v,
            Err(e) => {
                self.logger.warn(&format!("Quad relay read failed: {}", e));
                return;
            }
        };

        let observed = [
            false,
            status.contactor_state == CONTACTOR_L1_CLOSED,
            inputs[2],
            inputs[3],
        ];

        let mut fault_now = [false; CHANNEL_COUNT];
        for phase in 1..=3 {
            if observed[phase] == outputs[phase] {
                self.contactor_ok_since[phase] = now;
            }
            fault_now[phase] =
                now.saturating_duration_since(self.contactor_ok_since[phase]) >= CONTACTOR_DEBOUNCE;
            if fault_now[phase] && !self.contactor_error {
                self.logger
                    .error(&format!("Contactor error on phase {}", phase));
                self.contactor_error = true;
            }
        }

        if self.contactor_error {
            match self.sequencer_state {
                SequencerState::WaitingForEvseStart
                | SequencerState::Active
                | SequencerState::QuickCharging => {
                    self.logger.info("Requesting EVSE to stop charging");
                    self.sequencer_state = SequencerState::WaitingForEvseStop;
                    self.evse_command_deadline = None;
                }
                SequencerState::WaitingForEvseStop => {}
                _ => {
                    self.sequencer_state = SequencerState::Inactive;
                }
            }
        }

        if status.charger_state == ChargerState::NotConnected
            && !fault_now[1]
            && !fault_now[2]
            && !fault_now[3]
        {
            self.contactor_error = false;
        }
    }

    /// Phase count currently observed on the feedback inputs.
    pub(crate) fn read_active_phases(&mut self) -> u8 {
        let status = match self.last_evse_status {
            Some(status) => status,
            None => return 0,
        };
        let inputs = match self.digital_in.read() {
            Ok(v) => v,
            Err(e) => {
                self.logger.warn(&format!("Digital in read failed: {}", e));
                return 0;
            }
        };

        let l1 = status.contactor_state == CONTACTOR_L1_CLOSED;
        if l1 && inputs[2] && inputs[3] {
            3
        } else if l1 && inputs[2] {
            2
        } else if l1 {
            1
        } else {
            0
        }
    }
}
