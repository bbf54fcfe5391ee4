//! State snapshot publication and telemetry appends.

use std::sync::Arc;
use std::time::Instant;

use crate::history::SAMPLE_UNKNOWN;
use crate::selector::NOMINAL_VOLTAGE;

use super::types::{HistoryView, StateSnapshot};

impl super::PhaseSwitcher {
    pub(crate) fn build_snapshot(&mut self, now: Instant) -> StateSnapshot {
        let request_age_s =
            now.saturating_duration_since(self.last_phase_request_change).as_secs() as u32;

        // The countdown shown to the user: how long the pending request has
        // been waiting, capped at the delay that applies to its direction.
        let delay_time = if self.requested_phases_pending > self.requested_phases {
            request_age_s.min(self.in_use.delay_time_more_phases)
        } else if self.requested_phases_pending < self.requested_phases {
            request_age_s.min(self.in_use.delay_time_less_phases)
        } else {
            0
        };

        StateSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            available_charging_power: self.available_charging_power,
            requested_phases: self.requested_phases,
            requested_phases_pending: self.requested_phases_pending,
            active_phases: self.read_active_phases(),
            sequencer_state: self.sequencer_state.code(),
            time_since_state_change: now
                .saturating_duration_since(self.last_state_change)
                .as_secs(),
            delay_time,
            contactor_state: self.contactor_error,
        }
    }

    /// Publish a state snapshot for web consumers.
    pub fn publish_state(&mut self, now: Instant) {
        let snapshot = Arc::new(self.build_snapshot(now));
        self.snapshot_tx.send_replace(snapshot);
    }

    /// Append one sample to each telemetry ring and refresh the rendered
    /// history. Runs once per minute.
    pub fn update_history(&mut self) {
        let measured = match self.meter.power_w() {
            Some(power) => power as i16,
            None => SAMPLE_UNKNOWN,
        };

        self.requested_power_history
            .push(self.available_charging_power.min(i16::MAX as u16) as i16);
        self.charging_power_history.push(measured);
        self.active_phases_history
            .push(self.requested_phases as i16 * NOMINAL_VOLTAGE as i16 * 6);

        self.publish_history();
    }

    pub(crate) fn publish_history(&mut self) {
        let view = HistoryView {
            requested_power: self.requested_power_history.to_json(),
            charging_power: self.charging_power_history.to_json(),
            requested_phases: self.active_phases_history.to_json(),
        };
        self.history_tx.send_replace(Arc::new(view));
    }
}
