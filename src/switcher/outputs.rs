//! Relay output shaping.
//!
//! Converts the committed phase count plus the EVSE relay-output gate into
//! the three contactor channel commands.

use crate::evse::EvseStatus;
use crate::hardware::CHANNEL_COUNT;

/// Relay pulse width, milliseconds. Energized channels are commanded as
/// self-resetting monoflops refreshed every control tick; the tick period
/// must stay at or below half this width so that a stalled controller
/// de-energizes all contactors within one pulse.
pub(crate) const MONOFLOP_DURATION_MS: u32 = 2000;

impl super::PhaseSwitcher {
    /// Drive the relay channels for the current tick.
    ///
    /// Channels 1..=3 map to phases L1..L3 (channel 0 is unused). Nothing is
    /// energized unless the EVSE has closed its own contactor and no
    /// contactor fault is latched. A disabled module passes all three phases
    /// straight through.
    pub(crate) fn write_outputs(&mut self, status: &EvseStatus) {
        let mut channel_request = [false; CHANNEL_COUNT];

        if status.relay_output && !self.contactor_error {
            if self.enabled {
                for channel in 1..=self.requested_phases.min(3) as usize {
                    channel_request[channel] = true;
                }
            } else {
                channel_request[1] = true;
                channel_request[2] = true;
                channel_request[3] = true;
            }
        }

        for (channel, requested) in channel_request.iter().enumerate() {
            let result = if *requested {
                self.relay.set_monoflop(channel, true, MONOFLOP_DURATION_MS)
            } else {
                self.relay.set_steady(channel, false)
            };
            if let Err(e) = result {
                self.logger.warn(&format!(
                    "Relay command failed for channel {}: {}",
                    channel, e
                ));
                return;
            }
        }
    }
}
