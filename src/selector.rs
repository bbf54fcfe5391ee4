//! Phase selection and current derivation for Triphase
//!
//! Pure decision logic: how many mains phases a given available charging
//! power calls for under the configured operating mode, and what pilot
//! current to request from the EVSE for a committed phase count. No I/O and
//! no state beyond the caller-supplied committed phase count (used for
//! hysteresis in the one/two-phase dynamic mode).

use serde::{Deserialize, Serialize};

/// Nominal phase-to-neutral voltage, volts.
pub const NOMINAL_VOLTAGE: u32 = 230;

/// Minimum pilot current per IEC 61851, milliamps.
pub const MIN_CHARGE_CURRENT_MA: u32 = 6_000;

/// Maximum pilot current the installation supports, milliamps.
pub const MAX_CHARGE_CURRENT_MA: u32 = 32_000;

/// Power below which even one phase cannot sustain the 6 A minimum, watts.
pub const MIN_POWER_ONE_PHASE: u16 = (6 * NOMINAL_VOLTAGE) as u16;
pub const MIN_POWER_TWO_PHASES: u16 = 2 * MIN_POWER_ONE_PHASE;
pub const MIN_POWER_THREE_PHASES: u16 = 3 * MIN_POWER_ONE_PHASE;

/// Power a single phase can carry at the 16 A per-phase limit, watts.
pub const MAX_POWER_ONE_PHASE: u16 = (16 * NOMINAL_VOLTAGE) as u16;
pub const MAX_POWER_TWO_PHASES: u16 = 2 * MAX_POWER_ONE_PHASE;

/// Which phase counts are admissible and how to move between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    OnePhaseStatic,
    TwoPhasesStatic,
    ThreePhasesStatic,
    OneTwoPhasesDynamic,
    OneThreePhasesDynamic,
    OneTwoThreePhasesDynamic,
}

/// Phase count the given available power calls for.
///
/// `committed_phases` is the count currently driven to the contactors; it
/// only matters in `OneTwoPhasesDynamic`, where the upgrade to two phases
/// requires reaching `MAX_POWER_ONE_PHASE` while the demotion back to one
/// only happens below `MIN_POWER_TWO_PHASES`. The asymmetry keeps the
/// selector from oscillating around the two-phase minimum.
pub fn phases_for_power(
    mode: OperatingMode,
    available_power: u16,
    committed_phases: u8,
) -> u8 {
    match mode {
        OperatingMode::OnePhaseStatic => {
            if available_power >= MIN_POWER_ONE_PHASE {
                1
            } else {
                0
            }
        }

        OperatingMode::TwoPhasesStatic => {
            if available_power >= MIN_POWER_TWO_PHASES {
                2
            } else {
                0
            }
        }

        OperatingMode::ThreePhasesStatic => {
            if available_power >= MIN_POWER_THREE_PHASES {
                3
            } else {
                0
            }
        }

        OperatingMode::OneTwoPhasesDynamic => {
            if committed_phases == 2 {
                if available_power >= MIN_POWER_TWO_PHASES {
                    2
                } else if available_power >= MIN_POWER_ONE_PHASE {
                    1
                } else {
                    0
                }
            } else if available_power >= MAX_POWER_ONE_PHASE {
                2
            } else if available_power >= MIN_POWER_ONE_PHASE {
                1
            } else {
                0
            }
        }

        OperatingMode::OneThreePhasesDynamic => {
            if available_power >= MIN_POWER_THREE_PHASES {
                3
            } else if available_power >= MIN_POWER_ONE_PHASE {
                1
            } else {
                0
            }
        }

        OperatingMode::OneTwoThreePhasesDynamic => {
            if available_power >= MIN_POWER_THREE_PHASES {
                3
            } else if available_power >= MIN_POWER_TWO_PHASES {
                2
            } else if available_power >= MIN_POWER_ONE_PHASE {
                1
            } else {
                0
            }
        }
    }
}

/// External current to request from the EVSE for `available_power` watts
/// spread over `phases` phases, in milliamps.
///
/// Zero phases means no override (0 mA); otherwise the result is clamped to
/// 6.00..=32.00 A. Integer division matches the fixed-point arithmetic of the
/// charger firmware this value is compared against.
pub fn current_for_power_ma(available_power: u16, phases: u8) -> u32 {
    if phases == 0 {
        return 0;
    }
    (available_power as u32 * 1000 / NOMINAL_VOLTAGE / phases as u32)
        .clamp(MIN_CHARGE_CURRENT_MA, MAX_CHARGE_CURRENT_MA)
}
