use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::config::PhaseSwitcherConfig;

/// Sequencer states. The numeric codes are the wire values published in the
/// state snapshot; gaps are historical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SequencerState {
    Inactive = 0,
    Standby = 1,
    CancellingEvseStart = 5,
    WaitingForEvseStart = 10,
    Active = 20,
    QuickCharging = 25,
    WaitingForEvseStop = 30,
    PausingWhileSwitching = 40,
    StoppedByEvse = 50,
}

impl SequencerState {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Commands accepted by the switcher from external surfaces (web, button
/// handling lives inside the tick). Marshalled through the command channel so
/// that all state mutation happens on the switcher task.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitcherCommand {
    /// New available charging power setpoint in watts. Ignored while the
    /// module is disabled or quick charging is active.
    SetAvailableChargingPower(u16),
    /// Operator-forced three-phase charging at maximum current.
    StartQuickCharging,
    /// Toggle verbose sequencer tracing.
    SetDebug(bool),
    /// Replace the live (edit) copy of the phase switcher config and persist
    /// it. Takes effect on the next `ReloadConfig`.
    UpdateConfig(PhaseSwitcherConfig),
    /// Re-capture the in-use config snapshot from the live copy.
    ReloadConfig,
}

/// Published state snapshot.
///
/// Field names are wire-stable. `contactor_state` carries the contactor-error
/// latch under its historical name; `sequencer_state` is the numeric state
/// code.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StateSnapshot {
    pub timestamp: String,
    pub available_charging_power: u16,
    pub requested_phases: u8,
    pub requested_phases_pending: u8,
    /// Phase count observed on the contactor feedback inputs
    pub active_phases: u8,
    pub sequencer_state: u8,
    /// Seconds since the sequencer last changed state
    pub time_since_state_change: u64,
    /// Seconds a pending phase change has been waiting, capped at the
    /// applicable configured delay; 0 when nothing is pending
    pub delay_time: u32,
    /// The contactor-error latch
    pub contactor_state: bool,
}

/// Pre-rendered telemetry ring exports for the history endpoints, refreshed
/// after every append.
#[derive(Debug, Clone)]
pub struct HistoryView {
    pub requested_power: Value,
    pub charging_power: Value,
    pub requested_phases: Value,
}

impl Default for HistoryView {
    fn default() -> Self {
        Self {
            requested_power: Value::Array(Vec::new()),
            charging_power: Value::Array(Vec::new()),
            requested_phases: Value::Array(Vec::new()),
        }
    }
}
