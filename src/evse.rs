//! EVSE facade for Triphase
//!
//! Read-only access to the charger lifecycle plus the small command surface
//! the phase switcher needs (start, stop, external current override). The
//! concrete transport to the EVSE controller is injected behind [`EvseLink`];
//! calls are synchronous and bounded.

use crate::error::Result;

/// Charger lifecycle as reported by the EVSE controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChargerState {
    NotConnected = 0,
    WaitingForChargeRelease = 1,
    ReadyForCharging = 2,
    Charging = 3,
    Error = 4,
}

impl ChargerState {
    /// Decode the wire value; unknown codes map to `Error`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => ChargerState::NotConnected,
            1 => ChargerState::WaitingForChargeRelease,
            2 => ChargerState::ReadyForCharging,
            3 => ChargerState::Charging,
            _ => ChargerState::Error,
        }
    }
}

/// IEC 61851 pilot-line state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Iec61851State {
    /// Not connected
    A = 0,
    /// Connected
    B = 1,
    /// Charging
    C = 2,
    /// Charging with ventilation
    D = 3,
    /// Error
    Ef = 4,
}

impl Iec61851State {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Iec61851State::A,
            1 => Iec61851State::B,
            2 => Iec61851State::C,
            3 => Iec61851State::D,
            _ => Iec61851State::Ef,
        }
    }
}

/// The `contactor_state` value that means phase L1 is energized downstream of
/// the EVSE's internal contactor.
pub const CONTACTOR_L1_CLOSED: u8 = 3;

/// One polled observation of the EVSE controller.
#[derive(Debug, Clone, Copy)]
pub struct EvseStatus {
    pub charger_state: ChargerState,
    pub iec61851_state: Iec61851State,
    pub auto_start_charging: bool,
    /// Internal contactor feedback; `CONTACTOR_L1_CLOSED` means L1 energized
    pub contactor_state: u8,
    /// Quick-charge button, low-level GPIO 0 (active high)
    pub button_pressed: bool,
    /// EVSE relay-output gate, low-level GPIO 3
    pub relay_output: bool,
}

/// Capability trait for the EVSE controller.
///
/// `status()` is polled every tick and may fail transiently; the switcher
/// logs and skips the tick's EVSE-dependent sub-steps in that case. The
/// command methods are idempotent on the EVSE side and silently retried by
/// the sequencer's watchdog logic while the relevant state persists.
pub trait EvseLink {
    fn status(&mut self) -> Result<EvseStatus>;

    fn start_charging(&mut self) -> Result<()>;

    fn stop_charging(&mut self) -> Result<()>;

    /// Push an external current limit in milliamps; `0` clears the override.
    fn set_external_current(&mut self, current_ma: u32) -> Result<()>;
}
