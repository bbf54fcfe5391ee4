//! Loopback collaborator implementations.
//!
//! In-process doubles for the EVSE, relay, digital-in and meter capability
//! traits. They hold their state behind shared handles so a test (or the
//! demo entrypoint) can script charger behavior and observe every command
//! the switcher issues. No hardware transport lives in this crate; real
//! drivers are injected by integrators through the same traits.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Result, TriphaseError};
use crate::evse::{ChargerState, EvseLink, EvseStatus, Iec61851State};
use crate::hardware::{DigitalIn, QuadRelay, CHANNEL_COUNT};
use crate::meter::PowerMeter;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A command the switcher issued to the simulated EVSE, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvseCommand {
    StartCharging,
    StopCharging,
    ExternalCurrent(u32),
}

/// Scriptable EVSE state.
#[derive(Debug)]
pub struct SimEvseState {
    pub charger_state: ChargerState,
    pub iec61851_state: Iec61851State,
    pub auto_start_charging: bool,
    pub contactor_state: u8,
    pub button_pressed: bool,
    pub relay_output: bool,
    /// When true, `status()` fails to simulate an unreachable controller
    pub fail_status: bool,
    /// Every command received, oldest first
    pub commands: Vec<EvseCommand>,
}

impl Default for SimEvseState {
    fn default() -> Self {
        Self {
            charger_state: ChargerState::NotConnected,
            iec61851_state: Iec61851State::A,
            auto_start_charging: false,
            contactor_state: 0,
            button_pressed: false,
            relay_output: false,
            fail_status: false,
            commands: Vec::new(),
        }
    }
}

/// Simulated EVSE controller. Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct SimEvse {
    state: Arc<Mutex<SimEvseState>>,
}

impl SimEvse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle for scripting and assertions.
    pub fn state(&self) -> Arc<Mutex<SimEvseState>> {
        self.state.clone()
    }

    pub fn set_charger_state(&self, charger_state: ChargerState) {
        lock(&self.state).charger_state = charger_state;
    }

    pub fn set_iec61851_state(&self, iec61851_state: Iec61851State) {
        lock(&self.state).iec61851_state = iec61851_state;
    }

    pub fn set_auto_start_charging(&self, auto_start: bool) {
        lock(&self.state).auto_start_charging = auto_start;
    }

    pub fn set_contactor_state(&self, contactor_state: u8) {
        lock(&self.state).contactor_state = contactor_state;
    }

    pub fn set_button_pressed(&self, pressed: bool) {
        lock(&self.state).button_pressed = pressed;
    }

    pub fn set_relay_output(&self, on: bool) {
        lock(&self.state).relay_output = on;
    }

    pub fn set_fail_status(&self, fail: bool) {
        lock(&self.state).fail_status = fail;
    }

    pub fn commands(&self) -> Vec<EvseCommand> {
        lock(&self.state).commands.clone()
    }

    pub fn clear_commands(&self) {
        lock(&self.state).commands.clear();
    }

    /// The most recent external current override, if any was pushed.
    pub fn last_external_current(&self) -> Option<u32> {
        lock(&self.state)
            .commands
            .iter()
            .rev()
            .find_map(|cmd| match cmd {
                EvseCommand::ExternalCurrent(ma) => Some(*ma),
                _ => None,
            })
    }
}

impl EvseLink for SimEvse {
    fn status(&mut self) -> Result<EvseStatus> {
        let state = lock(&self.state);
        if state.fail_status {
            return Err(TriphaseError::evse("simulated EVSE unreachable"));
        }
        Ok(EvseStatus {
            charger_state: state.charger_state,
            iec61851_state: state.iec61851_state,
            auto_start_charging: state.auto_start_charging,
            contactor_state: state.contactor_state,
            button_pressed: state.button_pressed,
            relay_output: state.relay_output,
        })
    }

    fn start_charging(&mut self) -> Result<()> {
        lock(&self.state).commands.push(EvseCommand::StartCharging);
        Ok(())
    }

    fn stop_charging(&mut self) -> Result<()> {
        lock(&self.state).commands.push(EvseCommand::StopCharging);
        Ok(())
    }

    fn set_external_current(&mut self, current_ma: u32) -> Result<()> {
        lock(&self.state)
            .commands
            .push(EvseCommand::ExternalCurrent(current_ma));
        Ok(())
    }
}

/// A relay command the switcher issued, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCall {
    Steady {
        channel: usize,
        on: bool,
    },
    Monoflop {
        channel: usize,
        on: bool,
        duration_ms: u32,
    },
}

#[derive(Debug, Default)]
pub struct SimQuadRelayState {
    pub channels: [bool; CHANNEL_COUNT],
    pub calls: Vec<RelayCall>,
    pub fail: bool,
}

/// Simulated quad relay. Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct SimQuadRelay {
    state: Arc<Mutex<SimQuadRelayState>>,
}

impl SimQuadRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<Mutex<SimQuadRelayState>> {
        self.state.clone()
    }

    pub fn channels(&self) -> [bool; CHANNEL_COUNT] {
        lock(&self.state).channels
    }

    pub fn calls(&self) -> Vec<RelayCall> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    pub fn set_fail(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }
}

impl QuadRelay for SimQuadRelay {
    fn set_steady(&mut self, channel: usize, on: bool) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail {
            return Err(TriphaseError::hardware("simulated relay unreachable"));
        }
        state.channels[channel] = on;
        state.calls.push(RelayCall::Steady { channel, on });
        Ok(())
    }

    fn set_monoflop(&mut self, channel: usize, on: bool, duration_ms: u32) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail {
            return Err(TriphaseError::hardware("simulated relay unreachable"));
        }
        state.channels[channel] = on;
        state.calls.push(RelayCall::Monoflop {
            channel,
            on,
            duration_ms,
        });
        Ok(())
    }

    fn read(&mut self) -> Result<[bool; CHANNEL_COUNT]> {
        let state = lock(&self.state);
        if state.fail {
            return Err(TriphaseError::hardware("simulated relay unreachable"));
        }
        Ok(state.channels)
    }
}

#[derive(Debug, Default)]
pub struct SimDigitalInState {
    pub values: [bool; CHANNEL_COUNT],
    pub fail: bool,
}

/// Simulated digital-in module. Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct SimDigitalIn {
    state: Arc<Mutex<SimDigitalInState>>,
}

impl SimDigitalIn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_values(&self, values: [bool; CHANNEL_COUNT]) {
        lock(&self.state).values = values;
    }

    pub fn set_channel(&self, channel: usize, on: bool) {
        lock(&self.state).values[channel] = on;
    }

    pub fn set_fail(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }
}

impl DigitalIn for SimDigitalIn {
    fn read(&mut self) -> Result<[bool; CHANNEL_COUNT]> {
        let state = lock(&self.state);
        if state.fail {
            return Err(TriphaseError::hardware("simulated digital in unreachable"));
        }
        Ok(state.values)
    }
}

/// Simulated energy meter.
#[derive(Clone)]
pub struct SimMeter {
    power: Arc<Mutex<Option<f64>>>,
    available: bool,
}

impl SimMeter {
    pub fn new() -> Self {
        Self {
            power: Arc::new(Mutex::new(None)),
            available: true,
        }
    }

    /// A meter that reports unavailable at startup.
    pub fn unavailable() -> Self {
        Self {
            power: Arc::new(Mutex::new(None)),
            available: false,
        }
    }

    pub fn set_power(&self, power: Option<f64>) {
        *lock(&self.power) = power;
    }
}

impl Default for SimMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerMeter for SimMeter {
    fn available(&self) -> bool {
        self.available
    }

    fn power_w(&mut self) -> Option<f64> {
        *lock(&self.power)
    }
}
