//! Hardware abstraction for Triphase
//!
//! Capability traits for the two external devices the phase switcher drives:
//! a four-channel relay module (the line contactor coils) and a four-channel
//! digital input module (contactor feedback for phases L2/L3). The concrete
//! drivers are injected; test doubles implement the same traits.

use crate::error::Result;

/// Number of channels on both the relay and digital-in modules.
pub const CHANNEL_COUNT: usize = 4;

/// Four-channel relay module. Channels 1..=3 drive the contactors for phases
/// L1..L3; channel 0 is unused.
pub trait QuadRelay {
    /// Set a channel to a steady value.
    fn set_steady(&mut self, channel: usize, on: bool) -> Result<()>;

    /// Set a channel to a self-resetting pulse: it reverts to `!on` after
    /// `duration_ms` unless the command is refreshed before then.
    fn set_monoflop(&mut self, channel: usize, on: bool, duration_ms: u32) -> Result<()>;

    /// Read back the currently commanded channel values.
    fn read(&mut self) -> Result<[bool; CHANNEL_COUNT]>;
}

/// Four-channel digital input module. Indices 2 and 3 carry the contactor
/// feedback for phases L2 and L3.
pub trait DigitalIn {
    fn read(&mut self) -> Result<[bool; CHANNEL_COUNT]>;
}
