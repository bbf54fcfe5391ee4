//! Energy meter facade for Triphase
//!
//! The switcher only needs the instantaneous charging power for its history
//! ring; everything else about the meter stays behind the injected driver.

/// Capability trait for the charging energy meter.
pub trait PowerMeter {
    /// Whether the meter was reachable at startup. A switcher constructed
    /// with an unavailable meter disables itself for the boot.
    fn available(&self) -> bool;

    /// Instantaneous charging power in watts, or `None` while the meter is
    /// unreachable.
    fn power_w(&mut self) -> Option<f64>;
}
