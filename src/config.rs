//! Configuration management for Triphase
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. Numeric bounds on the phase switcher section
//! are enforced here, at the boundary; the sequencer core never re-validates.

use crate::error::{Result, TriphaseError};
use crate::selector::OperatingMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Inclusive bounds for every phase-switcher timing parameter, in seconds.
pub const TIMING_MIN_SECONDS: u32 = 10;
pub const TIMING_MAX_SECONDS: u32 = 3600;

/// First search location; also where runtime config edits are persisted.
pub const PRIMARY_CONFIG_PATH: &str = "triphase_config.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Phase switcher behavior (the persistent `phase_switcher/config` object)
    pub phase_switcher: PhaseSwitcherConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Control tick interval in milliseconds
    pub tick_interval_ms: u64,
}

/// Phase switcher operating parameters.
///
/// A snapshot of this section is captured as the in-use configuration when the
/// switcher starts (and on explicit reload); edits to the live copy do not
/// affect a running session until then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PhaseSwitcherConfig {
    /// Master switch; when false the external contactors pass all three phases
    pub enabled: bool,

    /// Which phase counts are admissible and how to move between them
    pub operating_mode: OperatingMode,

    /// Dwell before granting an increase in phase count, seconds
    pub delay_time_more_phases: u32,

    /// Dwell before granting a decrease in phase count, seconds
    pub delay_time_less_phases: u32,

    /// Minimum time charging before any switch, seconds
    pub minimum_duration: u32,

    /// Off-time between stop and restart when switching, seconds
    pub pause_time: u32,
}

impl PhaseSwitcherConfig {
    /// Copy of this section with every timing parameter clamped to the
    /// documented 10..=3600 s range. Out-of-range values are not rejected,
    /// they are pulled to the nearest bound.
    pub fn clamped(&self) -> Self {
        let clamp = |v: u32| v.clamp(TIMING_MIN_SECONDS, TIMING_MAX_SECONDS);
        Self {
            enabled: self.enabled,
            operating_mode: self.operating_mode,
            delay_time_more_phases: clamp(self.delay_time_more_phases),
            delay_time_less_phases: clamp(self.delay_time_less_phases),
            minimum_duration: clamp(self.minimum_duration),
            pause_time: clamp(self.pause_time),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Directory for rotated log files
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format for the file layer
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with an optional explicit override path.
    ///
    /// When `override_path` is provided, the configuration is loaded strictly
    /// from that path and any error (including file-not-found) is returned
    /// without falling back to default search locations.
    pub fn load_with_override<P: AsRef<Path>>(override_path: Option<P>) -> Result<Self> {
        if let Some(p) = override_path {
            return Self::from_file(p);
        }
        Self::load()
    }

    /// Load configuration from the default search locations, falling back to
    /// the built-in defaults when no file is found.
    pub fn load() -> Result<Self> {
        let default_paths = [
            PRIMARY_CONFIG_PATH,
            "/data/triphase_config.yaml",
            "/etc/triphase/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let timings = [
            (
                "phase_switcher.delay_time_more_phases",
                self.phase_switcher.delay_time_more_phases,
            ),
            (
                "phase_switcher.delay_time_less_phases",
                self.phase_switcher.delay_time_less_phases,
            ),
            (
                "phase_switcher.minimum_duration",
                self.phase_switcher.minimum_duration,
            ),
            ("phase_switcher.pause_time", self.phase_switcher.pause_time),
        ];
        for (field, value) in timings {
            if !(TIMING_MIN_SECONDS..=TIMING_MAX_SECONDS).contains(&value) {
                return Err(TriphaseError::Validation {
                    field: field.to_string(),
                    message: format!(
                        "must be within {}..={} seconds",
                        TIMING_MIN_SECONDS, TIMING_MAX_SECONDS
                    ),
                });
            }
        }

        if self.web.port == 0 {
            return Err(TriphaseError::validation("web.port", "must be greater than 0"));
        }

        if self.tick_interval_ms == 0 {
            return Err(TriphaseError::validation(
                "tick_interval_ms",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

// Tests live in `src/config_tests.rs` at the crate root.
