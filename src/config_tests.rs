#![cfg(test)]

use super::config::*;
use crate::selector::OperatingMode;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert!(!config.phase_switcher.enabled);
    assert_eq!(
        config.phase_switcher.operating_mode,
        OperatingMode::ThreePhasesStatic
    );
    assert_eq!(config.phase_switcher.delay_time_more_phases, 300);
    assert_eq!(config.phase_switcher.delay_time_less_phases, 60);
    assert_eq!(config.phase_switcher.minimum_duration, 900);
    assert_eq!(config.phase_switcher.pause_time, 120);
    assert_eq!(config.tick_interval_ms, 250);
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.phase_switcher.pause_time = 5;
    assert!(config.validate().is_err());

    config = Config::default();
    config.phase_switcher.delay_time_more_phases = 7200;
    assert!(config.validate().is_err());

    config = Config::default();
    config.web.port = 0;
    assert!(config.validate().is_err());

    config = Config::default();
    config.tick_interval_ms = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_clamping_pulls_to_bounds() {
    let section = PhaseSwitcherConfig {
        delay_time_more_phases: 5,
        delay_time_less_phases: 7200,
        minimum_duration: 10,
        pause_time: 3600,
        ..PhaseSwitcherConfig::default()
    };
    let clamped = section.clamped();
    assert_eq!(clamped.delay_time_more_phases, TIMING_MIN_SECONDS);
    assert_eq!(clamped.delay_time_less_phases, TIMING_MAX_SECONDS);
    assert_eq!(clamped.minimum_duration, 10);
    assert_eq!(clamped.pause_time, 3600);
    assert_eq!(clamped.operating_mode, section.operating_mode);
}

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(
        parsed.phase_switcher.operating_mode,
        config.phase_switcher.operating_mode
    );
    assert_eq!(parsed.web.port, config.web.port);
}

#[test]
fn test_operating_mode_wire_names() {
    let yaml = "one_two_phases_dynamic";
    let mode: OperatingMode = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(mode, OperatingMode::OneTwoPhasesDynamic);
}
