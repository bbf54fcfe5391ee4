use super::*;

impl Default for Config {
    fn default() -> Self {
        Self {
            phase_switcher: PhaseSwitcherConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
            tick_interval_ms: 250,
        }
    }
}

impl Default for PhaseSwitcherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            operating_mode: OperatingMode::ThreePhasesStatic,
            delay_time_more_phases: 300,
            delay_time_less_phases: 60,
            minimum_duration: 15 * 60,
            pause_time: 2 * 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/triphase".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8088,
        }
    }
}
