//! Structured logging and tracing for Triphase
//!
//! This module provides logging functionality with support for structured
//! output, log rotation, and integration with the tracing ecosystem.

use crate::config::LoggingConfig;
use crate::error::{Result, TriphaseError};
use std::sync::OnceLock;
use tracing::{Level, debug, error, info, trace, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Keeps the non-blocking writer thread alive for the process lifetime.
static APPENDER_GUARD: OnceLock<non_blocking::WorkerGuard> = OnceLock::new();

/// Initialize logging system based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("triphase={},tower_http=warn", level).into());

    let file_appender = rolling::Builder::new()
        .rotation(rolling::Rotation::DAILY)
        .filename_prefix("triphase")
        .filename_suffix("log")
        .max_log_files(config.backup_count as usize)
        .build(&config.file)
        .map_err(|e| TriphaseError::io(format!("Failed to create log file appender: {}", e)))?;

    let (non_blocking_appender, guard) = non_blocking(file_appender);
    let _ = APPENDER_GUARD.set(guard);

    let registry = tracing_subscriber::registry().with(filter);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_appender)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let file_layer = if config.json_format {
        file_layer.json().boxed()
    } else {
        file_layer.boxed()
    };

    let subscriber = registry.with(file_layer);

    if config.console_output {
        subscriber.with(fmt::layer().with_target(false)).init();
    } else {
        subscriber.init();
    }

    info!(
        "Logging initialized - level: {}, file: {}",
        level, config.file
    );

    Ok(())
}

/// Parse log level string to tracing Level
fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.to_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" => Ok(Level::WARN),
        "ERROR" => Ok(Level::ERROR),
        _ => Err(TriphaseError::config(format!(
            "Invalid log level: {}",
            level_str
        ))),
    }
}

/// Context information for log messages
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Component name (e.g., "sequencer", "outputs", "web")
    pub component: String,

    /// Additional context fields
    pub extra_fields: std::collections::HashMap<String, String>,
}

impl LogContext {
    /// Create a new log context
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            extra_fields: std::collections::HashMap::new(),
        }
    }

    /// Add extra field
    pub fn with_field(mut self, key: &str, value: String) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }
}

/// Structured logger with context
#[derive(Clone)]
pub struct StructuredLogger {
    context: LogContext,
}

impl StructuredLogger {
    /// Create a new structured logger with context
    pub fn new(context: LogContext) -> Self {
        Self { context }
    }

    /// Log an info message with context
    pub fn info(&self, message: &str) {
        let fields = self.format_fields();
        info!(%fields, "{}", message);
    }

    /// Log a warning message with context
    pub fn warn(&self, message: &str) {
        let fields = self.format_fields();
        warn!(%fields, "{}", message);
    }

    /// Log an error message with context
    pub fn error(&self, message: &str) {
        let fields = self.format_fields();
        error!(%fields, "{}", message);
    }

    /// Log a debug message with context
    pub fn debug(&self, message: &str) {
        let fields = self.format_fields();
        debug!(%fields, "{}", message);
    }

    /// Log a trace message with context
    pub fn trace(&self, message: &str) {
        let fields = self.format_fields();
        trace!(%fields, "{}", message);
    }

    fn format_fields(&self) -> String {
        let mut fields = vec![format!("component={}", self.context.component)];

        for (key, value) in &self.context.extra_fields {
            fields.push(format!("{}={}", key, value));
        }

        fields.join(",")
    }
}

/// Create a logger for a specific component
pub fn get_logger(component: &str) -> StructuredLogger {
    let context = LogContext::new(component);
    StructuredLogger::new(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("ERROR").unwrap(), Level::ERROR);
        assert!(parse_log_level("invalid").is_err());
    }

    #[test]
    fn test_log_context() {
        let context = LogContext::new("test").with_field("key", "value".to_string());

        assert_eq!(context.component, "test");
        assert_eq!(context.extra_fields.get("key"), Some(&"value".to_string()));
    }

    #[test]
    fn test_structured_logger() {
        let context = LogContext::new("test_component");
        let logger = StructuredLogger::new(context);

        // These should not panic even without an initialized subscriber
        logger.info("Test info message");
        logger.debug("Test debug message");
        logger.warn("Test warning message");
        logger.error("Test error message");
    }

    #[test]
    fn test_get_logger() {
        let logger = get_logger("test_component");
        assert_eq!(logger.context.component, "test_component");
    }
}
