//! Error types and handling for Triphase
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Triphase operations
pub type Result<T> = std::result::Result<T, TriphaseError>;

/// Main error type for Triphase
#[derive(Debug, Error)]
pub enum TriphaseError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Relay / digital-in hardware errors
    #[error("Hardware error: {message}")]
    Hardware { message: String },

    /// EVSE facade errors
    #[error("EVSE error: {message}")]
    Evse { message: String },

    /// Energy meter errors
    #[error("Meter error: {message}")]
    Meter { message: String },

    /// HTTP/Web server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl TriphaseError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        TriphaseError::Config {
            message: message.into(),
        }
    }

    /// Create a new hardware error
    pub fn hardware<S: Into<String>>(message: S) -> Self {
        TriphaseError::Hardware {
            message: message.into(),
        }
    }

    /// Create a new EVSE error
    pub fn evse<S: Into<String>>(message: S) -> Self {
        TriphaseError::Evse {
            message: message.into(),
        }
    }

    /// Create a new meter error
    pub fn meter<S: Into<String>>(message: S) -> Self {
        TriphaseError::Meter {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        TriphaseError::Web {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        TriphaseError::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        TriphaseError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        TriphaseError::Generic {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for TriphaseError {
    fn from(err: std::io::Error) -> Self {
        TriphaseError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for TriphaseError {
    fn from(err: serde_yaml::Error) -> Self {
        TriphaseError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TriphaseError {
    fn from(err: serde_json::Error) -> Self {
        TriphaseError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TriphaseError::config("test config error");
        assert!(matches!(err, TriphaseError::Config { .. }));

        let err = TriphaseError::hardware("relay unreachable");
        assert!(matches!(err, TriphaseError::Hardware { .. }));

        let err = TriphaseError::validation("field", "test validation error");
        assert!(matches!(err, TriphaseError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = TriphaseError::config("test error");
        let error_string = format!("{}", err);
        assert_eq!(error_string, "Configuration error: test error");

        let err = TriphaseError::validation("pause_time", "out of range");
        let error_string = format!("{}", err);
        assert_eq!(error_string, "Validation error: pause_time - out of range");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TriphaseError = io_err.into();
        assert!(matches!(err, TriphaseError::Io { .. }));
    }
}
