//! Custom error types for the application.
//!
//! This module defines the primary error type, `ScoutError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of errors that can occur,
//! from configuration and I/O issues to modem-specific problems.
//!
//! The taxonomy follows the failure domains of the system: transport errors
//! and device-reported errors are retried inside the command executor and
//! only surface here when a session cannot be established at all;
//! desired-configuration errors abort a smart-configuration run; identity
//! errors are fatal only under the `enforce` policy.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, ScoutError>;

/// Application error type.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// Configuration could not be loaded or extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration loaded but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// File or network I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port open/enumeration failure.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An operation required an open transport.
    #[error("Not connected to modem")]
    NotConnected,

    /// The bootstrap sequence did not complete; the session is unusable.
    #[error("Modem initialization failed at '{command}': {response}")]
    InitFailed {
        /// The bootstrap command that failed.
        command: String,
        /// The raw response (or error message) observed.
        response: String,
    },

    /// The desired-configuration document is missing or invalid.
    #[error("Desired-configuration error: {0}")]
    DesiredConfig(String),

    /// The connected device is not on the identity allow-list.
    #[error("Unsupported modem: {0}")]
    IdentityMismatch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScoutError::IdentityMismatch("manufacturer 'Acme'".to_string());
        assert_eq!(err.to_string(), "Unsupported modem: manufacturer 'Acme'");
    }

    #[test]
    fn test_init_failed_display() {
        let err = ScoutError::InitFailed {
            command: "ATE0".into(),
            response: "ERROR".into(),
        };
        assert!(err.to_string().contains("ATE0"));
        assert!(err.to_string().contains("ERROR"));
    }
}
