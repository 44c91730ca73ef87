//! Error types for notification operations.
//!
//! The only failure this crate originates is a wait timing out. Everything
//! the `WebDriver` layer reports (missing elements, stale references, session
//! failures) is carried through unchanged so callers can match on the
//! original `fantoccini` error.

use std::time::Duration;
use thiserror::Error;

/// The main error type for all notification operations.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The notification slot did not reach the expected state in time.
    ///
    /// The message is chosen from what was expected, e.g.
    /// `"AddOnInstallBlocked was not shown"`.
    #[error("{message}")]
    Timeout {
        /// Human-readable description of the unmet expectation
        message: String,
        /// How long we waited before timing out
        timeout: Duration,
    },

    /// A `WebDriver` command failed.
    #[error(transparent)]
    WebDriver(#[from] fantoccini::error::CmdError),

    /// The `WebDriver` session could not be created.
    #[error(transparent)]
    Session(#[from] fantoccini::error::NewSessionError),

    /// Marionette answered a context request with something unexpected.
    #[error("unexpected browser context response: {0}")]
    Context(String),

    /// The test web server failed to start or serve.
    #[error("web server error: {reason}")]
    Server {
        /// Human-readable reason for the failure
        reason: String,
        /// Optional underlying error that caused the failure
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Generic I/O errors (file access, network, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotificationError {
    /// Returns true if this error is a wait timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<figment::Error> for NotificationError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

/// A specialized Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotificationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_displays_only_its_message() {
        let err = NotificationError::Timeout {
            message: "Unexpected notification shown".to_string(),
            timeout: Duration::from_secs(1),
        };

        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Unexpected notification shown");
    }

    #[test]
    fn server_error_keeps_reason() {
        let err = NotificationError::Server {
            reason: "port in use".to_string(),
            source: None,
        };

        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "web server error: port in use");
    }
}
