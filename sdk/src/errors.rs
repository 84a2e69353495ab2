//! Error types and handling
//!
//! This module provides the error type used throughout the primerblast engine.
//! Every error implements the `EngineErrorExt` trait which provides a
//! user-friendly hint and indicates whether the error is recoverable.
//!
//! The three remote-service failures (`Submission`, `Poll`, `Parse`) are
//! never retried inside the engine. Retrying in this system only ever means
//! relaxing search parameters, so these errors travel to the caller as-is.

use thiserror::Error;

/// Trait for engine error extensions
pub trait EngineErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to print and never includes the contact email or the
    /// raw response body.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be fixed by running the same command again
    /// later or after a configuration change.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, EngineErrorExt};
///
/// let error = EngineError::Poll("connection reset".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::Parse("no primer table".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Remote search errors
    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Polling failed: {0}")]
    Poll(String),

    #[error("Failed to parse primers: {0}")]
    Parse(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Submission(_) => {
                "Primer-BLAST rejected the search. Check the target ID and parameters"
            }
            Self::Poll(_) => "Lost contact with Primer-BLAST while waiting. Try again later",
            Self::Parse(_) => "Primer-BLAST returned a page the engine cannot read",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Parse(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_keep_their_message() {
        let err = EngineError::Submission("HTTP 400".to_string());
        assert_eq!(err.to_string(), "Submission failed: HTTP 400");

        let err = EngineError::Poll("timeout".to_string());
        assert_eq!(err.to_string(), "Polling failed: timeout");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
        assert_eq!(err.user_hint(), "File system operation failed");
    }

    #[test]
    fn test_recoverability() {
        assert!(EngineError::Config("bad".into()).is_recoverable());
        assert!(EngineError::Network("down".into()).is_recoverable());
        assert!(!EngineError::Parse("garbage".into()).is_recoverable());
    }
}
