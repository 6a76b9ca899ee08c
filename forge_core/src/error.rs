//! Error types for the forge_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for forge_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record that has no sensible default was requested
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected before anything was written
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backing store could not be reached or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// The write would break a uniqueness or state-transition rule
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl Error {
    /// Whether retrying the same call (with backoff) can succeed.
    ///
    /// Validation and conflict errors need changed input first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Io(_))
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(Error::Storage("down".into()).is_retryable());
        assert!(Error::Io(io::Error::new(io::ErrorKind::Other, "disk")).is_retryable());
        assert!(!Error::Validation("mev > mav".into()).is_retryable());
        assert!(!Error::Conflict("already active".into()).is_retryable());
        assert!(!Error::NotFound("plan".into()).is_retryable());
    }

    #[test]
    fn test_display_names_the_kind() {
        let err = Error::validation("target reps must be positive");
        assert_eq!(
            err.to_string(),
            "Validation error: target reps must be positive"
        );
    }
}
