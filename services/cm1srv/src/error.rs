//! Error handling for the CM-1 polling service

use cm1_comlink::TransportError;
use cm1_registers::DecodeError;
use errors::{ErrorCategory, StationErrorTrait};
use thiserror::Error;

/// Poll controller error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollError {
    /// Register read/write failed on the link
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Registers arrived but could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Invalid settings; never retried
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Every attempt of an operation failed
    #[error("{operation} failed after {attempts} attempts: {source}")]
    ExhaustedRetries {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: Box<PollError>,
    },

    /// Shutdown requested while waiting to retry
    #[error("{0} cancelled")]
    Cancelled(&'static str),
}

/// Result type alias for the polling service
pub type Result<T> = std::result::Result<T, PollError>;

impl PollError {
    pub fn config(msg: impl Into<String>) -> Self {
        PollError::Configuration(msg.into())
    }

    /// Innermost failure behind any retry wrapping
    pub fn root_cause(&self) -> &PollError {
        match self {
            PollError::ExhaustedRetries { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl StationErrorTrait for PollError {
    fn error_code(&self) -> &'static str {
        match self {
            PollError::Transport(e) => e.error_code(),
            PollError::Decode(e) => e.error_code(),
            PollError::Configuration(_) => "CONFIGURATION_ERROR",
            PollError::ExhaustedRetries { .. } => "EXHAUSTED_RETRIES",
            PollError::Cancelled(_) => "CANCELLED",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            PollError::Transport(e) => e.category(),
            PollError::Decode(e) => e.category(),
            PollError::Configuration(_) => ErrorCategory::Configuration,
            PollError::ExhaustedRetries { .. } => ErrorCategory::ResourceExhausted,
            PollError::Cancelled(_) => ErrorCategory::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability_follows_source() {
        assert!(PollError::from(TransportError::timeout("no answer")).is_retryable());
        assert!(!PollError::from(DecodeError::malformed("wind", 9, 2)).is_retryable());
        assert!(!PollError::config("bucket_size must be positive").is_retryable());
        assert!(!PollError::Cancelled("poll").is_retryable());
    }

    #[test]
    fn test_exhausted_carries_last_cause() {
        let err = PollError::ExhaustedRetries {
            operation: "poll",
            attempts: 3,
            source: Box::new(TransportError::timeout("no answer").into()),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.error_code(), "EXHAUSTED_RETRIES");
        assert_eq!(err.to_string(), "poll failed after 3 attempts: Timeout: no answer");
        assert!(matches!(
            err.root_cause(),
            PollError::Transport(TransportError::Timeout(_))
        ));

        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Timeout: no answer"));
    }
}
