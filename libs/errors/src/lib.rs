//! Error classification for the CM1 station crates
//!
//! Each crate keeps its own domain error enum (`TransportError`,
//! `DecodeError`, `PollError`) and implements [`StationErrorTrait`] to expose
//! a common interface: a stable error code, a category, retryability and the
//! level the error should be logged at.

// ============================================================================
// Error categories
// ============================================================================

/// Error category enum - used for classification and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    // Infrastructure layer
    Configuration,
    Network,
    Timeout,

    // Protocol/communication layer
    Protocol,
    Connection,

    // Data layer
    Validation,
    DataCorruption,

    // System level
    Internal,
    ResourceExhausted,
    /// Operation abandoned on shutdown
    Cancelled,

    // Others
    Unknown,
}

impl ErrorCategory {
    /// Stable lowercase name, suitable for structured log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Network => "network",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Connection => "connection",
            ErrorCategory::Validation => "validation",
            ErrorCategory::DataCorruption => "data_corruption",
            ErrorCategory::Internal => "internal",
            ErrorCategory::ResourceExhausted => "resource_exhausted",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Station error trait
// ============================================================================

/// Error capability trait implemented by every error type in the workspace
///
/// The poll controller only looks at [`StationErrorTrait::is_retryable`] to
/// decide whether a failed attempt is worth repeating, so the default
/// implementation is the single place where that policy lives.
pub trait StationErrorTrait: std::error::Error + Send + Sync + 'static {
    /// Get error code (for logs and the CLI exit report)
    fn error_code(&self) -> &'static str;

    /// Get error category
    fn category(&self) -> ErrorCategory;

    /// Whether the error is retryable (default implementation is category-based)
    fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Protocol
                | ErrorCategory::Connection
                | ErrorCategory::DataCorruption
        )
    }

    /// Get log level
    fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self.category() {
            ErrorCategory::Internal
            | ErrorCategory::Configuration
            | ErrorCategory::ResourceExhausted => Level::ERROR,
            ErrorCategory::Network
            | ErrorCategory::Timeout
            | ErrorCategory::Connection
            | ErrorCategory::Protocol
            | ErrorCategory::DataCorruption => Level::WARN,
            ErrorCategory::Validation => Level::ERROR,
            ErrorCategory::Cancelled => Level::INFO,
            ErrorCategory::Unknown => Level::WARN,
        }
    }
}
