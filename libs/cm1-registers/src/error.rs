//! Decoder Error Types

use errors::{ErrorCategory, StationErrorTrait};
use thiserror::Error;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Failures while turning register words into measurements
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A block needs more registers than the window supplies
    #[error("Malformed {block} block: requires {required} registers, window has {available}")]
    MalformedWindow {
        block: &'static str,
        required: usize,
        available: usize,
    },

    /// Packed date/time registers do not form a calendar instant
    #[error("Invalid station clock: {0}")]
    InvalidClock(String),

    /// Register map does not fit the Modbus address space or its own windows
    #[error("Invalid register map: {0}")]
    InvalidRegisterMap(String),
}

impl DecodeError {
    pub fn malformed(block: &'static str, required: usize, available: usize) -> Self {
        DecodeError::MalformedWindow {
            block,
            required,
            available,
        }
    }

    pub fn invalid_clock(msg: impl Into<String>) -> Self {
        DecodeError::InvalidClock(msg.into())
    }

    pub fn invalid_map(msg: impl Into<String>) -> Self {
        DecodeError::InvalidRegisterMap(msg.into())
    }
}

impl StationErrorTrait for DecodeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedWindow { .. } => "MALFORMED_WINDOW",
            Self::InvalidClock(_) => "INVALID_CLOCK",
            Self::InvalidRegisterMap(_) => "INVALID_REGISTER_MAP",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            // A window/offset mismatch is a bug in the map, never transient
            Self::MalformedWindow { .. } => ErrorCategory::Validation,
            Self::InvalidClock(_) => ErrorCategory::DataCorruption,
            Self::InvalidRegisterMap(_) => ErrorCategory::Configuration,
        }
    }
}
