//! Transport Error Types
//!
//! Failures reported by the register transport. The decoder never produces
//! these; the poll controller retries all of them.

use errors::{ErrorCategory, StationErrorTrait};
use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport-level failures of a register read or write
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Serial port or stream I/O failure
    #[error("IO error: {0}")]
    Io(String),

    /// No (complete) response within the configured timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Device answered with a Modbus exception (01 illegal function,
    /// 02 illegal address, 03 illegal data value, 04 device failure, ...)
    #[error("Modbus exception {code:#04x}: {description}")]
    Exception { code: u8, description: String },

    /// Malformed frame (bad CRC, unexpected function code, framing)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Response carried a different number of registers than requested
    #[error("Short read at register {start}: expected {expected} registers, got {actual}")]
    ShortRead {
        start: u16,
        expected: u16,
        actual: usize,
    },

    /// Port could not be opened or the link is gone
    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

// Helper methods for creating errors
impl TransportError {
    pub fn io(msg: impl Into<String>) -> Self {
        TransportError::Io(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        TransportError::Timeout(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        TransportError::Protocol(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        TransportError::Connection(msg.into())
    }

    /// Build an exception error with the standard Modbus description
    pub fn exception(code: u8) -> Self {
        TransportError::Exception {
            code,
            description: exception_description(code).to_string(),
        }
    }
}

/// Human readable name of a Modbus exception code
pub fn exception_description(code: u8) -> &'static str {
    match code {
        0x01 => "illegal function",
        0x02 => "illegal data address",
        0x03 => "illegal data value",
        0x04 => "device failure",
        0x05 => "acknowledge",
        0x06 => "device busy",
        0x08 => "memory parity error",
        0x0A => "gateway path unavailable",
        0x0B => "gateway target failed to respond",
        _ => "unknown exception",
    }
}

impl StationErrorTrait for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Exception { .. } => "MODBUS_EXCEPTION",
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::ShortRead { .. } => "SHORT_READ",
            Self::Connection(_) => "CONNECTION_FAILED",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Exception { .. } | Self::Protocol(_) | Self::ShortRead { .. } => {
                ErrorCategory::Protocol
            },
            Self::Connection(_) => ErrorCategory::Connection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_transport_error_is_retryable() {
        let errors = [
            TransportError::io("broken pipe"),
            TransportError::timeout("no response"),
            TransportError::exception(0x04),
            TransportError::protocol("bad crc"),
            TransportError::ShortRead {
                start: 200,
                expected: 92,
                actual: 40,
            },
            TransportError::connection("port vanished"),
        ];
        for err in errors {
            assert!(err.is_retryable(), "{err} should be retryable");
        }
    }

    #[test]
    fn test_exception_display() {
        let err = TransportError::exception(0x02);
        assert_eq!(err.to_string(), "Modbus exception 0x02: illegal data address");
        assert_eq!(err.error_code(), "MODBUS_EXCEPTION");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: TransportError = io.into();
        assert!(matches!(err, TransportError::Io(msg) if msg.contains("gone")));
    }
}
