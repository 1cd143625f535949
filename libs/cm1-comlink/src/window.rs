//! Register windows
//!
//! A window is a contiguous run of holding registers returned by one read
//! request. It is immutable once built and always holds exactly the number of
//! words that were requested.

use tracing::debug;

use crate::error::{Result, TransportError};

/// Contiguous block of 16-bit registers read in one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterWindow {
    start: u16,
    words: Vec<u16>,
}

impl RegisterWindow {
    /// Build a window from a transport response
    ///
    /// Fails with [`TransportError::ShortRead`] when the response does not
    /// carry exactly `requested` words.
    pub fn from_response(start: u16, requested: u16, words: Vec<u16>) -> Result<Self> {
        if words.len() != usize::from(requested) {
            debug!(
                "Rejecting response at {}: {} words, requested {}",
                start,
                words.len(),
                requested
            );
            return Err(TransportError::ShortRead {
                start,
                expected: requested,
                actual: words.len(),
            });
        }
        Ok(Self { start, words })
    }

    /// First register address of the window
    pub fn start(&self) -> u16 {
        self.start
    }

    /// Number of registers in the window
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// All register words, in address order
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Sub-slice at a window-relative offset, `None` if it reaches past the end
    pub fn slice(&self, offset: usize, len: usize) -> Option<&[u16]> {
        let end = offset.checked_add(len)?;
        self.words.get(offset..end)
    }

    /// Word at an absolute register address
    pub fn register(&self, address: u16) -> Option<u16> {
        let offset = usize::from(address.checked_sub(self.start)?);
        self.words.get(offset).copied()
    }
}
