//! CM-1 Communication Link Library
//!
//! Transport contract and register codecs for the Dyacon CM-1 weather
//! station controller.
//!
//! # Architecture
//!
//! This library provides:
//! - **Core Trait**: [`Transport`], the register read/write contract the poll
//!   controller depends on
//! - **Windows**: [`RegisterWindow`], a validated run of holding registers
//! - **Bytes Utilities**: signed/unsigned words, register pairs, IEEE floats,
//!   scaled decimals and decimal-packed fields
//! - **Errors**: [`TransportError`], the uniform transport failure signal

pub mod bytes;
pub mod error;
pub mod traits;
pub mod window;

// Re-export core types
pub use error::{Result, TransportError};
pub use traits::Transport;
pub use window::RegisterWindow;
