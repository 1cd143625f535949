//! Register word processing utilities
//!
//! Provides the numeric codecs used by the CM-1 register contract:
//! signed/unsigned words, register pairs, IEEE-754 floats, scaled decimals
//! with a "no reading" sentinel, and decimal-packed calendar fields.
//!
//! All register pairs are high word first. Nothing here allocates or
//! performs I/O.

pub mod conversions;
pub mod packed_decimal;

pub use conversions::*;
pub use packed_decimal::*;
