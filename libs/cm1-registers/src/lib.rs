//! CM-1 Register Decoder
//!
//! Turns raw holding-register windows read from a Dyacon CM-1 controller into
//! named measurements. Nothing in this crate performs I/O.
//!
//! - [`SensorBlock`]: static table of block decoders with status gating
//! - [`RegisterMap`]: window addresses and block offsets per station model
//! - [`decode_window`]: window + layouts -> [`MeasurementMap`]
//! - [`StationClock`] and [`SystemParameters`]: the non-measurement registers

pub mod blocks;
pub mod clock;
pub mod decoder;
pub mod error;
pub mod measurement;
pub mod register_map;
pub mod system;

pub use blocks::{ChargerStatus, SensorBlock};
pub use clock::StationClock;
pub use decoder::{decode_polled, decode_window};
pub use error::{DecodeError, Result};
pub use measurement::{MeasurementMap, Quantity, Unit, UnknownQuantity};
pub use register_map::{
    BlockLayout, PolledWindow, RegisterMap, RegisterOverrides, RegisterSlice, StationModel,
    WindowSpec,
};
pub use system::SystemParameters;
