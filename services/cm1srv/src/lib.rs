//! CM-1 Polling Service
//!
//! Polls a Dyacon CM-1 weather station controller over Modbus-RTU, decodes
//! its register banks and emits readings with bounded retry.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod poller;
pub mod reading;
pub mod shutdown;
pub mod simulator;
pub mod transport;

pub use config::Cm1Config;
pub use error::{PollError, Result};
pub use poller::{PollController, PollSettings, PollState, RetryPolicy};
pub use reading::{Reading, SensorLabels, UnitSystem};
pub use simulator::SimulatedStation;
pub use transport::RtuTransport;
