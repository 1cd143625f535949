//! Modbus-RTU transport over a serial port
//!
//! Framing, CRC and slave addressing are handled by `tokio-modbus`; this
//! adapter adds the per-request timeout and maps every failure onto
//! [`TransportError`].

use std::time::Duration;

use async_trait::async_trait;
use cm1_comlink::{RegisterWindow, Result, Transport, TransportError};
use tokio::time::timeout;
use tokio_modbus::client::{rtu, Context};
use tokio_modbus::prelude::*;
use tokio_serial::SerialStream;
use tracing::{debug, info};

use crate::config::{Parity, StationConfig};

/// Serial Modbus-RTU client bound to one station address
pub struct RtuTransport {
    ctx: Context,
    port: String,
    address: u8,
    timeout: Duration,
}

impl RtuTransport {
    /// Open the serial port and attach to the configured slave
    pub fn open(config: &StationConfig) -> Result<Self> {
        let builder = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(data_bits(config.data_bits))
            .parity(parity(config.parity))
            .stop_bits(stop_bits(config.stop_bits))
            .timeout(config.timeout());

        let serial = SerialStream::open(&builder).map_err(|e| {
            TransportError::connection(format!("Failed to open {}: {}", config.port, e))
        })?;
        let ctx = rtu::attach_slave(serial, Slave(config.address));

        info!(
            "Opened {} at {} baud, slave address {}",
            config.port, config.baud_rate, config.address
        );

        Ok(Self {
            ctx,
            port: config.port.clone(),
            address: config.address,
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl Transport for RtuTransport {
    async fn read_registers(&mut self, start_address: u16, count: u16) -> Result<RegisterWindow> {
        debug!(
            "Read holding registers: slave={}, start={}, count={}",
            self.address, start_address, count
        );

        let response = timeout(
            self.timeout,
            self.ctx.read_holding_registers(start_address, count),
        )
        .await
        .map_err(|_| {
            TransportError::timeout(format!(
                "no response to read {start_address}+{count} within {:?}",
                self.timeout
            ))
        })?;

        let words = response
            .map_err(map_modbus_error)?
            .map_err(map_exception)?;
        debug!("Received {} registers from {}", words.len(), start_address);

        RegisterWindow::from_response(start_address, count, words)
    }

    async fn write_registers(&mut self, start_address: u16, words: &[u16]) -> Result<()> {
        debug!(
            "Write multiple registers: slave={}, start={}, words={:?}",
            self.address, start_address, words
        );

        timeout(
            self.timeout,
            self.ctx.write_multiple_registers(start_address, words),
        )
        .await
        .map_err(|_| {
            TransportError::timeout(format!(
                "no response to write at {start_address} within {:?}",
                self.timeout
            ))
        })?
        .map_err(map_modbus_error)?
        .map_err(map_exception)
    }

    fn name(&self) -> &str {
        &self.port
    }
}

fn map_modbus_error(err: tokio_modbus::Error) -> TransportError {
    match err {
        tokio_modbus::Error::Transport(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            TransportError::timeout(io.to_string())
        },
        tokio_modbus::Error::Transport(io) => TransportError::from(io),
        other => TransportError::protocol(other.to_string()),
    }
}

fn map_exception(exception: ExceptionCode) -> TransportError {
    TransportError::exception(u8::from(exception))
}

fn data_bits(bits: u8) -> tokio_serial::DataBits {
    match bits {
        5 => tokio_serial::DataBits::Five,
        6 => tokio_serial::DataBits::Six,
        7 => tokio_serial::DataBits::Seven,
        _ => tokio_serial::DataBits::Eight,
    }
}

fn parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Even => tokio_serial::Parity::Even,
        Parity::Odd => tokio_serial::Parity::Odd,
    }
}

fn stop_bits(bits: u8) -> tokio_serial::StopBits {
    match bits {
        2 => tokio_serial::StopBits::Two,
        _ => tokio_serial::StopBits::One,
    }
}
