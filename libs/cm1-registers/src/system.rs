//! System parameter block (registers 100..111)

use cm1_comlink::bytes::{reg_to_i16, regs_to_u32, scale_unsigned};
use cm1_comlink::RegisterWindow;
use serde::Serialize;

use crate::blocks::ChargerStatus;
use crate::error::{DecodeError, Result};
use crate::register_map::SYSTEM_REGISTERS;

/// Identity and supply state read once at startup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemParameters {
    pub product_id: i16,
    pub firmware_version: u16,
    pub serial_number: u32,
    /// Packed `HHMMSS`
    pub time: u32,
    /// Packed `YYMMDD`
    pub date: u32,
    pub battery_voltage: f64,
    pub solar_voltage: f64,
    pub charger_status: ChargerStatus,
}

impl SystemParameters {
    pub fn decode(window: &RegisterWindow) -> Result<Self> {
        let words = window
            .slice(0, usize::from(SYSTEM_REGISTERS))
            .ok_or_else(|| {
                DecodeError::malformed("system", usize::from(SYSTEM_REGISTERS), window.len())
            })?;

        Ok(Self {
            product_id: reg_to_i16(words[0]),
            firmware_version: words[1],
            serial_number: regs_to_u32(words[2], words[3]),
            time: regs_to_u32(words[4], words[5]),
            date: regs_to_u32(words[6], words[7]),
            battery_voltage: scale_unsigned(words[8], 0.001),
            solar_voltage: scale_unsigned(words[9], 0.001),
            charger_status: ChargerStatus::from(words[10]),
        })
    }

    /// `(name, value)` pairs in register order, for logging
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("product_id", self.product_id.to_string()),
            ("firmware_version", self.firmware_version.to_string()),
            ("serial_number", self.serial_number.to_string()),
            ("time", format!("{:06}", self.time)),
            ("date", format!("{:06}", self.date)),
            ("battery_voltage", format!("{:.3}", self.battery_voltage)),
            ("solar_voltage", format!("{:.3}", self.solar_voltage)),
            ("charger_status", self.charger_status.to_string()),
        ]
    }
}
