//! Sensor block decoders
//!
//! A block is a fixed-size group of registers with its own decode rule.
//! Gated blocks (wind, temperature/humidity/pressure, lightning) start with a
//! status word that decides whether the remaining words are meaningful.

use std::fmt;

use cm1_comlink::bytes::{
    reg_to_i16, regs_to_f32, regs_to_u32, scale_signed, scale_unsigned, scale_with_sentinel,
};
use serde::Serialize;

use crate::error::{DecodeError, Result};
use crate::measurement::{MeasurementMap, Quantity};

/// Wind or TPH status: no sensor attached
pub const SENSOR_ABSENT: i16 = -1;

/// Lightning status: sensor not present or not initialised
pub const LIGHTNING_UNAVAILABLE: u16 = 0x0080;

/// Raw value of a calculated quantity the station could not compute
pub const CALCULATED_SENTINEL: i16 = -9990;

/// Lightning distance reported when the storm is out of range
pub const LIGHTNING_OUT_OF_RANGE: u16 = 63;

const TENTHS: f64 = 0.1;
const MILLIS: f64 = 0.001;

const TPH_TEMP_HUMIDITY_FAULT: u16 = 0x0001;
const TPH_PRESSURE_FAULT: u16 = 0x0002;

const WIND_FIELDS: [Quantity; 8] = [
    Quantity::WindSpeed,
    Quantity::WindDir,
    Quantity::WindSpeed2m,
    Quantity::WindDir2m,
    Quantity::WindSpeed10m,
    Quantity::WindDir10m,
    Quantity::WindGustSpeed,
    Quantity::WindGustDir,
];

const LIGHTNING_FIELDS: [Quantity; 10] = [
    Quantity::LightningStrikeCount,
    Quantity::LightningNoiseCount,
    Quantity::LightningDisturberCount,
    Quantity::LightningDistance,
    Quantity::LightningEnergy,
    Quantity::LightningStrikeCount10m,
    Quantity::LightningStrikeCount30m,
    Quantity::LightningStrikeCount60m,
    Quantity::LightningNoiseCount60m,
    Quantity::LightningDisturberCount60m,
];

/// Solar charger state reported in the power block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChargerStatus {
    Off,
    Fast,
    FastTop,
    FloatCharge,
    Unknown(u16),
}

impl From<u16> for ChargerStatus {
    fn from(code: u16) -> Self {
        match code {
            0 => ChargerStatus::Off,
            1 => ChargerStatus::Fast,
            2 => ChargerStatus::FastTop,
            3 => ChargerStatus::FloatCharge,
            other => ChargerStatus::Unknown(other),
        }
    }
}

impl fmt::Display for ChargerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargerStatus::Off => write!(f, "off"),
            ChargerStatus::Fast => write!(f, "fast"),
            ChargerStatus::FastTop => write!(f, "fast top"),
            ChargerStatus::FloatCharge => write!(f, "float charge"),
            ChargerStatus::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// Every block the station exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorBlock {
    Power,
    Wind,
    TemperatureHumidityPressure,
    Rain,
    Analog1,
    Analog2,
    Calculated,
    Lightning,
}

impl SensorBlock {
    pub const ALL: [SensorBlock; 8] = [
        SensorBlock::Power,
        SensorBlock::Wind,
        SensorBlock::TemperatureHumidityPressure,
        SensorBlock::Rain,
        SensorBlock::Analog1,
        SensorBlock::Analog2,
        SensorBlock::Calculated,
        SensorBlock::Lightning,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SensorBlock::Power => "power",
            SensorBlock::Wind => "wind",
            SensorBlock::TemperatureHumidityPressure => "tph",
            SensorBlock::Rain => "rain",
            SensorBlock::Analog1 => "analog_1",
            SensorBlock::Analog2 => "analog_2",
            SensorBlock::Calculated => "calculated",
            SensorBlock::Lightning => "lightning",
        }
    }

    /// Number of register words the block consumes
    pub const fn word_count(&self) -> usize {
        match self {
            SensorBlock::Power => 3,
            SensorBlock::Wind => 9,
            SensorBlock::TemperatureHumidityPressure => 6,
            SensorBlock::Rain => 2,
            SensorBlock::Analog1 | SensorBlock::Analog2 => 2,
            SensorBlock::Calculated => 4,
            SensorBlock::Lightning => 12,
        }
    }

    /// Decode exactly [`word_count`](Self::word_count) words
    pub fn decode(&self, words: &[u16]) -> Result<MeasurementMap> {
        let mut out = MeasurementMap::new();
        match self {
            SensorBlock::Power => decode_power(fixed(*self, words)?, &mut out),
            SensorBlock::Wind => decode_wind(fixed(*self, words)?, &mut out),
            SensorBlock::TemperatureHumidityPressure => {
                decode_tph(fixed(*self, words)?, &mut out)
            },
            SensorBlock::Rain => decode_rain(fixed(*self, words)?, &mut out),
            SensorBlock::Analog1 => {
                decode_analog(Quantity::Analog1, fixed(*self, words)?, &mut out)
            },
            SensorBlock::Analog2 => {
                decode_analog(Quantity::Analog2, fixed(*self, words)?, &mut out)
            },
            SensorBlock::Calculated => decode_calculated(fixed(*self, words)?, &mut out),
            SensorBlock::Lightning => decode_lightning(fixed(*self, words)?, &mut out),
        }
        Ok(out)
    }
}

impl fmt::Display for SensorBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn fixed<const N: usize>(block: SensorBlock, words: &[u16]) -> Result<&[u16; N]> {
    words
        .try_into()
        .map_err(|_| DecodeError::malformed(block.name(), N, words.len()))
}

fn decode_power(words: &[u16; 3], out: &mut MeasurementMap) {
    let [battery, solar, charger] = *words;
    out.insert(Quantity::BatteryVoltage, Some(scale_unsigned(battery, MILLIS)));
    out.insert(Quantity::SolarVoltage, Some(scale_unsigned(solar, MILLIS)));
    out.insert(Quantity::ChargerStatus, Some(f64::from(charger)));
}

fn decode_wind(words: &[u16; 9], out: &mut MeasurementMap) {
    let status = reg_to_i16(words[0]);
    out.insert(Quantity::WindStatus, Some(f64::from(status)));

    match status {
        SENSOR_ABSENT => {},
        0 => {
            for (quantity, raw) in WIND_FIELDS.iter().zip(&words[1..]) {
                out.insert(*quantity, Some(scale_signed(*raw, TENTHS)));
            }
        },
        _ => {
            for quantity in WIND_FIELDS {
                out.insert(quantity, None);
            }
        },
    }
}

fn decode_tph(words: &[u16; 6], out: &mut MeasurementMap) {
    let [status, temperature, humidity, pressure, trend, temperature_p] = *words;
    out.insert(Quantity::TphStatus, Some(f64::from(reg_to_i16(status))));

    if reg_to_i16(status) == SENSOR_ABSENT {
        return;
    }

    let temp_humidity_ok = status & TPH_TEMP_HUMIDITY_FAULT == 0;
    out.insert(
        Quantity::Temperature,
        temp_humidity_ok.then(|| scale_signed(temperature, TENTHS)),
    );
    out.insert(
        Quantity::Humidity,
        temp_humidity_ok.then(|| scale_signed(humidity, TENTHS)),
    );

    let pressure_ok = status & TPH_PRESSURE_FAULT == 0;
    out.insert(
        Quantity::Pressure,
        pressure_ok.then(|| scale_signed(pressure, TENTHS)),
    );
    out.insert(
        Quantity::PressureTrend,
        pressure_ok.then(|| f64::from(reg_to_i16(trend))),
    );
    out.insert(
        Quantity::TemperatureP,
        pressure_ok.then(|| scale_signed(temperature_p, TENTHS)),
    );
}

fn decode_rain(words: &[u16; 2], out: &mut MeasurementMap) {
    // Tip counts; the bucket size belongs to the deployment, not the device
    out.insert(Quantity::RainDayTotal, Some(f64::from(words[0])));
    out.insert(Quantity::RainRate, Some(f64::from(words[1])));
}

fn decode_analog(quantity: Quantity, words: &[u16; 2], out: &mut MeasurementMap) {
    let value = regs_to_f32(words[0], words[1]);
    out.insert(quantity, value.is_finite().then(|| f64::from(value)));
}

fn decode_calculated(words: &[u16; 4], out: &mut MeasurementMap) {
    let quantities = [
        Quantity::HeatIndex,
        Quantity::WindChill,
        Quantity::DewPoint,
        Quantity::WetBulb,
    ];
    for (quantity, raw) in quantities.into_iter().zip(words) {
        out.insert(quantity, scale_with_sentinel(*raw, TENTHS, CALCULATED_SENTINEL));
    }
}

fn decode_lightning(words: &[u16; 12], out: &mut MeasurementMap) {
    let status = words[0];
    out.insert(Quantity::LightningStatus, Some(f64::from(status)));

    if status == LIGHTNING_UNAVAILABLE {
        for quantity in LIGHTNING_FIELDS {
            out.insert(quantity, None);
        }
        return;
    }

    let energy = regs_to_u32(words[5], words[6]);
    let values = [
        f64::from(words[1]),
        f64::from(words[2]),
        f64::from(words[3]),
        f64::from(words[4]),
        f64::from(energy),
        f64::from(words[7]),
        f64::from(words[8]),
        f64::from(words[9]),
        f64::from(words[10]),
        f64::from(words[11]),
    ];
    for (quantity, value) in LIGHTNING_FIELDS.into_iter().zip(values) {
        out.insert(quantity, Some(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm1_comlink::bytes::{f32_to_regs, i16_to_reg};

    fn assert_close(map: &MeasurementMap, quantity: Quantity, expected: f64) {
        let actual = map
            .value(quantity)
            .unwrap_or_else(|| panic!("{quantity} has no value"));
        assert!(
            (actual - expected).abs() < 1e-9,
            "{quantity}: expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_wind_healthy() {
        let map = SensorBlock::Wind
            .decode(&[0, 50, 1800, 45, 1790, 48, 1810, 60, 1805])
            .unwrap();
        assert_close(&map, Quantity::WindSpeed, 5.0);
        assert_close(&map, Quantity::WindDir, 180.0);
        assert_close(&map, Quantity::WindSpeed2m, 4.5);
        assert_close(&map, Quantity::WindDir10m, 181.0);
        assert_close(&map, Quantity::WindGustSpeed, 6.0);
        assert_close(&map, Quantity::WindGustDir, 180.5);
        assert_eq!(map.len(), 9);
    }

    #[test]
    fn test_wind_sensor_absent_emits_only_status() {
        let map = SensorBlock::Wind
            .decode(&[0xFFFF, 50, 1800, 45, 1790, 48, 1810, 60, 1805])
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.value(Quantity::WindStatus), Some(-1.0));
        assert!(WIND_FIELDS.iter().all(|q| !map.contains(*q)));
    }

    #[test]
    fn test_wind_fault_keeps_keys_without_values() {
        let map = SensorBlock::Wind
            .decode(&[2, 50, 1800, 45, 1790, 48, 1810, 60, 1805])
            .unwrap();
        for quantity in WIND_FIELDS {
            assert_eq!(map.get(quantity), Some(None), "{quantity}");
        }
    }

    #[test]
    fn test_tph_status_bits() {
        let words = [0, i16_to_reg(-52), 873, 10132, i16_to_reg(-3), 215];
        let map = SensorBlock::TemperatureHumidityPressure.decode(&words).unwrap();
        assert_close(&map, Quantity::Temperature, -5.2);
        assert_close(&map, Quantity::Humidity, 87.3);
        assert_close(&map, Quantity::Pressure, 1013.2);
        assert_close(&map, Quantity::PressureTrend, -3.0);
        assert_close(&map, Quantity::TemperatureP, 21.5);

        let words = [1, 0xFFFF, 0xFFFF, 10132, 0, 215];
        let map = SensorBlock::TemperatureHumidityPressure.decode(&words).unwrap();
        assert_eq!(map.get(Quantity::Temperature), Some(None));
        assert_eq!(map.get(Quantity::Humidity), Some(None));
        assert_close(&map, Quantity::Pressure, 1013.2);

        let words = [2, 200, 500, 0xFFFF, 0xFFFF, 0xFFFF];
        let map = SensorBlock::TemperatureHumidityPressure.decode(&words).unwrap();
        assert_close(&map, Quantity::Temperature, 20.0);
        assert_eq!(map.get(Quantity::Pressure), Some(None));
        assert_eq!(map.get(Quantity::PressureTrend), Some(None));
        assert_eq!(map.get(Quantity::TemperatureP), Some(None));

        let map = SensorBlock::TemperatureHumidityPressure
            .decode(&[0xFFFF, 1, 2, 3, 4, 5])
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.value(Quantity::TphStatus), Some(-1.0));
    }

    #[test]
    fn test_calculated_sentinel_before_scaling() {
        let map = SensorBlock::Calculated
            .decode(&[55546, 55546, 55546, 55546])
            .unwrap();
        for quantity in [
            Quantity::HeatIndex,
            Quantity::WindChill,
            Quantity::DewPoint,
            Quantity::WetBulb,
        ] {
            assert_eq!(map.get(quantity), Some(None), "{quantity}");
        }

        let map = SensorBlock::Calculated
            .decode(&[251, i16_to_reg(-31), 123, 0])
            .unwrap();
        assert_close(&map, Quantity::HeatIndex, 25.1);
        assert_close(&map, Quantity::WindChill, -3.1);
        assert_close(&map, Quantity::DewPoint, 12.3);
        assert_close(&map, Quantity::WetBulb, 0.0);
    }

    #[test]
    fn test_lightning_unavailable_masks_everything() {
        let map = SensorBlock::Lightning
            .decode(&[0x0080, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7])
            .unwrap();
        assert_eq!(map.value(Quantity::LightningStatus), Some(128.0));
        for quantity in LIGHTNING_FIELDS {
            assert_eq!(map.get(quantity), Some(None), "{quantity}");
        }
    }

    #[test]
    fn test_lightning_fields() {
        let words = [0, 4, 2, 1, LIGHTNING_OUT_OF_RANGE, 0x0001, 0x0002, 1, 3, 4, 9, 5];
        let map = SensorBlock::Lightning.decode(&words).unwrap();
        assert_eq!(map.value(Quantity::LightningStrikeCount), Some(4.0));
        assert_eq!(map.value(Quantity::LightningDistance), Some(63.0));
        assert_eq!(map.value(Quantity::LightningEnergy), Some(65538.0));
        assert_eq!(map.value(Quantity::LightningStrikeCount60m), Some(4.0));
        assert_eq!(map.value(Quantity::LightningDisturberCount60m), Some(5.0));
        assert_eq!(map.len(), 11);
    }

    #[test]
    fn test_power_and_analog() {
        let map = SensorBlock::Power.decode(&[12850, 18200, 3]).unwrap();
        assert_close(&map, Quantity::BatteryVoltage, 12.85);
        assert_close(&map, Quantity::SolarVoltage, 18.2);
        assert_eq!(map.value(Quantity::ChargerStatus), Some(3.0));
        assert_eq!(ChargerStatus::from(3), ChargerStatus::FloatCharge);
        assert_eq!(ChargerStatus::from(9), ChargerStatus::Unknown(9));

        let map = SensorBlock::Analog1.decode(&f32_to_regs(4.25)).unwrap();
        assert_eq!(map.value(Quantity::Analog1), Some(4.25));

        let map = SensorBlock::Analog2.decode(&f32_to_regs(f32::NAN)).unwrap();
        assert_eq!(map.get(Quantity::Analog2), Some(None));
        assert!(!map.contains(Quantity::Analog1));
    }

    #[test]
    fn test_rain_left_unscaled() {
        let map = SensorBlock::Rain.decode(&[125, 6]).unwrap();
        assert_eq!(map.value(Quantity::RainDayTotal), Some(125.0));
        assert_eq!(map.value(Quantity::RainRate), Some(6.0));
    }

    #[test]
    fn test_wrong_word_count_is_malformed() {
        for block in SensorBlock::ALL {
            let short = vec![0; block.word_count() - 1];
            assert_eq!(
                block.decode(&short),
                Err(DecodeError::malformed(
                    block.name(),
                    block.word_count(),
                    block.word_count() - 1
                ))
            );
        }
    }
}
