//! Service configuration
//!
//! Layering, lowest priority first:
//! 1. Built-in defaults ([`Cm1Config::default`])
//! 2. YAML file (`config/cm1srv.yaml` unless `--config` names another)
//! 3. Environment, `CM1SRV_` prefix with `__` for nesting
//!    (`CM1SRV_POLLING__MAX_TRIES=3`)
//! 4. Command line overrides

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cm1_registers::{Quantity, RegisterMap, RegisterOverrides, StationModel};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{PollError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config/cm1srv.yaml";
pub const ENV_PREFIX: &str = "CM1SRV_";

/// Serial parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// Serial link and station identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub model: StationModel,
    pub port: String,
    /// Modbus slave address
    pub address: u8,
    pub baud_rate: u32,
    pub timeout_secs: u64,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            model: StationModel::Ms120,
            port: "/dev/ttyUSB0".to_string(),
            address: 1,
            baud_rate: 19200,
            timeout_secs: 6,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
        }
    }
}

impl StationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub poll_interval_secs: u64,
    /// Attempts per operation, including the first
    pub max_tries: u32,
    pub retry_wait_secs: u64,
    /// Rain depth per bucket tip, mm
    pub bucket_size: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            max_tries: 6,
            retry_wait_secs: 5,
            bucket_size: 0.2,
        }
    }
}

impl PollingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for daily rolling log files; console only when unset
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cm1Config {
    pub station: StationConfig,
    pub polling: PollingConfig,
    pub register_map: RegisterOverrides,
    /// Reading label -> quantity; empty keeps the quantity names
    pub sensor_map: BTreeMap<String, Quantity>,
    pub logging: LoggingConfig,
}

/// Values given on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<String>,
    pub address: Option<u8>,
    pub log_level: Option<String>,
}

impl Cm1Config {
    /// Layered figment for a given config file
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Cm1Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load, apply command line overrides and validate
    ///
    /// With `path == None` the default file is optional; an explicitly named
    /// file must exist.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let path = match path {
            Some(path) if !path.exists() => {
                return Err(PollError::config(format!(
                    "config file {} not found",
                    path.display()
                )));
            },
            Some(path) => path,
            None => Path::new(DEFAULT_CONFIG_PATH),
        };

        let mut config: Cm1Config = Self::figment(path)
            .extract()
            .map_err(|e| PollError::config(format!("Failed to load configuration: {e}")))?;

        if let Some(port) = &overrides.port {
            config.station.port = port.clone();
        }
        if let Some(address) = overrides.address {
            config.station.address = address;
        }
        if let Some(level) = &overrides.log_level {
            config.logging.level = level.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let polling = &self.polling;
        if !polling.bucket_size.is_finite() || polling.bucket_size <= 0.0 {
            return Err(PollError::config(format!(
                "polling.bucket_size must be a positive number, got {}",
                polling.bucket_size
            )));
        }
        if polling.max_tries == 0 {
            return Err(PollError::config("polling.max_tries must be at least 1"));
        }
        if polling.poll_interval_secs == 0 {
            return Err(PollError::config("polling.poll_interval_secs must be non-zero"));
        }

        let station = &self.station;
        if station.timeout_secs == 0 {
            return Err(PollError::config("station.timeout_secs must be non-zero"));
        }
        if !(1..=247).contains(&station.address) {
            return Err(PollError::config(format!(
                "station.address {} outside 1..=247",
                station.address
            )));
        }
        if !(5..=8).contains(&station.data_bits) {
            return Err(PollError::config(format!(
                "station.data_bits {} outside 5..=8",
                station.data_bits
            )));
        }
        if !(1..=2).contains(&station.stop_bits) {
            return Err(PollError::config(format!(
                "station.stop_bits {} must be 1 or 2",
                station.stop_bits
            )));
        }
        if station.port.trim().is_empty() {
            return Err(PollError::config("station.port is empty"));
        }

        self.register_map().map(|_| ())
    }

    /// Register map of the configured model with overrides applied
    pub fn register_map(&self) -> Result<RegisterMap> {
        let map = RegisterMap::for_model(self.station.model).with_overrides(&self.register_map);
        map.validate()
            .map_err(|e| PollError::config(e.to_string()))?;
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Cm1Config::default();
        assert_eq!(config.station.port, "/dev/ttyUSB0");
        assert_eq!(config.station.baud_rate, 19200);
        assert_eq!(config.station.timeout(), Duration::from_secs(6));
        assert_eq!(config.polling.max_tries, 6);
        assert_eq!(config.polling.retry_wait(), Duration::from_secs(5));
        assert_eq!(config.polling.poll_interval(), Duration::from_secs(10));
        assert!((config.polling.bucket_size - 0.2).abs() < f64::EPSILON);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Cm1Config::default();
        config.polling.bucket_size = 0.0;
        assert!(matches!(config.validate(), Err(PollError::Configuration(_))));

        let mut config = Cm1Config::default();
        config.polling.bucket_size = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Cm1Config::default();
        config.polling.max_tries = 0;
        assert!(config.validate().is_err());

        let mut config = Cm1Config::default();
        config.station.address = 0;
        assert!(config.validate().is_err());

        let mut config = Cm1Config::default();
        config.register_map.main_start = Some(65_500);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("address space"), "{err}");
    }

    #[test]
    fn test_env_layer() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "cm1srv.yaml",
                "station:\n  port: /dev/ttyS1\npolling:\n  max_tries: 4\n",
            )?;
            jail.set_env("CM1SRV_POLLING__MAX_TRIES", "2");
            jail.set_env("CM1SRV_STATION__ADDRESS", "7");

            let config: Cm1Config = Cm1Config::figment(Path::new("cm1srv.yaml")).extract()?;
            assert_eq!(config.station.port, "/dev/ttyS1");
            assert_eq!(config.station.address, 7);
            assert_eq!(config.polling.max_tries, 2);
            assert_eq!(config.station.baud_rate, 19200);
            Ok(())
        });
    }
}
