//! Measurement names, units and the decoded value map
//!
//! Every value the station reports is keyed by a [`Quantity`] from a closed
//! set. A value is `Option<f64>`: `None` means "no reading" (sensor absent or
//! faulted) and is never the same thing as zero.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Physical unit implied by a quantity name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Volt,
    MetersPerSecond,
    CompassDegree,
    Celsius,
    Percent,
    HectoPascal,
    Millimeter,
    /// Bucket tips per hour; times the bucket size gives mm/h
    TipsPerHour,
    Kilometer,
    /// Event or tip count
    Count,
    /// Status word, enumeration code or deployment-specific raw value
    Raw,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Volt => "V",
            Unit::MetersPerSecond => "m/s",
            Unit::CompassDegree => "deg",
            Unit::Celsius => "degC",
            Unit::Percent => "%",
            Unit::HectoPascal => "hPa",
            Unit::Millimeter => "mm",
            Unit::TipsPerHour => "tips/h",
            Unit::Kilometer => "km",
            Unit::Count => "count",
            Unit::Raw => "",
        }
    }
}

macro_rules! quantities {
    ($($variant:ident => $name:literal, $unit:ident;)+) => {
        /// Named measurement reported by the station
        ///
        /// Ordering follows the register layout so maps print in a stable,
        /// readable order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Quantity {
            $($variant,)+
        }

        impl Quantity {
            /// Every quantity, in declaration order
            pub const ALL: &'static [Quantity] = &[$(Quantity::$variant,)+];

            /// Fixed snake_case name used as the reading key
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Quantity::$variant => $name,)+
                }
            }

            pub fn unit(&self) -> Unit {
                match self {
                    $(Quantity::$variant => Unit::$unit,)+
                }
            }
        }

        impl FromStr for Quantity {
            type Err = UnknownQuantity;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Quantity::$variant),)+
                    other => Err(UnknownQuantity(other.to_string())),
                }
            }
        }
    };
}

quantities! {
    BatteryVoltage => "battery_voltage", Volt;
    SolarVoltage => "solar_voltage", Volt;
    ChargerStatus => "charger_status", Raw;
    WindStatus => "wind_status", Raw;
    WindSpeed => "wind_speed", MetersPerSecond;
    WindDir => "wind_dir", CompassDegree;
    WindSpeed2m => "wind_speed_2m", MetersPerSecond;
    WindDir2m => "wind_dir_2m", CompassDegree;
    WindSpeed10m => "wind_speed_10m", MetersPerSecond;
    WindDir10m => "wind_dir_10m", CompassDegree;
    WindGustSpeed => "wind_gust_speed", MetersPerSecond;
    WindGustDir => "wind_gust_dir", CompassDegree;
    TphStatus => "tph_status", Raw;
    Temperature => "temperature", Celsius;
    Humidity => "humidity", Percent;
    Pressure => "pressure", HectoPascal;
    PressureTrend => "pressure_trend", Raw;
    TemperatureP => "temperature_p", Celsius;
    HeatIndex => "heatindex", Celsius;
    WindChill => "windchill", Celsius;
    RainDayTotal => "rain_day_total", Count;
    RainRate => "rain_rate", TipsPerHour;
    Analog1 => "analog_1", Raw;
    Analog2 => "analog_2", Raw;
    DewPoint => "dewpoint", Celsius;
    WetBulb => "wetbulb", Celsius;
    LightningStatus => "lightning_status", Raw;
    LightningStrikeCount => "lightning_strike_count", Count;
    LightningNoiseCount => "lightning_noise_count", Count;
    LightningDisturberCount => "lightning_disturber_count", Count;
    LightningDistance => "lightning_distance", Kilometer;
    LightningEnergy => "lightning_energy", Raw;
    LightningStrikeCount10m => "lightning_strike_count_10m", Count;
    LightningStrikeCount30m => "lightning_strike_count_30m", Count;
    LightningStrikeCount60m => "lightning_strike_count_60m", Count;
    LightningNoiseCount60m => "lightning_noise_count_60m", Count;
    LightningDisturberCount60m => "lightning_disturber_count_60m", Count;
    Rain => "rain", Millimeter;
}

impl Quantity {
    /// Raw status words that gate a sensor block
    pub fn is_status(&self) -> bool {
        matches!(
            self,
            Quantity::ChargerStatus
                | Quantity::WindStatus
                | Quantity::TphStatus
                | Quantity::LightningStatus
        )
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Name that is not part of the quantity set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quantity '{0}'")]
pub struct UnknownQuantity(pub String);

/// Decoded values keyed by quantity
///
/// Blocks own disjoint quantities, so merging maps from several blocks is a
/// plain union.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MeasurementMap(BTreeMap<Quantity, Option<f64>>);

impl MeasurementMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, quantity: Quantity, value: Option<f64>) {
        self.0.insert(quantity, value);
    }

    /// `None` if the quantity was not emitted, `Some(None)` for "no reading"
    pub fn get(&self, quantity: Quantity) -> Option<Option<f64>> {
        self.0.get(&quantity).copied()
    }

    /// Numeric value, flattening "absent" and "no reading"
    pub fn value(&self, quantity: Quantity) -> Option<f64> {
        self.get(quantity).flatten()
    }

    pub fn contains(&self, quantity: Quantity) -> bool {
        self.0.contains_key(&quantity)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&mut self, other: MeasurementMap) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Quantity, Option<f64>)> + '_ {
        self.0.iter().map(|(q, v)| (*q, *v))
    }
}

impl FromIterator<(Quantity, Option<f64>)> for MeasurementMap {
    fn from_iter<I: IntoIterator<Item = (Quantity, Option<f64>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
