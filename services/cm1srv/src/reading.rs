//! Reading records handed to the host
//!
//! A reading is a flat `label -> value` map plus a capture timestamp and the
//! unit-system tag. Values stay `Option<f64>` so "no reading" serialises as
//! JSON `null` and never turns into zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cm1_registers::{MeasurementMap, Quantity};
use serde::Serialize;

/// Unit system of every reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitSystem {
    /// m/s wind, mm rain, degC, hPa
    #[serde(rename = "METRICWX")]
    MetricWx,
}

/// Mapping from measurement quantities to reading labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorLabels {
    labels: BTreeMap<String, Quantity>,
}

impl SensorLabels {
    /// `labels` maps reading label to quantity
    pub fn new(labels: BTreeMap<String, Quantity>) -> Self {
        Self { labels }
    }

    pub fn is_identity(&self) -> bool {
        self.labels.is_empty()
    }

    /// Quantities named by the map appear under their labels, every other
    /// quantity under its own name. A label wins over a quantity name it
    /// shadows.
    fn apply(&self, measurements: &MeasurementMap) -> BTreeMap<String, Option<f64>> {
        let mut values: BTreeMap<String, Option<f64>> = measurements
            .iter()
            .filter(|(quantity, _)| !self.labels.values().any(|q| q == quantity))
            .map(|(quantity, value)| (quantity.as_str().to_string(), value))
            .collect();

        for (label, quantity) in &self.labels {
            if let Some(value) = measurements.get(*quantity) {
                values.insert(label.clone(), value);
            }
        }
        values
    }
}

/// One poll cycle as seen by the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Unix seconds at read completion, rounded
    pub date_time: i64,
    pub us_units: UnitSystem,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl Reading {
    pub fn new(
        captured_at: DateTime<Utc>,
        measurements: &MeasurementMap,
        labels: &SensorLabels,
    ) -> Self {
        Self {
            date_time: round_to_seconds(captured_at),
            us_units: UnitSystem::MetricWx,
            values: labels.apply(measurements),
        }
    }

    /// Value under `label`; `None` both for a missing label and "no reading"
    pub fn value(&self, label: &str) -> Option<f64> {
        self.values.get(label).copied().flatten()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.values.contains_key(label)
    }
}

fn round_to_seconds(instant: DateTime<Utc>) -> i64 {
    let seconds = instant.timestamp();
    if instant.timestamp_subsec_millis() >= 500 {
        seconds + 1
    } else {
        seconds
    }
}
