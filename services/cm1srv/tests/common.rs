//! Test Common Utilities
//!
//! Shared helpers for the cm1srv integration tests

#![allow(dead_code)]

use std::time::Duration;

use cm1_registers::RegisterMap;
use cm1srv::{PollController, PollSettings, RetryPolicy, SimulatedStation};

pub const RETRY_WAIT: Duration = Duration::from_secs(5);
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Settings with a small attempt bound and the default bucket size
pub fn settings(max_tries: u32) -> PollSettings {
    PollSettings {
        poll_interval: POLL_INTERVAL,
        retry: RetryPolicy {
            max_tries,
            retry_wait: RETRY_WAIT,
        },
        ..PollSettings::default()
    }
}

/// Station with the default register image
pub fn station() -> SimulatedStation {
    SimulatedStation::with_default_image(RegisterMap::default())
}

pub fn controller(station: SimulatedStation, max_tries: u32) -> PollController<SimulatedStation> {
    PollController::new(station, RegisterMap::default(), settings(max_tries))
        .expect("default map and settings are valid")
}

pub fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("value present");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
