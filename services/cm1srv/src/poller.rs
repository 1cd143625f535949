//! Poll controller
//!
//! Drives one station: reads the current-value windows, decodes them, keeps
//! the rain accumulator and retries failed operations under a bounded
//! policy. One controller owns one transport and one [`PollState`]; requests
//! are issued strictly one at a time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use cm1_comlink::Transport;
use cm1_registers::{
    decode_polled, MeasurementMap, Quantity, RegisterMap, StationClock, SystemParameters,
};
use errors::StationErrorTrait;
use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Cm1Config;
use crate::error::{PollError, Result};
use crate::reading::{Reading, SensorLabels};

/// Attempt bound and back-off for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_tries: u32,
    /// Pause between a failed attempt and the next one
    pub retry_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 6,
            retry_wait: Duration::from_secs(5),
        }
    }
}

/// Controller settings that are not part of the register map
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
    /// Rain depth per bucket tip, mm
    pub bucket_size: f64,
    pub labels: SensorLabels,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            bucket_size: 0.2,
            labels: SensorLabels::default(),
        }
    }
}

impl From<&Cm1Config> for PollSettings {
    fn from(config: &Cm1Config) -> Self {
        Self {
            poll_interval: config.polling.poll_interval(),
            retry: RetryPolicy {
                max_tries: config.polling.max_tries,
                retry_wait: config.polling.retry_wait(),
            },
            bucket_size: config.polling.bucket_size,
            labels: SensorLabels::new(config.sensor_map.clone()),
        }
    }
}

/// Mutable state owned by a single controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    last_rain_total: Option<u16>,
    retries: u32,
    attempts: u64,
    cycles: u64,
    outages: u64,
}

impl PollState {
    /// Turn a day-total counter into incremental tips since the last cycle
    ///
    /// The first cycle has no baseline. A counter below the previous value
    /// means the station reset it at day rollover, so the whole count is new.
    pub fn rain_delta(&mut self, day_total: u16) -> Option<u16> {
        let delta = self.last_rain_total.map(|previous| {
            if day_total >= previous {
                day_total - previous
            } else {
                day_total
            }
        });
        self.last_rain_total = Some(day_total);
        delta
    }

    pub fn last_rain_total(&self) -> Option<u16> {
        self.last_rain_total
    }

    /// Failed attempts of the operation in progress (or the last one)
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Attempts issued over the controller lifetime
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Readings delivered by [`PollController::run`]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs ended by exhausted retries and resumed afterwards
    pub fn outages(&self) -> u64 {
        self.outages
    }
}

/// Polls one station through a [`Transport`]
pub struct PollController<T: Transport> {
    transport: T,
    map: RegisterMap,
    settings: PollSettings,
    state: PollState,
}

impl<T: Transport> PollController<T> {
    /// Fails with [`PollError::Configuration`] for an unusable map or settings
    pub fn new(transport: T, map: RegisterMap, settings: PollSettings) -> Result<Self> {
        map.validate()
            .map_err(|e| PollError::config(e.to_string()))?;
        if !settings.bucket_size.is_finite() || settings.bucket_size <= 0.0 {
            return Err(PollError::config(format!(
                "bucket size must be a positive number, got {}",
                settings.bucket_size
            )));
        }
        if settings.retry.max_tries == 0 {
            return Err(PollError::config("max_tries must be at least 1"));
        }

        Ok(Self {
            transport,
            map,
            settings,
            state: PollState::default(),
        })
    }

    pub fn from_config(transport: T, config: &Cm1Config) -> Result<Self> {
        Self::new(transport, config.register_map()?, PollSettings::from(config))
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// One poll cycle, no retry
    pub async fn poll_once(&mut self) -> Result<Reading> {
        let mut measurements = MeasurementMap::new();
        for polled in [self.map.power, self.map.main] {
            let window = self
                .transport
                .read_registers(polled.window.start, polled.window.count)
                .await?;
            let decoded = decode_polled(&polled, &window)?;
            debug!(
                "Decoded {} values from {} window {}",
                decoded.len(),
                polled.name,
                polled.window
            );
            measurements.merge(decoded);
        }

        let bucket = self.settings.bucket_size;
        if let Some(total) = measurements.value(Quantity::RainDayTotal) {
            let delta = self.state.rain_delta(total as u16);
            measurements.insert(Quantity::Rain, delta.map(|tips| f64::from(tips) * bucket));
        } else {
            measurements.insert(Quantity::Rain, None);
        }
        if let Some(rate) = measurements.value(Quantity::RainRate) {
            measurements.insert(Quantity::RainRate, Some(rate * bucket));
        }

        Ok(Reading::new(Utc::now(), &measurements, &self.settings.labels))
    }

    /// [`poll_once`](Self::poll_once) under the retry policy
    pub async fn poll_with_retry(&mut self) -> Result<Reading> {
        self.poll_with_retry_until(&CancellationToken::new()).await
    }

    /// [`poll_with_retry`](Self::poll_with_retry) that gives up with
    /// [`PollError::Cancelled`] when `cancel` fires during a back-off
    pub async fn poll_with_retry_until(&mut self, cancel: &CancellationToken) -> Result<Reading> {
        self.with_retry("poll", cancel, |c| c.poll_once().boxed()).await
    }

    /// Read and decode the system parameter block, no retry
    pub async fn read_system_parameters(&mut self) -> Result<SystemParameters> {
        let window = self
            .transport
            .read_registers(self.map.system.start, self.map.system.count)
            .await?;
        Ok(SystemParameters::decode(&window)?)
    }

    /// Startup identity read; each parameter is logged on success
    pub async fn system_parameters_with_retry(&mut self) -> Result<SystemParameters> {
        let never = CancellationToken::new();
        let params = self
            .with_retry("read system parameters", &never, |c| {
                c.read_system_parameters().boxed()
            })
            .await?;
        for (name, value) in params.fields() {
            info!("{}: {}", name, value);
        }
        Ok(params)
    }

    /// Read the station clock once
    pub async fn read_clock(&mut self) -> Result<StationClock> {
        let window = self
            .transport
            .read_registers(self.map.clock.start, self.map.clock.count)
            .await?;
        let clock = StationClock::from_registers(window.words())?;
        debug!(
            "Station clock: date.time {:06}.{:06} ({})",
            clock.packed_date(),
            clock.packed_time(),
            clock
        );
        Ok(clock)
    }

    /// Set the station clock once; sub-second precision is dropped
    pub async fn write_clock(&mut self, instant: DateTime<Utc>) -> Result<StationClock> {
        let clock = StationClock::new(instant)?;
        self.transport
            .write_registers(self.map.clock.start, &clock.to_registers())
            .await?;
        info!("Station clock set to {}", clock);
        Ok(clock)
    }

    /// Poll until cancelled, handing every reading to `sink`
    ///
    /// Cancellation is honoured before each cycle, during the inter-poll sleep
    /// and during retry back-off, never while a request is in flight.
    /// Exhausted retries end the loop with an error.
    pub async fn run<F>(&mut self, cancel: CancellationToken, mut sink: F) -> Result<()>
    where
        F: FnMut(Reading) + Send,
    {
        info!(
            "Polling {} every {:?}",
            self.transport.name(),
            self.settings.poll_interval
        );

        while !cancel.is_cancelled() {
            let reading = match self.poll_with_retry_until(&cancel).await {
                Ok(reading) => reading,
                Err(PollError::Cancelled(_)) => break,
                Err(err) => return Err(err),
            };
            self.state.cycles += 1;
            sink(reading);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {},
            }
        }

        info!("Polling stopped after {} cycles", self.state.cycles);
        Ok(())
    }

    /// [`run`](Self::run) that outlives station outages
    ///
    /// Exhausted retries cost one poll cycle: the failure is logged, the
    /// controller waits one poll interval and starts polling again. Returns
    /// `Ok` once cancelled, or the first error that is not an outage.
    pub async fn run_until_cancelled<F>(
        &mut self,
        cancel: CancellationToken,
        mut sink: F,
    ) -> Result<()>
    where
        F: FnMut(Reading) + Send,
    {
        loop {
            match self.run(cancel.clone(), &mut sink).await {
                Ok(()) => return Ok(()),
                Err(err @ PollError::ExhaustedRetries { .. }) => {
                    self.state.outages += 1;
                    error!(
                        "Station unavailable ({}): {}; resuming in {:?}",
                        err.error_code(),
                        err,
                        self.settings.poll_interval
                    );
                },
                Err(err) => return Err(err),
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.settings.poll_interval) => {},
            }
        }
    }

    async fn with_retry<R, F>(
        &mut self,
        operation: &'static str,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<R>
    where
        F: for<'a> FnMut(&'a mut Self) -> BoxFuture<'a, Result<R>>,
    {
        let policy = self.settings.retry;
        let mut tries = 0;
        self.state.retries = 0;

        loop {
            tries += 1;
            self.state.attempts += 1;

            let err = match attempt(self).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                error!("{} failed ({}): {}", operation, err.error_code(), err);
                return Err(err);
            }

            self.state.retries = tries;
            if tries >= policy.max_tries {
                error!(
                    "{} failed after {} attempts, giving up: {}",
                    operation, tries, err
                );
                return Err(PollError::ExhaustedRetries {
                    operation,
                    attempts: tries,
                    source: Box::new(err),
                });
            }

            warn!(
                "{} attempt {}/{} failed: {}; retrying in {:?}",
                operation, tries, policy.max_tries, err, policy.retry_wait
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("{} cancelled during retry back-off", operation);
                    return Err(PollError::Cancelled(operation));
                },
                _ = tokio::time::sleep(policy.retry_wait) => {},
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SimulatedStation;
    use cm1_comlink::TransportError;
    use tracing_test::traced_test;

    #[test]
    fn test_rain_delta_sequence() {
        let mut state = PollState::default();
        assert_eq!(state.rain_delta(120), None);
        assert_eq!(state.rain_delta(125), Some(5));
        assert_eq!(state.rain_delta(125), Some(0));
        assert_eq!(state.rain_delta(3), Some(3));
        assert_eq!(state.last_rain_total(), Some(3));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Cm1Config::default();
        config.polling.max_tries = 3;
        config.polling.retry_wait_secs = 1;
        let settings = PollSettings::from(&config);
        assert_eq!(settings.retry.max_tries, 3);
        assert_eq!(settings.retry.retry_wait, Duration::from_secs(1));
        assert!(settings.labels.is_identity());
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_each_failed_attempt_is_logged() {
        let mut station = SimulatedStation::with_default_image(RegisterMap::default());
        station.fail_always(TransportError::timeout("no response"));
        let settings = PollSettings {
            retry: RetryPolicy {
                max_tries: 3,
                retry_wait: Duration::from_secs(1),
            },
            ..PollSettings::default()
        };
        let mut controller =
            PollController::new(station, RegisterMap::default(), settings).unwrap();

        assert!(controller.poll_with_retry().await.is_err());
        assert!(logs_contain("poll attempt 1/3 failed: Timeout: no response"));
        assert!(logs_contain("poll attempt 2/3 failed"));
        assert!(!logs_contain("poll attempt 3/3 failed"));
        assert!(logs_contain("poll failed after 3 attempts, giving up"));
    }

    #[tokio::test]
    async fn test_rain_baseline_carries_between_cycles() {
        let mut controller = PollController::new(
            SimulatedStation::with_default_image(RegisterMap::default()),
            RegisterMap::default(),
            PollSettings::default(),
        )
        .unwrap();
        controller.poll_once().await.unwrap();
        assert_eq!(controller.state().last_rain_total(), Some(120));

        controller.transport_mut().set_rain(121, 0);
        let reading = controller.poll_once().await.unwrap();
        let rain = reading.value("rain").unwrap();
        assert!((rain - 0.2).abs() < 1e-9);
    }
}
