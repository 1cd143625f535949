//! In-memory CM-1 station
//!
//! Holds a sparse holding-register image and answers reads and writes the
//! way the controller would. Failures can be scripted per call or made
//! permanent, and every request is counted, so the same type drives the
//! `--simulate` mode and the poll controller tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use cm1_comlink::bytes::{f32_to_regs, i16_to_reg, u32_to_regs};
use cm1_comlink::{RegisterWindow, Result, Transport, TransportError};
use cm1_registers::{RegisterMap, StationClock};
use tracing::debug;

/// Rain block offset inside the main window
const RAIN_OFFSET: u16 = 42;
const LIGHTNING_OFFSET: u16 = 80;

/// Simulated station register image
#[derive(Debug, Clone)]
pub struct SimulatedStation {
    map: RegisterMap,
    registers: HashMap<u16, u16>,
    scripted_failures: VecDeque<TransportError>,
    permanent_failure: Option<TransportError>,
    reads: usize,
    writes: usize,
}

impl SimulatedStation {
    /// Station with every register reading zero
    pub fn new(map: RegisterMap) -> Self {
        Self {
            map,
            registers: HashMap::new(),
            scripted_failures: VecDeque::new(),
            permanent_failure: None,
            reads: 0,
            writes: 0,
        }
    }

    /// Station reporting a plausible mild day, lightning sensor unavailable
    pub fn with_default_image(map: RegisterMap) -> Self {
        let mut station = Self::new(map);
        let system = station.map.system.start;
        let main = station.map.main.window.start;

        // product id, firmware, serial number
        station.set_registers(system, &[120, 214]);
        station.set_registers(system + 2, &u32_to_regs(10_402));
        if let Some(clock) = Utc
            .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .and_then(|t| StationClock::new(t).ok())
        {
            station.set_clock(&clock);
        }
        station.set_power(12.85, 18.2, 3);

        station.set_registers(main, &[0, 35, 2250, 32, 2210, 30, 2190, 61, 2305]);
        station.set_registers(main + 20, &[0, 215, 640, 10132, i16_to_reg(-3), 214]);
        station.set_registers(main + 40, &[215, 215]);
        station.set_rain(120, 0);
        station.set_registers(main + 44, &f32_to_regs(1.5));
        station.set_registers(main + 46, &f32_to_regs(0.0));
        station.set_registers(main + 48, &[145, 172]);
        station.set_register(main + LIGHTNING_OFFSET, 0x0080);
        station
    }

    pub fn set_register(&mut self, address: u16, value: u16) {
        self.registers.insert(address, value);
    }

    pub fn set_registers(&mut self, start: u16, values: &[u16]) {
        for (i, value) in values.iter().enumerate() {
            self.registers.insert(start.wrapping_add(i as u16), *value);
        }
    }

    pub fn register(&self, address: u16) -> u16 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    /// Rain day-total and rate counters, in bucket tips
    pub fn set_rain(&mut self, day_total: u16, rate: u16) {
        let start = self.map.main.window.start + RAIN_OFFSET;
        self.set_registers(start, &[day_total, rate]);
    }

    pub fn set_power(&mut self, battery_volts: f64, solar_volts: f64, charger: u16) {
        let start = self.map.power.window.start;
        let millivolts = |v: f64| (v * 1000.0).round() as u16;
        self.set_registers(start, &[millivolts(battery_volts), millivolts(solar_volts), charger]);
    }

    pub fn set_clock(&mut self, clock: &StationClock) {
        self.set_registers(self.map.clock.start, &clock.to_registers());
    }

    /// Fail the next request with `err`; queued failures are consumed in order
    pub fn fail_next(&mut self, err: TransportError) {
        self.scripted_failures.push_back(err);
    }

    /// Fail every request with `err` until [`recover`](Self::recover)
    pub fn fail_always(&mut self, err: TransportError) {
        self.permanent_failure = Some(err);
    }

    pub fn recover(&mut self) {
        self.scripted_failures.clear();
        self.permanent_failure = None;
    }

    /// Read requests received, failed ones included
    pub fn read_count(&self) -> usize {
        self.reads
    }

    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn injected_failure(&mut self) -> Option<TransportError> {
        self.scripted_failures
            .pop_front()
            .or_else(|| self.permanent_failure.clone())
    }
}

fn check_range(start: u16, count: usize) -> Result<()> {
    if count == 0 || usize::from(start) + count > 0x1_0000 {
        return Err(TransportError::exception(0x02));
    }
    Ok(())
}

#[async_trait]
impl Transport for SimulatedStation {
    async fn read_registers(&mut self, start_address: u16, count: u16) -> Result<RegisterWindow> {
        self.reads += 1;
        if let Some(err) = self.injected_failure() {
            debug!("Simulated read {}+{} failing: {}", start_address, count, err);
            return Err(err);
        }
        check_range(start_address, usize::from(count))?;

        let words = (0..count)
            .map(|i| self.register(start_address.wrapping_add(i)))
            .collect();
        RegisterWindow::from_response(start_address, count, words)
    }

    async fn write_registers(&mut self, start_address: u16, words: &[u16]) -> Result<()> {
        self.writes += 1;
        if let Some(err) = self.injected_failure() {
            debug!("Simulated write at {} failing: {}", start_address, err);
            return Err(err);
        }
        check_range(start_address, words.len())?;
        self.set_registers(start_address, words);
        Ok(())
    }

    fn name(&self) -> &str {
        "simulator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_back_written_registers() {
        let mut station = SimulatedStation::new(RegisterMap::default());
        station.write_registers(104, &[1, 2, 3, 4]).await.unwrap();
        let window = station.read_registers(103, 6).await.unwrap();
        assert_eq!(window.words(), &[0, 1, 2, 3, 4, 0]);
        assert_eq!(station.read_count(), 1);
        assert_eq!(station.write_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_then_permanent_failures() {
        let mut station = SimulatedStation::new(RegisterMap::default());
        station.fail_next(TransportError::timeout("first"));
        station.fail_always(TransportError::io("unplugged"));

        let first = station.read_registers(200, 1).await.unwrap_err();
        assert_eq!(first, TransportError::timeout("first"));
        let second = station.read_registers(200, 1).await.unwrap_err();
        assert_eq!(second, TransportError::io("unplugged"));

        station.recover();
        assert!(station.read_registers(200, 1).await.is_ok());
        assert_eq!(station.read_count(), 3);
    }

    #[tokio::test]
    async fn test_out_of_range_is_illegal_address() {
        let mut station = SimulatedStation::new(RegisterMap::default());
        let err = station.read_registers(65_530, 10).await.unwrap_err();
        assert_eq!(err, TransportError::exception(0x02));
    }

    #[test]
    fn test_default_image_layout() {
        let station = SimulatedStation::with_default_image(RegisterMap::default());
        assert_eq!(station.register(108), 12850);
        assert_eq!(station.register(242), 120);
        assert_eq!(station.register(280), 0x0080);
        let clock = StationClock::from_registers(&[
            station.register(104),
            station.register(105),
            station.register(106),
            station.register(107),
        ])
        .unwrap();
        assert_eq!(clock.to_string(), "2024-06-01 12:00:00 UTC");
    }
}
