//! Station clock codec
//!
//! The controller keeps its clock as two decimal-packed register pairs,
//! `HHMMSS` then `YYMMDD` (year offset from 2000). The clock is always
//! interpreted as UTC, for reads and writes alike.

use std::fmt;

use chrono::{
    DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeZone, Timelike, Utc,
};
use cm1_comlink::bytes::{packed_fields_to_regs, regs_to_packed_fields, regs_to_u32};

use crate::error::{DecodeError, Result};

const BASE_YEAR: i32 = 2000;
const LAST_YEAR: i32 = 2099;

/// Calendar instant held by the station, whole-second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StationClock(DateTime<Utc>);

impl StationClock {
    /// Truncate `instant` to whole seconds
    ///
    /// Fails for instants the two-digit year field cannot carry.
    pub fn new(instant: DateTime<Utc>) -> Result<Self> {
        if !(BASE_YEAR..=LAST_YEAR).contains(&instant.year()) {
            return Err(DecodeError::invalid_clock(format!(
                "year {} outside {BASE_YEAR}..={LAST_YEAR}",
                instant.year()
            )));
        }
        Ok(Self(instant.trunc_subsecs(0)))
    }

    /// Decode `[time_hi, time_lo, date_hi, date_lo]`
    pub fn from_registers(words: &[u16]) -> Result<Self> {
        let [thi, tlo, dhi, dlo] = *<&[u16; 4]>::try_from(words)
            .map_err(|_| DecodeError::malformed("clock", 4, words.len()))?;

        let time = regs_to_packed_fields(thi, tlo).ok_or_else(|| {
            let packed = regs_to_u32(thi, tlo);
            DecodeError::invalid_clock(format!("time {packed} has too many digits"))
        })?;
        let date = regs_to_packed_fields(dhi, dlo).ok_or_else(|| {
            let packed = regs_to_u32(dhi, dlo);
            DecodeError::invalid_clock(format!("date {packed} has too many digits"))
        })?;

        let [hour, minute, second] = time;
        let [year, month, day] = date;

        // Two-digit fields always fit in i32
        let date = NaiveDate::from_ymd_opt(BASE_YEAR + year as i32, month, day).ok_or_else(|| {
            DecodeError::invalid_clock(format!("no such date 20{year:02}-{month:02}-{day:02}"))
        })?;
        let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| {
            DecodeError::invalid_clock(format!("no such time {hour:02}:{minute:02}:{second:02}"))
        })?;

        Ok(Self(Utc.from_utc_datetime(&NaiveDateTime::new(date, time))))
    }

    /// Encode as `[time_hi, time_lo, date_hi, date_lo]`
    pub fn to_registers(&self) -> [u16; 4] {
        let [thi, tlo] = packed_fields_to_regs(self.time_fields()).unwrap_or_default();
        let [dhi, dlo] = packed_fields_to_regs(self.date_fields()).unwrap_or_default();
        [thi, tlo, dhi, dlo]
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    /// Packed `HHMMSS` value
    pub fn packed_time(&self) -> u32 {
        let [h, m, s] = self.time_fields();
        h * 10_000 + m * 100 + s
    }

    /// Packed `YYMMDD` value
    pub fn packed_date(&self) -> u32 {
        let [y, m, d] = self.date_fields();
        y * 10_000 + m * 100 + d
    }

    fn time_fields(&self) -> [u32; 3] {
        [self.0.hour(), self.0.minute(), self.0.second()]
    }

    fn date_fields(&self) -> [u32; 3] {
        // Year range is checked on construction
        let year = (self.0.year() - BASE_YEAR) as u32;
        [year, self.0.month(), self.0.day()]
    }
}

impl fmt::Display for StationClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}
