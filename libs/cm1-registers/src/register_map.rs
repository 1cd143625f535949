//! Station register map
//!
//! Static table of which register windows are read and where each
//! [`SensorBlock`] sits inside them. Block placement inside a window is fixed
//! per station model; the window start addresses can be moved per deployment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::blocks::SensorBlock;
use crate::error::{DecodeError, Result};

/// Largest register count a single Modbus read may request
pub const MAX_READ_REGISTERS: u16 = 125;

/// Registers holding the packed time and date
pub const CLOCK_REGISTERS: u16 = 4;

/// Registers holding the system parameter block
pub const SYSTEM_REGISTERS: u16 = 11;

/// Contiguous run of words inside a window, relative to the window start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSlice {
    pub offset: usize,
    pub len: usize,
}

impl RegisterSlice {
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Placement of one block inside a window
///
/// Most blocks occupy one slice. A block split across the window (the
/// calculated values) lists its slices in decode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    pub block: SensorBlock,
    pub slices: &'static [RegisterSlice],
}

impl BlockLayout {
    /// Highest window offset (exclusive) the layout touches
    pub fn required_len(&self) -> usize {
        self.slices.iter().map(RegisterSlice::end).max().unwrap_or(0)
    }

    pub fn word_count(&self) -> usize {
        self.slices.iter().map(|s| s.len).sum()
    }
}

/// Start address and length of one read request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub start: u16,
    pub count: u16,
}

impl WindowSpec {
    pub const fn new(start: u16, count: u16) -> Self {
        Self { start, count }
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.start, self.count)
    }
}

/// Window read every poll cycle, with the blocks it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolledWindow {
    pub name: &'static str,
    pub window: WindowSpec,
    pub blocks: &'static [BlockLayout],
}

/// Station hardware model selecting the register layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StationModel {
    #[default]
    #[serde(rename = "MS-120")]
    Ms120,
}

impl StationModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationModel::Ms120 => "MS-120",
        }
    }
}

impl fmt::Display for StationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StationModel {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MS-120" | "MS120" => Ok(StationModel::Ms120),
            other => Err(DecodeError::invalid_map(format!(
                "unknown station model '{other}'"
            ))),
        }
    }
}

const POWER_BLOCKS: &[BlockLayout] = &[BlockLayout {
    block: SensorBlock::Power,
    slices: &[RegisterSlice::new(0, 3)],
}];

const CM1_MAIN_BLOCKS: &[BlockLayout] = &[
    BlockLayout {
        block: SensorBlock::Wind,
        slices: &[RegisterSlice::new(0, 9)],
    },
    BlockLayout {
        block: SensorBlock::TemperatureHumidityPressure,
        slices: &[RegisterSlice::new(20, 6)],
    },
    BlockLayout {
        block: SensorBlock::Rain,
        slices: &[RegisterSlice::new(42, 2)],
    },
    BlockLayout {
        block: SensorBlock::Analog1,
        slices: &[RegisterSlice::new(44, 2)],
    },
    BlockLayout {
        block: SensorBlock::Analog2,
        slices: &[RegisterSlice::new(46, 2)],
    },
    BlockLayout {
        block: SensorBlock::Calculated,
        slices: &[RegisterSlice::new(40, 2), RegisterSlice::new(48, 2)],
    },
    BlockLayout {
        block: SensorBlock::Lightning,
        slices: &[RegisterSlice::new(80, 12)],
    },
];

/// Optional per-deployment start addresses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterOverrides {
    pub system_start: Option<u16>,
    pub clock_start: Option<u16>,
    pub power_start: Option<u16>,
    pub main_start: Option<u16>,
}

/// Complete register map of one station
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterMap {
    pub model: StationModel,
    pub system: WindowSpec,
    pub clock: WindowSpec,
    pub power: PolledWindow,
    pub main: PolledWindow,
}

impl RegisterMap {
    pub fn for_model(model: StationModel) -> Self {
        match model {
            StationModel::Ms120 => Self {
                model,
                system: WindowSpec::new(100, SYSTEM_REGISTERS),
                clock: WindowSpec::new(104, CLOCK_REGISTERS),
                power: PolledWindow {
                    name: "power",
                    window: WindowSpec::new(108, 3),
                    blocks: POWER_BLOCKS,
                },
                main: PolledWindow {
                    name: "main",
                    window: WindowSpec::new(200, 92),
                    blocks: CM1_MAIN_BLOCKS,
                },
            },
        }
    }

    /// Move window start addresses; block offsets within windows are kept
    pub fn with_overrides(mut self, overrides: &RegisterOverrides) -> Self {
        if let Some(start) = overrides.system_start {
            self.system.start = start;
        }
        if let Some(start) = overrides.clock_start {
            self.clock.start = start;
        }
        if let Some(start) = overrides.power_start {
            self.power.window.start = start;
        }
        if let Some(start) = overrides.main_start {
            self.main.window.start = start;
        }
        self
    }

    /// Windows read on every poll cycle, in request order
    pub fn polled_windows(&self) -> [&PolledWindow; 2] {
        [&self.power, &self.main]
    }

    /// Reject maps that could never be read or decoded
    pub fn validate(&self) -> Result<()> {
        check_window("system", self.system)?;
        check_window("clock", self.clock)?;
        if self.system.count != SYSTEM_REGISTERS {
            return Err(DecodeError::invalid_map(format!(
                "system window must span {SYSTEM_REGISTERS} registers, got {}",
                self.system.count
            )));
        }
        if self.clock.count != CLOCK_REGISTERS {
            return Err(DecodeError::invalid_map(format!(
                "clock window must span {CLOCK_REGISTERS} registers, got {}",
                self.clock.count
            )));
        }

        for polled in self.polled_windows() {
            check_window(polled.name, polled.window)?;
            for layout in polled.blocks {
                if layout.word_count() != layout.block.word_count() {
                    return Err(DecodeError::invalid_map(format!(
                        "{} block spans {} registers, decoder expects {}",
                        layout.block,
                        layout.word_count(),
                        layout.block.word_count()
                    )));
                }
                if layout.required_len() > usize::from(polled.window.count) {
                    return Err(DecodeError::invalid_map(format!(
                        "{} block reaches offset {}, {} window holds {}",
                        layout.block,
                        layout.required_len(),
                        polled.name,
                        polled.window.count
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::for_model(StationModel::default())
    }
}

fn check_window(name: &str, window: WindowSpec) -> Result<()> {
    if window.count == 0 || window.count > MAX_READ_REGISTERS {
        return Err(DecodeError::invalid_map(format!(
            "{name} window count {} outside 1..={MAX_READ_REGISTERS}",
            window.count
        )));
    }
    if u32::from(window.start) + u32::from(window.count) > 0x1_0000 {
        return Err(DecodeError::invalid_map(format!(
            "{name} window {window} overflows the register address space"
        )));
    }
    Ok(())
}
