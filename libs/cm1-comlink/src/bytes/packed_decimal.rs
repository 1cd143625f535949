//! Decimal-packed register fields
//!
//! The CM-1 stores calendar values as plain decimal numbers whose digits are
//! read in groups of two: `161231` is year 16, month 12, day 31, and `235959`
//! is 23:59:59. The number is carried in a register pair (`hi * 65536 + lo`).
//! Fields are extracted with integer division, never by nibble manipulation.

use super::conversions::{regs_to_u32, u32_to_regs};

/// Largest value that fits in three two-digit fields
pub const MAX_PACKED_DECIMAL: u32 = 999_999;

/// Split a decimal-packed value into its three two-digit fields
///
/// Returns `None` when the value has more than six decimal digits.
pub fn unpack_decimal_fields(value: u32) -> Option<[u32; 3]> {
    if value > MAX_PACKED_DECIMAL {
        return None;
    }
    Some([value / 10_000, value / 100 % 100, value % 100])
}

/// Pack three two-digit fields into one decimal value
///
/// Returns `None` when any field is above 99.
pub fn pack_decimal_fields(fields: [u32; 3]) -> Option<u32> {
    if fields.iter().any(|&f| f > 99) {
        return None;
    }
    Some(fields[0] * 10_000 + fields[1] * 100 + fields[2])
}

/// Read a decimal-packed value from a `[hi, lo]` register pair
pub fn regs_to_packed_fields(hi: u16, lo: u16) -> Option<[u32; 3]> {
    unpack_decimal_fields(regs_to_u32(hi, lo))
}

/// Encode three two-digit fields as a `[hi, lo]` register pair
pub fn packed_fields_to_regs(fields: [u32; 3]) -> Option<[u16; 2]> {
    pack_decimal_fields(fields).map(u32_to_regs)
}
