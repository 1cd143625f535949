//! Numeric type conversions for CM-1 holding registers
//!
//! Provides functions for converting between:
//! - Single registers (u16) ↔ signed values (i16)
//! - Register pairs ([u16; 2]) ↔ u32 and IEEE-754 f32
//! - Raw registers → scaled decimal values, with sentinel handling

// ============================================================================
// Single register conversions
// ============================================================================

/// Reinterpret a register as a two's-complement signed value
///
/// `v >= 2^15` maps to `v - 2^16`.
pub fn reg_to_i16(reg: u16) -> i16 {
    reg as i16
}

/// Convert a signed value back into its register representation
pub fn i16_to_reg(value: i16) -> u16 {
    value as u16
}

// ============================================================================
// Register pair conversions (high word first)
// ============================================================================

/// Combine two registers into an unsigned 32-bit value: `(hi << 16) + lo`
pub fn regs_to_u32(hi: u16, lo: u16) -> u32 {
    (u32::from(hi) << 16) | u32::from(lo)
}

/// Split an unsigned 32-bit value into `[hi, lo]` registers
pub fn u32_to_regs(value: u32) -> [u16; 2] {
    [(value >> 16) as u16, (value & 0xFFFF) as u16]
}

/// Reinterpret two registers as a big-endian IEEE-754 single
///
/// `hi` supplies the high-order 16 bits (sign, exponent and the top of the
/// mantissa), `lo` the low-order 16 bits.
pub fn regs_to_f32(hi: u16, lo: u16) -> f32 {
    let [a, b] = hi.to_be_bytes();
    let [c, d] = lo.to_be_bytes();
    f32::from_be_bytes([a, b, c, d])
}

/// Encode an IEEE-754 single as `[hi, lo]` registers, bit exact
pub fn f32_to_regs(value: f32) -> [u16; 2] {
    let [a, b, c, d] = value.to_be_bytes();
    [u16::from_be_bytes([a, b]), u16::from_be_bytes([c, d])]
}

// ============================================================================
// Scaled decimal conversions
// ============================================================================

/// Signed register value multiplied by a fixed per-field multiplier
pub fn scale_signed(reg: u16, multiplier: f64) -> f64 {
    f64::from(reg_to_i16(reg)) * multiplier
}

/// Unsigned register value multiplied by a fixed per-field multiplier
pub fn scale_unsigned(reg: u16, multiplier: f64) -> f64 {
    f64::from(reg) * multiplier
}

/// Signed scaled value with a "no reading" sentinel
///
/// The sentinel is compared against the signed raw value before any scaling,
/// so the result does not depend on the multiplier.
pub fn scale_with_sentinel(reg: u16, multiplier: f64, sentinel: i16) -> Option<f64> {
    let raw = reg_to_i16(reg);
    if raw == sentinel {
        return None;
    }
    Some(f64::from(raw) * multiplier)
}
