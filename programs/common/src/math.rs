//! Checked minor-unit arithmetic

use crate::error::{EngineError, EngineResult};

/// Basis points scale (10,000 bps = 100%)
pub const BPS_SCALE: u64 = 10_000;

/// Scale a whole-token quantity to minor units, e.g. 8000 with 9 decimals
/// becomes 8_000_000_000_000.
pub fn to_minor_units(whole: u64, decimals: u8) -> EngineResult<u64> {
    10u64
        .checked_pow(decimals as u32)
        .and_then(|scale| whole.checked_mul(scale))
        .ok_or(EngineError::MathOverflow)
}

#[inline]
pub fn checked_add(a: u64, b: u64) -> EngineResult<u64> {
    a.checked_add(b).ok_or(EngineError::MathOverflow)
}

#[inline]
pub fn checked_sub(a: u64, b: u64) -> EngineResult<u64> {
    a.checked_sub(b).ok_or(EngineError::MathOverflow)
}
