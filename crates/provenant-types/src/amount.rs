//! Decimal amount conversion at the ledger's fixed 10^18 scale.
//!
//! User-entered prices and balances are decimal text ("0.5"); the ledger
//! works in integer base units. Conversion truncates toward zero past 18
//! fractional digits.

use primitive_types::U256;
use thiserror::Error;

/// Number of decimal places in the ledger's base unit.
pub const UNIT_DECIMALS: usize = 18;

/// Errors from parsing a decimal amount.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount must be a non-negative decimal number")]
    Malformed,

    #[error("amount is too large")]
    Overflow,
}

/// Parse decimal text into base units (10^18 scale), truncating toward zero.
///
/// Accepts `"1"`, `"0.5"`, `".5"`, `"1."`. Rejects signs, exponents, and
/// anything that is not plain decimal digits around at most one dot.
pub fn parse_units(text: &str) -> Result<U256, AmountError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountError::Empty);
    }

    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AmountError::Malformed);
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AmountError::Malformed);
    }

    let scale = U256::exp10(UNIT_DECIMALS);
    let int_units = if int_part.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(int_part)
            .map_err(|_| AmountError::Overflow)?
            .checked_mul(scale)
            .ok_or(AmountError::Overflow)?
    };

    // Truncate fractional digits beyond the scale.
    let frac = &frac_part[..frac_part.len().min(UNIT_DECIMALS)];
    let frac_units = if frac.is_empty() {
        U256::zero()
    } else {
        let digits = U256::from_dec_str(frac).map_err(|_| AmountError::Overflow)?;
        digits * U256::exp10(UNIT_DECIMALS - frac.len())
    };

    int_units
        .checked_add(frac_units)
        .ok_or(AmountError::Overflow)
}

/// Format base units back to decimal text, trimming trailing zeros.
pub fn format_units(units: U256) -> String {
    let scale = U256::exp10(UNIT_DECIMALS);
    let int_part = units / scale;
    let frac_part = units % scale;
    if frac_part.is_zero() {
        return int_part.to_string();
    }
    let frac = format!("{frac_part:0>width$}", width = UNIT_DECIMALS);
    let frac = frac.trim_end_matches('0');
    format!("{int_part}.{frac}")
}

/// Format base units to decimal text with a fixed number of decimal places.
pub fn format_units_dp(units: U256, places: usize) -> String {
    let scale = U256::exp10(UNIT_DECIMALS);
    let int_part = units / scale;
    let frac_part = units % scale;
    if places == 0 {
        return int_part.to_string();
    }
    let frac = format!("{frac_part:0>width$}", width = UNIT_DECIMALS);
    format!("{int_part}.{}", &frac[..places.min(UNIT_DECIMALS)])
}
