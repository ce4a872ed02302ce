//! Money helpers.
//!
//! Balances and transaction amounts are integer minor units (kobo). Clients send
//! major-unit decimals, which are converted once at the edge.

use crate::errors::{Error, Result};

/// Minor units in one major unit (kobo per naira)
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Converts a client-supplied major-unit amount to minor units, rounding to the
/// nearest minor unit.
///
/// Only non-finite and out-of-range values are rejected here; whether zero or a
/// negative amount is acceptable is decided by the operation using it.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn to_minor_units(amount: f64) -> Result<i64> {
    if !amount.is_finite() {
        return Err(Error::InvalidAmount {
            amount: amount.to_string(),
        });
    }
    let scaled = (amount * MINOR_UNITS_PER_MAJOR as f64).round();
    if scaled.abs() >= i64::MAX as f64 {
        return Err(Error::InvalidAmount {
            amount: amount.to_string(),
        });
    }
    Ok(scaled as i64)
}

/// Converts minor units back to a major-unit decimal for external APIs.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn to_major_units(minor: i64) -> f64 {
    minor as f64 / MINOR_UNITS_PER_MAJOR as f64
}

/// Formats minor units as a major-unit string with thousands separators,
/// e.g. `150_000` -> `"1,500.00"`.
#[must_use]
pub fn format_minor_units(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let magnitude = minor.unsigned_abs();
    let per_major = MINOR_UNITS_PER_MAJOR.unsigned_abs();
    let whole = (magnitude / per_major).to_string();
    let fraction = magnitude % per_major;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}{grouped}.{fraction:02}")
}

/// Rejects non-positive amounts with `InvalidAmount`.
pub(crate) fn ensure_positive(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(Error::InvalidAmount {
            amount: amount.to_string(),
        });
    }
    Ok(())
}
