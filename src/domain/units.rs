//! Conversions from the ledger's raw string fields into display values.
//!
//! The ledger reports amounts in base units (wei) and block times as Unix epoch
//! seconds, both encoded as strings. Malformed values never fail a request: the
//! lenient helpers substitute a zero value and log the [`ConversionFallback`].

use super::errors::ConversionFallback;
use chrono::{DateTime, Utc};

/// Fractional digits of every display amount.
pub const DISPLAY_PRECISION: usize = 18;

/// Converts a base-unit amount into a display amount with [`DISPLAY_PRECISION`]
/// fractional digits.
///
/// Plain digit strings are shifted exactly. Other inputs that parse as a float
/// (signs, exponents, fractions) go through `f64` and lose precision beyond what
/// 64-bit floats can represent.
pub fn to_display_amount(base_units: &str, decimals: u32) -> Result<String, ConversionFallback> {
    let raw = base_units.trim();
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(shift_digits(raw, decimals as usize));
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(format!(
            "{:.prec$}",
            value / 10f64.powi(decimals as i32),
            prec = DISPLAY_PRECISION
        )),
        _ => Err(ConversionFallback::Amount(base_units.to_string())),
    }
}

/// Same as [`to_display_amount`] but substitutes zero for malformed input.
pub fn to_display_amount_lossy(base_units: &str, decimals: u32) -> String {
    to_display_amount(base_units, decimals).unwrap_or_else(|fallback| {
        tracing::warn!("{}, using zero", fallback);
        zero_amount()
    })
}

pub fn zero_amount() -> String {
    format!("0.{}", "0".repeat(DISPLAY_PRECISION))
}

/// Parses a Unix epoch seconds field into an absolute instant.
pub fn parse_epoch(epoch: &str) -> Result<DateTime<Utc>, ConversionFallback> {
    epoch
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .ok_or_else(|| ConversionFallback::Timestamp(epoch.to_string()))
}

/// Same as [`parse_epoch`] but falls back to the Unix epoch.
pub fn parse_epoch_lossy(epoch: &str) -> DateTime<Utc> {
    parse_epoch(epoch).unwrap_or_else(|fallback| {
        tracing::warn!("{}, using epoch zero", fallback);
        DateTime::<Utc>::UNIX_EPOCH
    })
}

fn shift_digits(digits: &str, decimals: usize) -> String {
    let digits = digits.trim_start_matches('0');
    let (integer, fraction) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };

    let mut fraction = fraction;
    if fraction.len() > DISPLAY_PRECISION {
        fraction.truncate(DISPLAY_PRECISION);
    } else {
        fraction.push_str(&"0".repeat(DISPLAY_PRECISION - fraction.len()));
    }
    format!("{integer}.{fraction}")
}
