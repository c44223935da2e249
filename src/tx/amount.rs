//! Decimal amount conversion between human readable strings and smallest units

use crate::error::{XchainError, XchainResult};

/// Largest decimal count a `u128` balance can represent meaningfully
const MAX_DECIMALS: u8 = 38;

/// Convert a decimal string such as `"1.5"` into smallest units.
///
/// Rejects negative values, signs, exponents, empty input and values with
/// more fractional digits than `decimals`.
pub fn parse_units(amount: &str, decimals: u8) -> XchainResult<u128> {
    let invalid = |reason: &str| XchainError::InvalidAmount {
        amount: amount.to_string(),
        reason: reason.to_string(),
    };

    if decimals > MAX_DECIMALS {
        return Err(invalid("asset declares too many decimals"));
    }

    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(invalid("amount is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("amount must not be negative"));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("amount has no digits"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid("amount must be a plain decimal number"));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid(&format!(
            "more than {} fractional digits",
            decimals
        )));
    }

    let scale = 10u128.pow(decimals as u32);
    let overflow = || invalid("amount overflows the balance type");

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| overflow())?
            .checked_mul(scale)
            .ok_or_else(overflow)?
    };

    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padding = 10u128.pow((decimals as usize - fraction.len()) as u32);
        fraction.parse::<u128>().map_err(|_| overflow())? * padding
    };

    whole_units.checked_add(fraction_units).ok_or_else(overflow)
}

/// Render smallest units as a decimal string, trimming trailing zeros
pub fn format_units(units: u128, decimals: u8) -> String {
    if decimals == 0 {
        return units.to_string();
    }
    let scale = 10u128.pow(decimals.min(MAX_DECIMALS) as u32);
    let whole = units / scale;
    let fraction = units % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
