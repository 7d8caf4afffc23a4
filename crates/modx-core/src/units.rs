//! Conversion between human decimal amounts and on-chain base units.
//!
//! Conversion to base units works on the decimal string so no precision is
//! lost at 18-decimal scale. Fractions longer than the token's decimals are
//! truncated, never rounded up.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::{CoreError, CoreResult};

/// Parse a human decimal string into base units, flooring to `decimals`.
pub fn to_base_units(amount: &str, decimals: u8) -> CoreResult<U256> {
    let amount = amount.trim();
    if amount.is_empty() || amount.starts_with('-') || amount.starts_with('+') {
        return Err(CoreError::InvalidAmount(amount.to_string()));
    }

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(CoreError::InvalidAmount(amount.to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoreError::InvalidAmount(amount.to_string()));
    }

    let decimals = decimals as usize;
    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    if frac.len() >= decimals {
        digits.push_str(&frac[..decimals]);
    } else {
        digits.push_str(frac);
        digits.extend(std::iter::repeat('0').take(decimals - frac.len()));
    }

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| CoreError::AmountOverflow(amount.to_string()))
}

/// Base units of a `Decimal` amount, flooring to `decimals`.
pub fn decimal_to_base_units(amount: Decimal, decimals: u8) -> CoreResult<U256> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CoreError::InvalidAmount(amount.to_string()));
    }
    to_base_units(&amount.normalize().to_string(), decimals)
}

/// Exact decimal string of a base-unit amount, without trailing zeros.
pub fn format_base_units(value: U256, decimals: u8) -> String {
    let raw = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return raw;
    }

    let padded = if raw.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - raw.len() + 1), raw)
    } else {
        raw
    };
    let split = padded.len() - decimals;
    let (whole, frac) = padded.split_at(split);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}

/// Base units as a `Decimal`.
///
/// `Decimal` carries 28 significant digits; longer fractions are truncated.
pub fn from_base_units(value: U256, decimals: u8) -> CoreResult<Decimal> {
    let s = format_base_units(value, decimals);
    let (whole, frac) = s.split_once('.').unwrap_or((s.as_str(), ""));
    if whole.len() > 28 {
        return Err(CoreError::AmountOverflow(s));
    }
    let keep = 28usize.saturating_sub(whole.len()).min(frac.len());
    let truncated = if keep == 0 {
        whole.to_string()
    } else {
        format!("{}.{}", whole, &frac[..keep])
    };
    Decimal::from_str(&truncated).map_err(|_| CoreError::AmountOverflow(s.clone()))
}

/// Like [`from_base_units`] but zero on overflow, for display-only values.
pub fn from_base_units_lossy(value: U256, decimals: u8) -> Decimal {
    from_base_units(value, decimals).unwrap_or(Decimal::ZERO)
}
