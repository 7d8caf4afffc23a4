//! Price impact estimation
//!
//! [`reserve_price_impact`] is the constant-product impact against the live
//! pair. [`banded_price_impact`] is a coarse size tier used when no reserves
//! are known for the pair being swapped.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

/// Share of input left after the 0.25% AMM fee.
const AFTER_FEE: Decimal = dec!(0.9975);

/// Impact in percent by notional input size; zero for invalid input.
pub fn banded_price_impact(input_amount: &str) -> Decimal {
    let amount = match Decimal::from_str(input_amount.trim()) {
        Ok(a) if a > Decimal::ZERO => a,
        _ => return Decimal::ZERO,
    };
    if amount < dec!(100) {
        dec!(0.1)
    } else if amount < dec!(1000) {
        dec!(0.15)
    } else if amount < dec!(10000) {
        dec!(0.3)
    } else {
        dec!(0.5)
    }
}

/// Execution price shortfall against the spot price, in percent.
///
/// With `x` the input reserve and `a` the fee-adjusted input, a
/// constant-product pool fills at `x / (x + a)` of spot.
pub fn reserve_price_impact(amount_in: Decimal, reserve_in: Decimal, reserve_out: Decimal) -> Decimal {
    if amount_in <= Decimal::ZERO || reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let effective = amount_in * AFTER_FEE;
    reserve_in
        .checked_add(effective)
        .and_then(|denominator| reserve_in.checked_div(denominator))
        .map(|fill| (Decimal::ONE - fill) * Decimal::ONE_HUNDRED)
        .map(|impact| impact.max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO)
}
