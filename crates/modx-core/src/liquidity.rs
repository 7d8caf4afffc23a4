//! Liquidity position valuation and removal sizing
//!
//! Pro-rata amounts are computed in base units (`U256`) and only converted to
//! decimals for display, so a position is never valued above what the pair
//! would actually return.

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;

use crate::models::LiquidityPosition;
use crate::units::{decimal_to_base_units, from_base_units_lossy};
use crate::validation::{validate_percentage, validate_slippage};
use crate::CoreResult;

/// Pair (LP) tokens of a constant-product pool always carry 18 decimals.
pub const LP_DECIMALS: u8 = 18;

/// One atomic read of a pair and the account's LP balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSnapshot {
    pub pair_address: Address,
    pub token0_symbol: String,
    pub token1_symbol: String,
    pub lp_balance: U256,
    pub total_supply: U256,
    pub reserve0: U256,
    pub reserve1: U256,
    pub decimals0: u8,
    pub decimals1: u8,
    pub lp_decimals: u8,
}

fn share_of(amount: U256, numerator: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::ZERO;
    }
    amount
        .checked_mul(numerator)
        .map(|v| v / denominator)
        .unwrap_or(U256::ZERO)
}

/// Value a snapshot. `None` when the account holds no LP tokens.
pub fn value_position(snapshot: &PairSnapshot) -> Option<LiquidityPosition> {
    if snapshot.lp_balance.is_zero() {
        return None;
    }

    let lp_balance = from_base_units_lossy(snapshot.lp_balance, snapshot.lp_decimals);
    let total_supply = from_base_units_lossy(snapshot.total_supply, snapshot.lp_decimals);
    let share_percent = if total_supply.is_zero() {
        Decimal::ZERO
    } else {
        lp_balance
            .checked_div(total_supply)
            .and_then(|s| s.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::ZERO)
    };

    let token0 = share_of(snapshot.reserve0, snapshot.lp_balance, snapshot.total_supply);
    let token1 = share_of(snapshot.reserve1, snapshot.lp_balance, snapshot.total_supply);

    Some(LiquidityPosition {
        pair_address: snapshot.pair_address,
        token0_symbol: snapshot.token0_symbol.clone(),
        token1_symbol: snapshot.token1_symbol.clone(),
        lp_balance,
        lp_balance_raw: snapshot.lp_balance,
        total_supply,
        reserve0: from_base_units_lossy(snapshot.reserve0, snapshot.decimals0),
        reserve1: from_base_units_lossy(snapshot.reserve1, snapshot.decimals1),
        share_percent,
        token0_amount: from_base_units_lossy(token0, snapshot.decimals0),
        token1_amount: from_base_units_lossy(token1, snapshot.decimals1),
    })
}

/// LP base units to burn for removing `percentage` of a position (floored).
pub fn lp_for_percentage(lp_balance: U256, percentage: u32) -> CoreResult<U256> {
    let percentage = validate_percentage(percentage)?;
    Ok(share_of(lp_balance, U256::from(percentage), U256::from(100u64)))
}

/// Token amounts returned by removing `percentage` of `position`.
pub fn pro_rata(position: &LiquidityPosition, percentage: u32) -> CoreResult<(Decimal, Decimal)> {
    let fraction = Decimal::from(validate_percentage(percentage)?) / Decimal::ONE_HUNDRED;
    Ok((
        position.token0_amount * fraction,
        position.token1_amount * fraction,
    ))
}

/// Minimum acceptable output after `slippage_percent` tolerance, floored.
pub fn min_amount_out(quoted: U256, slippage_percent: Decimal) -> CoreResult<U256> {
    let slippage = validate_slippage(slippage_percent)?;
    // keep-fraction scaled by 1e6 so fractional percents survive
    let keep = decimal_to_base_units(Decimal::ONE_HUNDRED - slippage, 4)?;
    Ok(share_of(quoted, keep, U256::from(1_000_000u64)))
}
