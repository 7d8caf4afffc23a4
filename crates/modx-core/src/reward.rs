//! Simple-interest reward model
//!
//! Pure functions only. Invalid or partial input yields zero rather than an
//! error, since these are evaluated continuously while a user is typing.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::{Pool, Stake, BASIS_POINTS, SECONDS_PER_YEAR};

/// Decimal places shown for a prospective (full-term) reward.
pub const PROSPECTIVE_DISPLAY_DP: u32 = 6;

/// Decimal places shown for an accrued, unclaimed reward.
pub const PENDING_DISPLAY_DP: u32 = 4;

/// `principal * bps/10000 * elapsed/SECONDS_PER_YEAR`, floored at zero.
pub fn accrue(principal: Decimal, annual_rate_bps: u32, elapsed_secs: i64) -> Decimal {
    if principal <= Decimal::ZERO || elapsed_secs <= 0 || annual_rate_bps == 0 {
        return Decimal::ZERO;
    }

    let denominator = Decimal::from(BASIS_POINTS) * Decimal::from(SECONDS_PER_YEAR);
    principal
        .checked_mul(Decimal::from(annual_rate_bps))
        .and_then(|v| v.checked_mul(Decimal::from(elapsed_secs)))
        .and_then(|v| v.checked_div(denominator))
        .map(|v| v.max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO)
}

/// Reward for holding `principal` in `pool` for `elapsed_secs`.
pub fn estimate_reward(principal: Decimal, pool: &Pool, elapsed_secs: i64) -> Decimal {
    accrue(principal, pool.annual_rate_bps, elapsed_secs)
}

/// Reward if `amount` is held for the pool's full lock duration.
///
/// `amount` is raw user input; anything non-numeric, non-positive, or an
/// unknown pool gives zero.
pub fn estimate_prospective_reward(amount: &str, pool: Option<&Pool>) -> Decimal {
    let Some(pool) = pool else {
        return Decimal::ZERO;
    };
    match Decimal::from_str(amount.trim()) {
        Ok(principal) if principal > Decimal::ZERO => {
            estimate_reward(principal, pool, pool.lock_duration_secs)
        }
        _ => Decimal::ZERO,
    }
}

/// Reward accrued by `stake` up to `now`. Keeps growing after the lock ends.
pub fn pending_reward(stake: &Stake, now: i64) -> Decimal {
    accrue(
        stake.principal,
        stake.annual_rate_bps,
        now.saturating_sub(stake.stake_timestamp),
    )
}

pub fn is_unlockable(stake: &Stake, now: i64) -> bool {
    now >= stake.lock_end_timestamp
}

/// Fixed-precision display string; `"0"` for zero.
pub fn display(reward: Decimal, dp: u32) -> String {
    if reward.is_zero() {
        return "0".to_string();
    }
    format!("{:.*}", dp as usize, reward.round_dp(dp))
}
