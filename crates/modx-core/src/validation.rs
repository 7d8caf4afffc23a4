//! Input checks run before any chain interaction.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::Pool;
use crate::{CoreError, CoreResult};

/// Parse a strictly positive decimal amount.
pub fn parse_amount(input: &str) -> CoreResult<Decimal> {
    let trimmed = input.trim();
    match Decimal::from_str(trimmed) {
        Ok(amount) if amount > Decimal::ZERO => Ok(amount),
        _ => Err(CoreError::InvalidAmount(trimmed.to_string())),
    }
}

/// Check a stake request against the pool it targets.
///
/// `pool` is `None` when the id is not among the known pools.
pub fn validate_stake(amount: &str, pool_id: u64, pool: Option<&Pool>) -> CoreResult<Decimal> {
    let amount = parse_amount(amount)?;
    let pool = match pool {
        Some(pool) if pool.is_active => pool,
        _ => return Err(CoreError::PoolUnavailable(pool_id)),
    };
    if amount > pool.max_stake_per_user {
        return Err(CoreError::ExceedsMaxStake {
            amount,
            max: pool.max_stake_per_user,
        });
    }
    Ok(amount)
}

/// Percentage of a position to remove, `1..=100`.
pub fn validate_percentage(percentage: u32) -> CoreResult<u32> {
    if (1..=100).contains(&percentage) {
        Ok(percentage)
    } else {
        Err(CoreError::InvalidPercentage(percentage))
    }
}

/// Slippage tolerance in percent, `0 <= s < 100`.
pub fn validate_slippage(slippage_percent: Decimal) -> CoreResult<Decimal> {
    if slippage_percent >= Decimal::ZERO && slippage_percent < Decimal::ONE_HUNDRED {
        Ok(slippage_percent)
    } else {
        Err(CoreError::InvalidAmount(slippage_percent.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pool(active: bool) -> Pool {
        Pool {
            pool_id: 2,
            lock_duration_secs: 86_400,
            annual_rate_bps: 800,
            total_staked: dec!(5000),
            max_stake_per_user: dec!(1000),
            is_active: active,
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 12.5 ").unwrap(), dec!(12.5));
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("ten").is_err());
    }

    #[test]
    fn test_validate_stake() {
        let active = pool(true);
        assert_eq!(validate_stake("1000", 2, Some(&active)).unwrap(), dec!(1000));
        assert_eq!(
            validate_stake("1000.01", 2, Some(&active)),
            Err(CoreError::ExceedsMaxStake {
                amount: dec!(1000.01),
                max: dec!(1000)
            })
        );
        assert_eq!(
            validate_stake("10", 2, Some(&pool(false))),
            Err(CoreError::PoolUnavailable(2))
        );
        assert_eq!(validate_stake("10", 9, None), Err(CoreError::PoolUnavailable(9)));
        assert!(matches!(
            validate_stake("", 2, Some(&active)),
            Err(CoreError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(validate_percentage(0).is_err());
        assert_eq!(validate_percentage(1).unwrap(), 1);
        assert_eq!(validate_percentage(100).unwrap(), 100);
        assert!(validate_percentage(101).is_err());
    }
}
