//! Portfolio aggregation
//!
//! Combines wallet holdings, live stakes and a price table into a
//! [`PortfolioSnapshot`]. No I/O; the snapshot is rebuilt in full every time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{PortfolioSnapshot, PortfolioToken, PriceTable, Stake};
use crate::reward::pending_reward;

/// A wallet balance in human units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub balance: Decimal,
}

impl Holding {
    pub fn new(symbol: impl Into<String>, balance: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            balance,
        }
    }
}

/// Build the snapshot.
///
/// Staked principal counts toward the row of `staking_symbol` and toward
/// `total_balance`. Rows with nothing held and nothing staked are omitted.
pub fn aggregate(
    holdings: &[Holding],
    staking_symbol: &str,
    stakes: &[Stake],
    prices: &PriceTable,
    now: i64,
) -> PortfolioSnapshot {
    let live: Vec<&Stake> = stakes.iter().filter(|s| s.is_live()).collect();
    let total_staked: Decimal = live.iter().map(|s| s.principal).sum();
    let total_rewards: Decimal = live.iter().map(|s| pending_reward(s, now)).sum();

    let wallet_balance = holdings
        .iter()
        .filter(|h| h.symbol == staking_symbol)
        .map(|h| h.balance)
        .sum::<Decimal>();

    let mut symbols: Vec<&str> = holdings.iter().map(|h| h.symbol.as_str()).collect();
    if !symbols.contains(&staking_symbol) {
        symbols.push(staking_symbol);
    }

    let mut tokens = Vec::new();
    for symbol in symbols {
        let held: Decimal = holdings
            .iter()
            .filter(|h| h.symbol == symbol)
            .map(|h| h.balance)
            .sum();
        let staked = if symbol == staking_symbol {
            total_staked
        } else {
            Decimal::ZERO
        };
        let balance = held + staked;
        if balance <= Decimal::ZERO {
            continue;
        }

        let quote = prices.get(symbol);
        let price = quote.map(|q| q.price).unwrap_or(Decimal::ZERO);
        tokens.push(PortfolioToken {
            symbol: symbol.to_string(),
            balance,
            price,
            value: balance.checked_mul(price).unwrap_or(Decimal::ZERO),
            change_24h: quote.map(|q| q.change_24h).unwrap_or(Decimal::ZERO),
            price_source: quote.map(|q| q.source),
        });
    }

    let total_value: Decimal = tokens.iter().map(|t| t.value).sum();
    let daily_change_percent = if total_value.is_zero() {
        Decimal::ZERO
    } else {
        tokens
            .iter()
            .filter_map(|t| t.value.checked_mul(t.change_24h))
            .sum::<Decimal>()
            .checked_div(total_value)
            .unwrap_or(Decimal::ZERO)
    };

    PortfolioSnapshot {
        total_value,
        total_balance: wallet_balance + total_staked,
        total_staked,
        total_rewards,
        daily_change_percent,
        tokens,
        prices_degraded: prices.degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pool, PriceQuote, PriceSource};
    use rust_decimal_macros::dec;

    fn quote(symbol: &str, price: Decimal, change: Decimal, source: PriceSource) -> PriceQuote {
        PriceQuote {
            symbol: symbol.to_string(),
            price,
            change_24h: change,
            volume_24h: Decimal::ZERO,
            market_cap: Decimal::ZERO,
            source,
        }
    }

    fn prices() -> PriceTable {
        PriceTable::new(
            vec![
                quote("modX", dec!(0.25), dec!(10), PriceSource::Fallback),
                quote("BNB", dec!(300), dec!(-2), PriceSource::Live),
            ],
            false,
        )
    }

    fn stake(principal: Decimal) -> Stake {
        let pool = Pool {
            pool_id: 1,
            lock_duration_secs: 30 * 86_400,
            annual_rate_bps: 1200,
            total_staked: Decimal::ZERO,
            max_stake_per_user: dec!(1000000),
            is_active: true,
        };
        Stake::new(&pool, principal, 0, pool.lock_duration_secs, 0)
    }

    #[test]
    fn test_empty_account() {
        let holdings = vec![Holding::new("modX", Decimal::ZERO), Holding::new("BNB", Decimal::ZERO)];
        let snapshot = aggregate(&holdings, "modX", &[], &prices(), 0);
        assert_eq!(snapshot.total_value, Decimal::ZERO);
        assert_eq!(snapshot.daily_change_percent, Decimal::ZERO);
        assert!(snapshot.tokens.is_empty());
    }

    #[test]
    fn test_staked_counts_toward_staking_token() {
        let holdings = vec![Holding::new("modX", dec!(600)), Holding::new("BNB", dec!(1))];
        let stakes = vec![stake(dec!(400)), stake(Decimal::ZERO)];
        let snapshot = aggregate(&holdings, "modX", &stakes, &prices(), 365 * 86_400);

        assert_eq!(snapshot.total_staked, dec!(400));
        assert_eq!(snapshot.total_balance, dec!(1000));
        assert_eq!(snapshot.total_rewards, dec!(48));
        assert_eq!(snapshot.tokens.len(), 2);

        let modx = &snapshot.tokens[0];
        assert_eq!(modx.balance, dec!(1000));
        assert_eq!(modx.value, dec!(250));
        assert_eq!(modx.price_source, Some(PriceSource::Fallback));

        // (250 * 10 + 300 * -2) / 550
        assert_eq!(snapshot.total_value, dec!(550));
        assert_eq!(snapshot.daily_change_percent.round_dp(6), dec!(3.454545));
    }

    #[test]
    fn test_stake_only_row_is_kept() {
        let snapshot = aggregate(&[], "modX", &[stake(dec!(10))], &prices(), 0);
        assert_eq!(snapshot.tokens.len(), 1);
        assert_eq!(snapshot.tokens[0].symbol, "modX");
    }

    #[test]
    fn test_missing_price_values_at_zero() {
        let holdings = vec![Holding::new("DOGE", dec!(5))];
        let snapshot = aggregate(&holdings, "modX", &[], &prices(), 0);
        assert_eq!(snapshot.tokens[0].value, Decimal::ZERO);
        assert_eq!(snapshot.tokens[0].price_source, None);
        assert_eq!(snapshot.daily_change_percent, Decimal::ZERO);
    }

    #[test]
    fn test_degraded_flag_carries_through() {
        let mut table = prices();
        table.degraded = true;
        assert!(aggregate(&[], "modX", &[], &table, 0).prices_degraded);
    }
}
