//! Account-scoped entities
//!
//! Every value here is owned by the querying session and rebuilt from chain
//! reads on refresh. Nothing is patched in place: a refresh produces a new
//! `Vec<Stake>`, a new `LiquidityPosition`, a new `PortfolioSnapshot`.

use std::collections::HashMap;
use std::fmt;

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Seconds in the 365-day year used for reward accrual.
pub const SECONDS_PER_YEAR: i64 = 365 * 86_400;

/// Basis points in one whole (100%).
pub const BASIS_POINTS: u32 = 10_000;

/// Address standing in for the chain's native currency in token lists.
pub const NATIVE_SENTINEL: Address = Address::ZERO;

// =============================================================================
// Tokens
// =============================================================================

/// A token the client can hold, price and route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Ticker symbol (e.g., "modX", "BNB")
    pub symbol: String,

    /// Display name
    pub name: String,

    /// Contract address, or [`NATIVE_SENTINEL`] for the native currency
    pub address: Address,

    /// Number of decimals of the base unit
    pub decimals: u8,
}

impl TokenInfo {
    pub fn is_native(&self) -> bool {
        self.address == NATIVE_SENTINEL
    }
}

// =============================================================================
// Staking
// =============================================================================

/// A staking offer with a fixed lock duration and annual reward rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub pool_id: u64,
    pub lock_duration_secs: i64,
    pub annual_rate_bps: u32,
    pub total_staked: Decimal,
    pub max_stake_per_user: Decimal,
    pub is_active: bool,
}

impl Pool {
    /// Annual rate as a percentage (1200 bps -> 12).
    pub fn apr_percent(&self) -> Decimal {
        Decimal::from(self.annual_rate_bps) / Decimal::from(100)
    }
}

/// A user's locked principal in one pool.
///
/// `pending_rewards` and `unlockable` are observations at a point in time,
/// produced by [`Stake::observe`]; they are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stake {
    pub pool_id: u64,
    pub principal: Decimal,
    pub stake_timestamp: i64,
    pub lock_end_timestamp: i64,
    /// Rate of the owning pool at the time the stake was read
    pub annual_rate_bps: u32,
    pub pending_rewards: Decimal,
    pub unlockable: bool,
}

impl Stake {
    /// Build a stake from its on-chain record and the owning pool.
    pub fn new(
        pool: &Pool,
        principal: Decimal,
        stake_timestamp: i64,
        lock_end_timestamp: i64,
        now: i64,
    ) -> Self {
        Self {
            pool_id: pool.pool_id,
            principal,
            stake_timestamp,
            lock_end_timestamp,
            annual_rate_bps: pool.annual_rate_bps,
            pending_rewards: Decimal::ZERO,
            unlockable: false,
        }
        .observe(now)
    }

    /// Recompute the time-dependent fields at `now`.
    pub fn observe(mut self, now: i64) -> Self {
        self.pending_rewards = crate::reward::pending_reward(&self, now);
        self.unlockable = crate::reward::is_unlockable(&self, now);
        self
    }

    pub fn is_live(&self) -> bool {
        self.principal > Decimal::ZERO
    }
}

// =============================================================================
// Liquidity
// =============================================================================

/// Pro-rata ownership of an AMM pair, valued from one atomic snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub pair_address: Address,
    pub token0_symbol: String,
    pub token1_symbol: String,
    pub lp_balance: Decimal,
    /// LP balance in base units, needed to size removals exactly
    pub lp_balance_raw: U256,
    pub total_supply: Decimal,
    pub reserve0: Decimal,
    pub reserve1: Decimal,
    /// `lp_balance / total_supply` expressed in percent
    pub share_percent: Decimal,
    pub token0_amount: Decimal,
    pub token1_amount: Decimal,
}

/// An ordered hop sequence accepted by the router's quoting function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRoute {
    pub path: Vec<Address>,
}

impl SwapRoute {
    pub fn direct(from: Address, to: Address) -> Self {
        Self { path: vec![from, to] }
    }

    pub fn bridged(from: Address, via: Address, to: Address) -> Self {
        Self {
            path: vec![from, via, to],
        }
    }

    pub fn is_bridged(&self) -> bool {
        self.path.len() > 2
    }
}

// =============================================================================
// Prices
// =============================================================================

/// Where a price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Live,
    Fallback,
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSource::Live => write!(f, "live"),
            PriceSource::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: Decimal,
    /// 24h change in percent
    pub change_24h: Decimal,
    pub volume_24h: Decimal,
    pub market_cap: Decimal,
    pub source: PriceSource,
}

/// Symbol -> price map consumed by valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    pub quotes: HashMap<String, PriceQuote>,
    /// True when the whole table is the reference fallback
    pub degraded: bool,
    pub fetched_at: DateTime<Utc>,
}

impl PriceTable {
    pub fn new(quotes: Vec<PriceQuote>, degraded: bool) -> Self {
        Self {
            quotes: quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
            degraded,
            fetched_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), false)
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceQuote> {
        self.quotes.get(symbol)
    }

    pub fn price(&self, symbol: &str) -> Option<Decimal> {
        self.get(symbol).map(|q| q.price)
    }

    /// Price ratio `from / to`; `1` when either side is unknown or zero.
    pub fn exchange_rate(&self, from: &str, to: &str) -> Decimal {
        match (self.price(from), self.price(to)) {
            (Some(f), Some(t)) if !t.is_zero() => f.checked_div(t).unwrap_or(Decimal::ONE),
            _ => Decimal::ONE,
        }
    }
}

// =============================================================================
// Portfolio
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioToken {
    pub symbol: String,
    pub balance: Decimal,
    pub price: Decimal,
    pub value: Decimal,
    pub change_24h: Decimal,
    pub price_source: Option<PriceSource>,
}

/// Unified valuation view, recomputed from scratch on every input change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_value: Decimal,
    pub total_balance: Decimal,
    pub total_staked: Decimal,
    pub total_rewards: Decimal,
    pub daily_change_percent: Decimal,
    pub tokens: Vec<PortfolioToken>,
    /// Set when valuation used the fallback price table
    pub prices_degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(symbol: &str, price: Decimal) -> PriceQuote {
        PriceQuote {
            symbol: symbol.to_string(),
            price,
            change_24h: Decimal::ZERO,
            volume_24h: Decimal::ZERO,
            market_cap: Decimal::ZERO,
            source: PriceSource::Live,
        }
    }

    #[test]
    fn test_exchange_rate() {
        let table = PriceTable::new(vec![quote("BNB", dec!(350)), quote("modX", dec!(0.25))], false);
        assert_eq!(table.exchange_rate("BNB", "modX"), dec!(1400));
        assert_eq!(table.exchange_rate("BNB", "DOGE"), Decimal::ONE);
    }

    #[test]
    fn test_route_shape() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let w = Address::repeat_byte(3);
        assert!(!SwapRoute::direct(a, b).is_bridged());
        assert_eq!(SwapRoute::bridged(a, w, b).path, vec![a, w, b]);
    }
}
