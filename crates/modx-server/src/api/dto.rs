use alloy_primitives::{Address, B256};
use modx_core::alarm::PriceAlarm;
use modx_core::history::HistoryEntry;
use modx_core::portfolio::Holding;
use modx_core::reward::{display, PENDING_DISPLAY_DP};
use modx_core::{LiquidityPosition, Pool, Stake};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::chain::Receipt;
use crate::engine::TriggeredAlarm;
use crate::pending::PendingAction;
use crate::services::swap::SwapQuote;

// ============================================================================
// GET /health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub chain: String,
    pub block_number: Option<u64>,
}

// ============================================================================
// GET|POST /api/v1/session
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub account: Address,
    /// Defaults to the configured chain
    #[serde(default)]
    pub chain_id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub connected: bool,
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
}

// ============================================================================
// GET /api/v1/pools, GET /api/v1/stakes
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PoolResponse {
    pub pool_id: u64,
    pub lock_duration_secs: i64,
    pub lock_duration_days: i64,
    pub annual_rate_bps: u32,
    pub apr_percent: Decimal,
    pub total_staked: Decimal,
    pub max_stake_per_user: Decimal,
    pub is_active: bool,
}

impl From<Pool> for PoolResponse {
    fn from(pool: Pool) -> Self {
        Self {
            pool_id: pool.pool_id,
            lock_duration_secs: pool.lock_duration_secs,
            lock_duration_days: pool.lock_duration_secs / 86_400,
            annual_rate_bps: pool.annual_rate_bps,
            apr_percent: pool.apr_percent(),
            total_staked: pool.total_staked,
            max_stake_per_user: pool.max_stake_per_user,
            is_active: pool.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PoolsResponse {
    pub pools: Vec<PoolResponse>,
}

#[derive(Debug, Serialize)]
pub struct StakeResponse {
    pub pool_id: u64,
    pub principal: Decimal,
    pub stake_timestamp: i64,
    pub lock_end_timestamp: i64,
    pub pending_rewards: String,
    pub unlockable: bool,
}

impl From<Stake> for StakeResponse {
    fn from(stake: Stake) -> Self {
        Self {
            pool_id: stake.pool_id,
            principal: stake.principal,
            stake_timestamp: stake.stake_timestamp,
            lock_end_timestamp: stake.lock_end_timestamp,
            pending_rewards: display(stake.pending_rewards, PENDING_DISPLAY_DP),
            unlockable: stake.unlockable,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StakesResponse {
    pub stakes: Vec<StakeResponse>,
    pub total_staked: Decimal,
}

// ============================================================================
// POST /api/v1/stake, /unstake, /claim
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StakeRequest {
    pub pool_id: u64,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct PoolActionRequest {
    pub pool_id: u64,
}

#[derive(Debug, Serialize)]
pub struct TxResponse {
    pub hash: B256,
    pub block_number: u64,
}

impl From<Receipt> for TxResponse {
    fn from(receipt: Receipt) -> Self {
        Self {
            hash: receipt.hash,
            block_number: receipt.block_number,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HashResponse {
    pub hash: B256,
}

// ============================================================================
// GET /api/v1/rewards/estimate, /rewards/pending
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RewardEstimateQuery {
    #[serde(default)]
    pub amount: String,
    pub pool_id: u64,
}

#[derive(Debug, Serialize)]
pub struct RewardEstimateResponse {
    pub pool_id: u64,
    pub amount: String,
    pub estimated_reward: String,
}

#[derive(Debug, Deserialize)]
pub struct PendingRewardQuery {
    pub pool_id: u64,
}

#[derive(Debug, Serialize)]
pub struct PendingRewardResponse {
    pub pool_id: u64,
    pub pending_rewards: String,
}

// ============================================================================
// Swap
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SwapQuoteQuery {
    #[serde(default)]
    pub input: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct SwapQuoteResponse {
    /// True when a newer quote request replaced this one
    pub superseded: bool,
    pub quote: Option<SwapQuote>,
    pub default_slippage_percent: Decimal,
}

#[derive(Debug, Serialize)]
pub struct LatestQuoteResponse {
    pub quote: Option<SwapQuote>,
}

#[derive(Debug, Serialize)]
pub struct SwapAmountResponse {
    pub input: String,
    pub from: String,
    pub to: String,
    pub output: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PriceImpactResponse {
    pub price_impact: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRateQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct ExchangeRateResponse {
    pub from: String,
    pub to: String,
    pub rate: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SwapRequest {
    pub from: String,
    pub to: String,
    pub amount: String,
    pub quoted_amount: String,
    #[serde(default)]
    pub slippage_percent: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct SwapResponse {
    pub hash: B256,
    pub block_number: u64,
    pub route: Vec<Address>,
    pub entry: HistoryEntry,
}

// ============================================================================
// Liquidity
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LiquidityPositionResponse {
    pub position: Option<LiquidityPosition>,
}

#[derive(Debug, Deserialize)]
pub struct AddLiquidityRequest {
    pub token_amount: String,
    pub native_amount: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveLiquidityRequest {
    pub percentage: u32,
}

#[derive(Debug, Serialize)]
pub struct LiquidityResponse {
    pub hash: B256,
    pub block_number: u64,
    pub entry: HistoryEntry,
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Serialize)]
pub struct BalancesResponse {
    pub account: Address,
    pub balances: Vec<Holding>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub symbol: String,
    pub spender: Address,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct AllowanceQuery {
    pub symbol: String,
    pub spender: Address,
}

#[derive(Debug, Serialize)]
pub struct AllowanceResponse {
    pub symbol: String,
    pub spender: Address,
    pub allowance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub symbol: String,
    pub to: Address,
    pub amount: String,
}

// ============================================================================
// Alarm, pending
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SetAlarmRequest {
    pub token: String,
    pub target_price: String,
}

#[derive(Debug, Serialize)]
pub struct AlarmResponse {
    pub alarm: Option<PriceAlarm>,
    /// Reported once, on the first read after it fired
    pub triggered: Option<TriggeredAlarm>,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub pending: Vec<PendingAction>,
}

// ============================================================================
// NFTs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MintNftRequest {
    pub uri: String,
    pub license: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferNftRequest {
    pub to: Address,
}
