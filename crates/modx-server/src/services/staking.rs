//! Position accounting for the staking contract
//!
//! Stakes are always re-derived from chain reads. Discovery prefers the
//! contract's own enumeration of a user's active pools and falls back to a
//! per-pool scan on contracts that lack it.

use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::Address;
use futures::future::{join_all, try_join_all};
use modx_core::units::{decimal_to_base_units, from_base_units_lossy};
use modx_core::validation::validate_stake;
use modx_core::{Pool, Stake};

use crate::chain::{ChainClient, ChainError, ChainResult, Receipt};
use crate::contracts::erc20::Erc20Contract;
use crate::contracts::staking::StakingContract;
use crate::error::AppResult;
use crate::pending::{ActionKey, TxTracker};

#[derive(Clone)]
pub struct PositionAccountant {
    staking: StakingContract,
    token: Erc20Contract,
    tracker: TxTracker,
    decimals: u8,
}

impl PositionAccountant {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        tracker: TxTracker,
        staking: Address,
        token: Address,
        decimals: u8,
    ) -> Self {
        Self {
            staking: StakingContract::new(chain.clone(), staking, decimals),
            token: Erc20Contract::new(chain, token),
            tracker,
            decimals,
        }
    }

    /// Every pool the contract knows, in id order.
    pub async fn pools(&self) -> ChainResult<Vec<Pool>> {
        let start = Instant::now();
        let count = self.staking.pool_count().await?;
        let pools = try_join_all((0..count).map(|id| self.staking.pool(id))).await?;
        tracing::debug!(
            pool_count = %pools.len(),
            duration_ms = %start.elapsed().as_millis(),
            "Loaded staking pools"
        );
        Ok(pools)
    }

    /// Pool ids where `user` currently has principal.
    pub async fn discover_active_pool_ids(&self, user: Address) -> ChainResult<Vec<u64>> {
        match self.staking.user_active_pool_ids(user).await {
            Ok(ids) => Ok(ids),
            Err(e) => {
                tracing::warn!(
                    account = %user,
                    error = %e,
                    "Active pool enumeration unavailable, scanning every pool"
                );
                self.scan_active_pool_ids(user).await
            }
        }
    }

    async fn scan_active_pool_ids(&self, user: Address) -> ChainResult<Vec<u64>> {
        let count = self.staking.pool_count().await?;
        let probes = (0..count).map(|id| async move {
            match self.staking.stake_info(user, id).await {
                Ok(record) if !record.amount.is_zero() => Some(id),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(account = %user, pool_id = %id, error = %e, "Skipping pool in scan");
                    None
                }
            }
        });
        Ok(join_all(probes).await.into_iter().flatten().collect())
    }

    /// Live stakes of `user`. Records with zero principal are dropped.
    pub async fn stakes(&self, user: Address, pools: &[Pool], now: i64) -> ChainResult<Vec<Stake>> {
        let ids = self.discover_active_pool_ids(user).await?;
        let reads = ids.into_iter().map(|id| async move {
            let record = self.staking.stake_info(user, id).await?;
            if record.amount.is_zero() {
                return Ok(None);
            }
            let pool = match pools.iter().find(|p| p.pool_id == id) {
                Some(pool) => pool.clone(),
                None => self.staking.pool(id).await?,
            };
            Ok::<_, ChainError>(Some(Stake::new(
                &pool,
                from_base_units_lossy(record.amount, self.decimals),
                i64::try_from(record.stake_time).unwrap_or(i64::MAX),
                i64::try_from(record.lock_end_time).unwrap_or(i64::MAX),
                now,
            )))
        });

        let stakes: Vec<Stake> = try_join_all(reads).await?.into_iter().flatten().collect();
        tracing::debug!(account = %user, stake_count = %stakes.len(), "Loaded stakes");
        Ok(stakes)
    }

    /// Approve exactly `amount`, then stake it. Validation runs before any
    /// chain write; `pool` is the known pool with that id, if any.
    pub async fn stake(&self, user: Address, amount: &str, pool_id: u64, pool: Option<&Pool>) -> AppResult<Receipt> {
        let amount = validate_stake(amount, pool_id, pool)?;
        let raw = decimal_to_base_units(amount, self.decimals)?;

        let guard = self.tracker.begin(ActionKey::Pool(pool_id))?;
        tracing::info!(account = %user, pool_id = %pool_id, amount = %amount, "Staking");

        self.tracker
            .submit(&guard, "approve", self.token.approve_tx(user, self.staking.address(), raw))
            .await?;
        self.tracker
            .submit(&guard, "stake", self.staking.stake_tx(user, pool_id, raw))
            .await
    }

    pub async fn unstake(&self, user: Address, pool_id: u64) -> AppResult<Receipt> {
        let guard = self.tracker.begin(ActionKey::Pool(pool_id))?;
        tracing::info!(account = %user, pool_id = %pool_id, "Unstaking");
        self.tracker
            .submit(&guard, "unstake", self.staking.unstake_tx(user, pool_id))
            .await
    }

    pub async fn claim_rewards(&self, user: Address, pool_id: u64) -> AppResult<Receipt> {
        let guard = self.tracker.begin(ActionKey::Pool(pool_id))?;
        tracing::info!(account = %user, pool_id = %pool_id, "Claiming rewards");
        self.tracker
            .submit(&guard, "claim", self.staking.claim_tx(user, pool_id))
            .await
    }
}
