use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolEvent};
use modx_core::history::{HistoryAmount, HistoryEntry, HistoryKind};
use modx_core::units::from_base_units_lossy;
use modx_core::Pool;

use super::{read, saturating_u64, transaction};
use crate::chain::{ChainClient, ChainResult, Log, LogFilter, TxRequest};

sol! {
    interface IModxStaking {
        function stakingPools(uint256 poolId) external view returns (uint256 duration, uint256 apy, uint256 totalStaked, uint256 maxStakePerUser, bool isActive);
        function poolCount() external view returns (uint256 count);
        function userActivePoolIds(address user) external view returns (uint256[] poolIds);
        function getUserStakeInfo(address user, uint256 poolId) external view returns (uint256 amount, uint256 stakeTime, uint256 lockEndTime, uint256 pendingRewards, bool canUnstake);
        function stake(uint256 poolId, uint256 amount) external;
        function unstake(uint256 poolId) external;
        function claimRewards(uint256 poolId) external;

        event Staked(address indexed user, uint256 indexed poolId, uint256 amount);
        event Unstaked(address indexed user, uint256 indexed poolId, uint256 amount);
        event RewardsClaimed(address indexed user, uint256 amount);
    }
}

/// Raw per-pool stake record as stored by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeRecord {
    pub amount: U256,
    pub stake_time: u64,
    pub lock_end_time: u64,
}

#[derive(Clone)]
pub struct StakingContract {
    chain: Arc<dyn ChainClient>,
    address: Address,
    /// Staking token decimals
    decimals: u8,
}

impl StakingContract {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address, decimals: u8) -> Self {
        Self {
            chain,
            address,
            decimals,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn pool_count(&self) -> ChainResult<u64> {
        let count = read(self.chain.as_ref(), self.address, IModxStaking::poolCountCall).await?;
        Ok(saturating_u64(count))
    }

    pub async fn pool(&self, pool_id: u64) -> ChainResult<Pool> {
        let raw = read(
            self.chain.as_ref(),
            self.address,
            IModxStaking::stakingPoolsCall {
                poolId: U256::from(pool_id),
            },
        )
        .await?;

        Ok(Pool {
            pool_id,
            lock_duration_secs: i64::try_from(saturating_u64(raw.duration)).unwrap_or(i64::MAX),
            annual_rate_bps: u32::try_from(saturating_u64(raw.apy)).unwrap_or(u32::MAX),
            total_staked: from_base_units_lossy(raw.totalStaked, self.decimals),
            max_stake_per_user: from_base_units_lossy(raw.maxStakePerUser, self.decimals),
            is_active: raw.isActive,
        })
    }

    pub async fn user_active_pool_ids(&self, user: Address) -> ChainResult<Vec<u64>> {
        let ids = read(
            self.chain.as_ref(),
            self.address,
            IModxStaking::userActivePoolIdsCall { user },
        )
        .await?;
        Ok(ids.into_iter().map(saturating_u64).collect())
    }

    pub async fn stake_info(&self, user: Address, pool_id: u64) -> ChainResult<StakeRecord> {
        let raw = read(
            self.chain.as_ref(),
            self.address,
            IModxStaking::getUserStakeInfoCall {
                user,
                poolId: U256::from(pool_id),
            },
        )
        .await?;

        Ok(StakeRecord {
            amount: raw.amount,
            stake_time: saturating_u64(raw.stakeTime),
            lock_end_time: saturating_u64(raw.lockEndTime),
        })
    }

    pub fn stake_tx(&self, from: Address, pool_id: u64, amount: U256) -> TxRequest {
        transaction(
            from,
            self.address,
            IModxStaking::stakeCall {
                poolId: U256::from(pool_id),
                amount,
            },
        )
    }

    pub fn unstake_tx(&self, from: Address, pool_id: u64) -> TxRequest {
        transaction(
            from,
            self.address,
            IModxStaking::unstakeCall {
                poolId: U256::from(pool_id),
            },
        )
    }

    pub fn claim_tx(&self, from: Address, pool_id: u64) -> TxRequest {
        transaction(
            from,
            self.address,
            IModxStaking::claimRewardsCall {
                poolId: U256::from(pool_id),
            },
        )
    }

    /// Filter for one staking event kind emitted for `user`.
    pub fn event_filter(&self, kind: HistoryKind, user: Address, from_block: u64, to_block: u64) -> LogFilter {
        let signature = match kind {
            HistoryKind::Unstake => IModxStaking::Unstaked::SIGNATURE_HASH,
            HistoryKind::Claim => IModxStaking::RewardsClaimed::SIGNATURE_HASH,
            _ => IModxStaking::Staked::SIGNATURE_HASH,
        };
        LogFilter {
            address: self.address,
            topics: vec![Some(signature), Some(user.into_word())],
            from_block,
            to_block,
        }
    }

    /// Decode a staking event log into a history entry.
    pub fn decode_event(&self, kind: HistoryKind, symbol: &str, log: &Log) -> Option<HistoryEntry> {
        let amount = U256::try_from_be_slice(log.data.get(..32)?)?;
        let pool_id = match kind {
            HistoryKind::Claim => None,
            _ => Some(saturating_u64(U256::from_be_bytes(log.topics.get(2)?.0))),
        };
        Some(HistoryEntry::from_chain(
            kind,
            log.tx_hash,
            log.log_index,
            log.block_number,
            HistoryAmount::new(symbol, from_base_units_lossy(amount, self.decimals)),
            pool_id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use alloy_primitives::{Bytes, B256};
    use alloy_sol_types::SolValue;
    use rust_decimal_macros::dec;

    const WEI: u128 = 1_000_000_000_000_000_000;

    #[tokio::test]
    async fn test_pool_decoding() {
        let chain = Arc::new(MockChain::new());
        let address = Address::repeat_byte(0x5a);
        chain.on::<IModxStaking::stakingPoolsCall>(address, |call| {
            assert_eq!(call.poolId, U256::from(3u64));
            Ok((
                U256::from(30u64 * 86_400),
                U256::from(1200u64),
                U256::from(2500 * WEI),
                U256::from(1000 * WEI),
                true,
            )
                .abi_encode_params())
        });

        let contract = StakingContract::new(chain, address, 18);
        let pool = contract.pool(3).await.unwrap();
        assert_eq!(pool.pool_id, 3);
        assert_eq!(pool.annual_rate_bps, 1200);
        assert_eq!(pool.lock_duration_secs, 2_592_000);
        assert_eq!(pool.total_staked, dec!(2500));
        assert_eq!(pool.max_stake_per_user, dec!(1000));
        assert!(pool.is_active);
    }

    #[test]
    fn test_decode_staked_event() {
        let chain: Arc<dyn ChainClient> = Arc::new(MockChain::new());
        let address = Address::repeat_byte(0x5a);
        let contract = StakingContract::new(chain, address, 18);
        let user = Address::repeat_byte(0x01);

        let log = Log {
            address,
            topics: vec![
                IModxStaking::Staked::SIGNATURE_HASH,
                user.into_word(),
                B256::from(U256::from(2u64).to_be_bytes::<32>()),
            ],
            data: Bytes::from(U256::from(15 * WEI / 10).abi_encode()),
            block_number: 1234,
            tx_hash: B256::repeat_byte(0xcd),
            log_index: 4,
        };

        let entry = contract.decode_event(HistoryKind::Stake, "modX", &log).unwrap();
        assert_eq!(entry.pool_id, Some(2));
        assert_eq!(entry.amounts[0].amount, dec!(1.5));
        assert!(entry.id.ends_with("-4"));
        assert!(contract
            .event_filter(HistoryKind::Stake, user, 0, 2000)
            .matches(&log));
        assert!(!contract
            .event_filter(HistoryKind::Claim, user, 0, 2000)
            .matches(&log));
    }
}
