//! Submitted-but-unconfirmed transactions and the in-flight guard.
//!
//! A mutation holds an [`InFlightGuard`] for its whole lifetime so a second
//! mutation under the same key is rejected with `Busy`. While a transaction
//! waits for its receipt it is listed as a [`PendingAction`]; it leaves the
//! list when the receipt arrives or the wait fails, never becoming confirmed
//! state on its own.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::chain::{ChainClient, Receipt, TxRequest};
use crate::error::{AppError, AppResult};

/// What a mutation touches. Stake, unstake and claim on one pool share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "pool_id", rename_all = "snake_case")]
pub enum ActionKey {
    Pool(u64),
    Swap,
    AddLiquidity,
    RemoveLiquidity,
    TokenTransfer,
    Nft,
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKey::Pool(id) => write!(f, "pool {}", id),
            ActionKey::Swap => write!(f, "swap"),
            ActionKey::AddLiquidity => write!(f, "add liquidity"),
            ActionKey::RemoveLiquidity => write!(f, "remove liquidity"),
            ActionKey::TokenTransfer => write!(f, "token transfer"),
            ActionKey::Nft => write!(f, "nft"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingAction {
    pub id: Uuid,
    pub key: ActionKey,
    /// Step within the action (e.g., "approve", "stake")
    pub step: String,
    pub hash: B256,
    pub submitted_at: DateTime<Utc>,
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    key: ActionKey,
    keys: Arc<Mutex<HashSet<ActionKey>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.remove(&self.key);
    }
}

#[derive(Clone)]
pub struct TxTracker {
    chain: Arc<dyn ChainClient>,
    in_flight: Arc<Mutex<HashSet<ActionKey>>>,
    pending: Arc<RwLock<Vec<PendingAction>>>,
}

impl TxTracker {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self {
            chain,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            pending: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Claim `key`, or `Busy` if another mutation holds it.
    pub fn begin(&self, key: ActionKey) -> AppResult<InFlightGuard> {
        let mut keys = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.insert(key) {
            return Err(AppError::Busy(key.to_string()));
        }
        Ok(InFlightGuard {
            key,
            keys: self.in_flight.clone(),
        })
    }

    /// Submit `tx` and wait for its receipt.
    ///
    /// The wait runs on its own task, so the pending entry is cleared when
    /// the receipt arrives even if the caller stops waiting. Submission and
    /// revert failures come back as `Transaction` errors carrying the
    /// underlying cause.
    pub async fn submit(&self, guard: &InFlightGuard, step: &str, tx: TxRequest) -> AppResult<Receipt> {
        let key = guard.key;
        let sent = self.chain.send(tx).await.map_err(|e| {
            tracing::error!(action = %key, step = %step, error = %e, "Transaction submission failed");
            AppError::Transaction(e)
        })?;

        let id = Uuid::new_v4();
        let hash = sent.hash;
        self.pending.write().await.push(PendingAction {
            id,
            key,
            step: step.to_string(),
            hash,
            submitted_at: Utc::now(),
        });
        tracing::info!(action = %key, step = %step, hash = %hash, "Awaiting confirmation");

        let chain = self.chain.clone();
        let pending = self.pending.clone();
        let waiter = tokio::spawn(async move {
            let result = chain.wait_for_receipt(hash).await;
            pending.write().await.retain(|p| p.id != id);
            result
        });
        let result = waiter
            .await
            .map_err(|e| AppError::Internal(format!("Receipt wait for {} aborted: {}", hash, e)))?;

        result.map_err(|e| {
            tracing::error!(action = %key, step = %step, hash = %hash, error = %e, "Transaction failed");
            AppError::Transaction(e)
        })
    }

    pub async fn pending(&self) -> Vec<PendingAction> {
        self.pending.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use crate::chain::ChainError;
    use crate::contracts::erc20::IERC20;
    use std::time::Duration;

    use alloy_primitives::{Address, U256};
    use alloy_sol_types::SolCall;
    use tokio_test::{assert_err, assert_ok};

    fn approve() -> TxRequest {
        TxRequest::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            IERC20::approveCall {
                spender: Address::repeat_byte(3),
                amount: U256::from(5u64),
            }
            .abi_encode(),
        )
    }

    #[test]
    fn test_same_key_is_busy_until_dropped() {
        let tracker = TxTracker::new(Arc::new(MockChain::new()));
        let guard = assert_ok!(tracker.begin(ActionKey::Pool(1)));
        let busy = assert_err!(tracker.begin(ActionKey::Pool(1)));
        assert!(matches!(busy, AppError::Busy(_)));
        assert_ok!(tracker.begin(ActionKey::Pool(2)));
        drop(guard);
        assert_ok!(tracker.begin(ActionKey::Pool(1)));
    }

    #[tokio::test]
    async fn test_submit_clears_pending() {
        let tracker = TxTracker::new(Arc::new(MockChain::new()));
        let guard = tracker.begin(ActionKey::TokenTransfer).unwrap();
        let receipt = tracker.submit(&guard, "approve", approve()).await.unwrap();
        assert_ne!(receipt.hash, B256::ZERO);
        assert!(tracker.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_revert_is_transaction_error() {
        let chain = Arc::new(MockChain::new());
        chain.revert_on::<IERC20::approveCall>();
        let tracker = TxTracker::new(chain);
        let guard = tracker.begin(ActionKey::TokenTransfer).unwrap();
        let err = tracker.submit(&guard, "approve", approve()).await.unwrap_err();
        assert!(matches!(err, AppError::Transaction(ChainError::Reverted(_))));
        assert!(tracker.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_wait_still_clears_pending() {
        let chain = Arc::new(MockChain::new());
        chain.set_receipt_delay(Duration::from_millis(100));
        let tracker = TxTracker::new(chain);
        let guard = tracker.begin(ActionKey::Swap).unwrap();

        let cut = tokio::time::timeout(Duration::from_millis(20), tracker.submit(&guard, "swap", approve())).await;
        assert!(cut.is_err());
        assert_eq!(tracker.pending().await.len(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(tracker.pending().await.is_empty());
    }
}
