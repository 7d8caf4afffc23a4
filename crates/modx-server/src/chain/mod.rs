//! EVM chain access
//!
//! [`ChainClient`] is the only way the rest of the server touches the
//! network. Amounts cross it as base-unit `U256`; conversion to human units
//! happens in the contract wrappers.

#[cfg(test)]
pub mod mock;
pub mod rpc;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Transaction {0} reverted")]
    Reverted(B256),

    #[error("Timed out waiting for {0}")]
    Timeout(String),
}

impl ChainError {
    /// True for the router's "no such pair along this path" rejection.
    pub fn is_path_rejection(&self) -> bool {
        let message = match self {
            ChainError::Rpc { message, .. } => message,
            ChainError::Transport(m) | ChainError::Decode(m) => m,
            ChainError::Reverted(_) | ChainError::Timeout(_) => return false,
        };
        message.contains("INVALID_PATH") || message.to_lowercase().contains("invalid path")
    }
}

pub type ChainResult<T> = Result<T, ChainError>;

/// A transaction to sign and submit from the connected account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl TxRequest {
    pub fn new(from: Address, to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from,
            to,
            data: data.into(),
            value: U256::ZERO,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// 4-byte function selector of the calldata.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// Submitted but not yet confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingTx {
    pub hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

/// A successful receipt. Reverted transactions surface as [`ChainError::Reverted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub hash: B256,
    pub block_number: u64,
    pub logs: Vec<Log>,
}

/// Event query over an inclusive block range. `None` topics match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topics: Vec<Option<B256>>,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogFilter {
    pub fn matches(&self, log: &Log) -> bool {
        log.address == self.address
            && log.block_number >= self.from_block
            && log.block_number <= self.to_block
            && self
                .topics
                .iter()
                .enumerate()
                .all(|(i, t)| t.map_or(true, |t| log.topics.get(i) == Some(&t)))
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Read-only contract call against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> ChainResult<Bytes>;

    async fn send(&self, tx: TxRequest) -> ChainResult<PendingTx>;

    /// Block until the transaction is mined. Fails if it reverted.
    async fn wait_for_receipt(&self, hash: B256) -> ChainResult<Receipt>;

    async fn query_logs(&self, filter: &LogFilter) -> ChainResult<Vec<Log>>;

    /// Native currency balance in base units.
    async fn get_balance(&self, account: Address) -> ChainResult<U256>;

    async fn block_number(&self) -> ChainResult<u64>;
}
