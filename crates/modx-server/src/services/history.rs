//! Transaction history
//!
//! Staking events are rebuilt from chain logs over a bounded block window;
//! swaps and liquidity changes come from per-account lists written when the
//! action confirmed.

use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::Address;
use modx_core::history::{merge_chain_history, HistoryEntry, HistoryKind, RecentHistory};
use serde::Serialize;

use crate::chain::{ChainClient, ChainResult, Log};
use crate::config::HistoryConfig;
use crate::contracts::staking::StakingContract;
use crate::error::AppResult;
use crate::store::{liquidity_history_key, swap_history_key, LocalStore};

const CHAIN_KINDS: [HistoryKind; 3] = [HistoryKind::Stake, HistoryKind::Unstake, HistoryKind::Claim];

/// Staking history, empty with a warning when the log scan failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChainHistory {
    pub entries: Vec<HistoryEntry>,
    pub warning: Option<String>,
}

#[derive(Clone)]
pub struct HistoryIndexer {
    chain: Arc<dyn ChainClient>,
    staking: StakingContract,
    symbol: String,
    config: HistoryConfig,
    store: LocalStore,
}

impl HistoryIndexer {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        staking: StakingContract,
        symbol: impl Into<String>,
        config: HistoryConfig,
        store: LocalStore,
    ) -> Self {
        Self {
            chain,
            staking,
            symbol: symbol.into(),
            config,
            store,
        }
    }

    /// Inclusive block range to scan for a chain at `head`.
    pub fn scan_window(&self, head: u64) -> (u64, u64) {
        let from = self
            .config
            .deployment_block
            .unwrap_or_else(|| head.saturating_sub(self.config.lookback_blocks));
        (from, head)
    }

    /// Most recent staking events of `user`. Never fails.
    pub async fn chain_history(&self, user: Address) -> ChainHistory {
        let start = Instant::now();
        match self.scan(user).await {
            Ok(entries) => {
                tracing::debug!(
                    account = %user,
                    entries = %entries.len(),
                    duration_ms = %start.elapsed().as_millis(),
                    "Chain history scanned"
                );
                ChainHistory {
                    entries,
                    warning: None,
                }
            }
            Err(e) => {
                tracing::warn!(account = %user, error = %e, "History scan failed, showing none");
                ChainHistory {
                    entries: Vec::new(),
                    warning: Some(format!("Transaction history unavailable: {}", e)),
                }
            }
        }
    }

    async fn scan(&self, user: Address) -> ChainResult<Vec<HistoryEntry>> {
        let head = self.chain.block_number().await?;
        let (from, to) = self.scan_window(head);
        let chunk = self.config.chunk_size.max(1);

        let mut batches = Vec::new();
        let mut chunk_start = from;
        while chunk_start <= to {
            let chunk_end = chunk_start.saturating_add(chunk - 1).min(to);
            let [stakes, unstakes, claims] = CHAIN_KINDS
                .map(|kind| self.staking.event_filter(kind, user, chunk_start, chunk_end));
            let (stakes, unstakes, claims) = tokio::try_join!(
                self.chain.query_logs(&stakes),
                self.chain.query_logs(&unstakes),
                self.chain.query_logs(&claims)
            )?;

            for (kind, logs) in CHAIN_KINDS.into_iter().zip([stakes, unstakes, claims]) {
                batches.push(self.decode(kind, &logs));
            }

            match chunk_end.checked_add(1) {
                Some(next) => chunk_start = next,
                None => break,
            }
        }

        Ok(merge_chain_history(batches, self.config.chain_limit))
    }

    fn decode(&self, kind: HistoryKind, logs: &[Log]) -> Vec<HistoryEntry> {
        logs.iter()
            .filter_map(|log| {
                let entry = self.staking.decode_event(kind, &self.symbol, log);
                if entry.is_none() {
                    tracing::debug!(kind = %kind, tx = %log.tx_hash, "Skipping undecodable event");
                }
                entry
            })
            .collect()
    }

    pub fn swaps(&self, user: Address) -> RecentHistory {
        self.load(&swap_history_key(user), self.config.swap_limit)
    }

    pub fn liquidity(&self, user: Address) -> RecentHistory {
        self.load(&liquidity_history_key(user), self.config.liquidity_limit)
    }

    pub fn record_swap(&self, user: Address, entry: HistoryEntry) -> AppResult<()> {
        self.record(&swap_history_key(user), self.config.swap_limit, entry)
    }

    pub fn record_liquidity(&self, user: Address, entry: HistoryEntry) -> AppResult<()> {
        self.record(&liquidity_history_key(user), self.config.liquidity_limit, entry)
    }

    fn load(&self, key: &str, limit: usize) -> RecentHistory {
        let entries = self.store.get::<Vec<HistoryEntry>>(key).unwrap_or_default();
        RecentHistory::from_entries(limit, entries)
    }

    fn record(&self, key: &str, limit: usize, entry: HistoryEntry) -> AppResult<()> {
        self.store.update(key, |entries: Option<Vec<HistoryEntry>>| {
            let mut history = RecentHistory::from_entries(limit, entries.unwrap_or_default());
            history.record(entry);
            history.entries
        })
    }
}
