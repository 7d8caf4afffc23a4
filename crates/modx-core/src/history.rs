//! Action history
//!
//! Two sources feed the history view: staking events reconstructed from
//! chain logs (bounded, newest block first) and swap/liquidity actions
//! recorded locally at confirmation time in capped most-recent-first lists.

use std::collections::HashSet;
use std::fmt;

use alloy_primitives::B256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Stake,
    Unstake,
    Claim,
    LiquidityAdd,
    LiquidityRemove,
    Swap,
}

impl HistoryKind {
    pub fn label(&self) -> &'static str {
        match self {
            HistoryKind::Stake => "stake",
            HistoryKind::Unstake => "unstake",
            HistoryKind::Claim => "claim",
            HistoryKind::LiquidityAdd => "liquidity_add",
            HistoryKind::LiquidityRemove => "liquidity_remove",
            HistoryKind::Swap => "swap",
        }
    }
}

impl fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Chain entries are ordered by block, local ones by wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum HistoryPoint {
    Block(u64),
    Timestamp(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryAmount {
    pub symbol: String,
    pub amount: Decimal,
}

impl HistoryAmount {
    pub fn new(symbol: impl Into<String>, amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub kind: HistoryKind,
    pub amounts: Vec<HistoryAmount>,
    pub point: HistoryPoint,
    pub reference_hash: B256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<u64>,
}

impl HistoryEntry {
    /// Entry decoded from a staking event log.
    pub fn from_chain(
        kind: HistoryKind,
        tx_hash: B256,
        log_index: u64,
        block_number: u64,
        amount: HistoryAmount,
        pool_id: Option<u64>,
    ) -> Self {
        Self {
            id: format!("{}-{}-{}", kind.label(), tx_hash, log_index),
            kind,
            amounts: vec![amount],
            point: HistoryPoint::Block(block_number),
            reference_hash: tx_hash,
            pool_id,
        }
    }

    /// Entry recorded when a swap or liquidity action confirmed.
    pub fn local(
        id: impl Into<String>,
        kind: HistoryKind,
        amounts: Vec<HistoryAmount>,
        tx_hash: B256,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            amounts,
            point: HistoryPoint::Timestamp(timestamp),
            reference_hash: tx_hash,
            pool_id: None,
        }
    }

    fn block(&self) -> u64 {
        match self.point {
            HistoryPoint::Block(b) => b,
            HistoryPoint::Timestamp(_) => 0,
        }
    }
}

/// Capped most-recent-first list of locally recorded actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentHistory {
    pub limit: usize,
    pub entries: Vec<HistoryEntry>,
}

impl RecentHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Vec::new(),
        }
    }

    /// Rehydrate a stored list, re-applying the current cap.
    pub fn from_entries(limit: usize, mut entries: Vec<HistoryEntry>) -> Self {
        entries.truncate(limit);
        Self { limit, entries }
    }

    /// Insert at the front, evicting the oldest beyond the cap.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(self.limit);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merge per-kind chain results: newest block first, duplicates dropped,
/// at most `limit` kept.
pub fn merge_chain_history(batches: Vec<Vec<HistoryEntry>>, limit: usize) -> Vec<HistoryEntry> {
    let mut seen = HashSet::new();
    let mut merged: Vec<HistoryEntry> = batches
        .into_iter()
        .flatten()
        .filter(|e| seen.insert(e.id.clone()))
        .collect();
    merged.sort_by(|a, b| b.block().cmp(&a.block()));
    merged.truncate(limit);
    merged
}
