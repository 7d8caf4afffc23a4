//! In-process chain for tests.
//!
//! Calls are dispatched by (contract address, selector) to responders that
//! receive the decoded call and return ABI-encoded output, so the typed
//! bindings run end to end.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;

use super::{ChainClient, ChainError, ChainResult, Log, LogFilter, PendingTx, Receipt, TxRequest};

type Selector = [u8; 4];
type Responder = Arc<dyn Fn(&[u8]) -> ChainResult<Bytes> + Send + Sync>;

#[derive(Default)]
struct MockState {
    responders: HashMap<(Address, Selector), Responder>,
    call_counts: HashMap<(Address, Selector), usize>,
    sent: Vec<TxRequest>,
    send_failures: HashMap<Selector, ChainError>,
    reverting: HashSet<Selector>,
    receipt_logs: HashMap<Selector, Vec<Log>>,
    pending: HashMap<B256, Selector>,
    logs: Vec<Log>,
    log_failure: Option<ChainError>,
    log_queries: Vec<LogFilter>,
    balances: HashMap<Address, U256>,
    head: u64,
    call_delay: Option<Duration>,
    receipt_delay: Option<Duration>,
}

#[derive(Default)]
pub struct MockChain {
    state: Mutex<MockState>,
}

fn selector_of(data: &[u8]) -> Selector {
    let mut selector = [0u8; 4];
    if let Some(s) = data.get(..4) {
        selector.copy_from_slice(s);
    }
    selector
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Answer calls of `C` on `to` with `respond`.
    pub fn on<C>(&self, to: Address, respond: impl Fn(C) -> ChainResult<Vec<u8>> + Send + Sync + 'static)
    where
        C: SolCall + 'static,
    {
        let responder: Responder = Arc::new(move |data: &[u8]| {
            let call = C::abi_decode(data).map_err(|e| ChainError::Decode(e.to_string()))?;
            respond(call).map(Bytes::from)
        });
        self.with(|s| s.responders.insert((to, C::SELECTOR), responder));
    }

    /// Answer calls of `C` on `to` with a fixed error.
    pub fn fail<C: SolCall + 'static>(&self, to: Address, error: ChainError) {
        self.on::<C>(to, move |_| Err(error.clone()));
    }

    pub fn call_count<C: SolCall>(&self, to: Address) -> usize {
        self.with(|s| s.call_counts.get(&(to, C::SELECTOR)).copied().unwrap_or(0))
    }

    pub fn total_calls(&self) -> usize {
        self.with(|s| s.call_counts.values().sum())
    }

    pub fn set_call_delay(&self, delay: Duration) {
        self.with(|s| s.call_delay = Some(delay));
    }

    pub fn set_receipt_delay(&self, delay: Duration) {
        self.with(|s| s.receipt_delay = Some(delay));
    }

    pub fn fail_send<C: SolCall>(&self, error: ChainError) {
        self.with(|s| s.send_failures.insert(C::SELECTOR, error));
    }

    pub fn revert_on<C: SolCall>(&self) {
        self.with(|s| s.reverting.insert(C::SELECTOR));
    }

    pub fn receipt_logs_for<C: SolCall>(&self, logs: Vec<Log>) {
        self.with(|s| s.receipt_logs.insert(C::SELECTOR, logs));
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.with(|s| s.sent.clone())
    }

    pub fn sent_selectors(&self) -> Vec<Selector> {
        self.with(|s| s.sent.iter().map(|tx| selector_of(&tx.data)).collect())
    }

    pub fn push_log(&self, log: Log) {
        self.with(|s| s.logs.push(log));
    }

    pub fn fail_logs(&self, error: ChainError) {
        self.with(|s| s.log_failure = Some(error));
    }

    pub fn log_queries(&self) -> Vec<LogFilter> {
        self.with(|s| s.log_queries.clone())
    }

    pub fn set_balance(&self, account: Address, balance: U256) {
        self.with(|s| s.balances.insert(account, balance));
    }

    pub fn set_head(&self, head: u64) {
        self.with(|s| s.head = head);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn call(&self, to: Address, data: Bytes) -> ChainResult<Bytes> {
        let key = (to, selector_of(&data));
        let (responder, delay) = self.with(|s| {
            *s.call_counts.entry(key).or_default() += 1;
            (s.responders.get(&key).cloned(), s.call_delay)
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match responder {
            Some(respond) => respond(&data),
            None => Err(ChainError::Rpc {
                code: -32000,
                message: format!("execution reverted: no responder for {} 0x{}", to, alloy_primitives::hex::encode(key.1)),
            }),
        }
    }

    async fn send(&self, tx: TxRequest) -> ChainResult<PendingTx> {
        let selector = selector_of(&tx.data);
        self.with(|s| {
            if let Some(error) = s.send_failures.get(&selector) {
                return Err(error.clone());
            }
            s.sent.push(tx);
            let hash = B256::from(U256::from(s.sent.len()).to_be_bytes::<32>());
            s.pending.insert(hash, selector);
            Ok(PendingTx { hash })
        })
    }

    async fn wait_for_receipt(&self, hash: B256) -> ChainResult<Receipt> {
        if let Some(delay) = self.with(|s| s.receipt_delay) {
            tokio::time::sleep(delay).await;
        }
        self.with(|s| {
            let selector = s
                .pending
                .remove(&hash)
                .ok_or_else(|| ChainError::Timeout(format!("receipt of {}", hash)))?;
            if s.reverting.contains(&selector) {
                return Err(ChainError::Reverted(hash));
            }
            let logs = s
                .receipt_logs
                .get(&selector)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|log| Log {
                    tx_hash: hash,
                    block_number: s.head,
                    ..log
                })
                .collect();
            Ok(Receipt {
                hash,
                block_number: s.head,
                logs,
            })
        })
    }

    async fn query_logs(&self, filter: &LogFilter) -> ChainResult<Vec<Log>> {
        self.with(|s| {
            s.log_queries.push(filter.clone());
            if let Some(error) = &s.log_failure {
                return Err(error.clone());
            }
            Ok(s.logs.iter().filter(|log| filter.matches(log)).cloned().collect())
        })
    }

    async fn get_balance(&self, account: Address) -> ChainResult<U256> {
        Ok(self.with(|s| s.balances.get(&account).copied().unwrap_or_default()))
    }

    async fn block_number(&self) -> ChainResult<u64> {
        Ok(self.with(|s| s.head))
    }
}
