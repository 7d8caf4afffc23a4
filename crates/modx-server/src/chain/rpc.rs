use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use alloy_primitives::{hex, Address, Bytes, B256, U256, U64};
use alloy_sol_types::{Revert, SolError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ChainClient, ChainError, ChainResult, Log, LogFilter, PendingTx, Receipt, TxRequest};
use crate::config::ChainConfig;

// ============================================================================
// JSON-RPC client for an EVM node
// ============================================================================

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: Option<U64>,
    transaction_hash: Option<B256>,
    log_index: Option<U64>,
}

impl From<RpcLog> for Log {
    fn from(log: RpcLog) -> Self {
        Self {
            address: log.address,
            topics: log.topics,
            data: log.data,
            block_number: log.block_number.map(|b| b.to::<u64>()).unwrap_or_default(),
            tx_hash: log.transaction_hash.unwrap_or_default(),
            log_index: log.log_index.map(|i| i.to::<u64>()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    block_number: Option<U64>,
    status: Option<U64>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

/// Revert reason from an error's `data`, when the node returns one.
fn revert_reason(data: &Option<Value>) -> Option<String> {
    let raw = data.as_ref()?.as_str()?;
    let bytes = hex::decode(raw).ok()?;
    Revert::abi_decode(&bytes).ok().map(|r| r.reason)
}

fn block_tag(block: u64) -> String {
    format!("0x{:x}", block)
}

pub struct RpcChainClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl RpcChainClient {
    pub fn new(config: &ChainConfig) -> Self {
        println!("[CHAIN] Initializing JSON-RPC client for {} (chain {})", config.rpc_url, config.chain_id);
        tracing::debug!(rpc_url = %config.rpc_url, chain_id = %config.chain_id, "Creating RPC chain client");

        Self {
            client: Client::new(),
            url: config.rpc_url.clone(),
            next_id: AtomicU64::new(1),
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs),
            poll_interval: Duration::from_millis(config.receipt_poll_ms),
        }
    }

    /// Send one JSON-RPC request and decode its `result`.
    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<Option<T>> {
        let start = Instant::now();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(method = %method, error = %e, "RPC request failed");
                ChainError::Transport(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChainError::Transport(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let parsed: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| ChainError::Decode(format!("{} response: {}", method, e)))?;

        tracing::trace!(
            method = %method,
            duration_ms = %start.elapsed().as_millis(),
            "RPC request completed"
        );

        if let Some(error) = parsed.error {
            let message = match revert_reason(&error.data) {
                Some(reason) if !error.message.contains(&reason) => format!("{}: {}", error.message, reason),
                _ => error.message,
            };
            return Err(ChainError::Rpc {
                code: error.code,
                message,
            });
        }

        Ok(parsed.result)
    }

    async fn request_required<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<T> {
        self.request(method, params)
            .await?
            .ok_or_else(|| ChainError::Decode(format!("{} returned no result", method)))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn call(&self, to: Address, data: Bytes) -> ChainResult<Bytes> {
        self.request_required("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }

    async fn send(&self, tx: TxRequest) -> ChainResult<PendingTx> {
        let hash: B256 = self
            .request_required(
                "eth_sendTransaction",
                json!([{
                    "from": tx.from,
                    "to": tx.to,
                    "data": tx.data,
                    "value": tx.value,
                }]),
            )
            .await?;

        tracing::info!(hash = %hash, to = %tx.to, "Transaction submitted");
        Ok(PendingTx { hash })
    }

    async fn wait_for_receipt(&self, hash: B256) -> ChainResult<Receipt> {
        let start = Instant::now();
        loop {
            let receipt: Option<RpcReceipt> = self
                .request("eth_getTransactionReceipt", json!([hash]))
                .await?;

            if let Some(receipt) = receipt {
                if receipt.block_number.is_some() {
                    if receipt.status.map(|s| s.is_zero()).unwrap_or(false) {
                        tracing::error!(hash = %hash, "Transaction reverted");
                        return Err(ChainError::Reverted(hash));
                    }
                    tracing::info!(
                        hash = %hash,
                        duration_ms = %start.elapsed().as_millis(),
                        "Transaction confirmed"
                    );
                    return Ok(Receipt {
                        hash: receipt.transaction_hash,
                        block_number: receipt.block_number.map(|b| b.to::<u64>()).unwrap_or_default(),
                        logs: receipt.logs.into_iter().map(Log::from).collect(),
                    });
                }
            }

            if start.elapsed() >= self.confirm_timeout {
                return Err(ChainError::Timeout(format!("receipt of {}", hash)));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn query_logs(&self, filter: &LogFilter) -> ChainResult<Vec<Log>> {
        let logs: Vec<RpcLog> = self
            .request_required(
                "eth_getLogs",
                json!([{
                    "address": filter.address,
                    "topics": filter.topics,
                    "fromBlock": block_tag(filter.from_block),
                    "toBlock": block_tag(filter.to_block),
                }]),
            )
            .await?;
        Ok(logs.into_iter().map(Log::from).collect())
    }

    async fn get_balance(&self, account: Address) -> ChainResult<U256> {
        self.request_required("eth_getBalance", json!([account, "latest"]))
            .await
    }

    async fn block_number(&self) -> ChainResult<u64> {
        let block: U64 = self.request_required("eth_blockNumber", json!([])).await?;
        Ok(block.to::<u64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_deserializes() {
        let raw = json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "blockNumber": "0x1b4",
            "status": "0x1",
            "logs": [{
                "address": "0x0000000000000000000000000000000000000001",
                "topics": [format!("0x{}", "11".repeat(32))],
                "data": "0x",
                "blockNumber": "0x1b4",
                "transactionHash": format!("0x{}", "ab".repeat(32)),
                "logIndex": "0x2"
            }]
        });
        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();
        assert_eq!(receipt.block_number.map(|b| b.to::<u64>()), Some(436));
        let log = Log::from(receipt.logs.into_iter().next().unwrap());
        assert_eq!(log.log_index, 2);
        assert_eq!(log.block_number, 436);
    }

    #[test]
    fn test_rpc_error_keeps_revert_reason() {
        let body: RpcResponse<Bytes> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": 3, "message": "execution reverted", "data": "0x08c379a0\
                0000000000000000000000000000000000000000000000000000000000000020\
                000000000000000000000000000000000000000000000000000000000000001c\
                50616e63616b654c6962726172793a20494e56414c49445f5041544800000000" }
        }))
        .unwrap();
        let error = body.error.unwrap();
        assert_eq!(revert_reason(&error.data).as_deref(), Some("PancakeLibrary: INVALID_PATH"));
    }

    #[test]
    fn test_block_tag() {
        assert_eq!(block_tag(0), "0x0");
        assert_eq!(block_tag(255), "0xff");
    }
}
