//! Typed bindings for the deployed contracts the client talks to.

pub mod erc20;
pub mod nft;
pub mod router;
pub mod staking;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;

use crate::chain::{ChainClient, ChainError, ChainResult, TxRequest};

/// Encode `call`, run it read-only against `to` and decode its returns.
pub async fn read<C: SolCall>(chain: &dyn ChainClient, to: Address, call: C) -> ChainResult<C::Return> {
    let output = chain.call(to, call.abi_encode().into()).await?;
    C::abi_decode_returns(&output)
        .map_err(|e| ChainError::Decode(format!("{}: {}", C::SIGNATURE, e)))
}

/// Unsigned transaction invoking `call` on `to` from `from`.
pub fn transaction<C: SolCall>(from: Address, to: Address, call: C) -> TxRequest {
    TxRequest::new(from, to, call.abi_encode())
}

/// Narrow a chain integer, saturating on overflow.
pub fn saturating_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
