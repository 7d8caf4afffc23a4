use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;

use super::{read, transaction};
use crate::chain::{ChainClient, ChainResult, TxRequest};

sol! {
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256 balance);
        function decimals() external view returns (uint8 value);
        function allowance(address owner, address spender) external view returns (uint256 remaining);
        function approve(address spender, uint256 amount) external returns (bool success);
        function transfer(address to, uint256 amount) external returns (bool success);
    }
}

/// An ERC-20 token (also used for AMM pair LP tokens).
#[derive(Clone)]
pub struct Erc20Contract {
    chain: Arc<dyn ChainClient>,
    address: Address,
}

impl Erc20Contract {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { chain, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn balance_of(&self, account: Address) -> ChainResult<U256> {
        read(self.chain.as_ref(), self.address, IERC20::balanceOfCall { account }).await
    }

    pub async fn decimals(&self) -> ChainResult<u8> {
        read(self.chain.as_ref(), self.address, IERC20::decimalsCall).await
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> ChainResult<U256> {
        read(self.chain.as_ref(), self.address, IERC20::allowanceCall { owner, spender }).await
    }

    pub fn approve_tx(&self, from: Address, spender: Address, amount: U256) -> TxRequest {
        transaction(from, self.address, IERC20::approveCall { spender, amount })
    }

    pub fn transfer_tx(&self, from: Address, to: Address, amount: U256) -> TxRequest {
        transaction(from, self.address, IERC20::transferCall { to, amount })
    }
}
