//! Token registry, wallet balances and ERC-20 allowance and transfers.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use futures::future::join_all;
use modx_core::portfolio::Holding;
use modx_core::units::{from_base_units_lossy, to_base_units};
use modx_core::validation::parse_amount;
use modx_core::{CoreError, TokenInfo};
use rust_decimal::Decimal;

use crate::chain::{ChainClient, ChainResult, Receipt};
use crate::contracts::erc20::Erc20Contract;
use crate::error::{AppError, AppResult};
use crate::pending::{ActionKey, InFlightGuard, TxTracker};

/// Balances, allowances and plain token transfers for the registered tokens.
#[derive(Clone)]
pub struct TokenService {
    chain: Arc<dyn ChainClient>,
    tracker: TxTracker,
    registry: Arc<Vec<TokenInfo>>,
}

impl TokenService {
    pub fn new(chain: Arc<dyn ChainClient>, tracker: TxTracker, registry: Vec<TokenInfo>) -> Self {
        Self {
            chain,
            tracker,
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &[TokenInfo] {
        &self.registry
    }

    pub fn token(&self, symbol: &str) -> AppResult<&TokenInfo> {
        self.registry
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| CoreError::UnknownToken(symbol.to_string()).into())
    }

    fn erc20(&self, token: &TokenInfo) -> Erc20Contract {
        Erc20Contract::new(self.chain.clone(), token.address)
    }

    /// Raw balance in base units; native currency via `getBalance`.
    pub async fn balance_raw(&self, account: Address, token: &TokenInfo) -> ChainResult<U256> {
        if token.is_native() {
            self.chain.get_balance(account).await
        } else {
            self.erc20(token).balance_of(account).await
        }
    }

    pub async fn balance(&self, account: Address, token: &TokenInfo) -> ChainResult<Decimal> {
        let raw = self.balance_raw(account, token).await?;
        Ok(from_base_units_lossy(raw, token.decimals))
    }

    /// Every registered token's balance, read concurrently. A failed read
    /// counts as zero.
    pub async fn balances(&self, account: Address) -> Vec<Holding> {
        let reads = self.registry.iter().map(|token| async move {
            match self.balance(account, token).await {
                Ok(balance) => Holding::new(token.symbol.clone(), balance),
                Err(e) => {
                    tracing::warn!(
                        account = %account,
                        token = %token.symbol,
                        error = %e,
                        "Balance read failed, treating as zero"
                    );
                    Holding::new(token.symbol.clone(), Decimal::ZERO)
                }
            }
        });
        join_all(reads).await
    }

    pub async fn allowance(&self, owner: Address, token: &TokenInfo, spender: Address) -> ChainResult<Decimal> {
        let raw = self.erc20(token).allowance(owner, spender).await?;
        Ok(from_base_units_lossy(raw, token.decimals))
    }

    pub async fn approve(&self, owner: Address, symbol: &str, spender: Address, amount: &str) -> AppResult<Receipt> {
        let token = self.token(symbol)?.clone();
        if token.is_native() {
            return Err(CoreError::UnknownToken(format!("{} has no allowance", token.symbol)).into());
        }
        parse_amount(amount)?;
        let raw = to_base_units(amount, token.decimals)?;

        let guard = self.tracker.begin(ActionKey::TokenTransfer)?;
        tracing::info!(owner = %owner, token = %token.symbol, spender = %spender, amount = %amount, "Approving spender");
        self.tracker
            .submit(&guard, "approve", self.erc20(&token).approve_tx(owner, spender, raw))
            .await
    }

    pub async fn transfer(&self, owner: Address, symbol: &str, to: Address, amount: &str) -> AppResult<Receipt> {
        let token = self.token(symbol)?.clone();
        if token.is_native() {
            return Err(CoreError::UnknownToken(format!("{} cannot be sent as a token", token.symbol)).into());
        }
        parse_amount(amount)?;
        let raw = to_base_units(amount, token.decimals)?;

        let guard = self.tracker.begin(ActionKey::TokenTransfer)?;
        tracing::info!(owner = %owner, token = %token.symbol, to = %to, amount = %amount, "Transferring tokens");
        self.tracker
            .submit(&guard, "transfer", self.erc20(&token).transfer_tx(owner, to, raw))
            .await
    }

    /// Approve `spender` for `amount` only when the current allowance is lower.
    pub async fn ensure_allowance(
        &self,
        guard: &InFlightGuard,
        owner: Address,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> AppResult<Option<Receipt>> {
        let erc20 = Erc20Contract::new(self.chain.clone(), token);
        let current = erc20.allowance(owner, spender).await.map_err(AppError::Chain)?;
        if current >= amount {
            tracing::debug!(token = %token, spender = %spender, "Allowance already sufficient");
            return Ok(None);
        }
        let receipt = self
            .tracker
            .submit(guard, "approve", erc20.approve_tx(owner, spender, amount))
            .await?;
        Ok(Some(receipt))
    }
}
