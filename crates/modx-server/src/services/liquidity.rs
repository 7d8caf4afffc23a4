//! Liquidity for the staking token / native pair: position snapshot,
//! add and remove through the router.

use std::sync::Arc;

use alloy_primitives::Address;
use chrono::Utc;
use modx_core::history::{HistoryAmount, HistoryEntry, HistoryKind};
use modx_core::liquidity::{lp_for_percentage, pro_rata, value_position, PairSnapshot, LP_DECIMALS};
use modx_core::units::to_base_units;
use modx_core::validation::{parse_amount, validate_percentage};
use modx_core::{LiquidityPosition, TokenInfo};
use uuid::Uuid;

use crate::chain::{ChainClient, ChainResult, Receipt};
use crate::contracts::erc20::Erc20Contract;
use crate::contracts::router::{FactoryContract, PairContract, RouterContract};
use crate::error::{AppError, AppResult};
use crate::pending::{ActionKey, TxTracker};
use crate::services::token::TokenService;

/// A confirmed liquidity change and its history entry.
#[derive(Debug, Clone)]
pub struct LiquidityOutcome {
    pub receipt: Receipt,
    pub entry: HistoryEntry,
}

/// The staking token / native currency pair.
#[derive(Clone)]
pub struct LiquidityService {
    chain: Arc<dyn ChainClient>,
    router: RouterContract,
    factory: FactoryContract,
    tokens: TokenService,
    tracker: TxTracker,
    token: TokenInfo,
    native_symbol: String,
    native_decimals: u8,
    wrapped_native: Address,
    deadline_secs: u64,
}

impl LiquidityService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: Arc<dyn ChainClient>,
        tracker: TxTracker,
        tokens: TokenService,
        router: Address,
        factory: Address,
        token: TokenInfo,
        wrapped_native: Address,
        deadline_secs: u64,
    ) -> Self {
        let (native_symbol, native_decimals) = tokens
            .registry()
            .iter()
            .find(|t| t.is_native())
            .map(|t| (t.symbol.clone(), t.decimals))
            .unwrap_or_else(|| ("BNB".to_string(), 18));
        Self {
            router: RouterContract::new(chain.clone(), router),
            factory: FactoryContract::new(chain.clone(), factory),
            chain,
            tokens,
            tracker,
            token,
            native_symbol,
            native_decimals,
            wrapped_native,
            deadline_secs,
        }
    }

    /// Pair balance, supply, reserves and orientation, read together.
    pub async fn snapshot(&self, user: Address) -> ChainResult<Option<PairSnapshot>> {
        let pair_address = self.factory.get_pair(self.token.address, self.wrapped_native).await?;
        if pair_address == Address::ZERO {
            tracing::debug!(token = %self.token.symbol, "No pair deployed for token");
            return Ok(None);
        }

        let pair = PairContract::new(self.chain.clone(), pair_address);
        let (lp_balance, total_supply, (reserve0, reserve1), token0) = tokio::try_join!(
            pair.balance_of(user),
            pair.total_supply(),
            pair.reserves(),
            pair.token0()
        )?;

        let token_side = (self.token.symbol.clone(), self.token.decimals);
        let native_side = (self.native_symbol.clone(), self.native_decimals);
        let ((token0_symbol, decimals0), (token1_symbol, decimals1)) = if token0 == self.token.address {
            (token_side, native_side)
        } else {
            (native_side, token_side)
        };

        Ok(Some(PairSnapshot {
            pair_address,
            token0_symbol,
            token1_symbol,
            lp_balance,
            total_supply,
            reserve0,
            reserve1,
            decimals0,
            decimals1,
            lp_decimals: LP_DECIMALS,
        }))
    }

    pub async fn position(&self, user: Address) -> ChainResult<Option<LiquidityPosition>> {
        Ok(self.snapshot(user).await?.as_ref().and_then(value_position))
    }

    pub async fn add_liquidity(&self, user: Address, token_amount: &str, native_amount: &str) -> AppResult<LiquidityOutcome> {
        let token_dec = parse_amount(token_amount)?;
        let native_dec = parse_amount(native_amount)?;
        let token_raw = to_base_units(token_amount, self.token.decimals)?;
        let native_raw = to_base_units(native_amount, self.native_decimals)?;

        let guard = self.tracker.begin(ActionKey::AddLiquidity)?;
        tracing::info!(
            account = %user,
            token_amount = %token_dec,
            native_amount = %native_dec,
            "Adding liquidity"
        );

        self.tokens
            .ensure_allowance(&guard, user, self.token.address, self.router.address(), token_raw)
            .await?;
        let add = self
            .router
            .add_liquidity_native_tx(user, self.token.address, token_raw, native_raw, self.deadline());
        let receipt = self.tracker.submit(&guard, "add_liquidity", add).await?;

        let entry = HistoryEntry::local(
            Uuid::new_v4().to_string(),
            HistoryKind::LiquidityAdd,
            vec![
                HistoryAmount::new(self.token.symbol.clone(), token_dec),
                HistoryAmount::new(self.native_symbol.clone(), native_dec),
            ],
            receipt.hash,
            Utc::now().timestamp(),
        );
        Ok(LiquidityOutcome { receipt, entry })
    }

    /// Burn `percentage` of the LP balance for the underlying tokens.
    pub async fn remove_liquidity(&self, user: Address, percentage: u32) -> AppResult<LiquidityOutcome> {
        let percentage = validate_percentage(percentage)?;
        let position = self
            .position(user)
            .await?
            .ok_or_else(|| AppError::NotFound("liquidity position".to_string()))?;
        let lp_amount = lp_for_percentage(position.lp_balance_raw, percentage)?;
        let (amount0, amount1) = pro_rata(&position, percentage)?;

        let guard = self.tracker.begin(ActionKey::RemoveLiquidity)?;
        tracing::info!(
            account = %user,
            pair = %position.pair_address,
            percentage = %percentage,
            lp_amount = %lp_amount,
            "Removing liquidity"
        );

        let approve = Erc20Contract::new(self.chain.clone(), position.pair_address)
            .approve_tx(user, self.router.address(), lp_amount);
        self.tracker.submit(&guard, "approve", approve).await?;

        let remove = self
            .router
            .remove_liquidity_native_tx(user, self.token.address, lp_amount, self.deadline());
        let receipt = self.tracker.submit(&guard, "remove_liquidity", remove).await?;

        let entry = HistoryEntry::local(
            Uuid::new_v4().to_string(),
            HistoryKind::LiquidityRemove,
            vec![
                HistoryAmount::new(position.token0_symbol.clone(), amount0),
                HistoryAmount::new(position.token1_symbol.clone(), amount1),
            ],
            receipt.hash,
            Utc::now().timestamp(),
        );
        Ok(LiquidityOutcome { receipt, entry })
    }

    fn deadline(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or_default() + self.deadline_secs
    }
}
