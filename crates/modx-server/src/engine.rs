//! Account state and the operations behind the HTTP API
//!
//! `Engine` ties the services to the [`Session`]. Confirmed state (pools,
//! stakes, liquidity position, staking history) lives in one
//! [`AccountState`] that a refresh replaces wholesale. Mutations never patch
//! it; after a receipt they trigger a refresh, after a failure they leave it
//! alone.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use modx_core::alarm::PriceAlarm;
use modx_core::history::HistoryEntry;
use modx_core::portfolio::{aggregate, Holding};
use modx_core::profile::{generate_profile, UserProfile};
use modx_core::reward::{estimate_prospective_reward, pending_reward};
use modx_core::{CoreError, LiquidityPosition, Pool, PortfolioSnapshot, PriceTable, Stake, TokenInfo};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::chain::{ChainClient, Receipt};
use crate::config::AppConfig;
use crate::contracts::staking::StakingContract;
use crate::error::{AppError, AppResult};
use crate::pending::{PendingAction, TxTracker};
use crate::price_feed::PriceFeed;
use crate::services::history::{ChainHistory, HistoryIndexer};
use crate::services::liquidity::{LiquidityOutcome, LiquidityService};
use crate::services::nft::{MintedNft, NftDetails, NftService};
use crate::services::staking::PositionAccountant;
use crate::services::swap::{SwapOutcome, SwapQuote, SwapService};
use crate::services::token::TokenService;
use crate::session::Session;
use crate::store::{profile_key, LocalStore, PRICE_ALARM_KEY};

/// Everything a positions refresh produces for one account.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountState {
    pub account: Option<Address>,
    pub pools: Vec<Pool>,
    pub stakes: Vec<Stake>,
    pub liquidity: Option<LiquidityPosition>,
    pub chain_history: ChainHistory,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Ticket of the refresh that produced this state
    #[serde(skip)]
    pub generation: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggeredAlarm {
    pub alarm: PriceAlarm,
    pub price: Decimal,
    pub triggered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub chain: Vec<HistoryEntry>,
    pub warning: Option<String>,
    pub swaps: Vec<HistoryEntry>,
    pub liquidity: Vec<HistoryEntry>,
}

#[derive(Clone)]
pub struct Engine {
    session: Session,
    tracker: TxTracker,
    tokens: TokenService,
    staking: PositionAccountant,
    swaps: SwapService,
    liquidity: LiquidityService,
    history: HistoryIndexer,
    nft: NftService,
    prices: Arc<dyn PriceFeed>,
    store: LocalStore,
    staking_token: TokenInfo,
    state: Arc<RwLock<AccountState>>,
    refresh_issued: Arc<AtomicU64>,
    triggered: Arc<RwLock<Option<TriggeredAlarm>>>,
    balance_cache: Cache<Address, Arc<Vec<Holding>>>,
    price_cache: Cache<(), Arc<PriceTable>>,
}

impl Engine {
    pub fn new(
        config: &AppConfig,
        chain: Arc<dyn ChainClient>,
        prices: Arc<dyn PriceFeed>,
        store: LocalStore,
        session: Session,
    ) -> AppResult<Self> {
        let contracts = config.contracts.parse()?;
        let registry = config.token_registry()?;
        let staking_token = registry
            .iter()
            .find(|t| t.address == contracts.token)
            .cloned()
            .unwrap_or_else(|| TokenInfo {
                symbol: "modX".to_string(),
                name: "modX Token".to_string(),
                address: contracts.token,
                decimals: 18,
            });

        let tracker = TxTracker::new(chain.clone());
        let tokens = TokenService::new(chain.clone(), tracker.clone(), registry);
        let staking = PositionAccountant::new(
            chain.clone(),
            tracker.clone(),
            contracts.staking,
            contracts.token,
            staking_token.decimals,
        );
        let swaps = SwapService::new(
            chain.clone(),
            tracker.clone(),
            tokens.clone(),
            contracts.router,
            contracts.factory,
            contracts.wrapped_native,
            config.swap.clone(),
        );
        let liquidity = LiquidityService::new(
            chain.clone(),
            tracker.clone(),
            tokens.clone(),
            contracts.router,
            contracts.factory,
            staking_token.clone(),
            contracts.wrapped_native,
            config.swap.deadline_secs,
        );
        let history = HistoryIndexer::new(
            chain.clone(),
            StakingContract::new(chain.clone(), contracts.staking, staking_token.decimals),
            staking_token.symbol.clone(),
            config.history.clone(),
            store.clone(),
        );
        let nft = NftService::new(chain, tracker.clone(), contracts.nft);

        // Requests inside one window share a single fetch
        let window = Duration::from_millis(config.refresh.coalesce_window_ms.max(1));

        Ok(Self {
            session,
            tracker,
            tokens,
            staking,
            swaps,
            liquidity,
            history,
            nft,
            prices,
            store,
            staking_token,
            state: Arc::new(RwLock::new(AccountState::default())),
            refresh_issued: Arc::new(AtomicU64::new(0)),
            triggered: Arc::new(RwLock::new(None)),
            balance_cache: Cache::builder().max_capacity(64).time_to_live(window).build(),
            price_cache: Cache::builder().max_capacity(1).time_to_live(window).build(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn staking_token(&self) -> &TokenInfo {
        &self.staking_token
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Re-read pools, stakes, the liquidity position and staking history for
    /// the connected account. Read failures degrade to empty collections.
    /// The result is dropped if the account changed while reading or a
    /// refresh started later has already landed.
    pub async fn refresh_positions(&self) {
        let Some(account) = self.session.account() else {
            return;
        };
        let ticket = self.begin_refresh();
        let start = Instant::now();
        let now = Utc::now().timestamp();

        let pools = self.staking.pools().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Pool read failed, showing none");
            Vec::new()
        });
        let (stakes, liquidity, chain_history) = tokio::join!(
            self.staking.stakes(account, &pools, now),
            self.liquidity.position(account),
            self.history.chain_history(account)
        );
        let stakes = stakes.unwrap_or_else(|e| {
            tracing::warn!(account = %account, error = %e, "Stake read failed, showing none");
            Vec::new()
        });
        let liquidity = liquidity.unwrap_or_else(|e| {
            tracing::warn!(account = %account, error = %e, "Liquidity read failed, showing none");
            None
        });

        let loaded = AccountState {
            account: Some(account),
            pools,
            stakes,
            liquidity,
            chain_history,
            refreshed_at: Some(Utc::now()),
            generation: ticket,
        };
        if self.commit_positions(loaded).await {
            tracing::info!(
                account = %account,
                ticket = %ticket,
                duration_ms = %start.elapsed().as_millis(),
                "Positions refreshed"
            );
        }
    }

    fn begin_refresh(&self) -> u64 {
        self.refresh_issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Install `loaded` unless the session moved to another account or a
    /// newer refresh already wrote its result.
    async fn commit_positions(&self, loaded: AccountState) -> bool {
        let mut state = self.state.write().await;
        if self.session.account() != loaded.account {
            tracing::debug!(account = ?loaded.account, "Account changed during refresh, discarding result");
            return false;
        }
        if state.account == loaded.account && state.generation > loaded.generation {
            tracing::debug!(
                ticket = %loaded.generation,
                current = %state.generation,
                "Newer positions already loaded, discarding result"
            );
            return false;
        }
        tracing::debug!(
            pools = %loaded.pools.len(),
            stakes = %loaded.stakes.len(),
            has_liquidity = %loaded.liquidity.is_some(),
            "Installing positions"
        );
        *state = loaded;
        true
    }

    /// Fresh balances and prices, then the alarm check. Returns the alarm if
    /// this refresh triggered it.
    pub async fn refresh_market(&self) -> Option<PriceAlarm> {
        self.price_cache.invalidate(&()).await;
        if let Some(account) = self.session.account() {
            self.balance_cache.invalidate(&account).await;
        }
        let (_, prices) = tokio::join!(self.refresh_balances(), self.prices());
        self.check_alarm(&prices).await
    }

    async fn refresh_balances(&self) {
        if let Some(account) = self.session.account() {
            self.balances(account).await;
        }
    }

    /// Drop everything held for the previous account.
    pub async fn reset_account_state(&self) {
        *self.state.write().await = AccountState::default();
        self.balance_cache.invalidate_all();
    }

    async fn refresh_after_receipt(&self, account: Address) {
        self.balance_cache.invalidate(&account).await;
        tokio::join!(self.refresh_positions(), self.refresh_balances());
    }

    /// Positions for `account`, refreshing first when none are loaded for it.
    async fn positions(&self, account: Address) -> AccountState {
        {
            let state = self.state.read().await;
            if state.account == Some(account) && state.refreshed_at.is_some() {
                return state.clone();
            }
        }
        self.refresh_positions().await;
        let state = self.state.read().await;
        if state.account == Some(account) {
            state.clone()
        } else {
            AccountState::default()
        }
    }

    /// Wallet balances of every registered token, coalesced per account.
    pub async fn balances(&self, account: Address) -> Arc<Vec<Holding>> {
        let tokens = self.tokens.clone();
        self.balance_cache
            .get_with(account, async move { Arc::new(tokens.balances(account).await) })
            .await
    }

    /// Current price table, coalesced across callers.
    pub async fn prices(&self) -> Arc<PriceTable> {
        let feed = self.prices.clone();
        self.price_cache
            .get_with((), async move { Arc::new(feed.get_prices().await) })
            .await
    }

    /// Run a mutation on its own task and wait for it. The receipt wait,
    /// history record and refresh complete even if the caller goes away.
    async fn detached<T, F, Fut>(&self, work: F) -> AppResult<T>
    where
        F: FnOnce(Engine) -> Fut,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(work(self.clone()))
            .await
            .map_err(|e| AppError::Internal(format!("Mutation task failed: {}", e)))?
    }

    // =========================================================================
    // Staking
    // =========================================================================

    /// Pools from the last refresh, or a live read when none is loaded.
    pub async fn pools(&self) -> AppResult<Vec<Pool>> {
        {
            let state = self.state.read().await;
            if state.refreshed_at.is_some() && !state.pools.is_empty() {
                return Ok(state.pools.clone());
            }
        }
        Ok(self.staking.pools().await?)
    }

    pub async fn stakes(&self) -> AppResult<Vec<Stake>> {
        let account = self.session.require_account()?;
        let now = Utc::now().timestamp();
        Ok(self
            .positions(account)
            .await
            .stakes
            .into_iter()
            .map(|s| s.observe(now))
            .collect())
    }

    async fn pool(&self, pool_id: u64) -> AppResult<Option<Pool>> {
        Ok(self.pools().await?.into_iter().find(|p| p.pool_id == pool_id))
    }

    pub async fn stake(&self, amount: &str, pool_id: u64) -> AppResult<Receipt> {
        let account = self.session.require_account()?;
        let amount = amount.to_string();
        self.detached(move |engine| async move {
            let pool = engine.pool(pool_id).await?;
            let receipt = engine.staking.stake(account, &amount, pool_id, pool.as_ref()).await?;
            engine.refresh_after_receipt(account).await;
            Ok(receipt)
        })
        .await
    }

    pub async fn unstake(&self, pool_id: u64) -> AppResult<Receipt> {
        let account = self.session.require_account()?;
        self.detached(move |engine| async move {
            let receipt = engine.staking.unstake(account, pool_id).await?;
            engine.refresh_after_receipt(account).await;
            Ok(receipt)
        })
        .await
    }

    pub async fn claim_rewards(&self, pool_id: u64) -> AppResult<Receipt> {
        let account = self.session.require_account()?;
        self.detached(move |engine| async move {
            let receipt = engine.staking.claim_rewards(account, pool_id).await?;
            engine.refresh_after_receipt(account).await;
            Ok(receipt)
        })
        .await
    }

    /// Full-term reward for staking `amount` in `pool_id`; zero for bad input.
    pub async fn estimated_rewards(&self, amount: &str, pool_id: u64) -> Decimal {
        match self.pool(pool_id).await {
            Ok(pool) => estimate_prospective_reward(amount, pool.as_ref()),
            Err(e) => {
                tracing::debug!(pool_id = %pool_id, error = %e, "Pool unavailable for estimate");
                Decimal::ZERO
            }
        }
    }

    /// Accrued reward of the connected account's stake in `pool_id`.
    pub async fn pending_rewards(&self, pool_id: u64) -> AppResult<Decimal> {
        let account = self.session.require_account()?;
        let now = Utc::now().timestamp();
        Ok(self
            .positions(account)
            .await
            .stakes
            .iter()
            .find(|s| s.pool_id == pool_id)
            .map(|s| pending_reward(s, now))
            .unwrap_or(Decimal::ZERO))
    }

    // =========================================================================
    // Swap
    // =========================================================================

    pub async fn swap_quote(&self, input: &str, from: &str, to: &str) -> AppResult<Option<SwapQuote>> {
        self.swaps.request_quote(input, from, to).await
    }

    pub async fn latest_quote(&self) -> Option<SwapQuote> {
        self.swaps.quotes().latest().await
    }

    pub fn default_slippage(&self) -> Decimal {
        self.swaps.default_slippage()
    }

    /// Expected output of `input`; zero for invalid input or no route.
    pub async fn swap_amount(&self, input: &str, from: &str, to: &str) -> AppResult<Decimal> {
        self.swaps.calculate_swap_amount(input, from, to).await
    }

    pub async fn price_impact(&self, input: &str, from: &str, to: &str) -> Decimal {
        self.swaps.calculate_price_impact(input, from, to).await
    }

    pub async fn exchange_rate(&self, from: &str, to: &str) -> Decimal {
        self.prices().await.exchange_rate(from, to)
    }

    pub async fn execute_swap(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        quoted: &str,
        slippage_percent: Option<Decimal>,
    ) -> AppResult<SwapOutcome> {
        let account = self.session.require_account()?;
        let (from, to, amount, quoted) = (from.to_string(), to.to_string(), amount.to_string(), quoted.to_string());
        self.detached(move |engine| async move {
            let outcome = engine
                .swaps
                .execute_swap(account, &from, &to, &amount, &quoted, slippage_percent)
                .await?;

            if let Err(e) = engine.history.record_swap(account, outcome.entry.clone()) {
                tracing::warn!(account = %account, error = %e, "Failed to record swap history");
            }
            engine.balance_cache.invalidate(&account).await;
            engine.refresh_balances().await;
            Ok(outcome)
        })
        .await
    }

    // =========================================================================
    // Liquidity
    // =========================================================================

    pub async fn liquidity_position(&self) -> AppResult<Option<LiquidityPosition>> {
        let account = self.session.require_account()?;
        Ok(self.positions(account).await.liquidity)
    }

    pub async fn add_liquidity(&self, token_amount: &str, native_amount: &str) -> AppResult<LiquidityOutcome> {
        let account = self.session.require_account()?;
        let (token_amount, native_amount) = (token_amount.to_string(), native_amount.to_string());
        self.detached(move |engine| async move {
            let outcome = engine
                .liquidity
                .add_liquidity(account, &token_amount, &native_amount)
                .await?;
            engine.record_liquidity(account, &outcome);
            engine.refresh_after_receipt(account).await;
            Ok(outcome)
        })
        .await
    }

    pub async fn remove_liquidity(&self, percentage: u32) -> AppResult<LiquidityOutcome> {
        let account = self.session.require_account()?;
        self.detached(move |engine| async move {
            let outcome = engine.liquidity.remove_liquidity(account, percentage).await?;
            engine.record_liquidity(account, &outcome);
            engine.refresh_after_receipt(account).await;
            Ok(outcome)
        })
        .await
    }

    fn record_liquidity(&self, account: Address, outcome: &LiquidityOutcome) {
        if let Err(e) = self.history.record_liquidity(account, outcome.entry.clone()) {
            tracing::warn!(account = %account, error = %e, "Failed to record liquidity history");
        }
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    pub async fn wallet_balances(&self) -> AppResult<Arc<Vec<Holding>>> {
        let account = self.session.require_account()?;
        Ok(self.balances(account).await)
    }

    pub async fn allowance(&self, symbol: &str, spender: Address) -> AppResult<Decimal> {
        let account = self.session.require_account()?;
        let token = self.tokens.token(symbol)?;
        if token.is_native() {
            return Err(CoreError::UnknownToken(format!("{} has no allowance", token.symbol)).into());
        }
        Ok(self.tokens.allowance(account, token, spender).await?)
    }

    pub async fn approve(&self, symbol: &str, spender: Address, amount: &str) -> AppResult<Receipt> {
        let account = self.session.require_account()?;
        let (symbol, amount) = (symbol.to_string(), amount.to_string());
        self.detached(move |engine| async move {
            engine.tokens.approve(account, &symbol, spender, &amount).await
        })
        .await
    }

    pub async fn transfer(&self, symbol: &str, to: Address, amount: &str) -> AppResult<Receipt> {
        let account = self.session.require_account()?;
        let (symbol, amount) = (symbol.to_string(), amount.to_string());
        self.detached(move |engine| async move {
            let receipt = engine.tokens.transfer(account, &symbol, to, &amount).await?;
            engine.balance_cache.invalidate(&account).await;
            Ok(receipt)
        })
        .await
    }

    // =========================================================================
    // Portfolio, history, profile
    // =========================================================================

    pub async fn portfolio(&self) -> AppResult<PortfolioSnapshot> {
        let account = self.session.require_account()?;
        let (positions, balances, prices) =
            tokio::join!(self.positions(account), self.balances(account), self.prices());
        Ok(aggregate(
            &balances,
            &self.staking_token.symbol,
            &positions.stakes,
            &prices,
            Utc::now().timestamp(),
        ))
    }

    pub async fn history(&self) -> AppResult<HistoryView> {
        let account = self.session.require_account()?;
        let positions = self.positions(account).await;
        Ok(HistoryView {
            chain: positions.chain_history.entries,
            warning: positions.chain_history.warning,
            swaps: self.history.swaps(account).entries,
            liquidity: self.history.liquidity(account).entries,
        })
    }

    pub fn profile(&self) -> AppResult<UserProfile> {
        let account = self.session.require_account()?;
        let key = profile_key(account);
        if let Some(profile) = self.store.get::<UserProfile>(&key) {
            return Ok(profile);
        }
        let profile = generate_profile(account);
        if let Err(e) = self.store.put(&key, &profile) {
            tracing::warn!(account = %account, error = %e, "Failed to cache profile");
        }
        Ok(profile)
    }

    pub async fn pending(&self) -> Vec<PendingAction> {
        self.tracker.pending().await
    }

    // =========================================================================
    // Price alarm
    // =========================================================================

    pub async fn set_alarm(&self, token: &str, target_price: &str) -> AppResult<PriceAlarm> {
        let prices = self.prices().await;
        let quote = prices
            .quotes
            .values()
            .find(|q| q.symbol.eq_ignore_ascii_case(token))
            .ok_or_else(|| CoreError::UnknownToken(token.to_string()))?;
        let alarm = PriceAlarm::new(quote.symbol.clone(), target_price, quote.price)?;
        self.store.put(PRICE_ALARM_KEY, &alarm)?;
        tracing::info!(
            token = %alarm.token,
            target = %alarm.target_price,
            reference = %alarm.reference_price,
            "Price alarm set"
        );
        Ok(alarm)
    }

    pub fn alarm(&self) -> Option<PriceAlarm> {
        self.store.get(PRICE_ALARM_KEY)
    }

    pub fn clear_alarm(&self) -> AppResult<()> {
        self.store.remove(PRICE_ALARM_KEY)
    }

    /// The last triggered alarm, handed out once.
    pub async fn take_triggered_alarm(&self) -> Option<TriggeredAlarm> {
        self.triggered.write().await.take()
    }

    async fn check_alarm(&self, prices: &PriceTable) -> Option<PriceAlarm> {
        let alarm = self.alarm()?;
        let price = prices.price(&alarm.token)?;
        if !alarm.is_triggered(price) {
            return None;
        }

        println!(
            "[ALARM] {} reached {} (target {}, set at {})",
            alarm.token, price, alarm.target_price, alarm.reference_price
        );
        tracing::info!(token = %alarm.token, price = %price, target = %alarm.target_price, "Price alarm triggered");
        if let Err(e) = self.clear_alarm() {
            tracing::warn!(error = %e, "Failed to remove triggered alarm");
        }
        *self.triggered.write().await = Some(TriggeredAlarm {
            alarm: alarm.clone(),
            price,
            triggered_at: Utc::now(),
        });
        Some(alarm)
    }

    // =========================================================================
    // NFTs
    // =========================================================================

    pub async fn mint_nft(&self, uri: &str, license: &str) -> AppResult<MintedNft> {
        let account = self.session.require_account()?;
        let (uri, license) = (uri.to_string(), license.to_string());
        self.detached(move |engine| async move { engine.nft.mint(account, &uri, &license).await })
            .await
    }

    pub async fn burn_nft(&self, token_id: U256) -> AppResult<B256> {
        let account = self.session.require_account()?;
        self.detached(move |engine| async move { engine.nft.burn(account, token_id).await })
            .await
    }

    pub async fn transfer_nft(&self, token_id: U256, to: Address) -> AppResult<B256> {
        let account = self.session.require_account()?;
        self.detached(move |engine| async move { engine.nft.transfer(account, token_id, to).await })
            .await
    }

    pub async fn nft_details(&self, token_id: U256) -> AppResult<NftDetails> {
        self.nft.details(token_id).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock as StdRwLock;

    use alloy_sol_types::SolValue;
    use async_trait::async_trait;

    use super::*;
    use crate::chain::mock::MockChain;
    use crate::config::Contracts;
    use crate::contracts::staking::IModxStaking;

    pub const WEI: u128 = 1_000_000_000_000_000_000;

    /// Price feed returning a settable table and counting fetches.
    pub struct StaticPriceFeed {
        table: StdRwLock<PriceTable>,
        calls: AtomicUsize,
    }

    impl StaticPriceFeed {
        pub fn new(table: PriceTable) -> Self {
            Self {
                table: StdRwLock::new(table),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn set(&self, table: PriceTable) {
            *self.table.write().unwrap() = table;
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceFeed for StaticPriceFeed {
        async fn get_prices(&self) -> PriceTable {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table.read().unwrap().clone()
        }
    }

    pub struct Fixture {
        pub engine: Engine,
        pub chain: Arc<MockChain>,
        pub feed: Arc<StaticPriceFeed>,
        pub contracts: Contracts,
    }

    pub fn fixture(coalesce_window_ms: u64) -> Fixture {
        let mut config = AppConfig::defaults().unwrap();
        config.refresh.coalesce_window_ms = coalesce_window_ms;
        let contracts = config.contracts.parse().unwrap();
        let chain = Arc::new(MockChain::new());
        let feed = Arc::new(StaticPriceFeed::new(crate::price_feed::fallback_table()));
        let engine = Engine::new(&config, chain.clone(), feed.clone(), LocalStore::in_memory(), Session::new()).unwrap();
        Fixture {
            engine,
            chain,
            feed,
            contracts,
        }
    }

    /// One active 30-day 12% pool; `owner` has `principal` whole tokens in it.
    pub fn mock_single_pool(chain: &MockChain, staking: Address, owner: Address, principal: u64) {
        chain.on::<IModxStaking::poolCountCall>(staking, |_| Ok(U256::from(1u64).abi_encode()));
        chain.on::<IModxStaking::stakingPoolsCall>(staking, |_| {
            Ok((
                U256::from(30 * 86_400u64),
                U256::from(1_200u64),
                U256::from(10_000 * WEI),
                U256::from(5_000 * WEI),
                true,
            )
                .abi_encode_params())
        });
        chain.on::<IModxStaking::getUserStakeInfoCall>(staking, move |call| {
            let amount = if call.user == owner { principal as u128 * WEI } else { 0 };
            Ok((
                U256::from(amount),
                U256::from(1_700_000_000u64),
                U256::from(1_700_000_000u64 + 30 * 86_400),
                U256::ZERO,
                false,
            )
                .abi_encode_params())
        });
        chain.on::<IModxStaking::userActivePoolIdsCall>(staking, move |call| {
            let ids: Vec<U256> = if call.user == owner && principal > 0 {
                vec![U256::ZERO]
            } else {
                Vec::new()
            };
            Ok((ids,).abi_encode_params())
        });
    }
}
