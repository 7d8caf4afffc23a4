//! Route resolution, quoting and swap execution against the AMM router.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use modx_core::history::{HistoryAmount, HistoryEntry, HistoryKind};
use modx_core::impact::{banded_price_impact, reserve_price_impact};
use modx_core::liquidity::min_amount_out;
use modx_core::units::{from_base_units, from_base_units_lossy, to_base_units};
use modx_core::validation::{parse_amount, validate_slippage};
use modx_core::{SwapRoute, TokenInfo};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::chain::{ChainClient, ChainResult, Receipt};
use crate::config::SwapConfig;
use crate::contracts::erc20::Erc20Contract;
use crate::contracts::router::{FactoryContract, PairContract, RouterContract, SwapLeg};
use crate::error::{AppError, AppResult};
use crate::pending::{ActionKey, TxTracker};
use crate::services::token::TokenService;

/// A path the router accepted, with its quoted amounts per hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub route: SwapRoute,
    pub amounts_out: Vec<U256>,
}

impl ResolvedRoute {
    pub fn amount_out(&self) -> U256 {
        self.amounts_out.last().copied().unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct RouteResolver {
    router: RouterContract,
    wrapped_native: Address,
}

impl RouteResolver {
    pub fn new(router: RouterContract, wrapped_native: Address) -> Self {
        Self {
            router,
            wrapped_native,
        }
    }

    /// Address used for quoting; the native sentinel becomes the wrapped token.
    pub fn quoting_address(&self, token: &TokenInfo) -> Address {
        if token.is_native() {
            self.wrapped_native
        } else {
            token.address
        }
    }

    /// Direct path first, then one hop through the wrapped native token.
    ///
    /// `Ok(None)` when the router rejects both paths. Any other quoting
    /// failure is returned as `Quote`.
    pub async fn resolve(&self, from: &TokenInfo, to: &TokenInfo, amount_in: U256) -> AppResult<Option<ResolvedRoute>> {
        let from_addr = self.quoting_address(from);
        let to_addr = self.quoting_address(to);

        let direct = SwapRoute::direct(from_addr, to_addr);
        match self.try_route(direct, amount_in).await? {
            Some(resolved) => return Ok(Some(resolved)),
            None if from_addr == self.wrapped_native || to_addr == self.wrapped_native => {
                tracing::debug!(from = %from.symbol, to = %to.symbol, "No direct pair and no bridge to try");
                return Ok(None);
            }
            None => {}
        }

        let bridged = SwapRoute::bridged(from_addr, self.wrapped_native, to_addr);
        let resolved = self.try_route(bridged, amount_in).await?;
        if resolved.is_none() {
            tracing::info!(from = %from.symbol, to = %to.symbol, "No swap route");
        }
        Ok(resolved)
    }

    async fn try_route(&self, route: SwapRoute, amount_in: U256) -> AppResult<Option<ResolvedRoute>> {
        match self.router.get_amounts_out(amount_in, &route.path).await {
            Ok(amounts_out) => Ok(Some(ResolvedRoute { route, amounts_out })),
            Err(e) if e.is_path_rejection() => {
                tracing::debug!(hops = %route.path.len(), error = %e, "Router rejected path");
                Ok(None)
            }
            Err(e) => Err(AppError::Quote(e)),
        }
    }
}

/// Latest published quote for the swap form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapQuote {
    pub ticket: u64,
    pub from: String,
    pub to: String,
    pub input: String,
    pub output: Decimal,
    pub route: Option<Vec<Address>>,
    pub price_impact: Decimal,
    pub quoted_at: DateTime<Utc>,
}

/// Last-write-wins by ticket: a quote is published only if no newer
/// request was issued while it was in flight.
#[derive(Clone, Default)]
pub struct QuoteBoard {
    issued: Arc<AtomicU64>,
    latest: Arc<RwLock<Option<SwapQuote>>>,
}

impl QuoteBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket
    }

    /// Returns false (and drops the quote) when it has been superseded.
    pub async fn publish(&self, quote: SwapQuote) -> bool {
        let mut latest = self.latest.write().await;
        if !self.is_current(quote.ticket) {
            return false;
        }
        *latest = Some(quote);
        true
    }

    pub async fn latest(&self) -> Option<SwapQuote> {
        self.latest.read().await.clone()
    }
}

/// A confirmed swap and the history entry recorded for it.
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub receipt: Receipt,
    pub route: SwapRoute,
    pub entry: HistoryEntry,
}

#[derive(Clone)]
pub struct SwapService {
    resolver: RouteResolver,
    router: RouterContract,
    factory: FactoryContract,
    chain: Arc<dyn ChainClient>,
    tokens: TokenService,
    tracker: TxTracker,
    quotes: QuoteBoard,
    config: SwapConfig,
}

impl SwapService {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        tracker: TxTracker,
        tokens: TokenService,
        router: Address,
        factory: Address,
        wrapped_native: Address,
        config: SwapConfig,
    ) -> Self {
        let router = RouterContract::new(chain.clone(), router);
        Self {
            resolver: RouteResolver::new(router.clone(), wrapped_native),
            router,
            factory: FactoryContract::new(chain.clone(), factory),
            chain,
            tokens,
            tracker,
            quotes: QuoteBoard::new(),
            config,
        }
    }

    #[cfg(test)]
    pub fn resolver(&self) -> &RouteResolver {
        &self.resolver
    }

    pub fn quotes(&self) -> &QuoteBoard {
        &self.quotes
    }

    pub fn default_slippage(&self) -> Decimal {
        self.config.slippage_percent
    }

    /// Expected output for `input`; zero for invalid input or no route.
    pub async fn calculate_swap_amount(&self, input: &str, from: &str, to: &str) -> AppResult<Decimal> {
        Ok(self.quote_route(input, from, to).await?.map(|(_, out)| out).unwrap_or(Decimal::ZERO))
    }

    async fn quote_route(&self, input: &str, from: &str, to: &str) -> AppResult<Option<(ResolvedRoute, Decimal)>> {
        let from = self.tokens.token(from)?.clone();
        let to = self.tokens.token(to)?.clone();
        let amount_in = match parse_amount(input).ok().and_then(|_| to_base_units(input, from.decimals).ok()) {
            Some(amount) if !amount.is_zero() => amount,
            _ => return Ok(None),
        };

        let Some(resolved) = self.resolver.resolve(&from, &to, amount_in).await? else {
            return Ok(None);
        };
        let output = from_base_units(resolved.amount_out(), to.decimals)?;
        Ok(Some((resolved, output)))
    }

    /// Quote under a fresh ticket. `None` when a newer request superseded it.
    pub async fn request_quote(&self, input: &str, from: &str, to: &str) -> AppResult<Option<SwapQuote>> {
        let ticket = self.quotes.issue();
        let quoted = self.quote_route(input, from, to).await?;
        let price_impact = self.calculate_price_impact(input, from, to).await;

        let quote = SwapQuote {
            ticket,
            from: from.to_string(),
            to: to.to_string(),
            input: input.trim().to_string(),
            output: quoted.as_ref().map(|(_, out)| *out).unwrap_or(Decimal::ZERO),
            route: quoted.map(|(resolved, _)| resolved.route.path),
            price_impact,
            quoted_at: Utc::now(),
        };

        if self.quotes.publish(quote.clone()).await {
            Ok(Some(quote))
        } else {
            tracing::debug!(ticket = %ticket, "Discarding superseded quote");
            Ok(None)
        }
    }

    /// Impact in percent from the pair's live reserves, or the size band
    /// when no reserves are known for the pair.
    pub async fn calculate_price_impact(&self, input: &str, from: &str, to: &str) -> Decimal {
        let (Ok(from), Ok(to)) = (self.tokens.token(from), self.tokens.token(to)) else {
            return banded_price_impact(input);
        };
        let amount = match Decimal::from_str(input.trim()) {
            Ok(a) if a > Decimal::ZERO => a,
            _ => return Decimal::ZERO,
        };

        match self.pair_reserves(from, to).await {
            Ok(Some((reserve_in, reserve_out))) => reserve_price_impact(amount, reserve_in, reserve_out),
            Ok(None) => banded_price_impact(input),
            Err(e) => {
                tracing::debug!(error = %e, "Reserve read failed, using banded impact");
                banded_price_impact(input)
            }
        }
    }

    /// Reserves of the direct pair oriented as (input side, output side).
    async fn pair_reserves(&self, from: &TokenInfo, to: &TokenInfo) -> ChainResult<Option<(Decimal, Decimal)>> {
        let from_addr = self.resolver.quoting_address(from);
        let to_addr = self.resolver.quoting_address(to);
        let pair = self.factory.get_pair(from_addr, to_addr).await?;
        if pair == Address::ZERO {
            return Ok(None);
        }

        let pair = PairContract::new(self.chain.clone(), pair);
        let ((reserve0, reserve1), token0) = tokio::try_join!(pair.reserves(), pair.token0())?;
        let (raw_in, raw_out) = if token0 == from_addr {
            (reserve0, reserve1)
        } else {
            (reserve1, reserve0)
        };
        if raw_in.is_zero() || raw_out.is_zero() {
            return Ok(None);
        }
        Ok(Some((
            from_base_units_lossy(raw_in, from.decimals),
            from_base_units_lossy(raw_out, to.decimals),
        )))
    }

    /// Swap `amount` of `from` for at least `quoted * (1 - slippage)` of `to`.
    pub async fn execute_swap(
        &self,
        user: Address,
        from: &str,
        to: &str,
        amount: &str,
        quoted: &str,
        slippage_percent: Option<Decimal>,
    ) -> AppResult<SwapOutcome> {
        let from = self.tokens.token(from)?.clone();
        let to = self.tokens.token(to)?.clone();
        if from.address == to.address {
            return Err(AppError::NoRoute {
                from: from.symbol,
                to: to.symbol,
            });
        }

        let amount_dec = parse_amount(amount)?;
        let quoted_dec = parse_amount(quoted)?;
        let slippage = validate_slippage(slippage_percent.unwrap_or(self.config.slippage_percent))?;
        let amount_in = to_base_units(amount, from.decimals)?;
        let min_out = min_amount_out(to_base_units(quoted, to.decimals)?, slippage)?;

        let guard = self.tracker.begin(ActionKey::Swap)?;
        let resolved = self
            .resolver
            .resolve(&from, &to, amount_in)
            .await?
            .ok_or_else(|| AppError::NoRoute {
                from: from.symbol.clone(),
                to: to.symbol.clone(),
            })?;

        let leg = if from.is_native() {
            SwapLeg::NativeIn
        } else if to.is_native() {
            SwapLeg::NativeOut
        } else {
            SwapLeg::TokenToToken
        };

        tracing::info!(
            account = %user,
            from = %from.symbol,
            to = %to.symbol,
            amount = %amount_dec,
            min_out = %min_out,
            hops = %resolved.route.path.len(),
            "Executing swap"
        );

        if !from.is_native() {
            let approve = Erc20Contract::new(self.chain.clone(), from.address).approve_tx(user, self.router.address(), amount_in);
            self.tracker.submit(&guard, "approve", approve).await?;
        }

        let deadline = u64::try_from(Utc::now().timestamp()).unwrap_or_default() + self.config.deadline_secs;
        let swap = self
            .router
            .swap_tx(user, leg, amount_in, min_out, resolved.route.path.clone(), deadline);
        let receipt = self.tracker.submit(&guard, "swap", swap).await?;

        let entry = HistoryEntry::local(
            Uuid::new_v4().to_string(),
            HistoryKind::Swap,
            vec![
                HistoryAmount::new(from.symbol.clone(), amount_dec),
                HistoryAmount::new(to.symbol.clone(), quoted_dec),
            ],
            receipt.hash,
            Utc::now().timestamp(),
        );

        Ok(SwapOutcome {
            receipt,
            route: resolved.route,
            entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use crate::chain::ChainError;
    use crate::contracts::erc20::IERC20;
    use crate::contracts::router::{IPancakeFactory, IPancakePair, IPancakeRouter};
    use alloy_sol_types::{SolCall, SolValue};
    use modx_core::{CoreError, NATIVE_SENTINEL};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    const WEI: u128 = 1_000_000_000_000_000_000;
    const ROUTER: Address = Address::repeat_byte(0xa0);
    const FACTORY: Address = Address::repeat_byte(0xf0);
    const WRAPPED: Address = Address::repeat_byte(0xee);
    const MODX: Address = Address::repeat_byte(0x10);
    const CAKE: Address = Address::repeat_byte(0x30);
    const LINK: Address = Address::repeat_byte(0x40);
    const PAIR: Address = Address::repeat_byte(0x99);

    fn token(symbol: &str, address: Address) -> TokenInfo {
        TokenInfo {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            address,
            decimals: 18,
        }
    }

    fn registry() -> Vec<TokenInfo> {
        vec![
            token("modX", MODX),
            token("BNB", NATIVE_SENTINEL),
            token("CAKE", CAKE),
            token("LINK", LINK),
        ]
    }

    fn service(chain: Arc<MockChain>) -> SwapService {
        let tracker = TxTracker::new(chain.clone());
        let tokens = TokenService::new(chain.clone(), tracker.clone(), registry());
        SwapService::new(
            chain,
            tracker,
            tokens,
            ROUTER,
            FACTORY,
            WRAPPED,
            SwapConfig {
                slippage_percent: dec!(0.5),
                deadline_secs: 600,
            },
        )
    }

    fn invalid_path() -> ChainError {
        ChainError::Rpc {
            code: 3,
            message: "execution reverted: PancakeLibrary: INVALID_PATH".into(),
        }
    }

    /// Router that knows the given pairs; 1 unit in returns 2 units per hop.
    fn mock_router(chain: &MockChain, pairs: Vec<(Address, Address)>) {
        chain.on::<IPancakeRouter::getAmountsOutCall>(ROUTER, move |call| {
            let known = call.path.windows(2).all(|hop| {
                pairs.contains(&(hop[0], hop[1])) || pairs.contains(&(hop[1], hop[0]))
            });
            if !known {
                return Err(invalid_path());
            }
            let mut amounts = vec![call.amountIn];
            for _ in 1..call.path.len() {
                let last = *amounts.last().unwrap();
                amounts.push(last * U256::from(2u64));
            }
            Ok((amounts,).abi_encode_params())
        });
    }

    #[tokio::test]
    async fn test_direct_route() {
        let chain = Arc::new(MockChain::new());
        mock_router(&chain, vec![(MODX, CAKE)]);
        let swaps = service(chain);
        let resolved = swaps
            .resolver()
            .resolve(&token("modX", MODX), &token("CAKE", CAKE), U256::from(10u64))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.route.path, vec![MODX, CAKE]);
        assert_eq!(resolved.amount_out(), U256::from(20u64));
    }

    #[tokio::test]
    async fn test_bridged_route() {
        let chain = Arc::new(MockChain::new());
        mock_router(&chain, vec![(MODX, WRAPPED), (WRAPPED, LINK)]);
        let swaps = service(chain.clone());
        let resolved = swaps
            .resolver()
            .resolve(&token("modX", MODX), &token("LINK", LINK), U256::from(10u64))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.route.path, vec![MODX, WRAPPED, LINK]);
        assert!(resolved.route.is_bridged());
        assert_eq!(chain.call_count::<IPancakeRouter::getAmountsOutCall>(ROUTER), 2);
    }

    #[tokio::test]
    async fn test_no_route_is_not_an_error() {
        let chain = Arc::new(MockChain::new());
        mock_router(&chain, vec![]);
        let swaps = service(chain);
        let resolved = swaps
            .resolver()
            .resolve(&token("CAKE", CAKE), &token("LINK", LINK), U256::from(1u64))
            .await
            .unwrap();
        assert!(resolved.is_none());
        assert_eq!(swaps.calculate_swap_amount("5", "CAKE", "LINK").await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_quote_fault_propagates() {
        let chain = Arc::new(MockChain::new());
        chain.fail::<IPancakeRouter::getAmountsOutCall>(ROUTER, ChainError::Timeout("eth_call".into()));
        let swaps = service(chain.clone());
        let err = swaps.calculate_swap_amount("1", "CAKE", "LINK").await.unwrap_err();
        assert!(matches!(err, AppError::Quote(ChainError::Timeout(_))));
        // no bridged attempt after a non-path failure
        assert_eq!(chain.call_count::<IPancakeRouter::getAmountsOutCall>(ROUTER), 1);
    }

    #[tokio::test]
    async fn test_native_substitution() {
        let chain = Arc::new(MockChain::new());
        mock_router(&chain, vec![(WRAPPED, MODX)]);
        let swaps = service(chain.clone());
        let out = swaps.calculate_swap_amount("1.5", "BNB", "modX").await.unwrap();
        assert_eq!(out, dec!(3));

        // wrapped endpoint with no direct pair does not bridge through itself
        let none = swaps.calculate_swap_amount("1", "BNB", "CAKE").await.unwrap();
        assert_eq!(none, Decimal::ZERO);
        assert_eq!(chain.call_count::<IPancakeRouter::getAmountsOutCall>(ROUTER), 2);
    }

    #[tokio::test]
    async fn test_invalid_input_quotes_zero_without_calls() {
        let chain = Arc::new(MockChain::new());
        let swaps = service(chain.clone());
        assert_eq!(swaps.calculate_swap_amount("", "modX", "CAKE").await.unwrap(), Decimal::ZERO);
        assert_eq!(swaps.calculate_swap_amount("-2", "modX", "CAKE").await.unwrap(), Decimal::ZERO);
        assert_eq!(chain.total_calls(), 0);
        assert!(matches!(
            swaps.calculate_swap_amount("1", "DOGE", "CAKE").await,
            Err(AppError::Validation(CoreError::UnknownToken(_)))
        ));
    }

    #[tokio::test]
    async fn test_price_impact_prefers_reserves() {
        let chain = Arc::new(MockChain::new());
        chain.on::<IPancakeFactory::getPairCall>(FACTORY, |call| {
            let pair = if [call.tokenA, call.tokenB].contains(&WRAPPED) && [call.tokenA, call.tokenB].contains(&MODX) {
                PAIR
            } else {
                Address::ZERO
            };
            Ok(pair.abi_encode())
        });
        chain.on::<IPancakePair::getReservesCall>(PAIR, |_| {
            Ok((U256::from(10_000 * WEI), U256::from(1_000 * WEI), 0u32).abi_encode_params())
        });
        chain.on::<IPancakePair::token0Call>(PAIR, |_| Ok(MODX.abi_encode()));
        let swaps = service(chain);

        // 1000 BNB into 1000 BNB of reserve
        let impact = swaps.calculate_price_impact("1000", "BNB", "modX").await;
        assert_eq!(impact.round_dp(4), dec!(49.9374));
        // no pair known, falls back to the size band
        assert_eq!(swaps.calculate_price_impact("1000", "CAKE", "LINK").await, dec!(0.3));
    }

    #[tokio::test]
    async fn test_execute_swap_token_to_native() {
        let chain = Arc::new(MockChain::new());
        mock_router(&chain, vec![(MODX, WRAPPED)]);
        let swaps = service(chain.clone());
        let user = Address::repeat_byte(1);

        let outcome = swaps.execute_swap(user, "modX", "BNB", "100", "200", None).await.unwrap();
        assert_eq!(outcome.route.path, vec![MODX, WRAPPED]);
        assert_eq!(outcome.entry.kind, HistoryKind::Swap);
        assert_eq!(outcome.entry.amounts[1], HistoryAmount::new("BNB", dec!(200)));

        let sent = chain.sent();
        assert_eq!(sent.len(), 2);
        let approve = IERC20::approveCall::abi_decode(&sent[0].data).unwrap();
        assert_eq!(approve.spender, ROUTER);
        assert_eq!(approve.amount, U256::from(100 * WEI));
        let swap = IPancakeRouter::swapExactTokensForETHSupportingFeeOnTransferTokensCall::abi_decode(&sent[1].data).unwrap();
        assert_eq!(swap.amountOutMin, U256::from(199 * WEI));
        assert_eq!(swap.to, user);
        assert!(swap.deadline > U256::from(Utc::now().timestamp() as u64));
    }

    #[tokio::test]
    async fn test_native_in_swap_sends_value_without_approval() {
        let chain = Arc::new(MockChain::new());
        mock_router(&chain, vec![(WRAPPED, MODX)]);
        let swaps = service(chain.clone());

        swaps
            .execute_swap(Address::repeat_byte(1), "BNB", "modX", "0.25", "0.5", Some(dec!(1)))
            .await
            .unwrap();
        let sent = chain.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].value, U256::from(WEI / 4));
        assert_eq!(
            sent[0].selector(),
            Some(IPancakeRouter::swapExactETHForTokensSupportingFeeOnTransferTokensCall::SELECTOR)
        );
    }

    #[tokio::test]
    async fn test_swap_without_route_sends_nothing() {
        let chain = Arc::new(MockChain::new());
        mock_router(&chain, vec![]);
        let swaps = service(chain.clone());
        let err = swaps
            .execute_swap(Address::repeat_byte(1), "CAKE", "LINK", "1", "1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoRoute { .. }));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn test_superseded_quote_is_discarded() {
        let chain = Arc::new(MockChain::new());
        mock_router(&chain, vec![(MODX, CAKE)]);
        chain.set_call_delay(Duration::from_millis(20));
        let swaps = service(chain);

        let first = swaps.request_quote("1", "modX", "CAKE");
        let second = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            swaps.request_quote("3", "modX", "CAKE").await
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.unwrap().is_none());
        let second = second.unwrap().unwrap();
        assert_eq!(second.output, dec!(6));
        assert_eq!(swaps.quotes().latest().await.unwrap().input, "3");
    }
}
