use std::str::FromStr;
use std::time::Instant;

use alloy_primitives::{B256, U256};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use modx_core::history::HistoryEntry;
use modx_core::profile::UserProfile;
use modx_core::reward::{display, PENDING_DISPLAY_DP, PROSPECTIVE_DISPLAY_DP};
use modx_core::{CoreError, PortfolioSnapshot, PriceTable};

use super::dto::*;
use crate::engine::HistoryView;
use crate::error::{AppError, AppResult};
use crate::services::nft::{MintedNft, NftDetails};
use crate::AppState;

fn parse_token_id(raw: &str) -> AppResult<U256> {
    U256::from_str(raw.trim()).map_err(|_| AppError::from(CoreError::InvalidAmount(format!("token id {}", raw))))
}

// ============================================================================
// Health and session
// ============================================================================

pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let start = Instant::now();
    println!("[REQUEST] GET /health");
    tracing::info!("Processing health check request");

    let block_number = match state.chain.block_number().await {
        Ok(head) => {
            tracing::debug!(block_number = %head, "Chain health check passed");
            Some(head)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Chain health check failed");
            None
        }
    };
    let chain_status = if block_number.is_some() { "connected" } else { "unreachable" };

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chain: chain_status.to_string(),
        block_number,
    };

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] GET /health -> 200 OK ({}ms) chain={}", duration, chain_status);
    tracing::info!(duration_ms = %duration, chain_status = %chain_status, "Health check completed");

    Ok(Json(response))
}

fn session_response(state: &AppState) -> SessionResponse {
    let current = state.engine.session().current();
    SessionResponse {
        connected: current.account.is_some(),
        account: current.account,
        chain_id: current.chain_id,
    }
}

pub async fn get_session(State(state): State<AppState>) -> AppResult<Json<SessionResponse>> {
    println!("[REQUEST] GET /api/v1/session");
    let response = session_response(&state);
    println!("[RESPONSE] GET /api/v1/session -> 200 OK connected={}", response.connected);
    Ok(Json(response))
}

pub async fn connect(
    State(state): State<AppState>,
    Json(request): Json<ConnectRequest>,
) -> AppResult<Json<SessionResponse>> {
    println!("[REQUEST] POST /api/v1/session account={}", request.account);
    let session = state.engine.session();
    let chain_id = request.chain_id.unwrap_or(state.config.chain.chain_id);

    match session.current() {
        current if current.account == Some(request.account) => {
            if current.chain_id != Some(chain_id) {
                session.switch_chain(chain_id);
            }
        }
        _ => session.connect(request.account, chain_id),
    }

    let response = session_response(&state);
    println!("[RESPONSE] POST /api/v1/session -> 200 OK chain_id={}", chain_id);
    Ok(Json(response))
}

pub async fn disconnect(State(state): State<AppState>) -> AppResult<Json<SessionResponse>> {
    println!("[REQUEST] POST /api/v1/session/disconnect");
    state.engine.session().disconnect();
    println!("[RESPONSE] POST /api/v1/session/disconnect -> 200 OK");
    Ok(Json(session_response(&state)))
}

// ============================================================================
// Staking
// ============================================================================

pub async fn list_pools(State(state): State<AppState>) -> AppResult<Json<PoolsResponse>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/v1/pools");
    tracing::info!("Listing staking pools");

    let pools = state.engine.pools().await?;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] GET /api/v1/pools -> 200 OK ({}ms) pools={}", duration, pools.len());
    tracing::info!(duration_ms = %duration, pool_count = %pools.len(), "Pools listed");

    Ok(Json(PoolsResponse {
        pools: pools.into_iter().map(PoolResponse::from).collect(),
    }))
}

pub async fn list_stakes(State(state): State<AppState>) -> AppResult<Json<StakesResponse>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/v1/stakes");

    let stakes = state.engine.stakes().await?;
    let total_staked = stakes.iter().map(|s| s.principal).sum();

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] GET /api/v1/stakes -> 200 OK ({}ms) stakes={}", duration, stakes.len());
    tracing::info!(duration_ms = %duration, stake_count = %stakes.len(), "Stakes listed");

    Ok(Json(StakesResponse {
        stakes: stakes.into_iter().map(StakeResponse::from).collect(),
        total_staked,
    }))
}

pub async fn stake(
    State(state): State<AppState>,
    Json(request): Json<StakeRequest>,
) -> AppResult<Json<TxResponse>> {
    let start = Instant::now();
    println!("[REQUEST] POST /api/v1/stake pool={} amount={}", request.pool_id, request.amount);
    tracing::info!(pool_id = %request.pool_id, amount = %request.amount, "Processing stake request");

    let receipt = state.engine.stake(&request.amount, request.pool_id).await?;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] POST /api/v1/stake -> 200 OK ({}ms) tx={}", duration, receipt.hash);
    tracing::info!(duration_ms = %duration, hash = %receipt.hash, "Stake confirmed");

    Ok(Json(receipt.into()))
}

pub async fn unstake(
    State(state): State<AppState>,
    Json(request): Json<PoolActionRequest>,
) -> AppResult<Json<TxResponse>> {
    let start = Instant::now();
    println!("[REQUEST] POST /api/v1/unstake pool={}", request.pool_id);
    tracing::info!(pool_id = %request.pool_id, "Processing unstake request");

    let receipt = state.engine.unstake(request.pool_id).await?;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] POST /api/v1/unstake -> 200 OK ({}ms) tx={}", duration, receipt.hash);
    tracing::info!(duration_ms = %duration, hash = %receipt.hash, "Unstake confirmed");

    Ok(Json(receipt.into()))
}

pub async fn claim(
    State(state): State<AppState>,
    Json(request): Json<PoolActionRequest>,
) -> AppResult<Json<TxResponse>> {
    let start = Instant::now();
    println!("[REQUEST] POST /api/v1/claim pool={}", request.pool_id);
    tracing::info!(pool_id = %request.pool_id, "Processing claim request");

    let receipt = state.engine.claim_rewards(request.pool_id).await?;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] POST /api/v1/claim -> 200 OK ({}ms) tx={}", duration, receipt.hash);
    tracing::info!(duration_ms = %duration, hash = %receipt.hash, "Claim confirmed");

    Ok(Json(receipt.into()))
}

pub async fn estimate_rewards(
    State(state): State<AppState>,
    Query(query): Query<RewardEstimateQuery>,
) -> AppResult<Json<RewardEstimateResponse>> {
    println!("[REQUEST] GET /api/v1/rewards/estimate?amount={}&pool_id={}", query.amount, query.pool_id);

    let reward = state.engine.estimated_rewards(&query.amount, query.pool_id).await;

    println!("[RESPONSE] GET /api/v1/rewards/estimate -> 200 OK reward={}", reward);
    Ok(Json(RewardEstimateResponse {
        pool_id: query.pool_id,
        amount: query.amount,
        estimated_reward: display(reward, PROSPECTIVE_DISPLAY_DP),
    }))
}

pub async fn pending_rewards(
    State(state): State<AppState>,
    Query(query): Query<PendingRewardQuery>,
) -> AppResult<Json<PendingRewardResponse>> {
    println!("[REQUEST] GET /api/v1/rewards/pending?pool_id={}", query.pool_id);

    let reward = state.engine.pending_rewards(query.pool_id).await?;

    println!("[RESPONSE] GET /api/v1/rewards/pending -> 200 OK reward={}", reward);
    Ok(Json(PendingRewardResponse {
        pool_id: query.pool_id,
        pending_rewards: display(reward, PENDING_DISPLAY_DP),
    }))
}

// ============================================================================
// Swap
// ============================================================================

pub async fn swap_quote(
    State(state): State<AppState>,
    Query(query): Query<SwapQuoteQuery>,
) -> AppResult<Json<SwapQuoteResponse>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/v1/swap/quote?input={}&from={}&to={}", query.input, query.from, query.to);
    tracing::debug!(input = %query.input, from = %query.from, to = %query.to, "Processing swap quote");

    let quote = state.engine.swap_quote(&query.input, &query.from, &query.to).await?;

    let duration = start.elapsed().as_millis();
    match &quote {
        Some(q) => println!(
            "[RESPONSE] GET /api/v1/swap/quote -> 200 OK ({}ms) output={} hops={}",
            duration,
            q.output,
            q.route.as_ref().map_or(0, |r| r.len())
        ),
        None => println!("[RESPONSE] GET /api/v1/swap/quote -> 200 OK ({}ms) [superseded]", duration),
    }

    Ok(Json(SwapQuoteResponse {
        superseded: quote.is_none(),
        quote,
        default_slippage_percent: state.engine.default_slippage(),
    }))
}

pub async fn latest_quote(State(state): State<AppState>) -> AppResult<Json<LatestQuoteResponse>> {
    println!("[REQUEST] GET /api/v1/swap/quote/latest");
    let quote = state.engine.latest_quote().await;
    println!("[RESPONSE] GET /api/v1/swap/quote/latest -> 200 OK ticket={:?}", quote.as_ref().map(|q| q.ticket));
    Ok(Json(LatestQuoteResponse { quote }))
}

pub async fn swap_amount(
    State(state): State<AppState>,
    Query(query): Query<SwapQuoteQuery>,
) -> AppResult<Json<SwapAmountResponse>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/v1/swap/amount?input={}&from={}&to={}", query.input, query.from, query.to);

    let output = state.engine.swap_amount(&query.input, &query.from, &query.to).await?;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] GET /api/v1/swap/amount -> 200 OK ({}ms) output={}", duration, output);
    tracing::info!(duration_ms = %duration, from = %query.from, to = %query.to, "Swap amount calculated");

    Ok(Json(SwapAmountResponse {
        input: query.input,
        from: query.from,
        to: query.to,
        output,
    }))
}

pub async fn price_impact(
    State(state): State<AppState>,
    Query(query): Query<SwapQuoteQuery>,
) -> AppResult<Json<PriceImpactResponse>> {
    println!("[REQUEST] GET /api/v1/swap/impact?input={}&from={}&to={}", query.input, query.from, query.to);
    let price_impact = state.engine.price_impact(&query.input, &query.from, &query.to).await;
    println!("[RESPONSE] GET /api/v1/swap/impact -> 200 OK impact={}%", price_impact);
    Ok(Json(PriceImpactResponse { price_impact }))
}

pub async fn exchange_rate(
    State(state): State<AppState>,
    Query(query): Query<ExchangeRateQuery>,
) -> AppResult<Json<ExchangeRateResponse>> {
    println!("[REQUEST] GET /api/v1/swap/rate?from={}&to={}", query.from, query.to);
    let rate = state.engine.exchange_rate(&query.from, &query.to).await;
    println!("[RESPONSE] GET /api/v1/swap/rate -> 200 OK rate={}", rate);
    Ok(Json(ExchangeRateResponse {
        from: query.from,
        to: query.to,
        rate,
    }))
}

pub async fn execute_swap(
    State(state): State<AppState>,
    Json(request): Json<SwapRequest>,
) -> AppResult<Json<SwapResponse>> {
    let start = Instant::now();
    println!(
        "[REQUEST] POST /api/v1/swap {} {} -> {} (quoted {})",
        request.amount, request.from, request.to, request.quoted_amount
    );
    tracing::info!(
        from = %request.from,
        to = %request.to,
        amount = %request.amount,
        quoted = %request.quoted_amount,
        "Processing swap request"
    );

    let outcome = state
        .engine
        .execute_swap(
            &request.from,
            &request.to,
            &request.amount,
            &request.quoted_amount,
            request.slippage_percent,
        )
        .await?;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] POST /api/v1/swap -> 200 OK ({}ms) tx={}", duration, outcome.receipt.hash);
    tracing::info!(
        duration_ms = %duration,
        hash = %outcome.receipt.hash,
        hops = %outcome.route.path.len(),
        "Swap confirmed"
    );

    Ok(Json(SwapResponse {
        hash: outcome.receipt.hash,
        block_number: outcome.receipt.block_number,
        route: outcome.route.path,
        entry: outcome.entry,
    }))
}

// ============================================================================
// Liquidity
// ============================================================================

pub async fn liquidity_position(State(state): State<AppState>) -> AppResult<Json<LiquidityPositionResponse>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/v1/liquidity");

    let position = state.engine.liquidity_position().await?;

    let duration = start.elapsed().as_millis();
    println!(
        "[RESPONSE] GET /api/v1/liquidity -> 200 OK ({}ms) share={}",
        duration,
        position.as_ref().map(|p| p.share_percent.to_string()).unwrap_or_else(|| "none".to_string())
    );
    Ok(Json(LiquidityPositionResponse { position }))
}

fn liquidity_response(receipt_hash: B256, block_number: u64, entry: HistoryEntry) -> LiquidityResponse {
    LiquidityResponse {
        hash: receipt_hash,
        block_number,
        entry,
    }
}

pub async fn add_liquidity(
    State(state): State<AppState>,
    Json(request): Json<AddLiquidityRequest>,
) -> AppResult<Json<LiquidityResponse>> {
    let start = Instant::now();
    println!(
        "[REQUEST] POST /api/v1/liquidity/add token={} native={}",
        request.token_amount, request.native_amount
    );
    tracing::info!(
        token_amount = %request.token_amount,
        native_amount = %request.native_amount,
        "Processing add liquidity request"
    );

    let outcome = state
        .engine
        .add_liquidity(&request.token_amount, &request.native_amount)
        .await?;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] POST /api/v1/liquidity/add -> 200 OK ({}ms) tx={}", duration, outcome.receipt.hash);
    tracing::info!(duration_ms = %duration, hash = %outcome.receipt.hash, "Liquidity added");

    Ok(Json(liquidity_response(outcome.receipt.hash, outcome.receipt.block_number, outcome.entry)))
}

pub async fn remove_liquidity(
    State(state): State<AppState>,
    Json(request): Json<RemoveLiquidityRequest>,
) -> AppResult<Json<LiquidityResponse>> {
    let start = Instant::now();
    println!("[REQUEST] POST /api/v1/liquidity/remove percentage={}", request.percentage);
    tracing::info!(percentage = %request.percentage, "Processing remove liquidity request");

    let outcome = state.engine.remove_liquidity(request.percentage).await?;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] POST /api/v1/liquidity/remove -> 200 OK ({}ms) tx={}", duration, outcome.receipt.hash);
    tracing::info!(duration_ms = %duration, hash = %outcome.receipt.hash, "Liquidity removed");

    Ok(Json(liquidity_response(outcome.receipt.hash, outcome.receipt.block_number, outcome.entry)))
}

// ============================================================================
// Tokens
// ============================================================================

pub async fn balances(State(state): State<AppState>) -> AppResult<Json<BalancesResponse>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/v1/balances");

    let account = state.engine.session().require_account()?;
    let balances = state.engine.wallet_balances().await?;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] GET /api/v1/balances -> 200 OK ({}ms) tokens={}", duration, balances.len());
    Ok(Json(BalancesResponse {
        account,
        balances: balances.as_ref().clone(),
    }))
}

pub async fn allowance(
    State(state): State<AppState>,
    Query(query): Query<AllowanceQuery>,
) -> AppResult<Json<AllowanceResponse>> {
    println!("[REQUEST] GET /api/v1/tokens/allowance?symbol={}&spender={}", query.symbol, query.spender);
    let allowance = state.engine.allowance(&query.symbol, query.spender).await?;
    println!("[RESPONSE] GET /api/v1/tokens/allowance -> 200 OK allowance={}", allowance);
    Ok(Json(AllowanceResponse {
        symbol: query.symbol,
        spender: query.spender,
        allowance,
    }))
}

pub async fn approve(
    State(state): State<AppState>,
    Json(request): Json<ApproveRequest>,
) -> AppResult<Json<TxResponse>> {
    println!("[REQUEST] POST /api/v1/tokens/approve {} {} -> {}", request.amount, request.symbol, request.spender);
    let receipt = state
        .engine
        .approve(&request.symbol, request.spender, &request.amount)
        .await?;
    println!("[RESPONSE] POST /api/v1/tokens/approve -> 200 OK tx={}", receipt.hash);
    Ok(Json(receipt.into()))
}

pub async fn transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> AppResult<Json<TxResponse>> {
    println!("[REQUEST] POST /api/v1/tokens/transfer {} {} -> {}", request.amount, request.symbol, request.to);
    let receipt = state
        .engine
        .transfer(&request.symbol, request.to, &request.amount)
        .await?;
    println!("[RESPONSE] POST /api/v1/tokens/transfer -> 200 OK tx={}", receipt.hash);
    Ok(Json(receipt.into()))
}

// ============================================================================
// Portfolio, history, prices, profile
// ============================================================================

pub async fn portfolio(State(state): State<AppState>) -> AppResult<Json<PortfolioSnapshot>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/v1/portfolio");
    tracing::info!("Processing portfolio request");

    let snapshot = state.engine.portfolio().await?;

    let duration = start.elapsed().as_millis();
    println!(
        "[RESPONSE] GET /api/v1/portfolio -> 200 OK ({}ms) value=${} tokens={}{}",
        duration,
        snapshot.total_value,
        snapshot.tokens.len(),
        if snapshot.prices_degraded { " [fallback prices]" } else { "" }
    );
    tracing::info!(
        duration_ms = %duration,
        total_value = %snapshot.total_value,
        prices_degraded = %snapshot.prices_degraded,
        "Portfolio computed"
    );

    Ok(Json(snapshot))
}

pub async fn history(State(state): State<AppState>) -> AppResult<Json<HistoryView>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/v1/history");

    let view = state.engine.history().await?;

    let duration = start.elapsed().as_millis();
    println!(
        "[RESPONSE] GET /api/v1/history -> 200 OK ({}ms) chain={} swaps={} liquidity={}",
        duration,
        view.chain.len(),
        view.swaps.len(),
        view.liquidity.len()
    );
    if let Some(warning) = &view.warning {
        tracing::warn!(warning = %warning, "History served with warning");
    }

    Ok(Json(view))
}

pub async fn prices(State(state): State<AppState>) -> AppResult<Json<PriceTable>> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/v1/prices");

    let table = state.engine.prices().await;

    let duration = start.elapsed().as_millis();
    println!(
        "[RESPONSE] GET /api/v1/prices -> 200 OK ({}ms) symbols={} degraded={}",
        duration,
        table.quotes.len(),
        table.degraded
    );
    Ok(Json(table.as_ref().clone()))
}

pub async fn profile(State(state): State<AppState>) -> AppResult<Json<UserProfile>> {
    println!("[REQUEST] GET /api/v1/profile");
    let profile = state.engine.profile()?;
    println!("[RESPONSE] GET /api/v1/profile -> 200 OK user={}", profile.username);
    Ok(Json(profile))
}

pub async fn pending(State(state): State<AppState>) -> AppResult<Json<PendingResponse>> {
    let pending = state.engine.pending().await;
    println!("[RESPONSE] GET /api/v1/pending -> 200 OK pending={}", pending.len());
    Ok(Json(PendingResponse { pending }))
}

// ============================================================================
// Price alarm
// ============================================================================

pub async fn get_alarm(State(state): State<AppState>) -> AppResult<Json<AlarmResponse>> {
    println!("[REQUEST] GET /api/v1/alarm");
    Ok(Json(AlarmResponse {
        alarm: state.engine.alarm(),
        triggered: state.engine.take_triggered_alarm().await,
    }))
}

pub async fn set_alarm(
    State(state): State<AppState>,
    Json(request): Json<SetAlarmRequest>,
) -> AppResult<Json<AlarmResponse>> {
    println!("[REQUEST] POST /api/v1/alarm {} @ {}", request.token, request.target_price);
    let alarm = state.engine.set_alarm(&request.token, &request.target_price).await?;
    println!(
        "[RESPONSE] POST /api/v1/alarm -> 200 OK {} target={} reference={}",
        alarm.token, alarm.target_price, alarm.reference_price
    );
    Ok(Json(AlarmResponse {
        alarm: Some(alarm),
        triggered: None,
    }))
}

pub async fn clear_alarm(State(state): State<AppState>) -> AppResult<Json<AlarmResponse>> {
    println!("[REQUEST] DELETE /api/v1/alarm");
    state.engine.clear_alarm()?;
    tracing::info!("Price alarm cleared");
    Ok(Json(AlarmResponse {
        alarm: None,
        triggered: None,
    }))
}

// ============================================================================
// NFTs
// ============================================================================

pub async fn mint_nft(
    State(state): State<AppState>,
    Json(request): Json<MintNftRequest>,
) -> AppResult<Json<MintedNft>> {
    let start = Instant::now();
    println!("[REQUEST] POST /api/v1/nft/mint license={}", request.license);

    let minted = state.engine.mint_nft(&request.uri, &request.license).await?;

    let duration = start.elapsed().as_millis();
    println!(
        "[RESPONSE] POST /api/v1/nft/mint -> 200 OK ({}ms) token_id={:?} tx={}",
        duration, minted.token_id, minted.hash
    );
    Ok(Json(minted))
}

pub async fn nft_details(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> AppResult<Json<NftDetails>> {
    println!("[REQUEST] GET /api/v1/nft/{}", token_id);
    let details = state.engine.nft_details(parse_token_id(&token_id)?).await?;
    println!(
        "[RESPONSE] GET /api/v1/nft/{} -> 200 OK license={} history={}",
        token_id,
        details.current_license,
        details.license_history.len()
    );
    Ok(Json(details))
}

pub async fn transfer_nft(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
    Json(request): Json<TransferNftRequest>,
) -> AppResult<Json<HashResponse>> {
    println!("[REQUEST] POST /api/v1/nft/{}/transfer to={}", token_id, request.to);
    let hash = state.engine.transfer_nft(parse_token_id(&token_id)?, request.to).await?;
    println!("[RESPONSE] POST /api/v1/nft/{}/transfer -> 200 OK tx={}", token_id, hash);
    Ok(Json(HashResponse { hash }))
}

pub async fn burn_nft(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> AppResult<Json<HashResponse>> {
    println!("[REQUEST] DELETE /api/v1/nft/{}", token_id);
    let hash = state.engine.burn_nft(parse_token_id(&token_id)?).await?;
    println!("[RESPONSE] DELETE /api/v1/nft/{} -> 200 OK tx={}", token_id, hash);
    Ok(Json(HashResponse { hash }))
}
