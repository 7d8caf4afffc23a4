mod api;
mod chain;
mod config;
mod contracts;
mod engine;
mod error;
mod pending;
mod price_feed;
mod scheduler;
mod services;
mod session;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::chain::rpc::RpcChainClient;
use crate::chain::ChainClient;
use crate::config::AppConfig;
use crate::engine::Engine;
use crate::price_feed::BinancePriceFeed;
use crate::scheduler::RefreshScheduler;
use crate::session::Session;
use crate::store::LocalStore;

pub use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub chain: Arc<dyn ChainClient>,
    pub config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modx=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();

    println!("================================================");
    println!("            modX CLIENT - Starting Up           ");
    println!("================================================");

    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    let contracts = config.contracts.parse()?;

    println!("[CONFIG] Server: {}:{}", config.server.host, config.server.port);
    println!("[CONFIG] RPC: {} (chain {})", config.chain.rpc_url, config.chain.chain_id);
    println!("[CONFIG] Staking: {} / Token: {}", contracts.staking, contracts.token);
    println!("[CONFIG] Router: {} / Factory: {}", contracts.router, contracts.factory);
    match contracts.nft {
        Some(nft) => println!("[CONFIG] Licensed NFT: {}", nft),
        None => println!("[CONFIG] Licensed NFT: not configured (NFT routes disabled)"),
    }
    println!("[CONFIG] Price feed: {}", config.price_feed.url);
    println!(
        "[CONFIG] Refresh: positions every {}s, balances every {}s",
        config.refresh.positions_secs, config.refresh.balances_secs
    );

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        chain_id = %config.chain.chain_id,
        "Starting modX client"
    );

    let chain: Arc<dyn ChainClient> = Arc::new(RpcChainClient::new(&config.chain));
    match chain.block_number().await {
        Ok(head) => {
            println!("[CHAIN] Connected, head block {}", head);
            tracing::info!(block_number = %head, "Connected to chain");
        }
        Err(e) => {
            println!("[CHAIN] WARNING: node not reachable - {}", e);
            tracing::warn!(error = %e, "Chain node not reachable, reads will fail until it is");
        }
    }

    let prices = Arc::new(BinancePriceFeed::new(&config.price_feed)?);
    let store = LocalStore::open(config.store.path.as_deref());
    let session = Session::new();
    let engine = Engine::new(&config, chain.clone(), prices, store, session)?;
    println!("[ENGINE] Staking token: {}", engine.staking_token().symbol);
    println!("[ENGINE] Tokens: {}", engine.tokens().registry().iter().map(|t| t.symbol.as_str()).collect::<Vec<_>>().join(", "));

    let shutdown = CancellationToken::new();
    let scheduler = RefreshScheduler::new(engine.clone(), &config.refresh, shutdown.clone()).spawn();

    let state = AppState {
        engine,
        chain,
        config: Arc::new(config.clone()),
    };

    println!("[ROUTER] Setting up API routes...");
    let app = Router::new()
        .merge(api::create_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    println!("[ROUTER] Routes configured: /health, /api/v1/{{session,pools,stakes,swap,liquidity,portfolio,history,...}}");

    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("================================================");
    println!("  Server listening on http://{}", addr);
    println!("================================================");
    println!();

    tracing::info!("Listening on {}", addr);

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            println!("[SHUTDOWN] Stopping background refresh...");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = scheduler.await {
        tracing::warn!(error = %e, "Refresh scheduler ended abnormally");
    }

    Ok(())
}
