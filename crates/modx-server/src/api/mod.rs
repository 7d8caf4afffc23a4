pub mod dto;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Wallet session
        .route("/api/v1/session", get(handlers::get_session).post(handlers::connect))
        .route("/api/v1/session/disconnect", post(handlers::disconnect))
        // Staking
        .route("/api/v1/pools", get(handlers::list_pools))
        .route("/api/v1/stakes", get(handlers::list_stakes))
        .route("/api/v1/stake", post(handlers::stake))
        .route("/api/v1/unstake", post(handlers::unstake))
        .route("/api/v1/claim", post(handlers::claim))
        .route("/api/v1/rewards/estimate", get(handlers::estimate_rewards))
        .route("/api/v1/rewards/pending", get(handlers::pending_rewards))
        // Swap
        .route("/api/v1/swap/quote", get(handlers::swap_quote))
        .route("/api/v1/swap/quote/latest", get(handlers::latest_quote))
        .route("/api/v1/swap/amount", get(handlers::swap_amount))
        .route("/api/v1/swap/impact", get(handlers::price_impact))
        .route("/api/v1/swap/rate", get(handlers::exchange_rate))
        .route("/api/v1/swap", post(handlers::execute_swap))
        // Liquidity
        .route("/api/v1/liquidity", get(handlers::liquidity_position))
        .route("/api/v1/liquidity/add", post(handlers::add_liquidity))
        .route("/api/v1/liquidity/remove", post(handlers::remove_liquidity))
        // Tokens
        .route("/api/v1/balances", get(handlers::balances))
        .route("/api/v1/tokens/allowance", get(handlers::allowance))
        .route("/api/v1/tokens/approve", post(handlers::approve))
        .route("/api/v1/tokens/transfer", post(handlers::transfer))
        // Account views
        .route("/api/v1/portfolio", get(handlers::portfolio))
        .route("/api/v1/history", get(handlers::history))
        .route("/api/v1/prices", get(handlers::prices))
        .route("/api/v1/profile", get(handlers::profile))
        .route("/api/v1/pending", get(handlers::pending))
        .route(
            "/api/v1/alarm",
            get(handlers::get_alarm)
                .post(handlers::set_alarm)
                .delete(handlers::clear_alarm),
        )
        // Licensed NFTs
        .route("/api/v1/nft/mint", post(handlers::mint_nft))
        .route("/api/v1/nft/{id}", get(handlers::nft_details).delete(handlers::burn_nft))
        .route("/api/v1/nft/{id}/transfer", post(handlers::transfer_nft))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::engine::testing::{fixture, Fixture};

    fn app(f: &Fixture) -> Router {
        let state = AppState {
            engine: f.engine.clone(),
            chain: f.chain.clone(),
            config: Arc::new(AppConfig::defaults().unwrap()),
        };
        create_router().with_state(state)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health_reports_chain_head() {
        let f = fixture(1);
        f.chain.set_head(1234);
        let (status, body) = send(app(&f), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chain"], "connected");
        assert_eq!(body["block_number"], 1234);
    }

    #[tokio::test]
    async fn test_account_routes_require_session() {
        let f = fixture(1);
        let (status, body) = send(app(&f), "GET", "/api/v1/portfolio", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "NOT_CONNECTED");

        let (status, _) = send(
            app(&f),
            "POST",
            "/api/v1/stake",
            Some(serde_json::json!({ "pool_id": 0, "amount": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_connect_then_disconnect() {
        let f = fixture(1);
        let account = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1";
        let (status, body) = send(
            app(&f),
            "POST",
            "/api/v1/session",
            Some(serde_json::json!({ "account": account })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connected"], true);
        assert_eq!(body["chain_id"], 97);
        assert!(f.engine.session().account().is_some());

        let (_, body) = send(app(&f), "POST", "/api/v1/session/disconnect", None).await;
        assert_eq!(body["connected"], false);
        assert!(f.engine.session().account().is_none());
    }

    #[tokio::test]
    async fn test_validation_errors_are_bad_requests() {
        let f = fixture(1);
        f.engine.session().connect(alloy_primitives::Address::repeat_byte(1), 97);
        let (status, body) = send(
            app(&f),
            "POST",
            "/api/v1/liquidity/remove",
            Some(serde_json::json!({ "percentage": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _) = send(app(&f), "GET", "/api/v1/nft/not-a-number", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_swap_amount_is_zero_for_invalid_input() {
        let f = fixture(1);
        let (status, body) = send(app(&f), "GET", "/api/v1/swap/amount?input=abc&from=modX&to=BNB", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"], "0");

        let (status, body) = send(app(&f), "GET", "/api/v1/swap/amount?input=1&from=modX&to=NOPE", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_prices_fall_back_with_provenance() {
        let f = fixture(1);
        let (status, body) = send(app(&f), "GET", "/api/v1/prices", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["degraded"], true);
        assert_eq!(body["quotes"]["modX"]["source"], "fallback");
    }
}
