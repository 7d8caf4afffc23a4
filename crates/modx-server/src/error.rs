use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use modx_core::CoreError;
use serde::Serialize;

use crate::chain::ChainError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("{0}")]
    Validation(#[from] CoreError),

    #[error("No swap route between {from} and {to}")]
    NoRoute { from: String, to: String },

    #[error("Quote failed: {0}")]
    Quote(ChainError),

    #[error("Transaction failed: {0}")]
    Transaction(ChainError),

    #[error("Chain read failed: {0}")]
    Chain(#[from] ChainError),

    #[error("Operation already in progress: {0}")]
    Busy(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::NotConnected => {
                tracing::info!(error_code = "NOT_CONNECTED", "Operation requires a connected wallet");
                (StatusCode::UNAUTHORIZED, "NOT_CONNECTED")
            }
            AppError::Validation(e) => {
                tracing::warn!(error = %e, error_code = "VALIDATION_ERROR", "Rejected invalid input");
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::NoRoute { from, to } => {
                tracing::info!(from = %from, to = %to, error_code = "NO_ROUTE", "No swap route");
                (StatusCode::UNPROCESSABLE_ENTITY, "NO_ROUTE")
            }
            AppError::Quote(e) => {
                tracing::error!(error = %e, error_code = "QUOTE_ERROR", "Quote failed");
                (StatusCode::BAD_GATEWAY, "QUOTE_ERROR")
            }
            AppError::Transaction(e) => {
                tracing::error!(error = %e, error_code = "TRANSACTION_ERROR", "Transaction failed");
                (StatusCode::BAD_GATEWAY, "TRANSACTION_ERROR")
            }
            AppError::Chain(e) => {
                tracing::error!(error = %e, error_code = "CHAIN_ERROR", "Chain read failed");
                (StatusCode::BAD_GATEWAY, "CHAIN_ERROR")
            }
            AppError::Busy(what) => {
                tracing::warn!(operation = %what, error_code = "BUSY", "Rejected overlapping operation");
                (StatusCode::CONFLICT, "BUSY")
            }
            AppError::NotFound(what) => {
                tracing::info!(what = %what, error_code = "NOT_FOUND", "Resource not found");
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            AppError::ExternalApi(msg) => {
                tracing::error!(message = %msg, error_code = "EXTERNAL_API_ERROR", "External API error");
                (StatusCode::BAD_GATEWAY, "EXTERNAL_API_ERROR")
            }
            AppError::Config(msg) => {
                tracing::error!(message = %msg, error_code = "CONFIG_ERROR", "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR")
            }
            AppError::Internal(msg) => {
                tracing::error!(message = %msg, error_code = "INTERNAL_ERROR", "Internal error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        tracing::debug!(
            status_code = %status.as_u16(),
            error_code = %code,
            error_message = %self,
            "Returning error response"
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
