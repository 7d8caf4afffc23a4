//! Error types for modX Core

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Selected pool is not valid or inactive: {0}")]
    PoolUnavailable(u64),

    #[error("Stake of {amount} exceeds max allowed per user ({max})")]
    ExceedsMaxStake { amount: Decimal, max: Decimal },

    #[error("Invalid percentage: {0} (expected 1-100)")]
    InvalidPercentage(u32),

    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    #[error("Unsupported token: {0}")]
    UnknownToken(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
