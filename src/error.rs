// src/error.rs
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the exchange.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by exchange (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("order rejected ({code}): {msg}")]
    OrderRejected { code: i64, msg: String },

    #[error("data inconsistency: {0}")]
    DataInconsistency(String),

    /// The paper-trading order ledger could not be read or written.
    #[error("paper ledger error: {0}")]
    PaperLedger(String),
}

impl GatewayError {
    /// Transient errors are expected to clear up by the next scan.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. })
    }
}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        GatewayError::PaperLedger(e.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::DataInconsistency(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt position row for {symbol}: {reason}")]
    Corrupt { symbol: String, reason: String },
}

/// Error returned by a single lifecycle operation on one symbol.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BotError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BotError::Gateway(GatewayError::RateLimited { .. }))
    }

    pub fn is_transient(&self) -> bool {
        match self {
            BotError::Gateway(e) => e.is_transient(),
            BotError::Store(_) => false,
        }
    }

    /// The exchange's Retry-After hint, when it sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BotError::Gateway(GatewayError::RateLimited { retry_after }) => *retry_after,
            _ => None,
        }
    }
}

pub type BotResult<T> = std::result::Result<T, BotError>;
