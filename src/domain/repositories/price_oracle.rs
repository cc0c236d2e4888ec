//! Price Oracle Trait
//!
//! This module defines the `PriceOracle` trait, the interface the enrichment
//! run uses to look up the current USD price of a coin. The CoinGecko client
//! implements it in production; tests substitute scripted oracles.

use async_trait::async_trait;
use thiserror::Error;

/// Common result type for oracle lookups
pub type OracleResult<T> = Result<T, OracleError>;

/// Errors that can occur while fetching a price
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OracleError {
    /// 2xx response without `<coin_id>.usd`
    #[error("price not found for coin: {symbol} (ID: {coin_id})")]
    PriceNotFound { symbol: String, coin_id: String },

    /// Still answering 429 after the last retry
    #[error("rate limit exceeded after {retries} retries")]
    RateLimited { retries: u32 },

    /// Any other non-2xx status
    #[error("API error: status {status}")]
    Http { status: u16 },

    /// Connection, TLS or timeout failure
    #[error("request failed: {0}")]
    Transport(String),

    /// 2xx response whose body is not the expected JSON shape
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The run was cancelled while the lookup was in flight
    #[error("price lookup cancelled")]
    Cancelled,
}

impl OracleError {
    /// Only 429 responses are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::RateLimited { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OracleError::Cancelled)
    }
}

/// Price oracle trait providing the current USD price of a coin
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Get the name of this oracle
    fn name(&self) -> &str;

    /// Fetch the current USD price for a user-facing symbol such as "BTC"
    async fn fetch_price_usd(&self, symbol: &str) -> OracleResult<f64>;
}
