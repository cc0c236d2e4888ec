//! # CoinGecko Price Oracle Client
//!
//! Looks up current USD prices through the public `simple/price` endpoint.
//!
//! ## Rate limiting
//!
//! - HTTP 429 is retried up to `max_retries` times, waiting
//!   `base_delay * 2^(k-1)` before retry k (2s, 4s, 8s by default)
//! - Every successful lookup is followed by a `success_pace` pause (1s) so a
//!   sequential caller never exceeds one request per second
//! - A shared governor limiter gates each attempt
//!
//! Transport errors and other non-2xx statuses fail immediately.
//!
//! ## References
//!
//! - API Documentation: https://docs.coingecko.com/reference/simple-price

use crate::domain::repositories::price_oracle::{OracleError, OracleResult, PriceOracle};
use crate::domain::services::symbol_resolver::resolve_coin_id;
use crate::rate_limit::{create_rate_limiter, RateLimiterConfig, SharedRateLimiter};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// CoinGecko public API base URL
pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// Retry and pacing schedule for one price lookup
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (only on 429)
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each following one
    pub base_delay: Duration,
    /// Pause after every successful lookup
    pub success_pace: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            success_pace: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Sum of all backoff delays when every attempt is rate limited.
    pub fn total_backoff(&self) -> Duration {
        (1..=self.max_retries).map(|attempt| self.backoff_delay(attempt)).sum()
    }
}

/// CoinGecko client configuration
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    pub api_base: String,
    /// Demo/pro key, sent as `x-cg-demo-api-key` when present
    pub api_key: Option<String>,
    pub retry: RetryPolicy,
    pub rate_limit: RateLimiterConfig,
    pub request_timeout: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            api_base: COINGECKO_API_BASE.to_string(),
            api_key: None,
            retry: RetryPolicy::default(),
            rate_limit: RateLimiterConfig::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// CoinGecko client for price lookups
pub struct CoinGeckoClient {
    client: Client,
    config: CoinGeckoConfig,
    limiter: SharedRateLimiter,
    cancel: CancellationToken,
}

impl std::fmt::Debug for CoinGeckoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinGeckoClient")
            .field("api_base", &self.config.api_base)
            .field("api_key", &self.config.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("retry", &self.config.retry)
            .finish()
    }
}

impl CoinGeckoClient {
    /// Create a client against the public API with default pacing
    pub fn new() -> Result<Self, String> {
        Self::new_with_config(CoinGeckoConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn new_with_config(config: CoinGeckoConfig) -> Result<Self, String> {
        let client = Client::builder()
            .user_agent("TrackMyCoin/0.1.0")
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        let limiter = create_rate_limiter(config.rate_limit.clone());

        Ok(Self {
            client,
            config,
            limiter,
            cancel: CancellationToken::new(),
        })
    }

    /// Abort in-flight requests and sleeps once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &CoinGeckoConfig {
        &self.config
    }

    async fn cancellable<F: Future>(&self, future: F) -> OracleResult<F::Output> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(OracleError::Cancelled),
            output = future => Ok(output),
        }
    }

    async fn request_price(&self, coin_id: &str) -> OracleResult<reqwest::Response> {
        let url = format!("{}/simple/price", self.config.api_base);

        let mut request = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&[("ids", coin_id), ("vs_currencies", "usd")]);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("x-cg-demo-api-key", api_key);
        }

        self.cancellable(self.limiter.until_ready()).await?;
        self.cancellable(request.send())
            .await?
            .map_err(|e| OracleError::Transport(e.to_string()))
    }

    fn extract_usd(body: &serde_json::Value, coin_id: &str) -> Option<f64> {
        body.get(coin_id)?.get("usd")?.as_f64()
    }
}

#[async_trait]
impl PriceOracle for CoinGeckoClient {
    fn name(&self) -> &str {
        "CoinGecko"
    }

    async fn fetch_price_usd(&self, symbol: &str) -> OracleResult<f64> {
        let coin_id = resolve_coin_id(symbol);
        let retry = &self.config.retry;

        for attempt in 0..=retry.max_retries {
            if attempt > 0 {
                let delay = retry.backoff_delay(attempt);
                debug!(
                    "CoinGecko retry {}/{} for {} in {:?}",
                    attempt, retry.max_retries, coin_id, delay
                );
                self.cancellable(tokio::time::sleep(delay)).await?;
            }

            let response = self.request_price(&coin_id).await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(
                    "CoinGecko rate limited {} (attempt {}/{})",
                    coin_id,
                    attempt + 1,
                    retry.max_retries + 1
                );
                continue;
            }

            if !status.is_success() {
                return Err(OracleError::Http {
                    status: status.as_u16(),
                });
            }

            let body: serde_json::Value = self
                .cancellable(response.json())
                .await?
                .map_err(|e| OracleError::Decode(e.to_string()))?;

            let price = Self::extract_usd(&body, &coin_id).ok_or_else(|| {
                OracleError::PriceNotFound {
                    symbol: symbol.to_string(),
                    coin_id: coin_id.clone(),
                }
            })?;

            debug!("CoinGecko {} = {} USD", coin_id, price);
            self.cancellable(tokio::time::sleep(retry.success_pace)).await?;
            return Ok(price);
        }

        Err(OracleError::RateLimited {
            retries: retry.max_retries,
        })
    }
}
