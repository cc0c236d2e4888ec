use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter configuration for outbound oracle requests
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum requests per minute
    pub requests_per_minute: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60, // CoinGecko public tier
        }
    }
}

/// Limiter shared by every caller of the same oracle
pub type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a new rate limiter. Requests are spread evenly (burst of one).
pub fn create_rate_limiter(config: RateLimiterConfig) -> SharedRateLimiter {
    let per_minute =
        NonZeroU32::new(config.requests_per_minute.max(1)).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::per_minute(per_minute).allow_burst(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(quota))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let config = RateLimiterConfig {
            requests_per_minute: 50,
        };
        let limiter = create_rate_limiter(config);

        // First request passes, the next one must wait
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_zero_is_clamped() {
        let limiter = create_rate_limiter(RateLimiterConfig {
            requests_per_minute: 0,
        });
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_default_config() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.requests_per_minute, 60);
    }
}
