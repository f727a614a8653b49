//! Fixed-window rate limiting
//!
//! Each (identifier, endpoint) pair owns one counter key. The first request
//! in a window creates the counter and arms its expiry; the window ends when
//! the key expires. Cache failures fail open so a cache outage never takes
//! the API down with it.

use serde::Serialize;
use tracing::warn;

use crate::cache::{keys, Cache};
use crate::Result;

/// Request budget for one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub limit: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub const fn new(limit: u32, window_secs: u64) -> Self {
        Self { limit, window_secs }
    }
}

/// Named budgets for the public API
pub struct RateLimits;

impl RateLimits {
    /// 5 requests per 15 minutes
    pub const AUTH: RateLimitConfig = RateLimitConfig::new(5, 900);
    pub const PRODUCT_SEARCH: RateLimitConfig = RateLimitConfig::new(30, 60);
    pub const COMPARISON: RateLimitConfig = RateLimitConfig::new(20, 60);
    pub const AFFILIATE_CLICK: RateLimitConfig = RateLimitConfig::new(100, 3600);
    pub const API_GENERAL: RateLimitConfig = RateLimitConfig::new(100, 3600);
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Seconds until the window resets
    pub reset_in: i64,
}

/// Count this request against the caller's window
pub async fn check_rate_limit(
    cache: &dyn Cache,
    identifier: &str,
    endpoint: &str,
    config: RateLimitConfig,
) -> RateLimitDecision {
    match count_request(cache, identifier, endpoint, config).await {
        Ok(decision) => decision,
        Err(e) => {
            warn!(
                "Rate limit check failed for {} on {}, allowing request: {}",
                identifier, endpoint, e
            );
            RateLimitDecision {
                allowed: true,
                remaining: config.limit,
                reset_in: config.window_secs as i64,
            }
        }
    }
}

async fn count_request(
    cache: &dyn Cache,
    identifier: &str,
    endpoint: &str,
    config: RateLimitConfig,
) -> Result<RateLimitDecision> {
    let key = keys::rate_limit(identifier, endpoint);

    let current = cache.incr(&key).await?;
    if current == 1 {
        cache.expire(&key, config.window_secs).await?;
    }

    let mut ttl = cache.ttl(&key).await?;
    if ttl < 0 {
        // Counter survived without an expiry (e.g. the EXPIRE after the first
        // INCR was lost); re-arm it so the caller is not locked out forever.
        cache.expire(&key, config.window_secs).await?;
        ttl = config.window_secs as i64;
    }

    let limit = i64::from(config.limit);
    Ok(RateLimitDecision {
        allowed: current <= limit,
        remaining: (limit - current).max(0) as u32,
        reset_in: ttl,
    })
}

/// Clear the caller's counter for `endpoint`
pub async fn reset_rate_limit(cache: &dyn Cache, identifier: &str, endpoint: &str) -> Result<()> {
    cache.del(&keys::rate_limit(identifier, endpoint)).await
}
