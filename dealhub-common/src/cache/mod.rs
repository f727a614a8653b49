//! Cache abstraction
//!
//! The cache is used as a read-through cache for API payloads and as a
//! counter store for rate limiting. It is never the source of truth: every
//! cached value can be rebuilt from the database.
//!
//! Two backends implement [`Cache`]:
//! - [`RedisCache`] for deployments
//! - [`MemoryCache`] for tests and single-process runs

mod memory;
mod redis_cache;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::Result;

/// Key/value store with expiry and atomic counters
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` with a time-to-live in seconds
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    async fn del(&self, key: &str) -> Result<()>;

    /// Increment an integer counter, creating it at 1 if missing
    async fn incr(&self, key: &str) -> Result<i64>;

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()>;

    /// Remaining lifetime in seconds; -2 if the key is missing, -1 if it has no expiry
    async fn ttl(&self, key: &str) -> Result<i64>;
}

/// Cache key patterns
pub mod keys {
    pub fn product(id: &str) -> String {
        format!("product:{}", id)
    }

    pub fn prices(product_id: &str) -> String {
        format!("prices:{}", product_id)
    }

    pub fn offers(store_id: &str) -> String {
        format!("offers:{}", store_id)
    }

    pub fn bank_offers() -> String {
        "bank_offers".to_string()
    }

    pub fn coupons() -> String {
        "coupons:active".to_string()
    }

    pub fn user_alerts(user_id: &str) -> String {
        format!("alerts:{}", user_id)
    }

    pub fn comparison(product_id: &str) -> String {
        format!("comparison:{}", product_id)
    }

    pub fn extension(extension_id: &str) -> String {
        format!("ext:{}", extension_id)
    }

    pub fn rate_limit(identifier: &str, endpoint: &str) -> String {
        format!("ratelimit:{}:{}", identifier, endpoint)
    }
}

/// Cache durations in seconds
pub mod ttl {
    pub const PRICES: u64 = 3600;
    pub const OFFERS: u64 = 7200;
    pub const BANK_OFFERS: u64 = 86400;
    pub const COUPONS: u64 = 3600;
    pub const USER_DATA: u64 = 1800;
    pub const RATE_LIMIT: u64 = 60;
}

/// Best-effort typed read; misses, backend errors and stale payloads all yield `None`
pub async fn load_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!("Cache read failed for {}: {}", key, e);
            None
        }
    }
}

/// Best-effort typed write; failures are logged and ignored
pub async fn store_json<T: Serialize + ?Sized>(cache: &dyn Cache, key: &str, value: &T, ttl_secs: u64) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Could not serialize cache entry {}: {}", key, e);
            return;
        }
    };

    if let Err(e) = cache.set_ex(key, &raw, ttl_secs).await {
        warn!("Cache write failed for {}: {}", key, e);
    }
}

/// Best-effort delete
pub async fn invalidate(cache: &dyn Cache, key: &str) {
    if let Err(e) = cache.del(key).await {
        warn!("Cache invalidation failed for {}: {}", key, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        title: String,
        best_price: f64,
    }

    #[test]
    fn test_key_patterns() {
        assert_eq!(keys::product("p1"), "product:p1");
        assert_eq!(keys::user_alerts("u1"), "alerts:u1");
        assert_eq!(keys::extension("anonymous"), "ext:anonymous");
        assert_eq!(
            keys::rate_limit("10.0.0.1", "/api/products/compare"),
            "ratelimit:10.0.0.1:/api/products/compare"
        );
        assert_eq!(keys::bank_offers(), "bank_offers");
    }

    #[tokio::test]
    async fn test_json_helpers_round_trip() {
        let cache = MemoryCache::new();
        let payload = Payload {
            title: "Pixel 9".to_string(),
            best_price: 64999.0,
        };

        store_json(&cache, "product:p1", &payload, ttl::PRICES).await;
        let loaded: Option<Payload> = load_json(&cache, "product:p1").await;
        assert_eq!(loaded, Some(payload));

        invalidate(&cache, "product:p1").await;
        let gone: Option<Payload> = load_json(&cache, "product:p1").await;
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_load_json_discards_corrupt_entry() {
        let cache = MemoryCache::new();
        cache.set_ex("product:p2", "{not json", 60).await.unwrap();
        let loaded: Option<Payload> = load_json(&cache, "product:p2").await;
        assert!(loaded.is_none());
    }
}
