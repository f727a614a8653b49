//! In-process cache backend

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::Cache;
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Writes between sweeps of expired entries
const SWEEP_INTERVAL: u64 = 256;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    writes: u64,
}

/// TTL-aware map with Redis-compatible semantics for the operations DealHub uses
///
/// Expired entries are dropped when touched, and every [`SWEEP_INTERVAL`]
/// writes the whole map is swept so one-off keys (rate-limit windows,
/// extension sessions) do not accumulate.
#[derive(Debug, Default)]
pub struct MemoryCache {
    inner: Mutex<Inner>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until swept
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry now
    pub fn purge_expired(&self) -> Result<()> {
        self.with_entries(|entries, now| {
            entries.retain(|_, e| !e.is_expired(now));
            Ok(())
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Internal("memory cache lock poisoned".to_string()))
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, Entry>, Instant) -> Result<T>) -> Result<T> {
        let mut inner = self.lock()?;
        f(&mut inner.entries, Instant::now())
    }

    /// Like `with_entries`, counting the call toward the next sweep
    fn write_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, Entry>, Instant) -> Result<T>) -> Result<T> {
        let mut inner = self.lock()?;
        let now = Instant::now();
        let result = f(&mut inner.entries, now);

        inner.writes += 1;
        if inner.writes % SWEEP_INTERVAL == 0 {
            inner.entries.retain(|_, e| !e.is_expired(now));
        }

        result
    }
}

/// Remove `key` if it has expired, returning the live entry otherwise
fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str, now: Instant) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|e| e.is_expired(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|entries, now| Ok(live(entries, key, now).map(|e| e.value.clone())))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.write_entries(|entries, now| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at: Some(now + Duration::from_secs(ttl_secs)),
                },
            );
            Ok(())
        })
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.with_entries(|entries, _| {
            entries.remove(key);
            Ok(())
        })
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        self.write_entries(|entries, now| match live(entries, key, now) {
            Some(entry) => {
                let current: i64 = entry.value.parse().map_err(|_| {
                    Error::InvalidInput(format!("value at {} is not an integer", key))
                })?;
                let next = current + 1;
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: None,
                    },
                );
                Ok(1)
            }
        })
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        self.write_entries(|entries, now| {
            if let Some(entry) = live(entries, key, now) {
                entry.expires_at = Some(now + Duration::from_secs(ttl_secs));
            }
            Ok(())
        })
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        self.with_entries(|entries, now| {
            Ok(match live(entries, key, now) {
                None => -2,
                Some(Entry { expires_at: None, .. }) => -1,
                Some(Entry {
                    expires_at: Some(at), ..
                }) => {
                    let remaining = at.saturating_duration_since(now);
                    // Round up like Redis does for partially elapsed seconds
                    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                    secs as i64
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set_del() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache.set_ex("k", "v", 60).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        cache.del("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incr_and_ttl_semantics() {
        let cache = MemoryCache::new();
        assert_eq!(cache.ttl("counter").await.unwrap(), -2);

        assert_eq!(cache.incr("counter").await.unwrap(), 1);
        assert_eq!(cache.ttl("counter").await.unwrap(), -1);

        cache.expire("counter", 30).await.unwrap();
        assert_eq!(cache.incr("counter").await.unwrap(), 2);

        let ttl = cache.ttl("counter").await.unwrap();
        assert!(ttl > 0 && ttl <= 30, "ttl was {}", ttl);
    }

    #[tokio::test]
    async fn test_expired_entries_disappear() {
        let cache = MemoryCache::new();
        cache.set_ex("short", "v", 0).await.unwrap();
        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.ttl("short").await.unwrap(), -2);
    }

    #[tokio::test]
    async fn test_expired_keys_are_swept_on_writes() {
        let cache = MemoryCache::new();

        for i in 0..SWEEP_INTERVAL * 4 {
            let key = format!("ratelimit:ip-{}:/api/products/compare", i);
            cache.incr(&key).await.unwrap();
            cache.expire(&key, 0).await.unwrap();
        }

        // Two writes per key, so a sweep runs on the final write
        assert!(cache.is_empty(), "{} entries left", cache.len());
    }

    #[tokio::test]
    async fn test_sweep_keeps_live_entries() {
        let cache = MemoryCache::new();
        cache.set_ex("product:keep", "{}", 3600).await.unwrap();

        for i in 0..SWEEP_INTERVAL {
            cache.set_ex(&format!("ext:{}", i), "{}", 0).await.unwrap();
        }
        cache.purge_expired().unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("product:keep").await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_incr_on_non_integer_fails() {
        let cache = MemoryCache::new();
        cache.set_ex("text", "hello", 60).await.unwrap();
        assert!(cache.incr("text").await.is_err());
    }
}
