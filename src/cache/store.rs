//! Cache storage backends and the resilient handle the read path uses.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::config::{CacheBackend, CacheConfig};
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};
use super::pattern::glob_match;
use super::redis_cache::RedisCache;

const SOURCE: &str = "cache::store";

pub const METRIC_CACHE_HIT: &str = "moyinji_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "moyinji_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "moyinji_cache_error_total";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{backend} cache unavailable: {message}")]
    Unavailable {
        backend: &'static str,
        message: String,
    },
    #[error("cached value could not be decoded: {0}")]
    Codec(String),
}

impl CacheError {
    pub fn unavailable(backend: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            backend,
            message: err.to_string(),
        }
    }
}

/// Key/value store with per-key TTL and glob bulk deletion.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name used in logs and metric labels.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key matching `pattern` (Redis `MATCH` syntax) and return
    /// how many were removed.
    async fn delete_matching(&self, pattern: &str) -> Result<u64, CacheError>;
}

/// Build the backend selected by configuration.
pub fn build_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    if !config.enabled {
        return Ok(Arc::new(DisabledCache));
    }
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::new(config))),
        CacheBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                CacheError::unavailable("redis", "cache.redis_url is not configured")
            })?;
            Ok(Arc::new(RedisCache::open(url)?))
        }
    }
}

// ============================================================================
// Memory backend
// ============================================================================

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: Instant,
}

/// In-process LRU with absolute per-entry expiry.
pub struct MemoryCache {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    /// Number of stored entries, including ones that expired but were not
    /// touched since.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a live entry exists, without promoting it.
    pub fn contains_key(&self, key: &str) -> bool {
        rw_read(&self.entries, SOURCE, "contains_key")
            .peek(key)
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }

    /// Live keys, most recently used first.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "keys")
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    fn backend(&self) -> &'static str {
        CacheBackend::Memory.as_str()
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let live = match entries.get(key) {
            None => return Ok(None),
            Some(entry) => (entry.expires_at > Instant::now()).then(|| entry.value.clone()),
        };
        if live.is_none() {
            entries.pop(key);
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        rw_write(&self.entries, SOURCE, "set").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "delete_matching");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        Ok(doomed.len() as u64)
    }
}

// ============================================================================
// Disabled backend
// ============================================================================

/// Always misses; writes are no-ops.
pub struct DisabledCache;

#[async_trait]
impl CacheStore for DisabledCache {
    fn backend(&self) -> &'static str {
        "disabled"
    }

    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete_matching(&self, _pattern: &str) -> Result<u64, CacheError> {
        Ok(0)
    }
}

// ============================================================================
// Resilient handle
// ============================================================================

/// Shared handle around a backend. Backend failures are logged and counted,
/// reads degrade to misses and writes are dropped, so callers never see a
/// cache error.
#[derive(Clone)]
pub struct CacheHandle {
    inner: Arc<dyn CacheStore>,
}

impl CacheHandle {
    pub fn new(inner: Arc<dyn CacheStore>) -> Self {
        Self { inner }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledCache))
    }

    pub fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    /// Fetch and decode a bundle. `None` on miss, backend error, or an entry
    /// that no longer decodes.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let backend = self.inner.backend();
        let keyspace = key.keyspace();
        let rendered = key.to_string();

        let bytes = match self.inner.get(&rendered).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                counter!(METRIC_CACHE_MISS, "backend" => backend, "keyspace" => keyspace)
                    .increment(1);
                debug!(key = %rendered, "Cache miss");
                return None;
            }
            Err(err) => {
                self.record_error("get", &rendered, &err);
                counter!(METRIC_CACHE_MISS, "backend" => backend, "keyspace" => keyspace)
                    .increment(1);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                counter!(METRIC_CACHE_HIT, "backend" => backend, "keyspace" => keyspace)
                    .increment(1);
                debug!(key = %rendered, "Cache hit");
                Some(value)
            }
            Err(err) => {
                self.record_error("decode", &rendered, &CacheError::Codec(err.to_string()));
                self.delete(key).await;
                counter!(METRIC_CACHE_MISS, "backend" => backend, "keyspace" => keyspace)
                    .increment(1);
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let rendered = key.to_string();
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) => {
                self.record_error("encode", &rendered, &CacheError::Codec(err.to_string()));
                return;
            }
        };
        if let Err(err) = self.inner.set(&rendered, bytes, ttl).await {
            self.record_error("set", &rendered, &err);
        }
    }

    pub async fn delete(&self, key: &CacheKey) {
        self.delete_raw(&key.to_string()).await;
    }

    pub(crate) async fn delete_raw(&self, key: &str) {
        if let Err(err) = self.inner.delete(key).await {
            self.record_error("delete", key, &err);
        }
    }

    /// Returns the number of removed keys, 0 when the backend failed.
    pub async fn delete_matching(&self, pattern: &str) -> u64 {
        match self.inner.delete_matching(pattern).await {
            Ok(removed) => removed,
            Err(err) => {
                self.record_error("delete_matching", pattern, &err);
                0
            }
        }
    }

    fn record_error(&self, op: &'static str, key: &str, err: &CacheError) {
        let backend = self.inner.backend();
        counter!(METRIC_CACHE_ERROR, "backend" => backend, "op" => op).increment(1);
        warn!(backend, op, key, error = %err, "Cache operation failed; continuing without cache");
    }
}
