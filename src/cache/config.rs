//! Cache configuration.
//!
//! Controls the read-through cache via the `[cache]` section of `moyinji.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CAPACITY: usize = 1024;
const DEFAULT_LIST_TTL_SECS: u64 = 15 * 60;
const DEFAULT_DETAIL_TTL_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// In-process LRU.
    #[default]
    Memory,
    /// Shared Redis server.
    Redis,
}

impl CacheBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every read misses and invalidation is skipped.
    pub enabled: bool,
    pub backend: CacheBackend,
    /// Required when `backend = "redis"`.
    pub redis_url: Option<String>,
    /// Maximum entries held by the memory backend.
    pub capacity: usize,
    /// TTL for blog and gallery list bundles.
    pub list_ttl_secs: u64,
    /// TTL for blog post and album detail bundles.
    pub detail_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            redis_url: None,
            capacity: DEFAULT_CAPACITY,
            list_ttl_secs: DEFAULT_LIST_TTL_SECS,
            detail_ttl_secs: DEFAULT_DETAIL_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// A configuration with caching switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_secs)
    }

    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_secs)
    }
}
