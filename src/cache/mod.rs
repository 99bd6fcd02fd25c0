//! Moyinji read-through cache.
//!
//! Read services look bundles up by a deterministic [`CacheKey`] and fill
//! misses from the store. Write services report every successful write to
//! the [`CacheTrigger`], which deletes the affected keys and key patterns
//! before the write call returns.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"   # or "redis"
//! redis_url = "redis://127.0.0.1:6379/0"
//! capacity = 1024
//! list_ttl_secs = 900
//! detail_ttl_secs = 1800
//! ```

mod config;
mod consumer;
mod events;
mod keys;
pub(crate) mod lock;
mod pattern;
mod planner;
mod redis_cache;
mod store;
mod trigger;

pub use config::{CacheBackend, CacheConfig};
pub use consumer::{CacheConsumer, METRIC_CACHE_INVALIDATION_MS};
pub use events::{
    AlbumSnapshot, CacheEvent, CategorySnapshot, Change, Epoch, EventKind, Operation,
    PhotoSnapshot, PostSnapshot, TagSnapshot,
};
pub use keys::{CacheKey, KeyPattern};
pub use pattern::{escape as escape_pattern, glob_match};
pub use planner::InvalidationPlan;
pub use redis_cache::RedisCache;
pub use store::{
    CacheError, CacheHandle, CacheStore, DisabledCache, METRIC_CACHE_ERROR, METRIC_CACHE_HIT,
    METRIC_CACHE_MISS, MemoryCache, build_store,
};
pub use trigger::CacheTrigger;
