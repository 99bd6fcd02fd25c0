//! Executes invalidation plans against the cache.

use std::time::Instant;

use metrics::histogram;
use tracing::{info, instrument};

use super::planner::InvalidationPlan;
use super::store::CacheHandle;

pub const METRIC_CACHE_INVALIDATION_MS: &str = "moyinji_cache_invalidation_ms";

#[derive(Clone)]
pub struct CacheConsumer {
    cache: CacheHandle,
}

impl CacheConsumer {
    pub fn new(cache: CacheHandle) -> Self {
        Self { cache }
    }

    /// Remove every key and pattern in `plan`. Returns the number of cache
    /// entries removed by pattern deletes; exact deletes are not counted
    /// because not every backend reports them.
    #[instrument(skip(self, plan), fields(plan = %plan))]
    pub async fn execute(&self, plan: &InvalidationPlan) -> u64 {
        if plan.is_empty() {
            return 0;
        }
        let started_at = Instant::now();

        for key in &plan.delete_keys {
            self.cache.delete(key).await;
        }

        let mut removed = 0;
        for pattern in &plan.delete_patterns {
            removed += self.cache.delete_matching(&pattern.to_string()).await;
        }

        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        info!(
            keys = plan.delete_keys.len(),
            patterns = plan.delete_patterns.len(),
            pattern_matches = removed,
            elapsed_ms,
            backend = self.cache.backend(),
            "Cache invalidation complete"
        );
        histogram!(METRIC_CACHE_INVALIDATION_MS, "backend" => self.cache.backend())
            .record(elapsed_ms);

        removed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::keys::{CacheKey, KeyPattern};
    use crate::cache::store::{CacheStore, MemoryCache};

    #[tokio::test]
    async fn execute_removes_keys_and_pattern_matches() {
        let store = Arc::new(MemoryCache::new(&CacheConfig::default()));
        let consumer = CacheConsumer::new(CacheHandle::new(store.clone()));
        let ttl = Duration::from_secs(60);
        for key in [
            CacheKey::blog_list(None, None),
            CacheKey::blog_list(Some("essay"), None),
            CacheKey::blog_detail("song-aesthetics-photography"),
            CacheKey::GalleryList,
        ] {
            store
                .set(&key.to_string(), bytes::Bytes::from_static(b"{}"), ttl)
                .await
                .unwrap();
        }

        let mut plan = InvalidationPlan::default();
        plan.delete_keys
            .insert(CacheKey::blog_detail("song-aesthetics-photography"));
        plan.delete_patterns.insert(KeyPattern::AllBlogLists);

        assert_eq!(consumer.execute(&plan).await, 2);
        assert_eq!(store.keys(), vec![CacheKey::GalleryList.to_string()]);
    }

    #[tokio::test]
    async fn empty_plan_is_a_no_op() {
        let consumer = CacheConsumer::new(CacheHandle::disabled());
        assert_eq!(consumer.execute(&InvalidationPlan::default()).await, 0);
    }
}
