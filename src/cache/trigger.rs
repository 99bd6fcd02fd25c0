//! Cache trigger service.
//!
//! Write services call the trigger after a successful store write. The
//! trigger turns the write into events, plans the invalidation and executes
//! it before returning, so the next read cannot see pre-write bundles.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};
use uuid::Uuid;

use super::consumer::CacheConsumer;
use super::events::{
    AlbumSnapshot, CacheEvent, CategorySnapshot, Change, EventKind, PhotoSnapshot, PostSnapshot,
    TagSnapshot,
};
use super::planner::InvalidationPlan;
use super::store::CacheHandle;

pub struct CacheTrigger {
    enabled: bool,
    consumer: CacheConsumer,
    epoch_counter: AtomicU64,
}

impl CacheTrigger {
    pub fn new(enabled: bool, cache: CacheHandle) -> Self {
        Self {
            enabled,
            consumer: CacheConsumer::new(cache),
            epoch_counter: AtomicU64::new(0),
        }
    }

    /// Plan and execute the invalidation for a batch of write events.
    pub async fn trigger(&self, kinds: Vec<EventKind>) {
        if !self.enabled {
            debug!(events = kinds.len(), "Cache trigger skipped: cache disabled");
            return;
        }

        let events: Vec<CacheEvent> = kinds
            .into_iter()
            .map(|kind| CacheEvent::new(kind, self.epoch_counter.fetch_add(1, Ordering::SeqCst)))
            .collect();

        for event in &events {
            info!(
                event_id = %event.id,
                event_epoch = event.epoch,
                event_timestamp = %event.timestamp,
                entity = event.kind.entity(),
                entity_id = %event.kind.entity_id(),
                operation = ?event.kind.operation(),
                "Cache write event"
            );
        }

        let plan = InvalidationPlan::from_events(&events);
        self.consumer.execute(&plan).await;
    }

    pub async fn post_written(&self, post_id: Uuid, change: Change<PostSnapshot>) {
        self.trigger(vec![EventKind::Post { post_id, change }]).await;
    }

    pub async fn category_written(&self, category_id: Uuid, change: Change<CategorySnapshot>) {
        self.trigger(vec![EventKind::Category {
            category_id,
            change,
        }])
        .await;
    }

    pub async fn tag_written(&self, tag_id: Uuid, change: Change<TagSnapshot>) {
        self.trigger(vec![EventKind::Tag { tag_id, change }]).await;
    }

    pub async fn album_written(&self, album_id: Uuid, change: Change<AlbumSnapshot>) {
        self.trigger(vec![EventKind::Album { album_id, change }])
            .await;
    }

    pub async fn photo_written(&self, photo_id: Uuid, change: Change<PhotoSnapshot>) {
        self.trigger(vec![EventKind::Photo { photo_id, change }])
            .await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::keys::CacheKey;
    use crate::cache::store::{CacheStore, MemoryCache};

    async fn seeded_store() -> Arc<MemoryCache> {
        let store = Arc::new(MemoryCache::new(&CacheConfig::default()));
        for key in [
            CacheKey::gallery_album("west-lake"),
            CacheKey::GalleryList,
            CacheKey::blog_list(None, None),
        ] {
            store
                .set(&key.to_string(), Bytes::from_static(b"{}"), Duration::from_secs(60))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn photo_write_purges_owning_album_before_returning() {
        let store = seeded_store().await;
        let trigger = CacheTrigger::new(true, CacheHandle::new(store.clone()));

        trigger
            .photo_written(
                Uuid::new_v4(),
                Change::created(PhotoSnapshot {
                    album_slug: "west-lake".into(),
                }),
            )
            .await;

        assert_eq!(store.keys(), vec![CacheKey::blog_list(None, None).to_string()]);
    }

    #[tokio::test]
    async fn disabled_trigger_leaves_cache_untouched() {
        let store = seeded_store().await;
        let trigger = CacheTrigger::new(false, CacheHandle::new(store.clone()));

        trigger
            .album_written(
                Uuid::new_v4(),
                Change::deleted(AlbumSnapshot {
                    slug: "west-lake".into(),
                }),
            )
            .await;

        assert_eq!(store.len(), 3);
    }
}
