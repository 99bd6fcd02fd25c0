use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics_util::debugging::DebuggingRecorder;
use moyinji::cache::{
    CacheConfig, CacheHandle, CacheKey, CacheStore, CacheTrigger, Change, METRIC_CACHE_ERROR,
    METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATION_MS, METRIC_CACHE_MISS, MemoryCache, PhotoSnapshot,
};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let store = Arc::new(MemoryCache::new(&CacheConfig::default()));
    let cache = CacheHandle::new(store.clone());
    let key = CacheKey::gallery_album("west-lake");

    // miss, then hit
    assert!(cache.get_json::<serde_json::Value>(&key).await.is_none());
    cache
        .set_json(&key, &json!({ "photos": [] }), Duration::from_secs(60))
        .await;
    assert!(cache.get_json::<serde_json::Value>(&key).await.is_some());

    // undecodable entry counts as an error
    let broken = CacheKey::GalleryList;
    store
        .set(
            &broken.to_string(),
            Bytes::from_static(b"{"),
            Duration::from_secs(60),
        )
        .await
        .expect("set");
    assert!(cache.get_json::<serde_json::Value>(&broken).await.is_none());

    // invalidation latency
    CacheTrigger::new(true, cache)
        .photo_written(
            Uuid::new_v4(),
            Change::created(PhotoSnapshot {
                album_slug: "west-lake".into(),
            }),
        )
        .await;
    assert!(!store.contains_key(&key.to_string()));

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        METRIC_CACHE_HIT,
        METRIC_CACHE_MISS,
        METRIC_CACHE_ERROR,
        METRIC_CACHE_INVALIDATION_MS,
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
