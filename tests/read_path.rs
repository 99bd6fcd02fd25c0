//! The read path keeps serving from the store when the cache backend fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use moyinji::application::admin::{AdminBlogService, CategoryInput, PostInput};
use moyinji::application::blog::BlogService;
use moyinji::application::repos::PostsRepo;
use moyinji::cache::{CacheConfig, CacheError, CacheHandle, CacheKey, CacheStore, CacheTrigger};
use moyinji::infra::memory::InMemoryRepositories;

/// Backend that refuses every operation, like an unreachable Redis.
#[derive(Default)]
struct FailingCache {
    calls: AtomicUsize,
}

impl FailingCache {
    fn fail(&self) -> CacheError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CacheError::unavailable("failing", "connection refused")
    }
}

#[async_trait]
impl CacheStore for FailingCache {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(self.fail())
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
        Err(self.fail())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(self.fail())
    }

    async fn delete_matching(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(self.fail())
    }
}

async fn seeded(repo: &Arc<InMemoryRepositories>, trigger: Arc<CacheTrigger>) {
    let admin = AdminBlogService::new(repo.clone(), trigger);
    let category = admin
        .create_category(CategoryInput {
            name: "随笔".into(),
            slug: Some("essay".into()),
            ..Default::default()
        })
        .await
        .expect("category");
    admin
        .create_post(PostInput {
            slug: Some("song-aesthetics-photography".into()),
            category_id: Some(category.id),
            ..PostInput::new("宋代美学与摄影", "留白与意境")
        })
        .await
        .expect("post");
}

#[tokio::test]
async fn unavailable_cache_degrades_to_store_reads() {
    let config = CacheConfig::default();
    let repo = Arc::new(InMemoryRepositories::new());
    let failing = Arc::new(FailingCache::default());
    let cache = CacheHandle::new(failing.clone());
    let trigger = Arc::new(CacheTrigger::new(true, cache.clone()));
    seeded(&repo, trigger).await;

    let blog = BlogService::new(repo.clone(), cache, &config);
    let list = blog.list(Some("essay"), None).await.expect("list");
    assert_eq!(list.posts.len(), 1);

    let first = blog
        .detail("song-aesthetics-photography", false)
        .await
        .expect("detail");
    let second = blog
        .detail("song-aesthetics-photography", false)
        .await
        .expect("detail");
    assert_eq!(second.post.view_count, first.post.view_count + 1);
    assert!(failing.calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn undecodable_entry_is_dropped_and_recomputed() {
    let config = CacheConfig::default();
    let repo = Arc::new(InMemoryRepositories::new());
    let store = Arc::new(moyinji::cache::MemoryCache::new(&config));
    let cache = CacheHandle::new(store.clone());
    seeded(&repo, Arc::new(CacheTrigger::new(true, cache.clone()))).await;

    let key = CacheKey::blog_detail("song-aesthetics-photography").to_string();
    store
        .set(&key, Bytes::from_static(b"not json"), Duration::from_secs(60))
        .await
        .expect("set");

    let blog = BlogService::new(repo.clone(), cache, &config);
    let detail = blog
        .detail("song-aesthetics-photography", false)
        .await
        .expect("detail");
    assert_eq!(detail.post.title, "宋代美学与摄影");
    assert_eq!(detail.post.view_count, 1);

    let stored = PostsRepo::find_by_slug(repo.as_ref(), "song-aesthetics-photography")
        .await
        .expect("lookup")
        .expect("post");
    assert_eq!(stored.view_count, 1);
    assert!(store.contains_key(&key));
}
