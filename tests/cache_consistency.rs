//! Read-through cache behaviour across the read and write services, backed
//! by the in-memory store and the in-process cache.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use moyinji::application::admin::{
    AdminBlogService, AdminGalleryService, AlbumInput, CategoryInput, PhotoInput, PostInput,
    TagInput,
};
use moyinji::application::blog::BlogService;
use moyinji::application::error::ReadError;
use moyinji::application::gallery::GalleryService;
use moyinji::application::repos::{CategoriesRepo, PostsRepo, TagsRepo};
use moyinji::cache::{CacheConfig, CacheHandle, CacheKey, CacheStore, CacheTrigger, MemoryCache};
use moyinji::domain::entities::PostRecord;
use moyinji::infra::memory::InMemoryRepositories;

struct Harness {
    repo: Arc<InMemoryRepositories>,
    store: Arc<MemoryCache>,
    blog: BlogService,
    gallery: GalleryService,
    admin_blog: AdminBlogService,
    admin_gallery: AdminGalleryService,
}

impl Harness {
    fn new() -> Self {
        let config = CacheConfig::default();
        let repo = Arc::new(InMemoryRepositories::new());
        let store = Arc::new(MemoryCache::new(&config));
        let cache = CacheHandle::new(store.clone());
        let trigger = Arc::new(CacheTrigger::new(true, cache.clone()));

        Self {
            blog: BlogService::new(repo.clone(), cache.clone(), &config),
            gallery: GalleryService::new(repo.clone(), cache, &config),
            admin_blog: AdminBlogService::new(repo.clone(), trigger.clone()),
            admin_gallery: AdminGalleryService::new(repo.clone(), trigger),
            repo,
            store,
        }
    }

    fn cached(&self, key: &CacheKey) -> bool {
        self.store.contains_key(&key.to_string())
    }

    /// Category `landscape`, tags `fengguang` and `renxiang`, and the post
    /// `spring-west-lake` carrying all three.
    async fn spring_west_lake(&self) -> PostRecord {
        let category = self
            .admin_blog
            .create_category(CategoryInput {
                name: "山水意境".into(),
                slug: Some("landscape".into()),
                ..Default::default()
            })
            .await
            .expect("category");
        let fengguang = self
            .admin_blog
            .create_tag(TagInput {
                name: "风光".into(),
                slug: Some("fengguang".into()),
            })
            .await
            .expect("tag");
        let renxiang = self
            .admin_blog
            .create_tag(TagInput {
                name: "人像".into(),
                slug: Some("renxiang".into()),
            })
            .await
            .expect("tag");

        self.admin_blog
            .create_post(PostInput {
                slug: Some("spring-west-lake".into()),
                category_id: Some(category.id),
                tag_ids: vec![fengguang.id, renxiang.id],
                is_photography: true,
                ..PostInput::new("春日西湖", "断桥残雪")
            })
            .await
            .expect("post")
    }

    async fn warm_lists(&self) {
        for (category, tag) in [
            (None, None),
            (Some("landscape"), None),
            (None, Some("fengguang")),
            (None, Some("renxiang")),
        ] {
            self.blog.list(category, tag).await.expect("list");
        }
    }

    async fn west_lake_album(&self) -> uuid::Uuid {
        self.admin_gallery
            .create_album(AlbumInput {
                title: "西湖四季".into(),
                slug: Some("west-lake".into()),
                is_featured: true,
                ..Default::default()
            })
            .await
            .expect("album")
            .id
    }
}

fn post_input(post: &PostRecord, title: &str) -> PostInput {
    PostInput {
        slug: Some(post.slug.clone()),
        cover_image: post.cover_image.clone(),
        excerpt: post.excerpt.clone(),
        category_id: post.category_id,
        is_photography: post.is_photography,
        is_published: post.is_published,
        ..PostInput::new(title, post.content.clone())
    }
}

#[tokio::test]
async fn detail_miss_hit_update_then_fresh_miss() {
    let h = Harness::new();
    let post = h.spring_west_lake().await;
    let key = CacheKey::blog_detail("spring-west-lake");
    assert!(!h.cached(&key));

    let first = h.blog.detail("spring-west-lake", false).await.expect("miss");
    assert!(h.cached(&key));
    assert_eq!(first.post.title, "春日西湖");

    let second = h.blog.detail("spring-west-lake", false).await.expect("hit");
    assert_eq!(second.post.title, "春日西湖");
    assert_eq!(second.post.view_count, first.post.view_count + 1);

    let tags = h.admin_blog.tags_for_post(post.id).await.expect("tags");
    let mut input = post_input(&post, "春日西湖（修订）");
    input.tag_ids = tags.iter().map(|tag| tag.id).collect();
    h.admin_blog.update_post(post.id, input).await.expect("update");
    assert!(!h.cached(&key));

    let third = h.blog.detail("spring-west-lake", false).await.expect("miss");
    assert_eq!(third.post.title, "春日西湖（修订）");
    assert_eq!(third.post.tags.len(), 2);
}

#[tokio::test]
async fn post_update_recomputes_category_tag_and_unfiltered_lists() {
    let h = Harness::new();
    let post = h.spring_west_lake().await;
    h.warm_lists().await;

    let keys = [
        CacheKey::blog_list(None, None),
        CacheKey::blog_list(Some("landscape"), None),
        CacheKey::blog_list(None, Some("fengguang")),
        CacheKey::blog_list(None, Some("renxiang")),
    ];
    assert!(keys.iter().all(|key| h.cached(key)));

    let tags = h.admin_blog.tags_for_post(post.id).await.expect("tags");
    let mut input = post_input(&post, "西湖春晓");
    input.tag_ids = tags.iter().map(|tag| tag.id).collect();
    h.admin_blog.update_post(post.id, input).await.expect("update");

    for key in &keys {
        assert!(!h.cached(key), "{key} survived the update");
    }
    let list = h
        .blog
        .list(Some("landscape"), None)
        .await
        .expect("list");
    assert_eq!(list.posts[0].title, "西湖春晓");
}

#[tokio::test]
async fn deleting_a_post_invalidates_its_tag_lists() {
    let h = Harness::new();
    let post = h.spring_west_lake().await;
    h.warm_lists().await;

    h.admin_blog.delete_post(post.id).await.expect("delete");

    assert!(!h.cached(&CacheKey::blog_list(None, Some("fengguang"))));
    assert!(!h.cached(&CacheKey::blog_list(None, Some("renxiang"))));
    let list = h
        .blog
        .list(None, Some("fengguang"))
        .await
        .expect("list");
    assert!(list.posts.is_empty());
}

#[tokio::test]
async fn cached_hit_still_counts_views() {
    let h = Harness::new();
    h.spring_west_lake().await;

    let mut last = 0;
    for _ in 0..5 {
        last = h
            .blog
            .detail("spring-west-lake", false)
            .await
            .expect("detail")
            .post
            .view_count;
    }
    assert_eq!(last, 5);

    let next = h.blog.detail("spring-west-lake", false).await.expect("hit");
    assert_eq!(next.post.view_count, 6);
    let stored = PostsRepo::find_by_slug(h.repo.as_ref(), "spring-west-lake")
        .await
        .expect("lookup")
        .expect("post");
    assert_eq!(stored.view_count, 6);
}

#[tokio::test]
async fn repeated_misses_cache_identical_bytes() {
    let h = Harness::new();
    h.spring_west_lake().await;
    let key = CacheKey::blog_list(None, None);

    let rendered = key.to_string();

    h.blog.list(None, None).await.expect("list");
    let first = h.store.get(&rendered).await.expect("get").expect("cached");
    h.store.delete(&rendered).await.expect("delete");
    h.blog.list(None, None).await.expect("list");
    let second = h.store.get(&rendered).await.expect("get").expect("cached");

    assert_eq!(first, second);
}

#[tokio::test]
async fn absent_and_empty_filters_use_distinct_keys() {
    let h = Harness::new();
    h.spring_west_lake().await;

    let absent = h.blog.list(None, None).await.expect("absent");
    let empty = h.blog.list(Some(""), Some("")).await.expect("empty");

    assert_ne!(
        CacheKey::blog_list(None, None).to_string(),
        CacheKey::blog_list(Some(""), Some("")).to_string()
    );
    assert!(h.cached(&CacheKey::blog_list(None, None)));
    assert!(h.cached(&CacheKey::blog_list(Some(""), Some(""))));
    assert_eq!(absent.posts, empty.posts);
}

#[tokio::test]
async fn unknown_slugs_are_not_cached() {
    let h = Harness::new();
    h.spring_west_lake().await;

    let err = h.blog.detail("missing", false).await.expect_err("missing post");
    assert!(matches!(err, ReadError::NotFound { .. }));
    assert!(!h.cached(&CacheKey::blog_detail("missing")));

    let err = h
        .blog
        .list(Some("nowhere"), None)
        .await
        .expect_err("missing category");
    assert!(matches!(err, ReadError::NotFound { .. }));
    assert!(!h.cached(&CacheKey::blog_list(Some("nowhere"), None)));

    let err = h.gallery.album("missing", false).await.expect_err("missing album");
    assert!(matches!(err, ReadError::NotFound { .. }));
    assert!(!h.cached(&CacheKey::gallery_album("missing")));
}

#[tokio::test]
async fn unpublishing_purges_detail_and_hides_post() {
    let h = Harness::new();
    let post = h.spring_west_lake().await;
    h.blog.detail("spring-west-lake", false).await.expect("detail");

    let mut input = post_input(&post, &post.title);
    input.is_published = false;
    h.admin_blog.update_post(post.id, input).await.expect("unpublish");

    assert!(!h.cached(&CacheKey::blog_detail("spring-west-lake")));
    let err = h
        .blog
        .detail("spring-west-lake", false)
        .await
        .expect_err("hidden");
    assert!(matches!(err, ReadError::NotFound { .. }));
}

#[tokio::test]
async fn renaming_a_tag_purges_embedding_details() {
    let h = Harness::new();
    let post = h.spring_west_lake().await;
    h.blog.detail("spring-west-lake", false).await.expect("detail");

    let tags = h.admin_blog.tags_for_post(post.id).await.expect("tags");
    let fengguang = tags
        .iter()
        .find(|tag| tag.slug == "fengguang")
        .expect("fengguang");
    h.admin_blog
        .update_tag(
            fengguang.id,
            TagInput {
                name: "山水风光".into(),
                slug: None,
            },
        )
        .await
        .expect("rename");

    assert!(!h.cached(&CacheKey::blog_detail("spring-west-lake")));
    let detail = h.blog.detail("spring-west-lake", false).await.expect("detail");
    assert!(detail.post.tags.iter().any(|tag| tag.name == "山水风光"));
}

#[tokio::test]
async fn bypass_refreshes_cached_bundle() {
    let h = Harness::new();
    h.spring_west_lake().await;
    h.blog.detail("spring-west-lake", false).await.expect("warm");

    let bypassed = h.blog.detail("spring-west-lake", true).await.expect("bypass");
    let hit = h.blog.detail("spring-west-lake", false).await.expect("hit");

    assert_eq!(bypassed.post.view_count, 2);
    assert_eq!(hit.post.view_count, 3);
}

#[tokio::test]
async fn photo_writes_purge_album_and_gallery_list() {
    let h = Harness::new();
    let album = h
        .admin_gallery
        .create_album(AlbumInput {
            title: "西湖四季".into(),
            slug: Some("west-lake".into()),
            is_featured: true,
            ..Default::default()
        })
        .await
        .expect("album");

    h.gallery.list().await.expect("list");
    let empty = h.gallery.album("west-lake", false).await.expect("album");
    assert_eq!(empty.photo_count, 0);

    h.admin_gallery
        .create_photo(PhotoInput {
            album_id: album.id,
            title: "断桥".into(),
            image: "gallery/west-lake/duanqiao.jpg".into(),
            ..Default::default()
        })
        .await
        .expect("photo");

    assert!(!h.cached(&CacheKey::GalleryList));
    assert!(!h.cached(&CacheKey::gallery_album("west-lake")));
    let refreshed = h.gallery.album("west-lake", false).await.expect("album");
    assert_eq!(refreshed.photo_count, 1);
    assert_eq!(refreshed.photos[0].photo.title, "断桥");
}

#[tokio::test]
async fn all_filter_never_answers_with_the_unfiltered_list() {
    let h = Harness::new();
    h.spring_west_lake().await;

    let cold = h.blog.list(Some("all"), None).await;
    assert!(matches!(cold, Err(ReadError::NotFound { .. })));

    h.blog.list(None, None).await.expect("unfiltered");
    assert!(h.cached(&CacheKey::blog_list(None, None)));

    for (category, tag) in [(Some("all"), None), (None, Some("all")), (Some("all"), Some("all"))] {
        let warm = h.blog.list(category, tag).await;
        assert!(
            matches!(warm, Err(ReadError::NotFound { .. })),
            "{category:?} {tag:?}"
        );
    }
}

#[tokio::test]
async fn category_rename_purges_lists_and_member_details() {
    let h = Harness::new();
    h.spring_west_lake().await;
    h.warm_lists().await;
    h.blog.detail("spring-west-lake", false).await.expect("detail");

    let landscape = CategoriesRepo::find_by_slug(h.repo.as_ref(), "landscape")
        .await
        .expect("lookup")
        .expect("category");
    h.admin_blog
        .update_category(
            landscape.id,
            CategoryInput {
                name: "山水".into(),
                slug: Some("shanshui".into()),
                ..Default::default()
            },
        )
        .await
        .expect("rename");

    for key in [
        CacheKey::blog_list(None, None),
        CacheKey::blog_list(Some("landscape"), None),
        CacheKey::blog_list(None, Some("fengguang")),
        CacheKey::blog_detail("spring-west-lake"),
    ] {
        assert!(!h.cached(&key), "{key} survived the rename");
    }

    let err = h
        .blog
        .list(Some("landscape"), None)
        .await
        .expect_err("old slug");
    assert!(matches!(err, ReadError::NotFound { .. }));
    let list = h.blog.list(Some("shanshui"), None).await.expect("new slug");
    assert_eq!(list.posts.len(), 1);
    let detail = h.blog.detail("spring-west-lake", false).await.expect("detail");
    let category = detail.post.category.expect("category");
    assert_eq!((category.name.as_str(), category.slug.as_str()), ("山水", "shanshui"));
}

#[tokio::test]
async fn deleting_a_category_leaves_its_posts_uncategorized() {
    let h = Harness::new();
    h.spring_west_lake().await;
    h.warm_lists().await;
    h.blog.detail("spring-west-lake", false).await.expect("detail");

    let landscape = CategoriesRepo::find_by_slug(h.repo.as_ref(), "landscape")
        .await
        .expect("lookup")
        .expect("category");
    h.admin_blog
        .delete_category(landscape.id)
        .await
        .expect("delete");

    assert!(!h.cached(&CacheKey::blog_list(Some("landscape"), None)));
    assert!(!h.cached(&CacheKey::blog_list(None, None)));
    assert!(!h.cached(&CacheKey::blog_detail("spring-west-lake")));

    let detail = h.blog.detail("spring-west-lake", false).await.expect("detail");
    assert!(detail.post.category.is_none());
    let list = h.blog.list(None, None).await.expect("list");
    assert_eq!(list.posts.len(), 1);
    assert!(list.posts[0].category.is_none());
    assert!(list.categories.is_empty());
}

#[tokio::test]
async fn deleting_a_tag_purges_its_lists_and_tagged_details() {
    let h = Harness::new();
    h.spring_west_lake().await;
    h.warm_lists().await;
    h.blog.detail("spring-west-lake", false).await.expect("detail");

    let fengguang = TagsRepo::find_by_slug(h.repo.as_ref(), "fengguang")
        .await
        .expect("lookup")
        .expect("tag");
    h.admin_blog.delete_tag(fengguang.id).await.expect("delete");

    for key in [
        CacheKey::blog_list(None, Some("fengguang")),
        CacheKey::blog_list(None, None),
        CacheKey::blog_detail("spring-west-lake"),
    ] {
        assert!(!h.cached(&key), "{key} survived the delete");
    }

    let err = h
        .blog
        .list(None, Some("fengguang"))
        .await
        .expect_err("deleted tag");
    assert!(matches!(err, ReadError::NotFound { .. }));
    let detail = h.blog.detail("spring-west-lake", false).await.expect("detail");
    let slugs: Vec<_> = detail.post.tags.iter().map(|tag| tag.slug.as_str()).collect();
    assert_eq!(slugs, ["renxiang"]);
}

#[tokio::test]
async fn album_slug_change_purges_old_and_new_album_keys() {
    let h = Harness::new();
    let album_id = h.west_lake_album().await;
    h.gallery.list().await.expect("list");
    h.gallery.album("west-lake", false).await.expect("album");

    // Left behind by an earlier album that used the slug.
    let renamed = CacheKey::gallery_album("xihu");
    h.store
        .set(
            &renamed.to_string(),
            Bytes::from_static(b"{}"),
            Duration::from_secs(60),
        )
        .await
        .expect("set");

    h.admin_gallery
        .update_album(
            album_id,
            AlbumInput {
                title: "西湖".into(),
                slug: Some("xihu".into()),
                is_featured: true,
                ..Default::default()
            },
        )
        .await
        .expect("update");

    assert!(!h.cached(&CacheKey::GalleryList));
    assert!(!h.cached(&CacheKey::gallery_album("west-lake")));
    assert!(!h.cached(&renamed));

    let err = h.gallery.album("west-lake", false).await.expect_err("old slug");
    assert!(matches!(err, ReadError::NotFound { .. }));
    let album = h.gallery.album("xihu", false).await.expect("new slug");
    assert_eq!(album.album.title, "西湖");
    let list = h.gallery.list().await.expect("list");
    assert_eq!(list.albums.len(), 1);
}

#[tokio::test]
async fn deleting_an_album_purges_its_bundle_and_the_gallery_list() {
    let h = Harness::new();
    let album_id = h.west_lake_album().await;
    h.admin_gallery
        .create_photo(PhotoInput {
            album_id,
            title: "断桥".into(),
            image: "gallery/west-lake/duanqiao.jpg".into(),
            ..Default::default()
        })
        .await
        .expect("photo");
    h.gallery.list().await.expect("list");
    h.gallery.album("west-lake", false).await.expect("album");

    h.admin_gallery.delete_album(album_id).await.expect("delete");

    assert!(!h.cached(&CacheKey::GalleryList));
    assert!(!h.cached(&CacheKey::gallery_album("west-lake")));
    let err = h.gallery.album("west-lake", false).await.expect_err("deleted");
    assert!(matches!(err, ReadError::NotFound { .. }));
    assert!(h.gallery.list().await.expect("list").albums.is_empty());
}
