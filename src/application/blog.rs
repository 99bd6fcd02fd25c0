//! Cached blog list and detail bundles.
//!
//! A bundle is everything a page needs in one JSON document. Lists are keyed
//! by their two filters; details by post slug. Detail hits still bump the
//! view counter in the store and overlay the fresh count on the cached copy.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::error::ReadError;
use crate::application::repos::{
    CategoriesRepo, PostListFilter, PostsRepo, RelatedPostsQuery, TagsRepo,
};
use crate::cache::{CacheConfig, CacheHandle, CacheKey};
use crate::domain::entities::{CategoryRecord, PostRecord, TagRecord};
use crate::domain::slug::RESERVED_FILTER_SLUG;

pub const RELATED_POSTS_LIMIT: usize = 3;

/// Category or tag as embedded in a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRef {
    pub name: String,
    pub slug: String,
}

impl From<&CategoryRecord> for TermRef {
    fn from(category: &CategoryRecord) -> Self {
        Self {
            name: category.name.clone(),
            slug: category.slug.clone(),
        }
    }
}

impl From<&TagRecord> for TermRef {
    fn from(tag: &TagRecord) -> Self {
        Self {
            name: tag.name.clone(),
            slug: tag.slug.clone(),
        }
    }
}

/// Post card used by lists, related posts and the home page. Carries no view
/// count so list bundles only change on content writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub cover_image: String,
    pub excerpt: String,
    pub category: Option<TermRef>,
    pub tags: Vec<TermRef>,
    pub is_photography: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogListBundle {
    pub posts: Vec<PostSummary>,
    pub categories: Vec<CategoryRecord>,
    pub tags: Vec<TagRecord>,
    pub current_category: Option<String>,
    pub current_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetail {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub cover_image: String,
    pub content: String,
    pub excerpt: String,
    pub category: Option<TermRef>,
    pub tags: Vec<TermRef>,
    pub is_photography: bool,
    pub view_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogDetailBundle {
    pub post: PostDetail,
    pub related_posts: Vec<PostSummary>,
}

/// Builds post cards for `posts`, resolving categories from `categories` and
/// tags with one batched lookup.
pub(crate) async fn summarize_posts(
    tags_repo: &dyn TagsRepo,
    posts: Vec<PostRecord>,
    categories: &HashMap<Uuid, TermRef>,
) -> Result<Vec<PostSummary>, ReadError> {
    let ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();
    let mut tags_by_post: HashMap<Uuid, Vec<TermRef>> = HashMap::new();
    for (post_id, tag) in tags_repo.list_for_posts(&ids).await? {
        tags_by_post
            .entry(post_id)
            .or_default()
            .push(TermRef::from(&tag));
    }

    Ok(posts
        .into_iter()
        .map(|post| PostSummary {
            category: post
                .category_id
                .and_then(|id| categories.get(&id).cloned()),
            tags: tags_by_post.remove(&post.id).unwrap_or_default(),
            id: post.id,
            title: post.title,
            slug: post.slug,
            cover_image: post.cover_image,
            excerpt: post.excerpt,
            is_photography: post.is_photography,
            created_at: post.created_at,
        })
        .collect())
}

pub(crate) fn category_refs(categories: &[CategoryRecord]) -> HashMap<Uuid, TermRef> {
    categories
        .iter()
        .map(|category| (category.id, TermRef::from(category)))
        .collect()
}

/// A blank filter value filters like an absent one.
fn active_filter(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

#[derive(Clone)]
pub struct BlogService {
    posts: Arc<dyn PostsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    tags: Arc<dyn TagsRepo>,
    cache: CacheHandle,
    list_ttl: Duration,
    detail_ttl: Duration,
}

impl BlogService {
    pub fn new<R>(repo: Arc<R>, cache: CacheHandle, config: &CacheConfig) -> Self
    where
        R: PostsRepo + CategoriesRepo + TagsRepo + 'static,
    {
        Self {
            posts: repo.clone(),
            categories: repo.clone(),
            tags: repo,
            cache,
            list_ttl: config.list_ttl(),
            detail_ttl: config.detail_ttl(),
        }
    }

    /// Published posts, optionally narrowed by category and tag slug.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        category: Option<&str>,
        tag: Option<&str>,
    ) -> Result<BlogListBundle, ReadError> {
        // `all` renders absent filters in the key and is never a stored slug.
        if category == Some(RESERVED_FILTER_SLUG) {
            return Err(ReadError::not_found("category", RESERVED_FILTER_SLUG));
        }
        if tag == Some(RESERVED_FILTER_SLUG) {
            return Err(ReadError::not_found("tag", RESERVED_FILTER_SLUG));
        }

        let key = CacheKey::blog_list(category, tag);
        if let Some(bundle) = self.cache.get_json::<BlogListBundle>(&key).await {
            return Ok(bundle);
        }

        let category = active_filter(category);
        let tag = active_filter(tag);

        let category_id = match category {
            Some(slug) => Some(
                self.categories
                    .find_by_slug(slug)
                    .await?
                    .ok_or_else(|| ReadError::not_found("category", slug))?
                    .id,
            ),
            None => None,
        };
        let tag_id = match tag {
            Some(slug) => Some(
                self.tags
                    .find_by_slug(slug)
                    .await?
                    .ok_or_else(|| ReadError::not_found("tag", slug))?
                    .id,
            ),
            None => None,
        };

        let posts = self
            .posts
            .list_published(PostListFilter {
                category_id,
                tag_id,
                limit: None,
            })
            .await?;
        let categories = self.categories.list_categories().await?;
        let tags = self.tags.list_tags().await?;
        let posts = summarize_posts(self.tags.as_ref(), posts, &category_refs(&categories)).await?;

        let bundle = BlogListBundle {
            posts,
            categories,
            tags,
            current_category: category.map(str::to_string),
            current_tag: tag.map(str::to_string),
        };
        self.cache.set_json(&key, &bundle, self.list_ttl).await;
        debug!(key = %key, posts = bundle.posts.len(), "Blog list bundle cached");
        Ok(bundle)
    }

    /// One published post with related posts. Every successful call counts
    /// as a view. `bypass_cache` skips the lookup but still refreshes the
    /// cached bundle.
    #[instrument(skip(self))]
    pub async fn detail(
        &self,
        slug: &str,
        bypass_cache: bool,
    ) -> Result<BlogDetailBundle, ReadError> {
        let key = CacheKey::blog_detail(slug);

        let cached = if bypass_cache {
            None
        } else {
            self.cache.get_json::<BlogDetailBundle>(&key).await
        };
        if let Some(mut bundle) = cached {
            return match self.posts.increment_view_count(slug).await? {
                Some(view_count) => {
                    bundle.post.view_count = view_count;
                    Ok(bundle)
                }
                None => {
                    // Unpublished or deleted without an invalidation reaching us.
                    self.cache.delete(&key).await;
                    Err(ReadError::not_found("post", slug))
                }
            };
        }

        let post = self
            .posts
            .find_published_by_slug(slug)
            .await?
            .ok_or_else(|| ReadError::not_found("post", slug))?;
        let view_count = self
            .posts
            .increment_view_count(slug)
            .await?
            .ok_or_else(|| ReadError::not_found("post", slug))?;

        let category = match post.category_id {
            Some(id) => self.categories.find_by_id(id).await?,
            None => None,
        };
        let category_refs = category_refs(category.as_slice());
        let tags = self.tags.list_for_post(post.id).await?;
        let related = self
            .posts
            .list_related(RelatedPostsQuery {
                post_id: post.id,
                category_id: post.category_id,
                limit: RELATED_POSTS_LIMIT,
            })
            .await?;
        let related_posts = summarize_posts(self.tags.as_ref(), related, &category_refs).await?;

        let bundle = BlogDetailBundle {
            post: PostDetail {
                id: post.id,
                title: post.title,
                slug: post.slug,
                cover_image: post.cover_image,
                content: post.content,
                excerpt: post.excerpt,
                category: category.as_ref().map(TermRef::from),
                tags: tags.iter().map(TermRef::from).collect(),
                is_photography: post.is_photography,
                view_count,
                created_at: post.created_at,
                updated_at: post.updated_at,
            },
            related_posts,
        };
        self.cache.set_json(&key, &bundle, self.detail_ttl).await;
        debug!(key = %key, bypass_cache, "Blog detail bundle cached");
        Ok(bundle)
    }
}
