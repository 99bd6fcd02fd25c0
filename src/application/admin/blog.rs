use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CreateCategoryParams, CreatePostParams, CreateTagParams,
    PostsRepo, PostsWriteRepo, TagsRepo, TagsWriteRepo, UpdateCategoryParams, UpdatePostParams,
    UpdateTagParams,
};
use crate::cache::{CacheTrigger, CategorySnapshot, Change, PostSnapshot, TagSnapshot};
use crate::domain::entities::{CategoryRecord, PostRecord, TagRecord};
use crate::domain::posts::{ensure_excerpt, ensure_title};

use super::{
    AdminError, SlugScope, ensure_non_empty, lookup_slug, slug_for_new, slug_for_update,
};

#[derive(Debug, Clone, Default)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default)]
pub struct TagInput {
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    /// Derived from the title on creation when absent.
    pub slug: Option<String>,
    pub cover_image: String,
    pub content: String,
    pub excerpt: String,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub is_photography: bool,
    pub is_published: bool,
}

impl PostInput {
    /// A published, uncategorized, untagged post.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: None,
            cover_image: String::new(),
            content: content.into(),
            excerpt: String::new(),
            category_id: None,
            tag_ids: Vec::new(),
            is_photography: false,
            is_published: true,
        }
    }
}

#[derive(Clone)]
pub struct AdminBlogService {
    categories: Arc<dyn CategoriesRepo>,
    category_writer: Arc<dyn CategoriesWriteRepo>,
    tags: Arc<dyn TagsRepo>,
    tag_writer: Arc<dyn TagsWriteRepo>,
    posts: Arc<dyn PostsRepo>,
    post_writer: Arc<dyn PostsWriteRepo>,
    trigger: Arc<CacheTrigger>,
}

impl AdminBlogService {
    pub fn new<R>(repo: Arc<R>, trigger: Arc<CacheTrigger>) -> Self
    where
        R: CategoriesRepo
            + CategoriesWriteRepo
            + TagsRepo
            + TagsWriteRepo
            + PostsRepo
            + PostsWriteRepo
            + 'static,
    {
        Self {
            categories: repo.clone(),
            category_writer: repo.clone(),
            tags: repo.clone(),
            tag_writer: repo.clone(),
            posts: repo.clone(),
            post_writer: repo,
            trigger,
        }
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn create_category(&self, input: CategoryInput) -> Result<CategoryRecord, AdminError> {
        ensure_non_empty(&input.name, "name")?;
        let name = input.name.trim().to_string();

        let reader = self.categories.clone();
        let slug = slug_for_new(input.slug.as_deref(), &name, SlugScope::Filter, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await?;

        let category = self
            .category_writer
            .create_category(CreateCategoryParams {
                name,
                slug,
                description: input.description.trim().to_string(),
                sort_order: input.sort_order,
            })
            .await?;
        info!(category_id = %category.id, slug = %category.slug, "Category created");

        self.trigger
            .category_written(
                category.id,
                Change::created(CategorySnapshot {
                    slug: category.slug.clone(),
                    post_slugs: Vec::new(),
                }),
            )
            .await;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        input: CategoryInput,
    ) -> Result<CategoryRecord, AdminError> {
        ensure_non_empty(&input.name, "name")?;
        let existing = self
            .categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found("category"))?;
        let slug = slug_for_update(input.slug.as_deref(), &existing.slug, SlugScope::Filter)?;
        let before = self.category_snapshot(&existing).await?;

        let category = self
            .category_writer
            .update_category(UpdateCategoryParams {
                id,
                name: input.name.trim().to_string(),
                slug,
                description: input.description.trim().to_string(),
                sort_order: input.sort_order,
            })
            .await?;
        info!(category_id = %category.id, slug = %category.slug, "Category updated");

        let after = CategorySnapshot {
            slug: category.slug.clone(),
            post_slugs: before.post_slugs.clone(),
        };
        self.trigger
            .category_written(id, Change::updated(before, after))
            .await;
        Ok(category)
    }

    /// Posts of a deleted category stay, uncategorized.
    pub async fn delete_category(&self, id: Uuid) -> Result<(), AdminError> {
        let existing = self
            .categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found("category"))?;
        let before = self.category_snapshot(&existing).await?;

        self.category_writer.delete_category(id).await?;
        info!(category_id = %id, slug = %existing.slug, "Category deleted");

        self.trigger
            .category_written(id, Change::deleted(before))
            .await;
        Ok(())
    }

    /// Returns the category with this slug, creating it when missing. The
    /// flag is true when a record was created.
    pub async fn get_or_create_category(
        &self,
        input: CategoryInput,
    ) -> Result<(CategoryRecord, bool), AdminError> {
        let slug = lookup_slug(input.slug.as_deref(), &input.name, SlugScope::Filter)?;
        if let Some(existing) = self.categories.find_by_slug(&slug).await? {
            return Ok((existing, false));
        }
        let created = self
            .create_category(CategoryInput {
                slug: Some(slug),
                ..input
            })
            .await?;
        Ok((created, true))
    }

    async fn category_snapshot(
        &self,
        category: &CategoryRecord,
    ) -> Result<CategorySnapshot, AdminError> {
        Ok(CategorySnapshot {
            slug: category.slug.clone(),
            post_slugs: self.posts.list_slugs_in_category(Some(category.id)).await?,
        })
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    pub async fn create_tag(&self, input: TagInput) -> Result<TagRecord, AdminError> {
        ensure_non_empty(&input.name, "name")?;
        let name = input.name.trim().to_string();

        let reader = self.tags.clone();
        let slug = slug_for_new(input.slug.as_deref(), &name, SlugScope::Filter, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await?;

        let tag = self
            .tag_writer
            .create_tag(CreateTagParams { name, slug })
            .await?;
        info!(tag_id = %tag.id, slug = %tag.slug, "Tag created");

        self.trigger
            .tag_written(
                tag.id,
                Change::created(TagSnapshot {
                    slug: tag.slug.clone(),
                    post_slugs: Vec::new(),
                }),
            )
            .await;
        Ok(tag)
    }

    pub async fn update_tag(&self, id: Uuid, input: TagInput) -> Result<TagRecord, AdminError> {
        ensure_non_empty(&input.name, "name")?;
        let existing = self
            .tags
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found("tag"))?;
        let slug = slug_for_update(input.slug.as_deref(), &existing.slug, SlugScope::Filter)?;
        let before = self.tag_snapshot(&existing).await?;

        let tag = self
            .tag_writer
            .update_tag(UpdateTagParams {
                id,
                name: input.name.trim().to_string(),
                slug,
            })
            .await?;
        info!(tag_id = %tag.id, slug = %tag.slug, "Tag updated");

        let after = TagSnapshot {
            slug: tag.slug.clone(),
            post_slugs: before.post_slugs.clone(),
        };
        self.trigger
            .tag_written(id, Change::updated(before, after))
            .await;
        Ok(tag)
    }

    pub async fn delete_tag(&self, id: Uuid) -> Result<(), AdminError> {
        let existing = self
            .tags
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found("tag"))?;
        let before = self.tag_snapshot(&existing).await?;

        self.tag_writer.delete_tag(id).await?;
        info!(tag_id = %id, slug = %existing.slug, "Tag deleted");

        self.trigger.tag_written(id, Change::deleted(before)).await;
        Ok(())
    }

    pub async fn get_or_create_tag(&self, input: TagInput) -> Result<(TagRecord, bool), AdminError> {
        let slug = lookup_slug(input.slug.as_deref(), &input.name, SlugScope::Filter)?;
        if let Some(existing) = self.tags.find_by_slug(&slug).await? {
            return Ok((existing, false));
        }
        let created = self
            .create_tag(TagInput {
                slug: Some(slug),
                ..input
            })
            .await?;
        Ok((created, true))
    }

    async fn tag_snapshot(&self, tag: &TagRecord) -> Result<TagSnapshot, AdminError> {
        Ok(TagSnapshot {
            slug: tag.slug.clone(),
            post_slugs: self.posts.list_slugs_with_tag(tag.id).await?,
        })
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    pub async fn create_post(&self, input: PostInput) -> Result<PostRecord, AdminError> {
        ensure_title(&input.title)?;
        ensure_excerpt(&input.excerpt)?;
        let title = input.title.trim().to_string();

        let reader = self.posts.clone();
        let slug = slug_for_new(input.slug.as_deref(), &title, SlugScope::Plain, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await?;

        let post = self
            .post_writer
            .create_post(CreatePostParams {
                title,
                slug,
                cover_image: input.cover_image,
                content: input.content,
                excerpt: input.excerpt,
                category_id: input.category_id,
                tag_ids: dedup_ids(input.tag_ids),
                is_photography: input.is_photography,
                is_published: input.is_published,
            })
            .await?;
        info!(post_id = %post.id, slug = %post.slug, "Post created");

        let after = self.written_post_snapshot(&post).await;
        self.trigger
            .post_written(post.id, Change::created(after))
            .await;
        Ok(post)
    }

    /// Replaces the post's content, category and tag set.
    pub async fn update_post(&self, id: Uuid, input: PostInput) -> Result<PostRecord, AdminError> {
        ensure_title(&input.title)?;
        ensure_excerpt(&input.excerpt)?;
        let existing = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found("post"))?;
        let slug = slug_for_update(input.slug.as_deref(), &existing.slug, SlugScope::Plain)?;
        let before = self.post_snapshot(&existing).await?;

        let post = self
            .post_writer
            .update_post(UpdatePostParams {
                id,
                title: input.title.trim().to_string(),
                slug,
                cover_image: input.cover_image,
                content: input.content,
                excerpt: input.excerpt,
                category_id: input.category_id,
                tag_ids: dedup_ids(input.tag_ids),
                is_photography: input.is_photography,
                is_published: input.is_published,
            })
            .await?;
        info!(post_id = %post.id, slug = %post.slug, "Post updated");

        let after = self.written_post_snapshot(&post).await;
        self.trigger
            .post_written(id, Change::updated(before, after))
            .await;
        Ok(post)
    }

    /// The snapshot, tags included, is taken before the associations go away.
    pub async fn delete_post(&self, id: Uuid) -> Result<(), AdminError> {
        let existing = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found("post"))?;
        let before = self.post_snapshot(&existing).await?;

        self.post_writer.delete_post(id).await?;
        info!(post_id = %id, slug = %existing.slug, "Post deleted");

        self.trigger.post_written(id, Change::deleted(before)).await;
        Ok(())
    }

    pub async fn get_or_create_post(
        &self,
        input: PostInput,
    ) -> Result<(PostRecord, bool), AdminError> {
        let slug = lookup_slug(input.slug.as_deref(), &input.title, SlugScope::Plain)?;
        if let Some(existing) = self.posts.find_by_slug(&slug).await? {
            return Ok((existing, false));
        }
        let created = self
            .create_post(PostInput {
                slug: Some(slug),
                ..input
            })
            .await?;
        Ok((created, true))
    }

    pub async fn tags_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, AdminError> {
        Ok(self.tags.list_for_post(post_id).await?)
    }

    /// Snapshot of a post that is already stored. The write has committed, so
    /// a failed association read degrades to a partial snapshot instead of
    /// skipping the invalidation.
    async fn written_post_snapshot(&self, post: &PostRecord) -> PostSnapshot {
        match self.post_snapshot(post).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    post_id = %post.id,
                    slug = %post.slug,
                    error = %err,
                    "Post associations unavailable after write; purging every blog detail"
                );
                PostSnapshot {
                    slug: post.slug.clone(),
                    partial: true,
                    ..PostSnapshot::default()
                }
            }
        }
    }

    async fn post_snapshot(&self, post: &PostRecord) -> Result<PostSnapshot, AdminError> {
        let category_slug = match post.category_id {
            Some(category_id) => self
                .categories
                .find_by_id(category_id)
                .await?
                .map(|category| category.slug),
            None => None,
        };
        let tag_slugs = self
            .tags
            .list_for_post(post.id)
            .await?
            .into_iter()
            .map(|tag| tag.slug)
            .collect();
        let sibling_slugs = self
            .posts
            .list_slugs_in_category(post.category_id)
            .await?
            .into_iter()
            .filter(|slug| *slug != post.slug)
            .collect();

        Ok(PostSnapshot {
            slug: post.slug.clone(),
            category_slug,
            tag_slugs,
            sibling_slugs,
            partial: false,
        })
    }
}

fn dedup_ids(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    ids
}
