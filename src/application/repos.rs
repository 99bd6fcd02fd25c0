//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::Date;
use uuid::Uuid;

use crate::domain::entities::{AlbumRecord, CategoryRecord, PhotoRecord, PostRecord, TagRecord};
use crate::domain::photos::ExifFields;
use crate::domain::types::ThemeColor;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Filters for published post listings. `None` means "no restriction".
#[derive(Debug, Clone, Copy, Default)]
pub struct PostListFilter {
    pub category_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
    pub limit: Option<usize>,
}

/// Published posts sharing a category with `post_id` (or also uncategorized
/// when `category_id` is `None`), excluding the post itself.
#[derive(Debug, Clone, Copy)]
pub struct RelatedPostsQuery {
    pub post_id: Uuid,
    pub category_id: Option<Uuid>,
    pub limit: usize,
}

/// Album plus the derived attributes shown in listings.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumSummary {
    pub album: AlbumRecord,
    pub photo_count: i64,
    pub cover: Option<PhotoRecord>,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct CreateTagParams {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct UpdateTagParams {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub slug: String,
    pub cover_image: String,
    pub content: String,
    pub excerpt: String,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub is_photography: bool,
    pub is_published: bool,
}

/// Full replacement of a post's content and tag set. The view counter is
/// never written through this path.
#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub cover_image: String,
    pub content: String,
    pub excerpt: String,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub is_photography: bool,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct CreateAlbumParams {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub theme_color: ThemeColor,
    pub is_featured: bool,
    pub created_on: Option<Date>,
}

#[derive(Debug, Clone)]
pub struct UpdateAlbumParams {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub theme_color: ThemeColor,
    pub cover_photo_id: Option<Uuid>,
    pub is_featured: bool,
}

#[derive(Debug, Clone)]
pub struct CreatePhotoParams {
    pub album_id: Uuid,
    pub title: String,
    pub image: String,
    pub description: String,
    pub location: String,
    pub date_taken: Option<Date>,
    pub exif: ExifFields,
    pub exif_data: Option<serde_json::Value>,
    pub display_order: i32,
}

#[derive(Debug, Clone)]
pub struct UpdatePhotoParams {
    pub id: Uuid,
    pub album_id: Uuid,
    pub title: String,
    pub image: String,
    pub description: String,
    pub location: String,
    pub date_taken: Option<Date>,
    pub exif: ExifFields,
    pub exif_data: Option<serde_json::Value>,
    pub display_order: i32,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    /// All categories, `sort_order` ascending then newest first.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    /// Posts referencing the category keep existing with no category.
    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    /// All tags, newest first.
    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TagRecord>, RepoError>;

    /// Tags attached to one post, newest first.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, RepoError>;

    /// `(post_id, tag)` pairs for a batch of posts.
    async fn list_for_posts(&self, post_ids: &[Uuid])
    -> Result<Vec<(Uuid, TagRecord)>, RepoError>;
}

#[async_trait]
pub trait TagsWriteRepo: Send + Sync {
    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError>;

    async fn update_tag(&self, params: UpdateTagParams) -> Result<TagRecord, RepoError>;

    /// Removes the tag and its post associations; posts themselves stay.
    async fn delete_tag(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Published posts matching `filter`, newest first.
    async fn list_published(&self, filter: PostListFilter) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;

    /// Any post regardless of publication state.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn list_related(&self, query: RelatedPostsQuery) -> Result<Vec<PostRecord>, RepoError>;

    /// Slugs of every post in a category (`None`: uncategorized posts).
    async fn list_slugs_in_category(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<String>, RepoError>;

    async fn list_slugs_with_tag(&self, tag_id: Uuid) -> Result<Vec<String>, RepoError>;

    /// Atomically bump the view counter of a published post and return the
    /// new value; `None` when no published post has this slug.
    async fn increment_view_count(&self, slug: &str) -> Result<Option<i64>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait AlbumsRepo: Send + Sync {
    /// Every album with photo count and designated cover, newest first.
    async fn list_albums(&self) -> Result<Vec<AlbumSummary>, RepoError>;

    async fn list_featured(&self) -> Result<Vec<AlbumSummary>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<AlbumRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AlbumRecord>, RepoError>;
}

#[async_trait]
pub trait AlbumsWriteRepo: Send + Sync {
    async fn create_album(&self, params: CreateAlbumParams) -> Result<AlbumRecord, RepoError>;

    async fn update_album(&self, params: UpdateAlbumParams) -> Result<AlbumRecord, RepoError>;

    /// Deletes the album together with its photos.
    async fn delete_album(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PhotosRepo: Send + Sync {
    /// Photos of an album, display order ascending then newest first.
    async fn list_for_album(&self, album_id: Uuid) -> Result<Vec<PhotoRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PhotoRecord>, RepoError>;
}

#[async_trait]
pub trait PhotosWriteRepo: Send + Sync {
    async fn create_photo(&self, params: CreatePhotoParams) -> Result<PhotoRecord, RepoError>;

    async fn update_photo(&self, params: UpdatePhotoParams) -> Result<PhotoRecord, RepoError>;

    /// Clears any album cover pointing at the photo.
    async fn delete_photo(&self, id: Uuid) -> Result<(), RepoError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
