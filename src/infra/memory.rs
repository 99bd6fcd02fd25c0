//! In-process store used when no database URL is configured and by tests.
//!
//! Mirrors the relational constraints of the Postgres schema: unique slugs,
//! foreign keys, `SET NULL` on category and cover deletion, and cascading
//! photo and tag-association deletes.

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    AlbumSummary, AlbumsRepo, AlbumsWriteRepo, CategoriesRepo, CategoriesWriteRepo,
    CreateAlbumParams, CreateCategoryParams, CreatePhotoParams, CreatePostParams, CreateTagParams,
    PhotosRepo, PhotosWriteRepo, PostListFilter, PostsRepo, PostsWriteRepo, RelatedPostsQuery,
    RepoError, StoreHealth, TagsRepo, TagsWriteRepo, UpdateAlbumParams, UpdateCategoryParams,
    UpdatePhotoParams, UpdatePostParams, UpdateTagParams,
};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{AlbumRecord, CategoryRecord, PhotoRecord, PostRecord, TagRecord};

const LOCK_TARGET: &str = "infra::memory";

#[derive(Default)]
struct MemoryState {
    // Insertion order is kept so ties on timestamps resolve newest first.
    categories: Vec<CategoryRecord>,
    tags: Vec<TagRecord>,
    posts: Vec<PostRecord>,
    post_tags: BTreeSet<(Uuid, Uuid)>,
    albums: Vec<AlbumRecord>,
    photos: Vec<PhotoRecord>,
}

impl MemoryState {
    fn category(&self, id: Uuid) -> Option<&CategoryRecord> {
        self.categories.iter().find(|category| category.id == id)
    }

    fn tag(&self, id: Uuid) -> Option<&TagRecord> {
        self.tags.iter().find(|tag| tag.id == id)
    }

    fn post(&self, id: Uuid) -> Option<&PostRecord> {
        self.posts.iter().find(|post| post.id == id)
    }

    fn album(&self, id: Uuid) -> Option<&AlbumRecord> {
        self.albums.iter().find(|album| album.id == id)
    }

    fn photo(&self, id: Uuid) -> Option<&PhotoRecord> {
        self.photos.iter().find(|photo| photo.id == id)
    }

    fn post_has_tag(&self, post_id: Uuid, tag_id: Uuid) -> bool {
        self.post_tags.contains(&(post_id, tag_id))
    }

    fn check_post_refs(&self, category_id: Option<Uuid>, tag_ids: &[Uuid]) -> Result<(), RepoError> {
        if category_id.is_some_and(|id| self.category(id).is_none()) {
            return Err(foreign_key("posts_category_id_fkey"));
        }
        if tag_ids.iter().any(|tag_id| self.tag(*tag_id).is_none()) {
            return Err(foreign_key("post_tags_tag_id_fkey"));
        }
        Ok(())
    }

    fn replace_post_tags(&mut self, post_id: Uuid, tag_ids: &[Uuid]) {
        self.post_tags.retain(|(post, _)| *post != post_id);
        self.post_tags
            .extend(tag_ids.iter().map(|tag_id| (post_id, *tag_id)));
    }

    fn published_posts(&self) -> impl Iterator<Item = &PostRecord> {
        self.posts.iter().filter(|post| post.is_published)
    }

    fn album_summary(&self, album: &AlbumRecord) -> AlbumSummary {
        let photo_count = self
            .photos
            .iter()
            .filter(|photo| photo.album_id == album.id)
            .count();
        AlbumSummary {
            album: album.clone(),
            photo_count: i64::try_from(photo_count).unwrap_or(i64::MAX),
            cover: album
                .cover_photo_id
                .and_then(|id| self.photo(id))
                .cloned(),
        }
    }
}

#[derive(Default)]
pub struct InMemoryRepositories {
    state: RwLock<MemoryState>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, op: &'static str) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        rw_read(&self.state, LOCK_TARGET, op)
    }

    fn write(&self, op: &'static str) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        rw_write(&self.state, LOCK_TARGET, op)
    }
}

fn duplicate(constraint: &str) -> RepoError {
    RepoError::Duplicate {
        constraint: constraint.to_string(),
    }
}

fn foreign_key(constraint: &str) -> RepoError {
    RepoError::InvalidInput {
        message: format!("violates foreign key constraint \"{constraint}\""),
    }
}

/// Newest first; equal timestamps fall back to reverse insertion order.
fn newest_first<T: Clone>(
    items: impl DoubleEndedIterator<Item = T>,
    created_at: impl Fn(&T) -> OffsetDateTime,
) -> Vec<T> {
    let mut sorted: Vec<T> = items.rev().collect();
    sorted.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    sorted
}

fn sorted_categories(state: &MemoryState) -> Vec<CategoryRecord> {
    let mut categories = newest_first(state.categories.iter().cloned(), |c| c.created_at);
    categories.sort_by_key(|category| category.sort_order);
    categories
}

fn sorted_photos<'a>(photos: impl DoubleEndedIterator<Item = &'a PhotoRecord>) -> Vec<PhotoRecord> {
    let mut photos = newest_first(photos.cloned(), |photo| photo.created_at);
    photos.sort_by_key(|photo| photo.display_order);
    photos
}

#[async_trait]
impl CategoriesRepo for InMemoryRepositories {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        Ok(sorted_categories(&self.read("list_categories")))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        let state = self.read("find_category_by_slug");
        Ok(state.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self.read("find_category_by_id").category(id).cloned())
    }
}

#[async_trait]
impl CategoriesWriteRepo for InMemoryRepositories {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.write("create_category");
        if state.categories.iter().any(|c| c.slug == params.slug) {
            return Err(duplicate("categories_slug_key"));
        }
        let record = CategoryRecord {
            id: Uuid::new_v4(),
            name: params.name,
            slug: params.slug,
            description: params.description,
            sort_order: params.sort_order,
            created_at: OffsetDateTime::now_utc(),
        };
        state.categories.push(record.clone());
        Ok(record)
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.write("update_category");
        if state
            .categories
            .iter()
            .any(|c| c.slug == params.slug && c.id != params.id)
        {
            return Err(duplicate("categories_slug_key"));
        }
        let category = state
            .categories
            .iter_mut()
            .find(|c| c.id == params.id)
            .ok_or(RepoError::NotFound)?;
        category.name = params.name;
        category.slug = params.slug;
        category.description = params.description;
        category.sort_order = params.sort_order;
        Ok(category.clone())
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.write("delete_category");
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        if state.categories.len() == before {
            return Err(RepoError::NotFound);
        }
        for post in state
            .posts
            .iter_mut()
            .filter(|post| post.category_id == Some(id))
        {
            post.category_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl TagsRepo for InMemoryRepositories {
    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError> {
        let state = self.read("list_tags");
        Ok(newest_first(state.tags.iter().cloned(), |tag| tag.created_at))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError> {
        let state = self.read("find_tag_by_slug");
        Ok(state.tags.iter().find(|tag| tag.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TagRecord>, RepoError> {
        Ok(self.read("find_tag_by_id").tag(id).cloned())
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, RepoError> {
        let state = self.read("list_tags_for_post");
        let tags = state
            .tags
            .iter()
            .filter(|tag| state.post_has_tag(post_id, tag.id))
            .cloned();
        Ok(newest_first(tags, |tag| tag.created_at))
    }

    async fn list_for_posts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, TagRecord)>, RepoError> {
        let state = self.read("list_tags_for_posts");
        let tags = newest_first(state.tags.iter().cloned(), |tag| tag.created_at);
        let mut pairs = Vec::new();
        for tag in tags {
            for post_id in post_ids {
                if state.post_has_tag(*post_id, tag.id) {
                    pairs.push((*post_id, tag.clone()));
                }
            }
        }
        Ok(pairs)
    }
}

#[async_trait]
impl TagsWriteRepo for InMemoryRepositories {
    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError> {
        let mut state = self.write("create_tag");
        if state.tags.iter().any(|tag| tag.slug == params.slug) {
            return Err(duplicate("tags_slug_key"));
        }
        let record = TagRecord {
            id: Uuid::new_v4(),
            name: params.name,
            slug: params.slug,
            created_at: OffsetDateTime::now_utc(),
        };
        state.tags.push(record.clone());
        Ok(record)
    }

    async fn update_tag(&self, params: UpdateTagParams) -> Result<TagRecord, RepoError> {
        let mut state = self.write("update_tag");
        if state
            .tags
            .iter()
            .any(|tag| tag.slug == params.slug && tag.id != params.id)
        {
            return Err(duplicate("tags_slug_key"));
        }
        let tag = state
            .tags
            .iter_mut()
            .find(|tag| tag.id == params.id)
            .ok_or(RepoError::NotFound)?;
        tag.name = params.name;
        tag.slug = params.slug;
        Ok(tag.clone())
    }

    async fn delete_tag(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.write("delete_tag");
        let before = state.tags.len();
        state.tags.retain(|tag| tag.id != id);
        if state.tags.len() == before {
            return Err(RepoError::NotFound);
        }
        state.post_tags.retain(|(_, tag_id)| *tag_id != id);
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepositories {
    async fn list_published(&self, filter: PostListFilter) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.read("list_published");
        let matching = state
            .published_posts()
            .filter(|post| {
                filter
                    .category_id
                    .is_none_or(|category_id| post.category_id == Some(category_id))
            })
            .filter(|post| {
                filter
                    .tag_id
                    .is_none_or(|tag_id| state.post_has_tag(post.id, tag_id))
            })
            .cloned()
            .collect::<Vec<_>>();
        let mut posts = newest_first(matching.into_iter(), |post| post.created_at);
        if let Some(limit) = filter.limit {
            posts.truncate(limit);
        }
        Ok(posts)
    }

    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        let state = self.read("find_published_by_slug");
        Ok(state.published_posts().find(|post| post.slug == slug).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        let state = self.read("find_post_by_slug");
        Ok(state.posts.iter().find(|post| post.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.read("find_post_by_id").post(id).cloned())
    }

    async fn list_related(&self, query: RelatedPostsQuery) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.read("list_related");
        let related = state
            .published_posts()
            .filter(|post| post.id != query.post_id && post.category_id == query.category_id)
            .cloned()
            .collect::<Vec<_>>();
        let mut posts = newest_first(related.into_iter(), |post| post.created_at);
        posts.truncate(query.limit);
        Ok(posts)
    }

    async fn list_slugs_in_category(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<String>, RepoError> {
        let state = self.read("list_slugs_in_category");
        let mut slugs: Vec<String> = state
            .posts
            .iter()
            .filter(|post| post.category_id == category_id)
            .map(|post| post.slug.clone())
            .collect();
        slugs.sort();
        Ok(slugs)
    }

    async fn list_slugs_with_tag(&self, tag_id: Uuid) -> Result<Vec<String>, RepoError> {
        let state = self.read("list_slugs_with_tag");
        let mut slugs: Vec<String> = state
            .posts
            .iter()
            .filter(|post| state.post_has_tag(post.id, tag_id))
            .map(|post| post.slug.clone())
            .collect();
        slugs.sort();
        Ok(slugs)
    }

    async fn increment_view_count(&self, slug: &str) -> Result<Option<i64>, RepoError> {
        let mut state = self.write("increment_view_count");
        Ok(state
            .posts
            .iter_mut()
            .find(|post| post.slug == slug && post.is_published)
            .map(|post| {
                post.view_count = post.view_count.saturating_add(1);
                post.view_count
            }))
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.write("create_post");
        if state.posts.iter().any(|post| post.slug == params.slug) {
            return Err(duplicate("posts_slug_key"));
        }
        state.check_post_refs(params.category_id, &params.tag_ids)?;

        let now = OffsetDateTime::now_utc();
        let record = PostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            slug: params.slug,
            cover_image: params.cover_image,
            content: params.content,
            excerpt: params.excerpt,
            category_id: params.category_id,
            is_photography: params.is_photography,
            is_published: params.is_published,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.replace_post_tags(record.id, &params.tag_ids);
        state.posts.push(record.clone());
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.write("update_post");
        if state
            .posts
            .iter()
            .any(|post| post.slug == params.slug && post.id != params.id)
        {
            return Err(duplicate("posts_slug_key"));
        }
        if state.post(params.id).is_none() {
            return Err(RepoError::NotFound);
        }
        state.check_post_refs(params.category_id, &params.tag_ids)?;
        state.replace_post_tags(params.id, &params.tag_ids);

        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.slug = params.slug;
        post.cover_image = params.cover_image;
        post.content = params.content;
        post.excerpt = params.excerpt;
        post.category_id = params.category_id;
        post.is_photography = params.is_photography;
        post.is_published = params.is_published;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.write("delete_post");
        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        state.post_tags.retain(|(post_id, _)| *post_id != id);
        Ok(())
    }
}

#[async_trait]
impl AlbumsRepo for InMemoryRepositories {
    async fn list_albums(&self) -> Result<Vec<AlbumSummary>, RepoError> {
        let state = self.read("list_albums");
        let mut albums: Vec<&AlbumRecord> = state.albums.iter().rev().collect();
        albums.sort_by_key(|album| std::cmp::Reverse(album.created_on));
        Ok(albums
            .into_iter()
            .map(|album| state.album_summary(album))
            .collect())
    }

    async fn list_featured(&self) -> Result<Vec<AlbumSummary>, RepoError> {
        Ok(self
            .list_albums()
            .await?
            .into_iter()
            .filter(|summary| summary.album.is_featured)
            .collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<AlbumRecord>, RepoError> {
        let state = self.read("find_album_by_slug");
        Ok(state.albums.iter().find(|album| album.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AlbumRecord>, RepoError> {
        Ok(self.read("find_album_by_id").album(id).cloned())
    }
}

#[async_trait]
impl AlbumsWriteRepo for InMemoryRepositories {
    async fn create_album(&self, params: CreateAlbumParams) -> Result<AlbumRecord, RepoError> {
        let mut state = self.write("create_album");
        if state.albums.iter().any(|album| album.slug == params.slug) {
            return Err(duplicate("albums_slug_key"));
        }
        let record = AlbumRecord {
            id: Uuid::new_v4(),
            title: params.title,
            slug: params.slug,
            description: params.description,
            theme_color: params.theme_color,
            cover_photo_id: None,
            created_on: params
                .created_on
                .unwrap_or_else(|| OffsetDateTime::now_utc().date()),
            is_featured: params.is_featured,
        };
        state.albums.push(record.clone());
        Ok(record)
    }

    async fn update_album(&self, params: UpdateAlbumParams) -> Result<AlbumRecord, RepoError> {
        let mut state = self.write("update_album");
        if state
            .albums
            .iter()
            .any(|album| album.slug == params.slug && album.id != params.id)
        {
            return Err(duplicate("albums_slug_key"));
        }
        if params
            .cover_photo_id
            .is_some_and(|cover_id| state.photo(cover_id).is_none())
        {
            return Err(foreign_key("albums_cover_photo_fk"));
        }
        let album = state
            .albums
            .iter_mut()
            .find(|album| album.id == params.id)
            .ok_or(RepoError::NotFound)?;
        album.title = params.title;
        album.slug = params.slug;
        album.description = params.description;
        album.theme_color = params.theme_color;
        album.cover_photo_id = params.cover_photo_id;
        album.is_featured = params.is_featured;
        Ok(album.clone())
    }

    async fn delete_album(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.write("delete_album");
        let before = state.albums.len();
        state.albums.retain(|album| album.id != id);
        if state.albums.len() == before {
            return Err(RepoError::NotFound);
        }
        let removed: Vec<Uuid> = state
            .photos
            .iter()
            .filter(|photo| photo.album_id == id)
            .map(|photo| photo.id)
            .collect();
        state.photos.retain(|photo| photo.album_id != id);
        for album in state.albums.iter_mut() {
            if album
                .cover_photo_id
                .is_some_and(|cover| removed.contains(&cover))
            {
                album.cover_photo_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PhotosRepo for InMemoryRepositories {
    async fn list_for_album(&self, album_id: Uuid) -> Result<Vec<PhotoRecord>, RepoError> {
        let state = self.read("list_photos_for_album");
        Ok(sorted_photos(
            state.photos.iter().filter(|photo| photo.album_id == album_id),
        ))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PhotoRecord>, RepoError> {
        Ok(self.read("find_photo_by_id").photo(id).cloned())
    }
}

#[async_trait]
impl PhotosWriteRepo for InMemoryRepositories {
    async fn create_photo(&self, params: CreatePhotoParams) -> Result<PhotoRecord, RepoError> {
        let mut state = self.write("create_photo");
        if state.album(params.album_id).is_none() {
            return Err(foreign_key("photos_album_id_fkey"));
        }
        let record = PhotoRecord {
            id: Uuid::new_v4(),
            album_id: params.album_id,
            title: params.title,
            image: params.image,
            description: params.description,
            location: params.location,
            date_taken: params.date_taken,
            exif: params.exif,
            exif_data: params.exif_data,
            display_order: params.display_order,
            created_at: OffsetDateTime::now_utc(),
        };
        state.photos.push(record.clone());
        Ok(record)
    }

    async fn update_photo(&self, params: UpdatePhotoParams) -> Result<PhotoRecord, RepoError> {
        let mut state = self.write("update_photo");
        if state.album(params.album_id).is_none() {
            return Err(foreign_key("photos_album_id_fkey"));
        }
        let photo = state
            .photos
            .iter_mut()
            .find(|photo| photo.id == params.id)
            .ok_or(RepoError::NotFound)?;
        photo.album_id = params.album_id;
        photo.title = params.title;
        photo.image = params.image;
        photo.description = params.description;
        photo.location = params.location;
        photo.date_taken = params.date_taken;
        photo.exif = params.exif;
        photo.exif_data = params.exif_data;
        photo.display_order = params.display_order;
        Ok(photo.clone())
    }

    async fn delete_photo(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.write("delete_photo");
        let before = state.photos.len();
        state.photos.retain(|photo| photo.id != id);
        if state.photos.len() == before {
            return Err(RepoError::NotFound);
        }
        for album in state.albums.iter_mut() {
            if album.cover_photo_id == Some(id) {
                album.cover_photo_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for InMemoryRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::domain::photos::ExifFields;
    use crate::domain::types::ThemeColor;

    fn post_params(slug: &str, category_id: Option<Uuid>, tag_ids: Vec<Uuid>) -> CreatePostParams {
        CreatePostParams {
            title: slug.to_string(),
            slug: slug.to_string(),
            cover_image: String::new(),
            content: "body".to_string(),
            excerpt: String::new(),
            category_id,
            tag_ids,
            is_photography: false,
            is_published: true,
        }
    }

    fn photo_params(album_id: Uuid, title: &str, display_order: i32) -> CreatePhotoParams {
        CreatePhotoParams {
            album_id,
            title: title.to_string(),
            image: format!("photos/{title}.jpg"),
            description: String::new(),
            location: String::new(),
            date_taken: None,
            exif: ExifFields::default(),
            exif_data: None,
            display_order,
        }
    }

    async fn album(repo: &InMemoryRepositories, slug: &str) -> AlbumRecord {
        repo.create_album(CreateAlbumParams {
            title: slug.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            theme_color: ThemeColor::default(),
            is_featured: false,
            created_on: Some(date!(2024 - 03 - 01)),
        })
        .await
        .expect("album")
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected() {
        let repo = InMemoryRepositories::new();
        repo.create_post(post_params("dup", None, Vec::new()))
            .await
            .expect("first post");
        let err = repo
            .create_post(post_params("dup", None, Vec::new()))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn unknown_tag_reference_is_rejected() {
        let repo = InMemoryRepositories::new();
        let err = repo
            .create_post(post_params("p", None, vec![Uuid::new_v4()]))
            .await
            .expect_err("dangling tag");
        assert!(matches!(err, RepoError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn list_published_is_newest_first_and_filters() {
        let repo = InMemoryRepositories::new();
        let tag = repo
            .create_tag(CreateTagParams {
                name: "Tag".into(),
                slug: "tag".into(),
            })
            .await
            .expect("tag");
        repo.create_post(post_params("first", None, vec![tag.id]))
            .await
            .expect("first");
        repo.create_post(post_params("second", None, Vec::new()))
            .await
            .expect("second");
        let mut hidden = post_params("hidden", None, vec![tag.id]);
        hidden.is_published = false;
        repo.create_post(hidden).await.expect("hidden");

        let all = repo
            .list_published(PostListFilter::default())
            .await
            .expect("list");
        let slugs: Vec<&str> = all.iter().map(|post| post.slug.as_str()).collect();
        assert_eq!(slugs, vec!["second", "first"]);

        let tagged = repo
            .list_published(PostListFilter {
                tag_id: Some(tag.id),
                ..Default::default()
            })
            .await
            .expect("tagged");
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].slug, "first");
    }

    #[tokio::test]
    async fn deleting_category_clears_post_reference() {
        let repo = InMemoryRepositories::new();
        let category = repo
            .create_category(CreateCategoryParams {
                name: "Essay".into(),
                slug: "essay".into(),
                description: String::new(),
                sort_order: 0,
            })
            .await
            .expect("category");
        let post = repo
            .create_post(post_params("p", Some(category.id), Vec::new()))
            .await
            .expect("post");

        repo.delete_category(category.id).await.expect("delete");

        let post = PostsRepo::find_by_id(&repo, post.id)
            .await
            .expect("lookup")
            .expect("post survives");
        assert_eq!(post.category_id, None);
    }

    #[tokio::test]
    async fn view_count_increment_only_touches_published_posts() {
        let repo = InMemoryRepositories::new();
        let post = repo
            .create_post(post_params("seen", None, Vec::new()))
            .await
            .expect("post");

        assert_eq!(repo.increment_view_count("seen").await.expect("inc"), Some(1));
        assert_eq!(repo.increment_view_count("seen").await.expect("inc"), Some(2));
        assert_eq!(repo.increment_view_count("missing").await.expect("inc"), None);

        let stored = PostsRepo::find_by_id(&repo, post.id)
            .await
            .expect("lookup")
            .expect("post");
        assert_eq!(stored.view_count, 2);
        assert_eq!(stored.updated_at, post.updated_at);
    }

    #[tokio::test]
    async fn photos_order_by_display_order_then_newest() {
        let repo = InMemoryRepositories::new();
        let album = album(&repo, "lake").await;
        repo.create_photo(photo_params(album.id, "b", 1))
            .await
            .expect("b");
        repo.create_photo(photo_params(album.id, "a-old", 0))
            .await
            .expect("a-old");
        repo.create_photo(photo_params(album.id, "a-new", 0))
            .await
            .expect("a-new");

        let photos = repo.list_for_album(album.id).await.expect("photos");
        let titles: Vec<&str> = photos.iter().map(|photo| photo.title.as_str()).collect();
        assert_eq!(titles, vec!["a-new", "a-old", "b"]);
    }

    #[tokio::test]
    async fn deleting_cover_photo_clears_album_cover() {
        let repo = InMemoryRepositories::new();
        let album = album(&repo, "lake").await;
        let photo = repo
            .create_photo(photo_params(album.id, "cover", 0))
            .await
            .expect("photo");
        repo.update_album(UpdateAlbumParams {
            id: album.id,
            title: album.title.clone(),
            slug: album.slug.clone(),
            description: String::new(),
            theme_color: album.theme_color,
            cover_photo_id: Some(photo.id),
            is_featured: false,
        })
        .await
        .expect("set cover");

        let summaries = repo.list_albums().await.expect("albums");
        assert_eq!(summaries[0].photo_count, 1);
        assert_eq!(summaries[0].cover.as_ref().map(|p| p.id), Some(photo.id));

        repo.delete_photo(photo.id).await.expect("delete");
        let summaries = repo.list_albums().await.expect("albums");
        assert_eq!(summaries[0].photo_count, 0);
        assert!(summaries[0].cover.is_none());
    }

    #[tokio::test]
    async fn deleting_album_cascades_photos() {
        let repo = InMemoryRepositories::new();
        let album = album(&repo, "lake").await;
        let photo = repo
            .create_photo(photo_params(album.id, "p", 0))
            .await
            .expect("photo");

        repo.delete_album(album.id).await.expect("delete");

        assert!(PhotosRepo::find_by_id(&repo, photo.id)
            .await
            .expect("lookup")
            .is_none());
    }
}
