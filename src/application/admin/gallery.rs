use std::sync::Arc;

use time::Date;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    AlbumsRepo, AlbumsWriteRepo, CreateAlbumParams, CreatePhotoParams, PhotosRepo,
    PhotosWriteRepo, UpdateAlbumParams, UpdatePhotoParams,
};
use crate::cache::{AlbumSnapshot, CacheTrigger, Change, PhotoSnapshot};
use crate::domain::entities::{AlbumRecord, PhotoRecord};
use crate::domain::error::DomainError;
use crate::domain::photos::ExifFields;
use crate::domain::types::ThemeColor;

use super::{AdminError, SlugScope, ensure_non_empty, lookup_slug, slug_for_new, slug_for_update};

#[derive(Debug, Clone, Default)]
pub struct AlbumInput {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
    pub theme_color: ThemeColor,
    pub is_featured: bool,
    /// Defaults to today on creation; ignored on update.
    pub created_on: Option<Date>,
    /// Only settable on update, and only to a photo of the same album.
    pub cover_photo_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct PhotoInput {
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

impl PhotoInput {
    fn validate(&self) -> Result<(), AdminError> {
        ensure_non_empty(&self.title, "title")?;
        ensure_non_empty(&self.image, "image")?;
        if self.display_order < 0 {
            return Err(DomainError::validation("display_order must not be negative").into());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct AdminGalleryService {
    albums: Arc<dyn AlbumsRepo>,
    album_writer: Arc<dyn AlbumsWriteRepo>,
    photos: Arc<dyn PhotosRepo>,
    photo_writer: Arc<dyn PhotosWriteRepo>,
    trigger: Arc<CacheTrigger>,
}

impl AdminGalleryService {
    pub fn new<R>(repo: Arc<R>, trigger: Arc<CacheTrigger>) -> Self
    where
        R: AlbumsRepo + AlbumsWriteRepo + PhotosRepo + PhotosWriteRepo + 'static,
    {
        Self {
            albums: repo.clone(),
            album_writer: repo.clone(),
            photos: repo.clone(),
            photo_writer: repo,
            trigger,
        }
    }

    pub async fn create_album(&self, input: AlbumInput) -> Result<AlbumRecord, AdminError> {
        ensure_non_empty(&input.title, "title")?;
        if input.cover_photo_id.is_some() {
            return Err(
                DomainError::validation("a new album has no photos to use as cover").into(),
            );
        }
        let title = input.title.trim().to_string();

        let reader = self.albums.clone();
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

        let album = self
            .album_writer
            .create_album(CreateAlbumParams {
                title,
                slug,
                description: input.description.trim().to_string(),
                theme_color: input.theme_color,
                is_featured: input.is_featured,
                created_on: input.created_on,
            })
            .await?;
        info!(album_id = %album.id, slug = %album.slug, "Album created");

        self.trigger
            .album_written(
                album.id,
                Change::created(AlbumSnapshot {
                    slug: album.slug.clone(),
                }),
            )
            .await;
        Ok(album)
    }

    pub async fn update_album(&self, id: Uuid, input: AlbumInput) -> Result<AlbumRecord, AdminError> {
        ensure_non_empty(&input.title, "title")?;
        let existing = self
            .albums
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found("album"))?;
        let slug = slug_for_update(input.slug.as_deref(), &existing.slug, SlugScope::Plain)?;

        if let Some(photo_id) = input.cover_photo_id {
            let belongs = self
                .photos
                .find_by_id(photo_id)
                .await?
                .is_some_and(|photo| photo.album_id == id);
            if !belongs {
                return Err(DomainError::validation(
                    "cover photo must belong to the album",
                )
                .into());
            }
        }

        let album = self
            .album_writer
            .update_album(UpdateAlbumParams {
                id,
                title: input.title.trim().to_string(),
                slug,
                description: input.description.trim().to_string(),
                theme_color: input.theme_color,
                cover_photo_id: input.cover_photo_id,
                is_featured: input.is_featured,
            })
            .await?;
        info!(album_id = %album.id, slug = %album.slug, "Album updated");

        self.trigger
            .album_written(
                id,
                Change::updated(
                    AlbumSnapshot {
                        slug: existing.slug,
                    },
                    AlbumSnapshot {
                        slug: album.slug.clone(),
                    },
                ),
            )
            .await;
        Ok(album)
    }

    /// Photos of the album are deleted with it.
    pub async fn delete_album(&self, id: Uuid) -> Result<(), AdminError> {
        let existing = self
            .albums
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found("album"))?;

        self.album_writer.delete_album(id).await?;
        info!(album_id = %id, slug = %existing.slug, "Album deleted");

        self.trigger
            .album_written(
                id,
                Change::deleted(AlbumSnapshot {
                    slug: existing.slug,
                }),
            )
            .await;
        Ok(())
    }

    pub async fn get_or_create_album(
        &self,
        input: AlbumInput,
    ) -> Result<(AlbumRecord, bool), AdminError> {
        let slug = lookup_slug(input.slug.as_deref(), &input.title, SlugScope::Plain)?;
        if let Some(existing) = self.albums.find_by_slug(&slug).await? {
            return Ok((existing, false));
        }
        let created = self
            .create_album(AlbumInput {
                slug: Some(slug),
                ..input
            })
            .await?;
        Ok((created, true))
    }

    pub async fn create_photo(&self, input: PhotoInput) -> Result<PhotoRecord, AdminError> {
        input.validate()?;
        let album = self.album_for(input.album_id).await?;

        let photo = self
            .photo_writer
            .create_photo(CreatePhotoParams {
                album_id: input.album_id,
                title: input.title.trim().to_string(),
                image: input.image.trim().to_string(),
                description: input.description,
                location: input.location,
                date_taken: input.date_taken,
                exif: input.exif,
                exif_data: input.exif_data,
                display_order: input.display_order,
            })
            .await?;
        info!(photo_id = %photo.id, album = %album.slug, "Photo created");

        self.trigger
            .photo_written(
                photo.id,
                Change::created(PhotoSnapshot {
                    album_slug: album.slug,
                }),
            )
            .await;
        Ok(photo)
    }

    /// Moving a photo to another album purges both albums.
    pub async fn update_photo(&self, id: Uuid, input: PhotoInput) -> Result<PhotoRecord, AdminError> {
        input.validate()?;
        let existing = self
            .photos
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found("photo"))?;
        let before_album = self.album_for(existing.album_id).await?;
        let after_album = if input.album_id == existing.album_id {
            before_album.clone()
        } else {
            self.album_for(input.album_id).await?
        };

        let photo = self
            .photo_writer
            .update_photo(UpdatePhotoParams {
                id,
                album_id: input.album_id,
                title: input.title.trim().to_string(),
                image: input.image.trim().to_string(),
                description: input.description,
                location: input.location,
                date_taken: input.date_taken,
                exif: input.exif,
                exif_data: input.exif_data,
                display_order: input.display_order,
            })
            .await?;
        info!(photo_id = %photo.id, album = %after_album.slug, "Photo updated");

        self.trigger
            .photo_written(
                id,
                Change::updated(
                    PhotoSnapshot {
                        album_slug: before_album.slug,
                    },
                    PhotoSnapshot {
                        album_slug: after_album.slug,
                    },
                ),
            )
            .await;
        Ok(photo)
    }

    pub async fn delete_photo(&self, id: Uuid) -> Result<(), AdminError> {
        let existing = self
            .photos
            .find_by_id(id)
            .await?
            .ok_or_else(|| AdminError::not_found("photo"))?;
        let album = self.album_for(existing.album_id).await?;

        self.photo_writer.delete_photo(id).await?;
        info!(photo_id = %id, album = %album.slug, "Photo deleted");

        self.trigger
            .photo_written(
                id,
                Change::deleted(PhotoSnapshot {
                    album_slug: album.slug,
                }),
            )
            .await;
        Ok(())
    }

    pub async fn photos_in_album(&self, album_id: Uuid) -> Result<Vec<PhotoRecord>, AdminError> {
        Ok(self.photos.list_for_album(album_id).await?)
    }

    async fn album_for(&self, album_id: Uuid) -> Result<AlbumRecord, AdminError> {
        self.albums
            .find_by_id(album_id)
            .await?
            .ok_or_else(|| AdminError::not_found("album"))
    }
}
