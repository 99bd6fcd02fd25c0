//! Cached gallery list and album bundles.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::error::ReadError;
use crate::application::repos::{AlbumSummary, AlbumsRepo, PhotosRepo};
use crate::cache::{CacheConfig, CacheHandle, CacheKey};
use crate::domain::entities::{AlbumRecord, PhotoRecord};
use crate::domain::photos::{LARGE_IMAGE, SQUARE_THUMBNAIL};

/// A photo with its derived rendition paths and EXIF summary line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoView {
    pub photo: PhotoRecord,
    pub thumbnail: String,
    pub large: String,
    pub exif_line: String,
}

impl From<PhotoRecord> for PhotoView {
    fn from(photo: PhotoRecord) -> Self {
        Self {
            thumbnail: SQUARE_THUMBNAIL.path_for(&photo.image),
            large: LARGE_IMAGE.path_for(&photo.image),
            exif_line: photo.exif.display_line(),
            photo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumCard {
    pub album: AlbumRecord,
    pub theme_label: String,
    pub photo_count: i64,
    pub cover: Option<PhotoView>,
}

impl From<AlbumSummary> for AlbumCard {
    fn from(summary: AlbumSummary) -> Self {
        Self {
            theme_label: summary.album.theme_color.label().to_string(),
            photo_count: summary.photo_count,
            cover: summary.cover.map(PhotoView::from),
            album: summary.album,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryListBundle {
    pub albums: Vec<AlbumCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumBundle {
    pub album: AlbumRecord,
    pub theme_label: String,
    pub photo_count: usize,
    pub photos: Vec<PhotoView>,
}

#[derive(Clone)]
pub struct GalleryService {
    albums: Arc<dyn AlbumsRepo>,
    photos: Arc<dyn PhotosRepo>,
    cache: CacheHandle,
    list_ttl: Duration,
    detail_ttl: Duration,
}

impl GalleryService {
    pub fn new<R>(repo: Arc<R>, cache: CacheHandle, config: &CacheConfig) -> Self
    where
        R: AlbumsRepo + PhotosRepo + 'static,
    {
        Self {
            albums: repo.clone(),
            photos: repo,
            cache,
            list_ttl: config.list_ttl(),
            detail_ttl: config.detail_ttl(),
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<GalleryListBundle, ReadError> {
        let key = CacheKey::GalleryList;
        if let Some(bundle) = self.cache.get_json::<GalleryListBundle>(&key).await {
            return Ok(bundle);
        }

        let albums = self.albums.list_albums().await?;
        let bundle = GalleryListBundle {
            albums: albums.into_iter().map(AlbumCard::from).collect(),
        };
        self.cache.set_json(&key, &bundle, self.list_ttl).await;
        debug!(key = %key, albums = bundle.albums.len(), "Gallery list bundle cached");
        Ok(bundle)
    }

    #[instrument(skip(self))]
    pub async fn album(&self, slug: &str, bypass_cache: bool) -> Result<AlbumBundle, ReadError> {
        let key = CacheKey::gallery_album(slug);
        if !bypass_cache {
            if let Some(bundle) = self.cache.get_json::<AlbumBundle>(&key).await {
                return Ok(bundle);
            }
        }

        let album = self
            .albums
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| ReadError::not_found("album", slug))?;
        let photos = self.photos.list_for_album(album.id).await?;

        let bundle = AlbumBundle {
            theme_label: album.theme_color.label().to_string(),
            photo_count: photos.len(),
            photos: photos.into_iter().map(PhotoView::from).collect(),
            album,
        };
        self.cache.set_json(&key, &bundle, self.detail_ttl).await;
        debug!(key = %key, bypass_cache, "Album bundle cached");
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::domain::photos::ExifFields;

    #[test]
    fn photo_view_derives_renditions_and_exif_line() {
        let photo = PhotoRecord {
            id: Uuid::new_v4(),
            album_id: Uuid::new_v4(),
            title: "断桥".to_string(),
            image: "gallery/west-lake/duanqiao.png".to_string(),
            description: String::new(),
            location: "杭州".to_string(),
            date_taken: None,
            exif: ExifFields {
                camera: "Sony A7R IV".to_string(),
                aperture: "1.2".to_string(),
                ..Default::default()
            },
            exif_data: None,
            display_order: 0,
            created_at: OffsetDateTime::now_utc(),
        };

        let view = PhotoView::from(photo);
        assert_eq!(view.thumbnail, "renditions/square/gallery/west-lake/duanqiao.jpg");
        assert_eq!(view.large, "renditions/large/gallery/west-lake/duanqiao.jpg");
        assert_eq!(view.exif_line, "Sony A7R IV | f/1.2");
    }
}
