use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::application::repos::{
    CreatePhotoParams, PhotosRepo, PhotosWriteRepo, RepoError, UpdatePhotoParams,
};
use crate::domain::entities::PhotoRecord;
use crate::domain::photos::ExifFields;

use super::{PostgresRepositories, map_sqlx_error};

const PHOTO_COLUMNS: &str = "id, album_id, title, image, description, location, date_taken, \
    camera, lens, focal_length, aperture, shutter_speed, iso, exif_data, display_order, created_at";

#[derive(sqlx::FromRow)]
struct PhotoRow {
    id: Uuid,
    album_id: Uuid,
    title: String,
    image: String,
    description: String,
    location: String,
    date_taken: Option<Date>,
    camera: String,
    lens: String,
    focal_length: String,
    aperture: String,
    shutter_speed: String,
    iso: String,
    exif_data: Option<serde_json::Value>,
    display_order: i32,
    created_at: OffsetDateTime,
}

impl From<PhotoRow> for PhotoRecord {
    fn from(row: PhotoRow) -> Self {
        Self {
            id: row.id,
            album_id: row.album_id,
            title: row.title,
            image: row.image,
            description: row.description,
            location: row.location,
            date_taken: row.date_taken,
            exif: ExifFields {
                camera: row.camera,
                lens: row.lens,
                focal_length: row.focal_length,
                aperture: row.aperture,
                shutter_speed: row.shutter_speed,
                iso: row.iso,
            },
            exif_data: row.exif_data,
            display_order: row.display_order,
            created_at: row.created_at,
        }
    }
}

impl PostgresRepositories {
    pub(super) async fn photos_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PhotoRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PhotoRow>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PhotoRecord::from).collect())
    }
}

#[async_trait]
impl PhotosRepo for PostgresRepositories {
    async fn list_for_album(&self, album_id: Uuid) -> Result<Vec<PhotoRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PhotoRow>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE album_id = $1 \
             ORDER BY display_order ASC, created_at DESC"
        ))
        .bind(album_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PhotoRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PhotoRecord>, RepoError> {
        let row = sqlx::query_as::<_, PhotoRow>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PhotoRecord::from))
    }
}

#[async_trait]
impl PhotosWriteRepo for PostgresRepositories {
    async fn create_photo(&self, params: CreatePhotoParams) -> Result<PhotoRecord, RepoError> {
        let CreatePhotoParams {
            album_id,
            title,
            image,
            description,
            location,
            date_taken,
            exif,
            exif_data,
            display_order,
        } = params;

        let row = sqlx::query_as::<_, PhotoRow>(&format!(
            "INSERT INTO photos (id, album_id, title, image, description, location, date_taken, \
             camera, lens, focal_length, aperture, shutter_speed, iso, exif_data, display_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {PHOTO_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(album_id)
        .bind(title)
        .bind(image)
        .bind(description)
        .bind(location)
        .bind(date_taken)
        .bind(exif.camera)
        .bind(exif.lens)
        .bind(exif.focal_length)
        .bind(exif.aperture)
        .bind(exif.shutter_speed)
        .bind(exif.iso)
        .bind(exif_data)
        .bind(display_order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_photo(&self, params: UpdatePhotoParams) -> Result<PhotoRecord, RepoError> {
        let UpdatePhotoParams {
            id,
            album_id,
            title,
            image,
            description,
            location,
            date_taken,
            exif,
            exif_data,
            display_order,
        } = params;

        let row = sqlx::query_as::<_, PhotoRow>(&format!(
            "UPDATE photos SET album_id = $2, title = $3, image = $4, description = $5, \
             location = $6, date_taken = $7, camera = $8, lens = $9, focal_length = $10, \
             aperture = $11, shutter_speed = $12, iso = $13, exif_data = $14, display_order = $15 \
             WHERE id = $1 RETURNING {PHOTO_COLUMNS}"
        ))
        .bind(id)
        .bind(album_id)
        .bind(title)
        .bind(image)
        .bind(description)
        .bind(location)
        .bind(date_taken)
        .bind(exif.camera)
        .bind(exif.lens)
        .bind(exif.focal_length)
        .bind(exif.aperture)
        .bind(exif.shutter_speed)
        .bind(exif.iso)
        .bind(exif_data)
        .bind(display_order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_photo(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM photos WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
