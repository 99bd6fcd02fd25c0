use std::collections::HashMap;

use async_trait::async_trait;
use time::Date;
use uuid::Uuid;

use crate::application::repos::{
    AlbumSummary, AlbumsRepo, AlbumsWriteRepo, CreateAlbumParams, RepoError, UpdateAlbumParams,
};
use crate::domain::entities::AlbumRecord;
use crate::domain::types::ThemeColor;

use super::{PostgresRepositories, map_sqlx_error};

const ALBUM_COLUMNS: &str =
    "a.id, a.title, a.slug, a.description, a.theme_color, a.cover_photo_id, a.created_on, a.is_featured";

const RETURNING_ALBUM: &str = "RETURNING id, title, slug, description, theme_color, \
    cover_photo_id, created_on, is_featured";

#[derive(sqlx::FromRow)]
struct AlbumRow {
    id: Uuid,
    title: String,
    slug: String,
    description: String,
    theme_color: String,
    cover_photo_id: Option<Uuid>,
    created_on: Date,
    is_featured: bool,
}

impl TryFrom<AlbumRow> for AlbumRecord {
    type Error = RepoError;

    fn try_from(row: AlbumRow) -> Result<Self, Self::Error> {
        let theme_color =
            ThemeColor::try_from(row.theme_color.as_str()).map_err(|err| RepoError::Integrity {
                message: err.to_string(),
            })?;
        Ok(Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            theme_color,
            cover_photo_id: row.cover_photo_id,
            created_on: row.created_on,
            is_featured: row.is_featured,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AlbumCountRow {
    #[sqlx(flatten)]
    album: AlbumRow,
    photo_count: i64,
}

impl PostgresRepositories {
    async fn list_album_summaries(&self, featured_only: bool) -> Result<Vec<AlbumSummary>, RepoError> {
        let rows = sqlx::query_as::<_, AlbumCountRow>(&format!(
            "SELECT {ALBUM_COLUMNS}, \
             (SELECT COUNT(*) FROM photos ph WHERE ph.album_id = a.id) AS photo_count \
             FROM albums a WHERE ($1 = FALSE OR a.is_featured) \
             ORDER BY a.created_on DESC, a.created_at DESC"
        ))
        .bind(featured_only)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            summaries.push(AlbumSummary {
                album: AlbumRecord::try_from(row.album)?,
                photo_count: row.photo_count,
                cover: None,
            });
        }

        let cover_ids: Vec<Uuid> = summaries
            .iter()
            .filter_map(|summary| summary.album.cover_photo_id)
            .collect();
        if cover_ids.is_empty() {
            return Ok(summaries);
        }

        let covers: HashMap<Uuid, _> = self
            .photos_by_ids(&cover_ids)
            .await?
            .into_iter()
            .map(|photo| (photo.id, photo))
            .collect();
        for summary in &mut summaries {
            summary.cover = summary
                .album
                .cover_photo_id
                .and_then(|id| covers.get(&id).cloned());
        }
        Ok(summaries)
    }
}

#[async_trait]
impl AlbumsRepo for PostgresRepositories {
    async fn list_albums(&self) -> Result<Vec<AlbumSummary>, RepoError> {
        self.list_album_summaries(false).await
    }

    async fn list_featured(&self) -> Result<Vec<AlbumSummary>, RepoError> {
        self.list_album_summaries(true).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<AlbumRecord>, RepoError> {
        let row = sqlx::query_as::<_, AlbumRow>(&format!(
            "SELECT {ALBUM_COLUMNS} FROM albums a WHERE a.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(AlbumRecord::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AlbumRecord>, RepoError> {
        let row = sqlx::query_as::<_, AlbumRow>(&format!(
            "SELECT {ALBUM_COLUMNS} FROM albums a WHERE a.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(AlbumRecord::try_from).transpose()
    }
}

#[async_trait]
impl AlbumsWriteRepo for PostgresRepositories {
    async fn create_album(&self, params: CreateAlbumParams) -> Result<AlbumRecord, RepoError> {
        let row = sqlx::query_as::<_, AlbumRow>(&format!(
            "INSERT INTO albums (id, title, slug, description, theme_color, is_featured, created_on) \
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, CURRENT_DATE)) {RETURNING_ALBUM}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.title)
        .bind(params.slug)
        .bind(params.description)
        .bind(params.theme_color.as_hex())
        .bind(params.is_featured)
        .bind(params.created_on)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn update_album(&self, params: UpdateAlbumParams) -> Result<AlbumRecord, RepoError> {
        let row = sqlx::query_as::<_, AlbumRow>(&format!(
            "UPDATE albums SET title = $2, slug = $3, description = $4, theme_color = $5, \
             cover_photo_id = $6, is_featured = $7 WHERE id = $1 {RETURNING_ALBUM}"
        ))
        .bind(params.id)
        .bind(params.title)
        .bind(params.slug)
        .bind(params.description)
        .bind(params.theme_color.as_hex())
        .bind(params.cover_photo_id)
        .bind(params.is_featured)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn delete_album(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM albums WHERE id = $1")
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
