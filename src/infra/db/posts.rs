use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreatePostParams, PostListFilter, PostsRepo, PostsWriteRepo, RelatedPostsQuery, RepoError,
    UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::{PostgresRepositories, map_sqlx_error};

const POST_COLUMNS: &str = "p.id, p.title, p.slug, p.cover_image, p.content, p.excerpt, \
    p.category_id, p.is_photography, p.is_published, p.view_count, p.created_at, p.updated_at";

const RETURNING_POST: &str = "RETURNING id, title, slug, cover_image, content, excerpt, \
    category_id, is_photography, is_published, view_count, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    slug: String,
    cover_image: String,
    content: String,
    excerpt: String,
    category_id: Option<Uuid>,
    is_photography: bool,
    is_published: bool,
    view_count: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            cover_image: row.cover_image,
            content: row.content,
            excerpt: row.excerpt,
            category_id: row.category_id,
            is_photography: row.is_photography,
            is_published: row.is_published,
            view_count: row.view_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    async fn find_post_where(
        &self,
        condition: &str,
        slug: &str,
    ) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE {condition}"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn replace_post_tags(
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        if !tag_ids.is_empty() {
            sqlx::query(
                "INSERT INTO post_tags (post_id, tag_id) \
                 SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS t(tag_id) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(tag_ids)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_published(&self, filter: PostListFilter) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.is_published"
        ));
        if let Some(category_id) = filter.category_id {
            qb.push(" AND p.category_id = ");
            qb.push_bind(category_id);
        }
        if let Some(tag_id) = filter.tag_id {
            qb.push(" AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ");
            qb.push_bind(tag_id);
            qb.push(")");
        }
        qb.push(" ORDER BY p.created_at DESC, p.id");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        self.find_post_where("p.slug = $1 AND p.is_published", slug)
            .await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        self.find_post_where("p.slug = $1", slug).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn list_related(&self, query: RelatedPostsQuery) -> Result<Vec<PostRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p \
             WHERE p.is_published AND p.id <> $1 AND p.category_id IS NOT DISTINCT FROM $2::uuid \
             ORDER BY p.created_at DESC, p.id LIMIT $3"
        ))
        .bind(query.post_id)
        .bind(query.category_id)
        .bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn list_slugs_in_category(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar::<_, String>(
            "SELECT slug FROM posts WHERE category_id IS NOT DISTINCT FROM $1::uuid ORDER BY slug",
        )
        .bind(category_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_slugs_with_tag(&self, tag_id: Uuid) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar::<_, String>(
            "SELECT p.slug FROM posts p \
             INNER JOIN post_tags pt ON pt.post_id = p.id \
             WHERE pt.tag_id = $1 ORDER BY p.slug",
        )
        .bind(tag_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn increment_view_count(&self, slug: &str) -> Result<Option<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE posts SET view_count = view_count + 1 \
             WHERE slug = $1 AND is_published RETURNING view_count",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (id, title, slug, cover_image, content, excerpt, category_id, \
             is_photography, is_published) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             {RETURNING_POST}"
        ))
        .bind(Uuid::new_v4())
        .bind(&params.title)
        .bind(&params.slug)
        .bind(&params.cover_image)
        .bind(&params.content)
        .bind(&params.excerpt)
        .bind(params.category_id)
        .bind(params.is_photography)
        .bind(params.is_published)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        Self::replace_post_tags(&mut tx, row.id, &params.tag_ids).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts SET title = $2, slug = $3, cover_image = $4, content = $5, \
             excerpt = $6, category_id = $7, is_photography = $8, is_published = $9, \
             updated_at = now() WHERE id = $1 {RETURNING_POST}"
        ))
        .bind(params.id)
        .bind(&params.title)
        .bind(&params.slug)
        .bind(&params.cover_image)
        .bind(&params.content)
        .bind(&params.excerpt)
        .bind(params.category_id)
        .bind(params.is_photography)
        .bind(params.is_published)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        Self::replace_post_tags(&mut tx, row.id, &params.tag_ids).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
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
