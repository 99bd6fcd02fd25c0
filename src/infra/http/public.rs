use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::application::{
    blog::{BlogDetailBundle, BlogListBundle, BlogService},
    error::HttpError,
    gallery::{AlbumBundle, GalleryListBundle, GalleryService},
    home::{HomeBundle, HomeService},
    repos::StoreHealth,
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub blog: Arc<BlogService>,
    pub gallery: Arc<GalleryService>,
    pub home: Arc<HomeService>,
    pub health: Arc<dyn StoreHealth>,
}

/// Every page route answers with and without a trailing slash.
pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/blog", get(blog_list))
        .route("/blog/", get(blog_list))
        .route("/blog/{slug}", get(blog_detail))
        .route("/blog/{slug}/", get(blog_detail))
        .route("/gallery", get(gallery_list))
        .route("/gallery/", get(gallery_list))
        .route("/gallery/{slug}", get(album_detail))
        .route("/gallery/{slug}/", get(album_detail))
        .route("/_health/db", get(public_health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    category: Option<String>,
    tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailQuery {
    #[serde(rename = "no-cache")]
    no_cache: Option<String>,
}

impl DetailQuery {
    /// `no-cache=1` (or `true`, `yes`, `on`) skips the cache lookup.
    fn bypass_cache(&self) -> bool {
        self.no_cache.as_deref().is_some_and(|value| {
            ["1", "true", "yes", "on"]
                .iter()
                .any(|flag| value.trim().eq_ignore_ascii_case(flag))
        })
    }
}

async fn home(State(state): State<HttpState>) -> Result<Json<HomeBundle>, HttpError> {
    Ok(Json(state.home.home().await?))
}

async fn blog_list(
    State(state): State<HttpState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<BlogListBundle>, HttpError> {
    let bundle = state
        .blog
        .list(query.category.as_deref(), query.tag.as_deref())
        .await?;
    Ok(Json(bundle))
}

async fn blog_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<BlogDetailBundle>, HttpError> {
    let bundle = state.blog.detail(&slug, query.bypass_cache()).await?;
    Ok(Json(bundle))
}

async fn gallery_list(
    State(state): State<HttpState>,
) -> Result<Json<GalleryListBundle>, HttpError> {
    Ok(Json(state.gallery.list().await?))
}

async fn album_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<AlbumBundle>, HttpError> {
    let bundle = state.gallery.album(&slug, query.bypass_cache()).await?;
    Ok(Json(bundle))
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn fallback() -> Response {
    HttpError::new(
        "infra::http::public::fallback",
        StatusCode::NOT_FOUND,
        "Resource not found",
        "no route matched",
    )
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cache_flag_needs_a_truthy_value() {
        let query = |value: Option<&str>| DetailQuery {
            no_cache: value.map(str::to_string),
        };
        assert!(query(Some("1")).bypass_cache());
        assert!(query(Some("TRUE")).bypass_cache());
        assert!(!query(Some("0")).bypass_cache());
        assert!(!query(Some("false")).bypass_cache());
        assert!(!query(Some("")).bypass_cache());
        assert!(!query(None).bypass_cache());
    }
}
