//! Write services. Every successful store write is reported to the cache
//! trigger before the call returns.

mod blog;
mod gallery;

pub use blog::{AdminBlogService, CategoryInput, PostInput, TagInput};
pub use gallery::{AdminGalleryService, AlbumInput, PhotoInput};

use std::future::Future;

use thiserror::Error;

use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::domain::slug::{
    SlugAsyncError, SlugError, derive_slug, ensure_filter_slug_allowed, generate_unique_slug_async,
    validate_slug,
};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl AdminError {
    fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }
}

impl From<SlugError> for AdminError {
    fn from(err: SlugError) -> Self {
        Self::Domain(DomainError::Slug(err))
    }
}

/// Whether slugs of this entity appear as list filters and so must avoid the
/// `all` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlugScope {
    Filter,
    Plain,
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")).into());
    }
    Ok(())
}

fn explicit_slug(slug: Option<&str>, scope: SlugScope) -> Result<Option<String>, AdminError> {
    let Some(slug) = slug.map(str::trim).filter(|slug| !slug.is_empty()) else {
        return Ok(None);
    };
    validate_slug(slug)?;
    if scope == SlugScope::Filter {
        ensure_filter_slug_allowed(slug)?;
    }
    Ok(Some(slug.to_string()))
}

/// Slug for a new record: the explicit one when given, otherwise derived
/// from `source` and made unique with `-2`, `-3`, … suffixes.
async fn slug_for_new<F, Fut>(
    slug: Option<&str>,
    source: &str,
    scope: SlugScope,
    is_unique: F,
) -> Result<String, AdminError>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, RepoError>>,
{
    if let Some(slug) = explicit_slug(slug, scope)? {
        return Ok(slug);
    }
    generate_unique_slug_async(source, scope == SlugScope::Filter, is_unique)
        .await
        .map_err(|err| match err {
            SlugAsyncError::Slug(err) => AdminError::from(err),
            SlugAsyncError::Predicate(err) => AdminError::Repo(err),
        })
}

/// Slug used as the get-or-create key when seeding.
fn lookup_slug(slug: Option<&str>, source: &str, scope: SlugScope) -> Result<String, AdminError> {
    match explicit_slug(slug, scope)? {
        Some(slug) => Ok(slug),
        None => Ok(derive_slug(source)?),
    }
}

/// Updates keep the stored slug unless a new one is supplied.
fn slug_for_update(
    slug: Option<&str>,
    current: &str,
    scope: SlugScope,
) -> Result<String, AdminError> {
    Ok(explicit_slug(slug, scope)?.unwrap_or_else(|| current.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_slugs_are_validated() {
        assert_eq!(
            explicit_slug(Some(" landscape "), SlugScope::Filter).expect("valid"),
            Some("landscape".to_string())
        );
        assert_eq!(explicit_slug(Some("  "), SlugScope::Filter).expect("blank"), None);
        assert!(explicit_slug(Some("all"), SlugScope::Filter).is_err());
        assert!(explicit_slug(Some("all"), SlugScope::Plain).is_ok());
        assert!(explicit_slug(Some("a*b"), SlugScope::Plain).is_err());
    }

    #[test]
    fn updates_keep_current_slug_by_default() {
        assert_eq!(
            slug_for_update(None, "spring-west-lake", SlugScope::Plain).expect("slug"),
            "spring-west-lake"
        );
        assert_eq!(
            slug_for_update(Some("west-lake"), "spring-west-lake", SlugScope::Plain)
                .expect("slug"),
            "west-lake"
        );
    }

    #[tokio::test]
    async fn derived_slugs_skip_taken_candidates() {
        let slug = slug_for_new(None, "春日西湖", SlugScope::Plain, |candidate: &str| {
            let free = candidate != "chun-ri-xi-hu";
            async move { Ok::<_, RepoError>(free) }
        })
        .await
        .expect("slug");
        assert_eq!(slug, "chun-ri-xi-hu-2");
    }

    #[tokio::test]
    async fn derived_filter_slugs_avoid_sentinel() {
        let slug = slug_for_new(None, "All", SlugScope::Filter, |_candidate: &str| async {
            Ok::<_, RepoError>(true)
        })
        .await
        .expect("slug");
        assert_eq!(slug, "all-2");
    }
}
