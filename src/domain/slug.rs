//! Slug derivation and validation for categories, tags, posts and albums.
//!
//! Titles are usually Chinese, so derivation transliterates to pinyin
//! (`pinyin` crate) before ASCII slugification (`slug` crate): “春日西湖”
//! becomes `chun-ri-xi-hu`. Uniqueness is delegated to an async predicate so
//! the same helper works for every repository backend.

use std::future::Future;

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;

/// Sentinel used in list cache keys when a filter is absent.
pub const RESERVED_FILTER_SLUG: &str = "all";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` may only contain ASCII letters, digits, `-` and `_`")]
    Invalid { slug: String },
    #[error("slug `{slug}` is reserved")]
    Reserved { slug: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from a human-readable title or name.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(transliterate_to_ascii(input));
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Check an explicitly supplied slug. Slugs end up inside cache keys and glob
/// patterns, so only `[A-Za-z0-9_-]` is accepted.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(SlugError::Invalid {
            slug: slug.to_string(),
        })
    }
}

/// Category and tag slugs must not collide with the list-key sentinel.
pub fn ensure_filter_slug_allowed(slug: &str) -> Result<(), SlugError> {
    if slug == RESERVED_FILTER_SLUG {
        return Err(SlugError::Reserved {
            slug: slug.to_string(),
        });
    }
    Ok(())
}

/// Produce a slug for `input` that the `is_unique` predicate accepts, trying
/// `-2`, `-3`, … suffixes after the base. Reserved bases are skipped the same
/// way taken ones are when `avoid_reserved` is set.
pub async fn generate_unique_slug_async<F, Fut, E>(
    input: &str,
    avoid_reserved: bool,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;
    let usable = |candidate: &str| !(avoid_reserved && candidate == RESERVED_FILTER_SLUG);

    if usable(&base) && is_unique(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => push_syllable(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            // slugify decides what to keep
            None => output.push(ch),
        }
    }

    output
}

fn push_syllable(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}
