//! Cache key definitions.
//!
//! `CacheKey` names a single cached bundle; `KeyPattern` names a family of
//! list bundles removed together by glob deletion.

use std::fmt;

use super::pattern::escape;
use crate::domain::slug::RESERVED_FILTER_SLUG;

/// Key of a cached read-path bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// Blog list for a category/tag filter pair. `None` is rendered as the
    /// `all` sentinel, while `Some("")` stays empty, so the two never collide.
    BlogList {
        category: Option<String>,
        tag: Option<String>,
    },
    BlogDetail(String),
    GalleryList,
    GalleryAlbum(String),
}

impl CacheKey {
    pub fn blog_list(category: Option<&str>, tag: Option<&str>) -> Self {
        Self::BlogList {
            category: category.map(str::to_string),
            tag: tag.map(str::to_string),
        }
    }

    pub fn blog_detail(slug: &str) -> Self {
        Self::BlogDetail(slug.to_string())
    }

    pub fn gallery_album(slug: &str) -> Self {
        Self::GalleryAlbum(slug.to_string())
    }

    /// Label for metrics and logs, e.g. `blog_list`.
    pub fn keyspace(&self) -> &'static str {
        match self {
            CacheKey::BlogList { .. } => "blog_list",
            CacheKey::BlogDetail(_) => "blog_detail",
            CacheKey::GalleryList => "gallery_list",
            CacheKey::GalleryAlbum(_) => "gallery_album",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::BlogList { category, tag } => write!(
                f,
                "blog:list:category:{}:tag:{}",
                category.as_deref().unwrap_or(RESERVED_FILTER_SLUG),
                tag.as_deref().unwrap_or(RESERVED_FILTER_SLUG)
            ),
            CacheKey::BlogDetail(slug) => write!(f, "blog:detail:{slug}"),
            CacheKey::GalleryList => f.write_str("gallery:list:all"),
            CacheKey::GalleryAlbum(slug) => write!(f, "gallery:album:{slug}:photos"),
        }
    }
}

/// Glob pattern covering a family of blog keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPattern {
    AllBlogLists,
    AllBlogDetails,
    BlogListsForCategory(String),
    BlogListsForTag(String),
}

impl KeyPattern {
    pub fn category(slug: &str) -> Self {
        Self::BlogListsForCategory(slug.to_string())
    }

    pub fn tag(slug: &str) -> Self {
        Self::BlogListsForTag(slug.to_string())
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPattern::AllBlogLists => f.write_str("blog:list:*"),
            KeyPattern::AllBlogDetails => f.write_str("blog:detail:*"),
            KeyPattern::BlogListsForCategory(slug) => {
                write!(f, "blog:list:category:{}:tag:*", escape(slug))
            }
            KeyPattern::BlogListsForTag(slug) => {
                write!(f, "blog:list:category:*:tag:{}", escape(slug))
            }
        }
    }
}
