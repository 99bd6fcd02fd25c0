//! Cache write events.
//!
//! A write service emits one event per changed record, carrying what the
//! cache needs to know about the record before and after the write.

use time::OffsetDateTime;
use uuid::Uuid;

/// Monotonic epoch for ordering events within this process.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier used to deduplicate events when merging a plan.
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Created,
    Updated,
    Deleted,
}

/// State of a record around a write: `before` is absent for creates and
/// `after` is absent for deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<S> {
    pub before: Option<S>,
    pub after: Option<S>,
}

impl<S> Change<S> {
    pub fn created(after: S) -> Self {
        Self {
            before: None,
            after: Some(after),
        }
    }

    pub fn updated(before: S, after: S) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(before: S) -> Self {
        Self {
            before: Some(before),
            after: None,
        }
    }

    pub fn operation(&self) -> Operation {
        match (&self.before, &self.after) {
            (None, _) => Operation::Created,
            (Some(_), Some(_)) => Operation::Updated,
            (Some(_), None) => Operation::Deleted,
        }
    }

    /// Every snapshot present, previous state first.
    pub fn snapshots(&self) -> impl Iterator<Item = &S> {
        self.before.iter().chain(self.after.iter())
    }
}

/// What cached bundles know about a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostSnapshot {
    pub slug: String,
    pub category_slug: Option<String>,
    pub tag_slugs: Vec<String>,
    /// Posts whose detail bundle lists this one as related.
    pub sibling_slugs: Vec<String>,
    /// Set when the associations could not be read; the category, tags and
    /// siblings above are then incomplete.
    pub partial: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySnapshot {
    pub slug: String,
    /// Posts whose detail bundle embeds this category.
    pub post_slugs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSnapshot {
    pub slug: String,
    /// Posts whose detail bundle embeds this tag.
    pub post_slugs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumSnapshot {
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoSnapshot {
    pub album_slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Post {
        post_id: Uuid,
        change: Change<PostSnapshot>,
    },
    Category {
        category_id: Uuid,
        change: Change<CategorySnapshot>,
    },
    Tag {
        tag_id: Uuid,
        change: Change<TagSnapshot>,
    },
    Album {
        album_id: Uuid,
        change: Change<AlbumSnapshot>,
    },
    Photo {
        photo_id: Uuid,
        change: Change<PhotoSnapshot>,
    },
}

impl EventKind {
    pub fn entity(&self) -> &'static str {
        match self {
            EventKind::Post { .. } => "post",
            EventKind::Category { .. } => "category",
            EventKind::Tag { .. } => "tag",
            EventKind::Album { .. } => "album",
            EventKind::Photo { .. } => "photo",
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            EventKind::Post { post_id, .. } => *post_id,
            EventKind::Category { category_id, .. } => *category_id,
            EventKind::Tag { tag_id, .. } => *tag_id,
            EventKind::Album { album_id, .. } => *album_id,
            EventKind::Photo { photo_id, .. } => *photo_id,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            EventKind::Post { change, .. } => change.operation(),
            EventKind::Category { change, .. } => change.operation(),
            EventKind::Tag { change, .. } => change.operation(),
            EventKind::Album { change, .. } => change.operation(),
            EventKind::Photo { change, .. } => change.operation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_reports_operation() {
        let slug = |s: &str| AlbumSnapshot { slug: s.into() };
        assert_eq!(Change::created(slug("a")).operation(), Operation::Created);
        assert_eq!(
            Change::updated(slug("a"), slug("b")).operation(),
            Operation::Updated
        );
        assert_eq!(Change::deleted(slug("a")).operation(), Operation::Deleted);
    }

    #[test]
    fn snapshots_yield_previous_state_first() {
        let change = Change::updated(
            AlbumSnapshot { slug: "old".into() },
            AlbumSnapshot { slug: "new".into() },
        );
        let slugs: Vec<_> = change.snapshots().map(|s| s.slug.as_str()).collect();
        assert_eq!(slugs, ["old", "new"]);
    }

    #[test]
    fn event_creation() {
        let kind = EventKind::Photo {
            photo_id: Uuid::nil(),
            change: Change::created(PhotoSnapshot {
                album_slug: "west-lake".into(),
            }),
        };
        let event = CacheEvent::new(kind.clone(), 42);

        assert_eq!(event.epoch, 42);
        assert_eq!(event.kind, kind);
        assert_eq!(event.kind.entity(), "photo");
        assert!(!event.id.is_nil());
    }
}
