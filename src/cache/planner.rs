//! Invalidation plan generation.
//!
//! Merges write events into the set of exact keys and glob patterns that
//! must be removed before the write returns.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use super::events::{CacheEvent, EventKind};
use super::keys::{CacheKey, KeyPattern};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub delete_keys: BTreeSet<CacheKey>,
    pub delete_patterns: BTreeSet<KeyPattern>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ keys: {}, patterns: {} }}",
            self.delete_keys.len(),
            self.delete_patterns.len()
        )
    }
}

impl InvalidationPlan {
    /// Merge events into a deduplicated plan. Both the previous and the new
    /// snapshot of each record contribute keys.
    pub fn from_events(events: &[CacheEvent]) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();

        for event in events.iter().filter(|e| seen_ids.insert(e.id)) {
            match &event.kind {
                EventKind::Post { change, .. } => {
                    plan.delete_patterns.insert(KeyPattern::AllBlogLists);
                    for snapshot in change.snapshots() {
                        if snapshot.partial {
                            plan.delete_patterns.insert(KeyPattern::AllBlogDetails);
                        }
                        plan.delete_keys.insert(CacheKey::blog_detail(&snapshot.slug));
                        for sibling in &snapshot.sibling_slugs {
                            plan.delete_keys.insert(CacheKey::blog_detail(sibling));
                        }
                        if let Some(category) = &snapshot.category_slug {
                            plan.delete_patterns.insert(KeyPattern::category(category));
                        }
                        for tag in &snapshot.tag_slugs {
                            plan.delete_patterns.insert(KeyPattern::tag(tag));
                        }
                    }
                }
                EventKind::Category { change, .. } => {
                    plan.delete_patterns.insert(KeyPattern::AllBlogLists);
                    for snapshot in change.snapshots() {
                        plan.delete_patterns
                            .insert(KeyPattern::category(&snapshot.slug));
                        plan.add_post_details(&snapshot.post_slugs);
                    }
                }
                EventKind::Tag { change, .. } => {
                    plan.delete_patterns.insert(KeyPattern::AllBlogLists);
                    for snapshot in change.snapshots() {
                        plan.delete_patterns.insert(KeyPattern::tag(&snapshot.slug));
                        plan.add_post_details(&snapshot.post_slugs);
                    }
                }
                EventKind::Album { change, .. } => {
                    plan.delete_keys.insert(CacheKey::GalleryList);
                    for snapshot in change.snapshots() {
                        plan.delete_keys
                            .insert(CacheKey::gallery_album(&snapshot.slug));
                    }
                }
                EventKind::Photo { change, .. } => {
                    plan.delete_keys.insert(CacheKey::GalleryList);
                    for snapshot in change.snapshots() {
                        plan.delete_keys
                            .insert(CacheKey::gallery_album(&snapshot.album_slug));
                    }
                }
            }
        }

        plan
    }

    fn add_post_details(&mut self, slugs: &[String]) {
        self.delete_keys
            .extend(slugs.iter().map(|slug| CacheKey::blog_detail(slug)));
    }

    pub fn is_empty(&self) -> bool {
        self.delete_keys.is_empty() && self.delete_patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.delete_keys.len() + self.delete_patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::cache::events::{
        AlbumSnapshot, CategorySnapshot, Change, PhotoSnapshot, PostSnapshot, TagSnapshot,
    };

    fn post(slug: &str, category: Option<&str>, tags: &[&str]) -> PostSnapshot {
        PostSnapshot {
            slug: slug.into(),
            category_slug: category.map(Into::into),
            tag_slugs: tags.iter().map(|t| t.to_string()).collect(),
            sibling_slugs: Vec::new(),
            partial: false,
        }
    }

    fn plan_for(kind: EventKind) -> InvalidationPlan {
        InvalidationPlan::from_events(&[CacheEvent::new(kind, 0)])
    }

    #[test]
    fn post_write_covers_detail_lists_category_and_tags() {
        let plan = plan_for(EventKind::Post {
            post_id: Uuid::new_v4(),
            change: Change::created(post(
                "spring-west-lake",
                Some("landscape"),
                &["fengguang", "renxiang"],
            )),
        });

        assert!(plan
            .delete_keys
            .contains(&CacheKey::blog_detail("spring-west-lake")));
        assert!(plan.delete_patterns.contains(&KeyPattern::AllBlogLists));
        assert!(plan.delete_patterns.contains(&KeyPattern::category("landscape")));
        assert!(plan.delete_patterns.contains(&KeyPattern::tag("fengguang")));
        assert!(plan.delete_patterns.contains(&KeyPattern::tag("renxiang")));
    }

    #[test]
    fn post_update_covers_previous_and_new_state() {
        let mut before = post("old-slug", Some("landscape"), &["heibai"]);
        before.sibling_slugs = vec!["huangshan-cloud-sea".into()];
        let after = post("new-slug", Some("essay"), &["jiaopian"]);

        let plan = plan_for(EventKind::Post {
            post_id: Uuid::new_v4(),
            change: Change::updated(before, after),
        });

        for slug in ["old-slug", "new-slug", "huangshan-cloud-sea"] {
            assert!(plan.delete_keys.contains(&CacheKey::blog_detail(slug)), "{slug}");
        }
        for pattern in [
            KeyPattern::category("landscape"),
            KeyPattern::category("essay"),
            KeyPattern::tag("heibai"),
            KeyPattern::tag("jiaopian"),
        ] {
            assert!(plan.delete_patterns.contains(&pattern), "{pattern}");
        }
    }

    #[test]
    fn partial_post_snapshot_purges_every_detail() {
        let before = post("spring-west-lake", Some("landscape"), &["fengguang"]);
        let after = PostSnapshot {
            partial: true,
            ..post("spring-west-lake", None, &[])
        };

        let plan = plan_for(EventKind::Post {
            post_id: Uuid::new_v4(),
            change: Change::updated(before, after),
        });

        assert!(plan.delete_patterns.contains(&KeyPattern::AllBlogDetails));
        assert!(plan.delete_patterns.contains(&KeyPattern::AllBlogLists));
        assert!(plan.delete_patterns.contains(&KeyPattern::category("landscape")));
    }

    #[test]
    fn uncategorized_post_adds_no_category_pattern() {
        let plan = plan_for(EventKind::Post {
            post_id: Uuid::new_v4(),
            change: Change::deleted(post("loose", None, &[])),
        });
        assert_eq!(
            plan.delete_patterns.iter().collect::<Vec<_>>(),
            vec![&KeyPattern::AllBlogLists]
        );
    }

    #[test]
    fn category_and_tag_writes_purge_lists_and_embedding_details() {
        let plan = plan_for(EventKind::Category {
            category_id: Uuid::new_v4(),
            change: Change::deleted(CategorySnapshot {
                slug: "landscape".into(),
                post_slugs: vec!["spring-west-lake".into()],
            }),
        });
        assert!(plan.delete_patterns.contains(&KeyPattern::category("landscape")));
        assert!(plan.delete_patterns.contains(&KeyPattern::AllBlogLists));
        assert!(plan
            .delete_keys
            .contains(&CacheKey::blog_detail("spring-west-lake")));

        let plan = plan_for(EventKind::Tag {
            tag_id: Uuid::new_v4(),
            change: Change::created(TagSnapshot {
                slug: "heibai".into(),
                post_slugs: Vec::new(),
            }),
        });
        assert!(plan.delete_patterns.contains(&KeyPattern::tag("heibai")));
        assert!(plan.delete_keys.is_empty());
    }

    #[test]
    fn gallery_writes_touch_album_and_list_keys() {
        let plan = plan_for(EventKind::Album {
            album_id: Uuid::new_v4(),
            change: Change::updated(
                AlbumSnapshot { slug: "west-lake".into() },
                AlbumSnapshot { slug: "xi-hu".into() },
            ),
        });
        assert_eq!(plan.delete_keys.len(), 3);
        assert!(plan.delete_keys.contains(&CacheKey::GalleryList));
        assert!(plan.delete_patterns.is_empty());

        let plan = plan_for(EventKind::Photo {
            photo_id: Uuid::new_v4(),
            change: Change::deleted(PhotoSnapshot {
                album_slug: "mountains".into(),
            }),
        });
        assert!(plan.delete_keys.contains(&CacheKey::gallery_album("mountains")));
        assert!(plan.delete_keys.contains(&CacheKey::GalleryList));
    }

    #[test]
    fn dedupe_by_event_id() {
        let event = CacheEvent::new(
            EventKind::Album {
                album_id: Uuid::new_v4(),
                change: Change::created(AlbumSnapshot { slug: "a".into() }),
            },
            0,
        );
        let plan = InvalidationPlan::from_events(&[event.clone(), event]);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn display_and_is_empty() {
        let plan = InvalidationPlan::default();
        assert!(plan.is_empty());
        assert_eq!(plan.to_string(), "InvalidationPlan { keys: 0, patterns: 0 }");
    }
}
