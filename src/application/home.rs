//! Home page: latest posts and featured albums, read straight from the store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::application::blog::{PostSummary, category_refs, summarize_posts};
use crate::application::error::ReadError;
use crate::application::gallery::AlbumCard;
use crate::application::repos::{AlbumsRepo, CategoriesRepo, PostListFilter, PostsRepo, TagsRepo};

pub const LATEST_POSTS_LIMIT: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeBundle {
    pub latest_posts: Vec<PostSummary>,
    pub featured_albums: Vec<AlbumCard>,
}

#[derive(Clone)]
pub struct HomeService {
    posts: Arc<dyn PostsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    tags: Arc<dyn TagsRepo>,
    albums: Arc<dyn AlbumsRepo>,
}

impl HomeService {
    pub fn new<R>(repo: Arc<R>) -> Self
    where
        R: PostsRepo + CategoriesRepo + TagsRepo + AlbumsRepo + 'static,
    {
        Self {
            posts: repo.clone(),
            categories: repo.clone(),
            tags: repo.clone(),
            albums: repo,
        }
    }

    pub async fn home(&self) -> Result<HomeBundle, ReadError> {
        let posts = self
            .posts
            .list_published(PostListFilter {
                limit: Some(LATEST_POSTS_LIMIT),
                ..Default::default()
            })
            .await?;
        let categories = self.categories.list_categories().await?;
        let latest_posts =
            summarize_posts(self.tags.as_ref(), posts, &category_refs(&categories)).await?;
        let featured_albums = self
            .albums
            .list_featured()
            .await?
            .into_iter()
            .map(AlbumCard::from)
            .collect();

        Ok(HomeBundle {
            latest_posts,
            featured_albums,
        })
    }
}
