//! Page sources backed by the remote API.

use std::sync::Arc;

use async_trait::async_trait;

use commu_core::{Api, Comment, Page, PageRequest, Post, PostFilters, PostId, Result};

use super::PageSource;
use crate::cache::QueryKey;

/// Posts of a feed, channel, profile, tag, search or "my activity" scope.
pub struct PostSource<A> {
    api: Arc<A>,
}

impl<A: Api> PostSource<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Key prefix of every post listing.
    pub fn resource_key() -> QueryKey {
        QueryKey::new("posts")
    }
}

#[async_trait]
impl<A: Api> PageSource for PostSource<A> {
    type Item = Post;
    type Filters = PostFilters;

    fn key(&self, filters: &PostFilters) -> QueryKey {
        Self::resource_key().with_all(filters.key_parts())
    }

    async fn load(&self, filters: &PostFilters, request: PageRequest) -> Result<Page<Post>> {
        self.api.list_posts(filters, request).await
    }
}

/// Comments of one post.
pub struct CommentSource<A> {
    api: Arc<A>,
}

impl<A: Api> CommentSource<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: Api> PageSource for CommentSource<A> {
    type Item = Comment;
    type Filters = PostId;

    fn key(&self, post: &PostId) -> QueryKey {
        QueryKey::new("comments").with(format!("post={}", post))
    }

    async fn load(&self, post: &PostId, request: PageRequest) -> Result<Page<Comment>> {
        self.api.list_comments(post, request).await
    }
}
