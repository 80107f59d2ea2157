//! Remote API trait.

use async_trait::async_trait;

use crate::models::{AuthSession, Channel, Comment, Post, Tag, ToggleOutcome, UserProfile};
use crate::page::{Page, PageRequest, PostFilters};
use crate::types::{PostId, Username};
use crate::{Credentials, Result};

/// The Commu REST API as the data layer consumes it.
///
/// Implementations return decoded envelopes: a `success: false` response or
/// a non-success status is an `Err`, never a value.
#[async_trait]
pub trait Api: Send + Sync + 'static {
    /// Authenticate and open a session.
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession>;

    /// Profile of the authenticated user.
    async fn me(&self) -> Result<UserProfile>;

    /// List posts in a scope.
    async fn list_posts(&self, filters: &PostFilters, request: PageRequest) -> Result<Page<Post>>;

    async fn get_post(&self, id: &PostId) -> Result<Post>;

    /// List the comments of a post, oldest first.
    async fn list_comments(&self, post: &PostId, request: PageRequest) -> Result<Page<Comment>>;

    async fn create_comment(&self, post: &PostId, content: &str) -> Result<Comment>;

    /// Like (`true`) or unlike (`false`) a post.
    async fn set_like(&self, post: &PostId, liked: bool) -> Result<ToggleOutcome>;

    /// Bookmark (`true`) or remove the bookmark (`false`) of a post.
    async fn set_bookmark(&self, post: &PostId, bookmarked: bool) -> Result<ToggleOutcome>;

    async fn list_channels(&self) -> Result<Vec<Channel>>;

    async fn get_user(&self, username: &Username) -> Result<UserProfile>;

    /// Tags whose name matches `query`.
    async fn search_tags(&self, query: &str, limit: u32) -> Result<Vec<Tag>>;

    /// Most used tags, shown before the user types.
    async fn popular_tags(&self, limit: u32) -> Result<Vec<Tag>>;
}
