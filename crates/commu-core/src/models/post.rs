//! Posts, comments and like/bookmark outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelSummary, UserSummary};
use crate::types::{CommentId, PostId};

/// A post in a feed, channel or profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub author: UserSummary,
    #[serde(default)]
    pub channel: Option<ChannelSummary>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
    pub created_at: DateTime<Utc>,
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Server answer to a like or bookmark mutation.
///
/// The backend reports the relationship under a resource-specific name
/// (`isLiked`, `isBookmarked`) and, for likes, the new counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    #[serde(alias = "isLiked", alias = "isBookmarked", alias = "liked", alias = "bookmarked")]
    pub active: bool,
    #[serde(default, alias = "likeCount")]
    pub count: Option<u64>,
}
