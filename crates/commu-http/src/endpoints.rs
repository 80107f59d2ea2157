//! Endpoint paths and request bodies of the Commu REST API.

use serde::Serialize;

use commu_core::{PageRequest, PostFilters, PostId, PostScope, Username};

// ============================================================================
// Endpoint Paths
// ============================================================================

pub const LOGIN: &str = "auth/login";

pub const ME: &str = "auth/me";

pub const POSTS: &str = "posts";

pub const CHANNELS: &str = "channels";

pub const TAG_SEARCH: &str = "tags/search";

pub const POPULAR_TAGS: &str = "tags/popular";

/// Collection path of a post listing.
pub fn posts_path(scope: &PostScope) -> String {
    match scope {
        PostScope::Channel(slug) => format!("channels/{}/posts", slug),
        PostScope::Author(username) => format!("users/{}/posts", username),
        PostScope::MyPosts => "users/me/posts".to_string(),
        PostScope::MyLikes => "users/me/likes".to_string(),
        PostScope::MyBookmarks => "users/me/bookmarks".to_string(),
        PostScope::Feed | PostScope::Tag(_) | PostScope::Search(_) => POSTS.to_string(),
    }
}

/// Query parameters of a post listing.
pub fn posts_query(filters: &PostFilters, request: &PageRequest) -> Vec<(&'static str, String)> {
    let mut query = request.query_pairs();
    query.push(("sort", filters.sort.as_str().to_string()));
    match &filters.scope {
        PostScope::Tag(tag) => query.push(("tag", tag.clone())),
        PostScope::Search(text) => query.push(("q", text.clone())),
        _ => {}
    }
    query
}

pub fn post_path(id: &PostId) -> String {
    format!("posts/{}", id)
}

pub fn comments_path(id: &PostId) -> String {
    format!("posts/{}/comments", id)
}

pub fn like_path(id: &PostId) -> String {
    format!("posts/{}/like", id)
}

pub fn bookmark_path(id: &PostId) -> String {
    format!("posts/{}/bookmark", id)
}

pub fn user_path(username: &Username) -> String {
    format!("users/{}", username)
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for login.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Request body for creating a comment.
#[derive(Debug, Serialize)]
pub struct CreateCommentRequest<'a> {
    pub content: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use commu_core::{ChannelSlug, SortOrder};

    #[test]
    fn scope_paths() {
        let rust = PostScope::Channel(ChannelSlug::new("rust").unwrap());
        assert_eq!(posts_path(&rust), "channels/rust/posts");
        let alice = PostScope::Author(Username::new("alice").unwrap());
        assert_eq!(posts_path(&alice), "users/alice/posts");
        assert_eq!(posts_path(&PostScope::MyLikes), "users/me/likes");
        assert_eq!(posts_path(&PostScope::Tag("async".into())), "posts");
    }

    #[test]
    fn listing_query() {
        let filters = PostFilters::new(PostScope::Search("tokio".into()), SortOrder::Popular);
        let request = PageRequest::offset(2, 20).unwrap();
        assert_eq!(
            posts_query(&filters, &request),
            vec![
                ("page", "2".to_string()),
                ("limit", "20".to_string()),
                ("sort", "popular".to_string()),
                ("q", "tokio".to_string()),
            ]
        );
    }
}
