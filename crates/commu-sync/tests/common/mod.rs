//! In-memory `Api` used by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use commu_core::error::{AuthError, TransportError};
use commu_core::{
    Api, AuthSession, Channel, ChannelSlug, ChannelSummary, Comment, Credentials, Error, Page,
    PageRequest, PaginationMeta, Post, PostFilters, PostId, PostScope, Result, SortOrder, Tag,
    ToggleOutcome, UserProfile, UserSummary, Username,
};

pub fn post(id: u32, channel: &str, tags: &[&str], like_count: u64) -> Post {
    Post {
        id: PostId::new(id.to_string()).unwrap(),
        title: format!("Post {}", id),
        content: String::new(),
        author: UserSummary {
            username: Username::new(if id % 2 == 0 { "alice" } else { "bob" }).unwrap(),
            display_name: None,
            avatar_url: None,
        },
        channel: Some(ChannelSummary {
            slug: ChannelSlug::new(channel).unwrap(),
            name: channel.to_string(),
        }),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        like_count,
        comment_count: 0,
        is_liked: false,
        is_bookmarked: false,
        created_at: Utc.timestamp_opt(1_700_000_000 - id as i64 * 60, 0).unwrap(),
    }
}

pub fn tag(name: &str, post_count: u64) -> Tag {
    Tag {
        name: name.to_string(),
        post_count,
    }
}

pub fn ids(posts: &[Post]) -> Vec<String> {
    posts.iter().map(|post| post.id.to_string()).collect()
}

/// Server double: fixed data, per-call latency, failure injection and a
/// log of every call.
pub struct FakeApi {
    posts: Vec<Post>,
    tags: Mutex<Vec<Tag>>,
    latency: Duration,
    search_delays: Mutex<HashMap<String, Duration>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    /// 23 posts across two channels and a handful of tags.
    pub fn new() -> Self {
        let posts = (1..=23)
            .map(|id| {
                let channel = if id % 3 == 0 { "rust" } else { "general" };
                let tags: &[&str] = if id % 4 == 0 { &["async"] } else { &[] };
                post(id, channel, tags, (id as u64 * 7) % 11)
            })
            .collect();
        let tags = vec![
            tag("rust", 40),
            tag("async", 12),
            tag("abc", 3),
            tag("abstract", 2),
            tag("tokio", 9),
        ];
        Self {
            posts,
            tags: Mutex::new(tags),
            latency: Duration::ZERO,
            search_delays: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_posts(mut self, posts: Vec<Post>) -> Self {
        self.posts = posts;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make `search_tags(query)` take `delay`.
    pub fn delay_search(&self, query: &str, delay: Duration) {
        self.search_delays
            .lock()
            .unwrap()
            .insert(query.to_string(), delay);
    }

    /// Add a tag on the server side.
    pub fn add_tag(&self, tag: Tag) {
        self.tags.lock().unwrap().push(tag);
    }

    /// Make every call of `operation` fail with a transport error.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls whose log line starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn all_posts(&self) -> &[Post] {
        &self.posts
    }

    async fn enter(&self, operation: &'static str, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        tokio::time::sleep(self.latency).await;
        if self.failing.lock().unwrap().contains(operation) {
            return Err(TransportError::Connection {
                message: format!("{} unavailable", operation),
            }
            .into());
        }
        Ok(())
    }

    fn matching(&self, filters: &PostFilters) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|post| match &filters.scope {
                PostScope::Channel(slug) => post.channel.as_ref().is_some_and(|c| &c.slug == slug),
                PostScope::Author(name) => &post.author.username == name,
                PostScope::Tag(tag) => post.tags.contains(tag),
                PostScope::Search(text) => post.title.contains(text.as_str()),
                _ => true,
            })
            .cloned()
            .collect();
        if filters.sort == SortOrder::Popular {
            posts.sort_by(|a, b| b.like_count.cmp(&a.like_count));
        }
        posts
    }
}

/// Slice `all` the way the backend does: `page` or an offset cursor.
pub fn paginate<T: Clone>(all: &[T], request: &PageRequest) -> Page<T> {
    let limit = request.limit() as usize;
    let offset = match request {
        PageRequest::Offset { page, .. } => (*page as usize - 1) * limit,
        PageRequest::Cursor { cursor, .. } => {
            cursor.as_deref().map_or(0, |cursor| cursor.parse().unwrap())
        }
    };
    let items: Vec<T> = all.iter().skip(offset).take(limit).cloned().collect();
    let end = offset + items.len();
    let meta = PaginationMeta {
        page: (offset / limit) as u32 + 1,
        limit: limit as u32,
        total: all.len() as u64,
        total_pages: all.len().div_ceil(limit) as u32,
        has_next_page: end < all.len(),
        has_previous_page: offset > 0,
        next_cursor: (end < all.len()).then(|| end.to_string()),
    };
    Page::from_response(items, Some(meta), request)
}

#[async_trait]
impl Api for FakeApi {
    async fn login(&self, _credentials: &Credentials) -> Result<AuthSession> {
        self.enter("login", "login".to_string()).await?;
        Err(AuthError::InvalidCredentials("no accounts".to_string()).into())
    }

    async fn me(&self) -> Result<UserProfile> {
        self.enter("me", "me".to_string()).await?;
        Err(AuthError::NotLoggedIn.into())
    }

    async fn list_posts(&self, filters: &PostFilters, request: PageRequest) -> Result<Page<Post>> {
        let call = format!("list_posts:{}:{}", filters.key_parts().join(":"), request.key_parts().join(":"));
        self.enter("list_posts", call).await?;
        Ok(paginate(&self.matching(filters), &request))
    }

    async fn get_post(&self, id: &PostId) -> Result<Post> {
        self.enter("get_post", format!("get_post:{}", id)).await?;
        self.posts
            .iter()
            .find(|post| &post.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("post {}", id)))
    }

    async fn list_comments(&self, post: &PostId, request: PageRequest) -> Result<Page<Comment>> {
        self.enter("list_comments", format!("list_comments:{}", post)).await?;
        Ok(paginate::<Comment>(&[], &request))
    }

    async fn create_comment(&self, post: &PostId, _content: &str) -> Result<Comment> {
        self.enter("create_comment", format!("create_comment:{}", post)).await?;
        Err(AuthError::NotLoggedIn.into())
    }

    async fn set_like(&self, post: &PostId, liked: bool) -> Result<ToggleOutcome> {
        self.enter("set_like", format!("set_like:{}:{}", post, liked)).await?;
        let base = self.get_like_count(post);
        Ok(ToggleOutcome {
            active: liked,
            count: Some(base + liked as u64),
        })
    }

    async fn set_bookmark(&self, post: &PostId, bookmarked: bool) -> Result<ToggleOutcome> {
        self.enter("set_bookmark", format!("set_bookmark:{}:{}", post, bookmarked))
            .await?;
        Ok(ToggleOutcome {
            active: bookmarked,
            count: None,
        })
    }

    async fn list_channels(&self) -> Result<Vec<Channel>> {
        self.enter("list_channels", "list_channels".to_string()).await?;
        Ok(Vec::new())
    }

    async fn get_user(&self, username: &Username) -> Result<UserProfile> {
        self.enter("get_user", format!("get_user:{}", username)).await?;
        Err(Error::not_found(format!("user {}", username)))
    }

    async fn search_tags(&self, query: &str, limit: u32) -> Result<Vec<Tag>> {
        let delay = self.search_delays.lock().unwrap().get(query).copied();
        self.enter("search_tags", format!("search_tags:{}", query)).await?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .tags
            .lock()
            .unwrap()
            .iter()
            .filter(|tag| tag.name.starts_with(query))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn popular_tags(&self, limit: u32) -> Result<Vec<Tag>> {
        self.enter("popular_tags", "popular_tags".to_string()).await?;
        let mut tags = self.tags.lock().unwrap().clone();
        tags.sort_by(|a, b| b.post_count.cmp(&a.post_count));
        tags.truncate(limit as usize);
        Ok(tags)
    }
}

impl FakeApi {
    fn get_like_count(&self, post: &PostId) -> u64 {
        self.posts
            .iter()
            .find(|candidate| &candidate.id == post)
            .map_or(0, |post| post.like_count)
    }
}
