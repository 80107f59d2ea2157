//! Pagination metadata, page requests and post collection filters.

use serde::{Deserialize, Serialize};

use crate::error::{Error, InvalidInputError};
use crate::types::{ChannelSlug, Username};

/// Largest page size the backend serves.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    /// Opaque continuation token for cursor requests.
    pub next_cursor: Option<String>,
}

/// One fetched slice of a collection.
///
/// Item order is the server's; nothing in the client reorders it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Page<T> {
    /// A page with no items and nothing after it.
    pub fn empty(page: u32, limit: u32) -> Self {
        Self {
            items: Vec::new(),
            meta: PaginationMeta {
                page,
                limit,
                ..PaginationMeta::default()
            },
        }
    }

    /// Build a page from a response, synthesizing metadata the server left out.
    pub fn from_response(items: Vec<T>, meta: Option<PaginationMeta>, request: &PageRequest) -> Self {
        let meta = meta.unwrap_or_else(|| {
            let page = match request {
                PageRequest::Offset { page, .. } => *page,
                PageRequest::Cursor { .. } => 0,
            };
            PaginationMeta {
                page,
                limit: request.limit(),
                total: items.len() as u64,
                total_pages: u32::from(!items.is_empty()),
                ..PaginationMeta::default()
            }
        });

        if items.is_empty() {
            // An empty slice never advertises a continuation.
            return Self {
                items,
                meta: PaginationMeta {
                    has_next_page: false,
                    next_cursor: None,
                    ..meta
                },
            };
        }

        Self { items, meta }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next_page(&self) -> bool {
        self.meta.has_next_page
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.meta.next_cursor.as_deref()
    }
}

/// How a page is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageRequest {
    /// Discrete page index, starting at 1.
    Offset { page: u32, limit: u32 },
    /// Continuation token; `None` requests the first page.
    Cursor { cursor: Option<String>, limit: u32 },
}

impl PageRequest {
    /// Request a page by index.
    pub fn offset(page: u32, limit: u32) -> Result<Self, Error> {
        if page == 0 {
            return Err(InvalidInputError::Page.into());
        }
        validate_limit(limit)?;
        Ok(PageRequest::Offset { page, limit })
    }

    /// Request the page following `cursor`.
    pub fn cursor(cursor: Option<String>, limit: u32) -> Result<Self, Error> {
        validate_limit(limit)?;
        Ok(PageRequest::Cursor { cursor, limit })
    }

    pub fn limit(&self) -> u32 {
        match self {
            PageRequest::Offset { limit, .. } | PageRequest::Cursor { limit, .. } => *limit,
        }
    }

    /// Query-string parameters for this request.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            PageRequest::Offset { page, limit } => {
                vec![("page", page.to_string()), ("limit", limit.to_string())]
            }
            PageRequest::Cursor { cursor, limit } => {
                let mut pairs = vec![("limit", limit.to_string())];
                if let Some(cursor) = cursor {
                    pairs.push(("cursor", cursor.clone()));
                }
                pairs
            }
        }
    }

    /// Cache key segments identifying this slice.
    pub fn key_parts(&self) -> Vec<String> {
        match self {
            PageRequest::Offset { page, limit } => {
                vec![format!("page={}", page), format!("limit={}", limit)]
            }
            PageRequest::Cursor { cursor, limit } => vec![
                format!("cursor={}", cursor.as_deref().unwrap_or("-")),
                format!("limit={}", limit),
            ],
        }
    }
}

fn validate_limit(limit: u32) -> Result<(), Error> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(InvalidInputError::Limit {
            limit,
            max: MAX_PAGE_LIMIT,
        }
        .into());
    }
    Ok(())
}

/// Sort order of a post collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Latest,
    Popular,
    Comments,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Latest => "latest",
            SortOrder::Popular => "popular",
            SortOrder::Comments => "comments",
        }
    }
}

/// Which post collection is being listed.
///
/// The "my activity" pages are scopes of the same collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum PostScope {
    /// The global feed.
    #[default]
    Feed,
    Channel(ChannelSlug),
    Author(Username),
    Tag(String),
    Search(String),
    MyPosts,
    MyLikes,
    MyBookmarks,
}

impl PostScope {
    /// Whether listing this scope needs an authenticated session.
    pub fn requires_auth(&self) -> bool {
        matches!(self, PostScope::MyPosts | PostScope::MyLikes | PostScope::MyBookmarks)
    }

    fn key_part(&self) -> String {
        match self {
            PostScope::Feed => "feed".to_string(),
            PostScope::Channel(slug) => format!("channel={}", slug),
            PostScope::Author(user) => format!("author={}", user),
            PostScope::Tag(tag) => format!("tag={}", tag),
            PostScope::Search(text) => format!("q={}", text),
            PostScope::MyPosts => "mine=posts".to_string(),
            PostScope::MyLikes => "mine=likes".to_string(),
            PostScope::MyBookmarks => "mine=bookmarks".to_string(),
        }
    }
}

/// Filters of a post listing. Changing them addresses a different collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PostFilters {
    pub scope: PostScope,
    pub sort: SortOrder,
}

impl PostFilters {
    pub fn new(scope: PostScope, sort: SortOrder) -> Self {
        Self { scope, sort }
    }

    /// Stable cache key segments for these filters.
    pub fn key_parts(&self) -> Vec<String> {
        vec![self.scope.key_part(), format!("sort={}", self.sort.as_str())]
    }
}
