//! One collection, two retrieval disciplines.
//!
//! A [`PageSource`] loads slices of a filtered collection. On top of it:
//!
//! - [`PagedQuery`] fetches discrete, page-indexed slices (desktop).
//! - [`InfiniteQuery`] chains cursor pages into one growing list
//!   (mobile / infinite scroll).
//! - [`Feed`] holds both and lets an external viewport classifier pick which
//!   one is active; the inactive one refuses to fetch.
//!
//! Both disciplines go through the [`QueryCache`] and share the key
//! namespace `resource:filters:...`, so invalidating `resource` or
//! `resource:filters` covers every page of either kind.

mod discrete;
mod feed;
mod infinite;
mod source;

pub use discrete::PagedQuery;
pub use feed::{Feed, FeedConfig, FeedState, FetchMode, ViewportClass};
pub use infinite::{FetchNext, InfiniteQuery};
pub use source::{CommentSource, PostSource};

use std::sync::Arc;

use async_trait::async_trait;

use commu_core::{Page, PageRequest, Result};

use crate::cache::{QueryCache, QueryKey};

/// A paginated collection on the server.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    /// Element of the collection.
    type Item: Send + Sync + 'static;
    /// What selects and orders the collection.
    type Filters: Clone + PartialEq + Send + Sync + 'static;

    /// Cache key of the whole collection for `filters` (`resource:filters`).
    fn key(&self, filters: &Self::Filters) -> QueryKey;

    /// Load one slice.
    async fn load(&self, filters: &Self::Filters, request: PageRequest) -> Result<Page<Self::Item>>;
}

/// Cache key of one slice: `resource:filters:page-or-cursor:limit`.
pub(crate) fn page_key<S: PageSource>(source: &S, filters: &S::Filters, request: &PageRequest) -> QueryKey {
    source.key(filters).with_all(request.key_parts())
}

/// Fetch one slice of `source` through `cache`.
///
/// With `fresh` the slice is reloaded even when cached.
pub(crate) async fn fetch_page<S: PageSource>(
    cache: &QueryCache,
    source: &Arc<S>,
    filters: &S::Filters,
    request: PageRequest,
    fresh: bool,
) -> Result<Arc<Page<S::Item>>> {
    let key = page_key(source.as_ref(), filters, &request);
    let source = Arc::clone(source);
    let filters = filters.clone();

    let loader = move || {
        let source = Arc::clone(&source);
        let filters = filters.clone();
        let request = request.clone();
        async move { source.load(&filters, request).await }
    };
    if fresh {
        cache.fetch_fresh(key, loader).await
    } else {
        cache.fetch(key, loader).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory page source for adapter tests.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use commu_core::{PaginationMeta, error::TransportError};

    use super::*;

    /// Serves numbered collections keyed by a label, taking `delay` per call.
    pub struct NumberSource {
        pub collections: Mutex<HashMap<String, Vec<u32>>>,
        pub delay: Duration,
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    impl NumberSource {
        pub fn new(collections: &[(&str, Vec<u32>)]) -> Self {
            Self {
                collections: Mutex::new(
                    collections
                        .iter()
                        .map(|(label, items)| (label.to_string(), items.clone()))
                        .collect(),
                ),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        /// Replace the server-side contents of collection `label`.
        pub fn set(&self, label: &str, items: Vec<u32>) {
            self.collections.lock().unwrap().insert(label.to_string(), items);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource for NumberSource {
        type Item = u32;
        type Filters = String;

        fn key(&self, filters: &String) -> QueryKey {
            QueryKey::new("numbers").with(filters.clone())
        }

        async fn load(&self, filters: &String, request: PageRequest) -> Result<Page<u32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(TransportError::Connection {
                    message: "connection reset".to_string(),
                }
                .into());
            }

            let all = self.collections.lock().unwrap().get(filters).cloned().unwrap_or_default();
            let limit = request.limit() as usize;
            let (page, offset) = match &request {
                PageRequest::Offset { page, .. } => (*page, (*page as usize - 1) * limit),
                PageRequest::Cursor { cursor, .. } => {
                    let offset = cursor.as_deref().map_or(0, |c| c.parse().unwrap());
                    ((offset / limit) as u32 + 1, offset)
                }
            };

            let items: Vec<u32> = all.iter().skip(offset).take(limit).copied().collect();
            let end = offset + items.len();
            let total_pages = all.len().div_ceil(limit) as u32;
            let meta = PaginationMeta {
                page,
                limit: limit as u32,
                total: all.len() as u64,
                total_pages,
                has_next_page: end < all.len(),
                has_previous_page: offset > 0,
                next_cursor: (end < all.len()).then(|| end.to_string()),
            };

            Ok(Page::from_response(items, Some(meta), &request))
        }
    }
}
