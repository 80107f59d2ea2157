//! Page-indexed retrieval.

use std::sync::{Arc, Mutex};

use tracing::debug;

use commu_core::{Error, Page, PageRequest, PaginationMeta, Result};

use super::{PageSource, fetch_page, page_key};
use crate::cache::{QueryCache, Subscription};
use crate::lock;

struct PagedState<S: PageSource> {
    filters: S::Filters,
    page: u32,
    limit: u32,
    epoch: u64,
    current: Option<Arc<Page<S::Item>>>,
    /// Keeps the displayed page cached and revalidated while shown.
    subscription: Option<Subscription>,
    loading: bool,
    error: Option<Error>,
}

impl<S: PageSource> PagedState<S> {
    /// The displayed page, as last written to the cache.
    fn displayed(&self) -> Option<Arc<Page<S::Item>>> {
        self.subscription
            .as_ref()
            .and_then(Subscription::entry)
            .and_then(|entry| entry.data::<Page<S::Item>>())
            .or_else(|| self.current.clone())
    }

    fn clear(&mut self) {
        self.page = 1;
        self.epoch += 1;
        self.current = None;
        self.subscription = None;
        self.loading = false;
        self.error = None;
    }
}

/// Discrete pagination over a [`PageSource`].
///
/// Changing the filters or the page size goes back to page 1 and forgets the
/// displayed page; a fetch that settles after such a change still returns
/// its page to the caller but is not displayed.
///
/// The displayed page stays subscribed in the cache, so invalidating its key
/// refetches it and [`current`](Self::current) shows the new contents.
pub struct PagedQuery<S: PageSource> {
    cache: QueryCache,
    source: Arc<S>,
    state: Mutex<PagedState<S>>,
}

impl<S: PageSource> PagedQuery<S> {
    pub fn new(cache: QueryCache, source: S, filters: S::Filters, limit: u32) -> Self {
        Self::with_source(cache, Arc::new(source), filters, limit)
    }

    /// Create a query over a shared source.
    pub fn with_source(cache: QueryCache, source: Arc<S>, filters: S::Filters, limit: u32) -> Self {
        Self {
            cache,
            source,
            state: Mutex::new(PagedState {
                filters,
                page: 1,
                limit,
                epoch: 0,
                current: None,
                subscription: None,
                loading: false,
                error: None,
            }),
        }
    }

    /// Fetch `page` under the current filters and display it.
    pub async fn fetch(&self, page: u32) -> Result<Arc<Page<S::Item>>> {
        self.load(page, false).await
    }

    /// Reload the current page from the server.
    pub async fn refresh(&self) -> Result<Arc<Page<S::Item>>> {
        let page = self.page();
        self.load(page, true).await
    }

    async fn load(&self, page: u32, fresh: bool) -> Result<Arc<Page<S::Item>>> {
        let (request, filters, epoch) = {
            let mut state = lock(&self.state);
            let request = PageRequest::offset(page, state.limit)?;
            state.page = page;
            state.loading = true;
            (request, state.filters.clone(), state.epoch)
        };

        let key = page_key(self.source.as_ref(), &filters, &request);
        let result = fetch_page(&self.cache, &self.source, &filters, request, fresh).await;

        let mut state = lock(&self.state);
        if state.epoch != epoch || state.page != page {
            debug!(page, "page settled after inputs changed, not displaying it");
            return result;
        }

        state.loading = false;
        match &result {
            Ok(fetched) => {
                state.current = Some(Arc::clone(fetched));
                state.error = None;
                if state.subscription.as_ref().map(Subscription::key) != Some(&key) {
                    state.subscription = Some(self.cache.subscribe(key));
                }
            }
            Err(err) => state.error = Some(err.clone()),
        }
        result
    }

    /// Fetch the page after the displayed one, if the server reported one.
    pub async fn next_page(&self) -> Result<Option<Arc<Page<S::Item>>>> {
        let next = {
            let state = lock(&self.state);
            state
                .displayed()
                .filter(|page| page.has_next_page())
                .map(|_| state.page + 1)
        };
        match next {
            Some(page) => self.fetch(page).await.map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the page before the displayed one.
    pub async fn previous_page(&self) -> Result<Option<Arc<Page<S::Item>>>> {
        let page = self.page();
        if page <= 1 {
            return Ok(None);
        }
        self.fetch(page - 1).await.map(Some)
    }

    /// Switch to other filters (including sort order); goes back to page 1.
    pub fn set_filters(&self, filters: S::Filters) {
        let mut state = lock(&self.state);
        if state.filters == filters {
            return;
        }
        state.filters = filters;
        state.clear();
    }

    /// Change the page size; goes back to page 1.
    pub fn set_limit(&self, limit: u32) {
        let mut state = lock(&self.state);
        if state.limit == limit {
            return;
        }
        state.limit = limit;
        state.clear();
    }

    /// Forget the displayed page and go back to page 1. A fetch still
    /// running will not be displayed.
    pub fn reset(&self) {
        lock(&self.state).clear();
    }

    pub fn page(&self) -> u32 {
        lock(&self.state).page
    }

    pub fn limit(&self) -> u32 {
        lock(&self.state).limit
    }

    pub fn filters(&self) -> S::Filters {
        lock(&self.state).filters.clone()
    }

    /// The displayed page.
    pub fn current(&self) -> Option<Arc<Page<S::Item>>> {
        lock(&self.state).displayed()
    }

    pub fn meta(&self) -> Option<PaginationMeta> {
        lock(&self.state).displayed().map(|page| page.meta.clone())
    }

    /// Whether a fetch is running with nothing displayed yet.
    pub fn is_loading(&self) -> bool {
        let state = lock(&self.state);
        state.loading && state.current.is_none()
    }

    pub fn error(&self) -> Option<Error> {
        lock(&self.state).error.clone()
    }
}
