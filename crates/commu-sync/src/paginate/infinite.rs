//! Cursor-chained, append-only retrieval.

use std::sync::{Arc, Mutex};

use futures_util::Stream;
use tracing::{debug, trace};

use commu_core::{Error, Page, PageRequest, PaginationMeta, Result};

use super::{PageSource, fetch_page, page_key};
use crate::cache::{QueryCache, Subscription};
use crate::lock;

/// Outcome of [`InfiniteQuery::fetch_next`].
#[derive(Debug)]
pub enum FetchNext<T> {
    /// A page was fetched and appended.
    Appended(Arc<Page<T>>),
    /// A page fetch was already running; nothing was started.
    InFlight,
    /// The server reported no further page; nothing was started.
    Exhausted,
    /// The filters changed while the page was loading; it was dropped.
    Superseded,
}

impl<T> FetchNext<T> {
    pub fn is_appended(&self) -> bool {
        matches!(self, FetchNext::Appended(_))
    }
}

struct InfiniteState<S: PageSource> {
    filters: S::Filters,
    limit: u32,
    pages: Vec<Arc<Page<S::Item>>>,
    /// One per page, keeping it cached and revalidated while listed.
    subscriptions: Vec<Subscription>,
    next_cursor: Option<String>,
    has_next: bool,
    fetching: bool,
    epoch: u64,
    error: Option<Error>,
}

impl<S: PageSource> InfiniteState<S> {
    fn can_fetch(&self) -> bool {
        self.pages.is_empty() || (self.has_next && self.next_cursor.is_some())
    }

    /// Pages as last written to the cache.
    fn displayed(&self) -> Vec<Arc<Page<S::Item>>> {
        self.pages
            .iter()
            .zip(&self.subscriptions)
            .map(|(page, subscription)| {
                subscription
                    .entry()
                    .and_then(|entry| entry.data::<Page<S::Item>>())
                    .unwrap_or_else(|| Arc::clone(page))
            })
            .collect()
    }

    fn reset(&mut self) {
        self.pages.clear();
        self.subscriptions.clear();
        self.next_cursor = None;
        self.has_next = false;
        self.fetching = false;
        self.epoch += 1;
        self.error = None;
    }
}

/// Infinite pagination over a [`PageSource`].
///
/// Pages are fetched one at a time by cursor and appended in fetch order.
/// At most one fetch runs at once; changing the filters starts a new epoch
/// and any fetch from the previous one is dropped when it settles. Listed
/// pages stay subscribed in the cache and show revalidated contents.
pub struct InfiniteQuery<S: PageSource> {
    cache: QueryCache,
    source: Arc<S>,
    state: Mutex<InfiniteState<S>>,
}

impl<S: PageSource> InfiniteQuery<S> {
    pub fn new(cache: QueryCache, source: S, filters: S::Filters, limit: u32) -> Self {
        Self::with_source(cache, Arc::new(source), filters, limit)
    }

    /// Create a query over a shared source.
    pub fn with_source(cache: QueryCache, source: Arc<S>, filters: S::Filters, limit: u32) -> Self {
        Self {
            cache,
            source,
            state: Mutex::new(InfiniteState {
                filters,
                limit,
                pages: Vec::new(),
                subscriptions: Vec::new(),
                next_cursor: None,
                has_next: false,
                fetching: false,
                epoch: 0,
                error: None,
            }),
        }
    }

    /// Fetch and append the next page.
    ///
    /// Does nothing while a fetch is running or once the collection is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// The load error of the page; pages already appended are kept.
    pub async fn fetch_next(&self) -> Result<FetchNext<S::Item>> {
        self.load_next(false).await
    }

    async fn load_next(&self, fresh: bool) -> Result<FetchNext<S::Item>> {
        let (request, filters, epoch) = {
            let mut state = lock(&self.state);
            if state.fetching {
                trace!("next page already loading");
                return Ok(FetchNext::InFlight);
            }
            if !state.can_fetch() {
                return Ok(FetchNext::Exhausted);
            }
            let request = PageRequest::cursor(state.next_cursor.clone(), state.limit)?;
            state.fetching = true;
            (request, state.filters.clone(), state.epoch)
        };

        let key = page_key(self.source.as_ref(), &filters, &request);
        let result = fetch_page(&self.cache, &self.source, &filters, request, fresh).await;

        let mut state = lock(&self.state);
        if state.epoch != epoch {
            debug!(epoch, current = state.epoch, "dropping page from previous filters");
            return Ok(FetchNext::Superseded);
        }
        state.fetching = false;

        match result {
            Ok(page) => {
                state.has_next = page.has_next_page();
                state.next_cursor = page.next_cursor().map(str::to_owned);
                state.error = None;
                state.pages.push(Arc::clone(&page));
                state.subscriptions.push(self.cache.subscribe(key));
                Ok(FetchNext::Appended(page))
            }
            Err(err) => {
                state.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Switch to other filters; clears the list. Equal filters are a no-op.
    pub fn set_filters(&self, filters: S::Filters) {
        let mut state = lock(&self.state);
        if state.filters == filters {
            return;
        }
        state.filters = filters;
        state.reset();
    }

    /// Change the page size; clears the list.
    pub fn set_limit(&self, limit: u32) {
        let mut state = lock(&self.state);
        if state.limit == limit {
            return;
        }
        state.limit = limit;
        state.reset();
    }

    /// Clear the list; the next fetch starts from the first page.
    pub fn reset(&self) {
        lock(&self.state).reset();
    }

    /// Invalidate every cached page of the current filters and start over
    /// from a first page reloaded from the server.
    pub async fn refresh(&self) -> Result<FetchNext<S::Item>> {
        let key = {
            let mut state = lock(&self.state);
            state.reset();
            self.source.key(&state.filters)
        };
        self.cache.invalidate(&key);
        self.load_next(true).await
    }

    pub fn filters(&self) -> S::Filters {
        lock(&self.state).filters.clone()
    }

    pub fn limit(&self) -> u32 {
        lock(&self.state).limit
    }

    /// Pages in fetch order.
    pub fn pages(&self) -> Vec<Arc<Page<S::Item>>> {
        lock(&self.state).displayed()
    }

    /// Whether another page may be fetched. True before the first fetch.
    pub fn has_next_page(&self) -> bool {
        lock(&self.state).can_fetch()
    }

    pub fn is_fetching_next_page(&self) -> bool {
        let state = lock(&self.state);
        state.fetching && !state.pages.is_empty()
    }

    /// Whether the first page is loading.
    pub fn is_loading(&self) -> bool {
        let state = lock(&self.state);
        state.fetching && state.pages.is_empty()
    }

    /// Metadata of the last page.
    pub fn meta(&self) -> Option<PaginationMeta> {
        lock(&self.state).displayed().last().map(|page| page.meta.clone())
    }

    pub fn error(&self) -> Option<Error> {
        lock(&self.state).error.clone()
    }
}

impl<S> InfiniteQuery<S>
where
    S: PageSource,
    S::Item: Clone,
{
    /// All items, flattened in fetch order.
    pub fn items(&self) -> Vec<S::Item> {
        lock(&self.state)
            .displayed()
            .iter()
            .flat_map(|page| page.items.iter().cloned())
            .collect()
    }

    /// Stream the items of every remaining page until the collection is
    /// exhausted or the filters change.
    ///
    /// A load error is yielded once and ends the stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<S::Item>> {
        async_stream::stream! {
            loop {
                match self.fetch_next().await {
                    Ok(FetchNext::Appended(page)) => {
                        for item in page.items.iter() {
                            yield Ok(item.clone());
                        }
                    }
                    Ok(_) => break,
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;

    use super::*;
    use crate::cache::{CacheConfig, QueryKey};
    use crate::paginate::testing::NumberSource;

    fn query(source: NumberSource, filters: &str, limit: u32) -> Arc<InfiniteQuery<NumberSource>> {
        Arc::new(InfiniteQuery::new(
            QueryCache::new(CacheConfig::default()),
            source,
            filters.to_string(),
            limit,
        ))
    }

    #[tokio::test]
    async fn appends_pages_until_exhausted() {
        let feed = query(NumberSource::new(&[("all", (1..=5).collect())]), "all", 2);

        assert!(feed.has_next_page());
        while feed.has_next_page() {
            assert!(feed.fetch_next().await.unwrap().is_appended());
        }

        assert_eq!(feed.items(), vec![1, 2, 3, 4, 5]);
        assert_eq!(feed.pages().len(), 3);
        assert!(matches!(feed.fetch_next().await.unwrap(), FetchNext::Exhausted));
    }

    #[tokio::test]
    async fn empty_collection_ends_after_first_page() {
        let feed = query(NumberSource::new(&[]), "none", 10);

        assert!(feed.fetch_next().await.unwrap().is_appended());
        assert!(feed.items().is_empty());
        assert!(!feed.has_next_page());
        assert!(feed.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_while_loading_is_a_no_op() {
        let source = Arc::new(
            NumberSource::new(&[("all", (1..=4).collect())]).with_delay(Duration::from_millis(100)),
        );
        let feed = Arc::new(InfiniteQuery::with_source(
            QueryCache::new(CacheConfig::default()),
            Arc::clone(&source),
            "all".to_string(),
            2,
        ));

        let first = {
            let feed = Arc::clone(&feed);
            tokio::spawn(async move { feed.fetch_next().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(feed.is_loading());
        assert!(matches!(feed.fetch_next().await.unwrap(), FetchNext::InFlight));

        assert!(first.await.unwrap().unwrap().is_appended());
        assert_eq!(source.calls(), 1);
        assert_eq!(feed.items(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn page_from_previous_filters_is_dropped() {
        let source = NumberSource::new(&[("odd", vec![1, 3]), ("even", vec![2, 4])])
            .with_delay(Duration::from_millis(100));
        let feed = query(source, "odd", 10);

        let stale = {
            let feed = Arc::clone(&feed);
            tokio::spawn(async move { feed.fetch_next().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        feed.set_filters("even".to_string());

        let fresh = feed.fetch_next().await.unwrap();
        assert!(fresh.is_appended());
        assert!(matches!(stale.await.unwrap().unwrap(), FetchNext::Superseded));
        assert_eq!(feed.items(), vec![2, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_page_is_recorded() {
        let feed = query(NumberSource::new(&[("all", vec![1])]).failing(), "all", 1);

        assert!(feed.fetch_next().await.is_err());
        assert!(feed.error().is_some());
        assert!(!feed.is_loading());
        assert!(feed.has_next_page(), "a failed first page may be retried");
    }

    #[tokio::test]
    async fn stream_yields_every_item() {
        let source = NumberSource::new(&[("all", (1..=7).collect())]);
        let feed = InfiniteQuery::new(
            QueryCache::new(CacheConfig::default()),
            source,
            "all".to_string(),
            3,
        );

        let items: Vec<u32> = feed
            .into_stream()
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(items, (1..=7).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_revalidates_from_the_server() {
        let source = Arc::new(NumberSource::new(&[("all", (1..=4).collect())]));
        let feed = InfiniteQuery::with_source(
            QueryCache::new(CacheConfig::default()),
            Arc::clone(&source),
            "all".to_string(),
            2,
        );

        feed.fetch_next().await.unwrap();
        feed.fetch_next().await.unwrap();
        assert_eq!(source.calls(), 2);

        source.set("all", vec![10, 20, 30]);
        assert!(feed.refresh().await.unwrap().is_appended());
        assert_eq!(feed.items(), vec![10, 20]);
        assert_eq!(source.calls(), 3);
        assert!(feed.has_next_page());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidated_pages_show_new_contents() {
        let cache = QueryCache::new(CacheConfig::default());
        let source = Arc::new(NumberSource::new(&[("all", (1..=4).collect())]));
        let feed = InfiniteQuery::with_source(cache.clone(), Arc::clone(&source), "all".to_string(), 2);

        feed.fetch_next().await.unwrap();
        feed.fetch_next().await.unwrap();
        source.set("all", vec![4, 3, 2, 1]);

        assert_eq!(cache.invalidate(&QueryKey::new("numbers")), 2);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(source.calls(), 4);
        assert_eq!(feed.items(), vec![4, 3, 2, 1]);
    }
}
