//! Debounced tag autocomplete.
//!
//! [`TagSuggestions`] turns raw keystrokes into tag suggestions:
//!
//! 1. [`set_query`](TagSuggestions::set_query) records the raw input and
//!    pushes it through a [`Debouncer`].
//! 2. Once input has been quiet for [`SuggestConfig::debounce`], the trimmed
//!    query becomes the debounced query.
//! 3. A debounced query of at least [`SuggestConfig::min_length`] characters
//!    is searched through the [`QueryCache`]; shorter ones clear the
//!    suggestions without a call.
//!
//! Results are applied only while their query is still the debounced one,
//! so a late response for `"ab"` never replaces suggestions for `"abc"`.
//! Popular tags are fetched once at construction and cached separately.
//!
//! The popular tags and the current search stay subscribed in the cache:
//! invalidating `tags` refetches them and the new results are applied.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, trace, warn};

use commu_core::{Api, Result, Tag};

use crate::cache::{QueryCache, QueryKey, Subscription};
use crate::debounce::Debouncer;
use crate::lock;

/// Quiet period before a query is searched.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Shortest query that is searched, in characters.
pub const DEFAULT_MIN_LENGTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestConfig {
    pub debounce: Duration,
    pub min_length: usize,
    /// Maximum suggestions per search.
    pub limit: u32,
    /// Number of popular tags to show before typing.
    pub popular_limit: u32,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_length: DEFAULT_MIN_LENGTH,
            limit: 10,
            popular_limit: 10,
        }
    }
}

/// What a tag input renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionState {
    /// Raw input.
    pub query: String,
    /// Trimmed input after the quiet period.
    pub debounced_query: String,
    pub suggestions: Vec<Tag>,
    pub popular_tags: Vec<Tag>,
    /// A search for `debounced_query` is running.
    pub is_loading: bool,
    /// Message of the last failed search.
    pub error: Option<String>,
}

struct Shared<A> {
    api: Arc<A>,
    cache: QueryCache,
    config: SuggestConfig,
    state: watch::Sender<SuggestionState>,
    /// Task searching, then following, the current debounced query.
    search: Mutex<Option<AbortHandle>>,
}

/// Tag suggestion pipeline.
///
/// Spawns background tasks; construct it inside a Tokio runtime. Dropping it
/// stops the pipeline.
pub struct TagSuggestions<A> {
    shared: Arc<Shared<A>>,
    debouncer: Debouncer<String>,
    tasks: Vec<JoinHandle<()>>,
}

impl<A: Api> TagSuggestions<A> {
    pub fn new(api: Arc<A>, cache: QueryCache, config: SuggestConfig) -> Self {
        let debouncer = Debouncer::new(config.debounce, String::new());
        let (state, _) = watch::channel(SuggestionState::default());
        let shared = Arc::new(Shared {
            api,
            cache,
            config,
            state,
            search: Mutex::new(None),
        });

        let popular = tokio::spawn(Arc::clone(&shared).load_popular());
        let listener = tokio::spawn(Arc::clone(&shared).listen(debouncer.subscribe()));

        Self {
            shared,
            debouncer,
            tasks: vec![popular, listener],
        }
    }

    /// Record raw input; the search follows after the quiet period.
    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        let trimmed = query.trim().to_string();
        self.shared.state.send_modify(|state| state.query = query);
        self.debouncer.push(trimmed);
    }

    /// Empty both the raw and the debounced query now.
    pub fn clear_query(&self) {
        self.shared.state.send_modify(|state| {
            state.query.clear();
            state.debounced_query.clear();
            state.suggestions.clear();
            state.is_loading = false;
            state.error = None;
        });
        self.debouncer.flush(String::new());
    }

    pub fn state(&self) -> SuggestionState {
        self.shared.state.borrow().clone()
    }

    /// Receiver of every state change.
    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.shared.state.subscribe()
    }

    pub fn config(&self) -> &SuggestConfig {
        &self.shared.config
    }
}

impl<A> Drop for TagSuggestions<A> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        if let Some(search) = lock(&self.shared.search).take() {
            search.abort();
        }
    }
}

/// Cache key of a tag search.
pub fn search_key(query: &str, limit: u32) -> QueryKey {
    QueryKey::new("tags")
        .with("search")
        .with(query)
        .with(format!("limit={}", limit))
}

/// Cache key of the popular tags.
pub fn popular_key(limit: u32) -> QueryKey {
    QueryKey::new("tags").with("popular").with(format!("limit={}", limit))
}

impl<A: Api> Shared<A> {
    async fn load_popular(self: Arc<Self>) {
        let limit = self.config.popular_limit;
        let key = popular_key(limit);
        let mut subscription = self.cache.subscribe(key.clone());

        let api = Arc::clone(&self.api);
        let result = self
            .cache
            .fetch(key, move || {
                let api = Arc::clone(&api);
                async move { api.popular_tags(limit).await }
            })
            .await;

        match result {
            Ok(tags) => self.apply_popular(&tags),
            Err(err) => warn!(error = %err, "failed to load popular tags"),
        }

        while subscription.changed().await {
            if let Some(tags) = cached_tags(&subscription) {
                self.apply_popular(&tags);
            }
        }
    }

    fn apply_popular(&self, tags: &[Tag]) {
        self.state.send_if_modified(|state| {
            if state.popular_tags == tags {
                return false;
            }
            state.popular_tags = tags.to_vec();
            true
        });
    }

    async fn listen(self: Arc<Self>, mut debounced: watch::Receiver<String>) {
        while debounced.changed().await.is_ok() {
            let query = debounced.borrow_and_update().clone();
            Arc::clone(&self).on_debounced(query);
        }
    }

    fn on_debounced(self: Arc<Self>, query: String) {
        let searchable = query.chars().count() >= self.config.min_length;
        self.state.send_modify(|state| {
            state.debounced_query = query.clone();
            state.is_loading = searchable;
            state.error = None;
            if !searchable {
                state.suggestions.clear();
            }
        });

        let mut current = lock(&self.search);
        if let Some(previous) = current.take() {
            previous.abort();
        }
        if searchable {
            trace!(%query, "searching tags");
            let task = tokio::spawn(Arc::clone(&self).search(query));
            *current = Some(task.abort_handle());
        }
    }

    async fn search(self: Arc<Self>, query: String) {
        let limit = self.config.limit;
        let key = search_key(&query, limit);
        let mut subscription = self.cache.subscribe(key.clone());

        let api = Arc::clone(&self.api);
        let result = {
            let query = query.clone();
            self.cache
                .fetch(key, move || {
                    let api = Arc::clone(&api);
                    let query = query.clone();
                    async move { api.search_tags(&query, limit).await }
                })
                .await
        };

        if !self.apply_search(&query, result.map(|tags| tags.as_ref().clone())) {
            debug!(%query, "dropping suggestions for superseded query");
            return;
        }

        while subscription.changed().await {
            if let Some(tags) = cached_tags(&subscription) {
                if !self.apply_search(&query, Ok(tags.as_ref().clone())) {
                    break;
                }
            }
        }
    }

    /// Show `result` if `query` is still the debounced query.
    fn apply_search(&self, query: &str, result: Result<Vec<Tag>>) -> bool {
        let mut current = true;
        self.state.send_if_modified(|state| {
            if state.debounced_query != query {
                current = false;
                return false;
            }
            let unchanged = !state.is_loading
                && state.error.is_none()
                && result.as_ref().is_ok_and(|tags| *tags == state.suggestions);
            if unchanged {
                return false;
            }
            state.is_loading = false;
            match &result {
                Ok(tags) => {
                    state.suggestions = tags.clone();
                    state.error = None;
                }
                Err(err) => {
                    warn!(%query, error = %err, "tag search failed");
                    state.suggestions.clear();
                    state.error = Some(err.to_string());
                }
            }
            true
        });
        current
    }
}

/// The tags currently cached for a subscribed key.
fn cached_tags(subscription: &Subscription) -> Option<Arc<Vec<Tag>>> {
    subscription.entry().and_then(|entry| entry.data::<Vec<Tag>>())
}
