//! Viewport-driven switch between the two retrieval disciplines.

use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use commu_core::error::InvalidInputError;
use commu_core::{Error, Page, PaginationMeta, Result};

use super::{FetchNext, InfiniteQuery, PageSource, PagedQuery};
use crate::cache::QueryCache;
use crate::lock;

/// Default page size of a feed.
pub const DEFAULT_FEED_LIMIT: u32 = 20;

/// Coarse screen class reported by the embedding view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportClass {
    Mobile,
    Tablet,
    Desktop,
}

impl ViewportClass {
    /// Classify a viewport width in CSS pixels.
    pub fn from_width(width: u32) -> Self {
        match width {
            0..768 => ViewportClass::Mobile,
            768..1024 => ViewportClass::Tablet,
            _ => ViewportClass::Desktop,
        }
    }

    /// Mobile scrolls; everything else pages.
    pub fn fetch_mode(self) -> FetchMode {
        match self {
            ViewportClass::Mobile => FetchMode::Infinite,
            ViewportClass::Tablet | ViewportClass::Desktop => FetchMode::Discrete,
        }
    }
}

/// Retrieval discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    #[default]
    Discrete,
    Infinite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub limit: u32,
    pub mode: FetchMode,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_FEED_LIMIT,
            mode: FetchMode::default(),
        }
    }
}

/// What a list view renders.
#[derive(Debug, Clone)]
pub struct FeedState<T> {
    /// Displayed page (discrete) or every fetched item (infinite).
    pub data: Vec<T>,
    pub meta: Option<PaginationMeta>,
    pub is_loading: bool,
    pub has_next_page: bool,
    pub is_fetching_next_page: bool,
    pub error: Option<Error>,
}

/// A collection exposed through whichever discipline is active.
///
/// Only the active discipline fetches; the other one refuses with
/// [`Error::InvalidInput`]. Switching mode forgets what either discipline
/// displayed. At most one fetch runs at a time: a fetch started before a
/// switch is not displayed, and the new discipline waits for it to settle.
pub struct Feed<S: PageSource> {
    mode: Mutex<FetchMode>,
    /// Held for the duration of every fetch.
    gate: tokio::sync::Mutex<()>,
    paged: PagedQuery<S>,
    infinite: InfiniteQuery<S>,
}

impl<S: PageSource> Feed<S> {
    pub fn new(cache: QueryCache, source: S, filters: S::Filters, config: FeedConfig) -> Self {
        Self::with_source(cache, Arc::new(source), filters, config)
    }

    /// Create a feed over a shared source.
    pub fn with_source(cache: QueryCache, source: Arc<S>, filters: S::Filters, config: FeedConfig) -> Self {
        Self {
            mode: Mutex::new(config.mode),
            gate: tokio::sync::Mutex::new(()),
            paged: PagedQuery::with_source(
                cache.clone(),
                Arc::clone(&source),
                filters.clone(),
                config.limit,
            ),
            infinite: InfiniteQuery::with_source(cache, source, filters, config.limit),
        }
    }

    pub fn mode(&self) -> FetchMode {
        *lock(&self.mode)
    }

    /// Switch discipline. Returns whether the mode changed.
    pub fn set_mode(&self, mode: FetchMode) -> bool {
        let mut current = lock(&self.mode);
        if *current == mode {
            return false;
        }
        debug!(from = ?*current, to = ?mode, "switching feed mode");
        *current = mode;
        self.paged.reset();
        self.infinite.reset();
        true
    }

    pub fn set_viewport(&self, viewport: ViewportClass) -> bool {
        self.set_mode(viewport.fetch_mode())
    }

    /// Apply new filters to both disciplines.
    pub fn set_filters(&self, filters: S::Filters) {
        self.paged.set_filters(filters.clone());
        self.infinite.set_filters(filters);
    }

    /// Fetch a discrete page, after any fetch already running.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] in infinite mode, otherwise the load error.
    pub async fn fetch_page(&self, page: u32) -> Result<Arc<Page<S::Item>>> {
        self.require(FetchMode::Discrete)?;
        let _gate = self.gate.lock().await;
        // The mode may have changed while waiting.
        self.require(FetchMode::Discrete)?;
        self.paged.fetch(page).await
    }

    /// Fetch and append the next page. Returns [`FetchNext::InFlight`]
    /// while any fetch of this feed is running.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] in discrete mode, otherwise the load error.
    pub async fn fetch_next(&self) -> Result<FetchNext<S::Item>> {
        self.require(FetchMode::Infinite)?;
        let Ok(_gate) = self.gate.try_lock() else {
            trace!("feed fetch already running");
            return Ok(FetchNext::InFlight);
        };
        self.infinite.fetch_next().await
    }

    pub fn paged(&self) -> &PagedQuery<S> {
        &self.paged
    }

    pub fn infinite(&self) -> &InfiniteQuery<S> {
        &self.infinite
    }

    fn require(&self, mode: FetchMode) -> Result<()> {
        let active = self.mode();
        if active == mode {
            return Ok(());
        }
        Err(InvalidInputError::Other {
            message: format!("feed is in {:?} mode, cannot fetch in {:?} mode", active, mode),
        }
        .into())
    }
}

impl<S> Feed<S>
where
    S: PageSource,
    S::Item: Clone,
{
    /// Snapshot of the active discipline.
    pub fn state(&self) -> FeedState<S::Item> {
        match self.mode() {
            FetchMode::Discrete => {
                let current = self.paged.current();
                FeedState {
                    data: current.as_ref().map(|page| page.items.clone()).unwrap_or_default(),
                    meta: current.as_ref().map(|page| page.meta.clone()),
                    is_loading: self.paged.is_loading(),
                    has_next_page: current.as_ref().is_some_and(|page| page.has_next_page()),
                    is_fetching_next_page: false,
                    error: self.paged.error(),
                }
            }
            FetchMode::Infinite => FeedState {
                data: self.infinite.items(),
                meta: self.infinite.meta(),
                is_loading: self.infinite.is_loading(),
                has_next_page: self.infinite.has_next_page(),
                is_fetching_next_page: self.infinite.is_fetching_next_page(),
                error: self.infinite.error(),
            },
        }
    }
}
