//! commu-sync - Client-side data synchronization for the Commu client.
//!
//! This crate sits between view code and an [`Api`](commu_core::Api)
//! implementation:
//!
//! - [`QueryCache`]: keyed, de-duplicating, stale-while-revalidate cache of
//!   server reads.
//! - [`paginate`]: one collection exposed as discrete pages or as an
//!   infinite, cursor-chained list.
//! - [`toggle`]: optimistic like/bookmark state machines with rollback.
//! - [`suggest`]: debounced tag autocomplete that drops stale responses.
//!
//! All shared state is guarded by short critical sections that are never
//! held across an `.await`. Late results are recognised at settlement time
//! by comparing generations, epochs or sequence numbers and are dropped.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use commu_core::{Api, PostFilters};
//! use commu_sync::{CacheConfig, QueryCache};
//! use commu_sync::paginate::{InfiniteQuery, PostSource};
//!
//! # async fn example(api: Arc<impl Api>) -> commu_core::Result<()> {
//! let cache = QueryCache::new(CacheConfig::default());
//! let feed = InfiniteQuery::new(cache, PostSource::new(api), PostFilters::default(), 20);
//!
//! while feed.has_next_page() {
//!     feed.fetch_next().await?;
//! }
//! println!("{} posts", feed.items().len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod debounce;
pub mod paginate;
pub mod scheduler;
pub mod suggest;
pub mod toggle;

pub use cache::{CacheConfig, CacheEntry, QueryCache, QueryKey, QueryStatus, Subscription};
pub use debounce::Debouncer;
pub use scheduler::{Scheduler, TaskHandle};
pub use suggest::{SuggestConfig, SuggestionState, TagSuggestions};
pub use toggle::{
    Activation, BookmarkMutation, ButtonSize, InFlightPolicy, LikeMutation, OptimisticToggle,
    ToggleConfig, ToggleMutation, TogglePhase, ToggleState,
};

pub use commu_core::{Error, Result};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
