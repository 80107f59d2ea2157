//! Process-wide query cache.
//!
//! [`QueryCache`] stores the results of server reads under structured
//! [`QueryKey`]s and guarantees:
//!
//! - **De-duplication**: concurrent fetches of one key share a single
//!   loader call and receive the same value.
//! - **Stale-while-revalidate**: a value is fresh for
//!   [`CacheConfig::stale_time`]; afterwards a read returns it immediately
//!   and starts one background refetch.
//! - **Failure handling**: transient failures are retried
//!   [`CacheConfig::retry`] times, then the entry is marked
//!   [`QueryStatus::Error`] while keeping its last good value.
//! - **Lifecycle**: entries are kept alive by [`Subscription`]s and evicted
//!   [`CacheConfig::gc_time`] after their last subscriber leaves.
//!
//! Entries are written only by settled fetches and by
//! [`invalidate`](QueryCache::invalidate). Each entry carries a generation
//! that invalidation bumps; a fetch that settles under an older generation
//! is not written.
//!
//! The cache is an explicit service object. Build one per application (or
//! per test) and clone the handle wherever it is needed.

mod config;
mod key;

pub use config::{CacheConfig, DEFAULT_STALE_TIME};
pub use key::QueryKey;

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use commu_core::error::CacheError;
use commu_core::{Error, Result};

use crate::lock;

/// A type-erased cached value.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

type Loader = Arc<dyn Fn() -> BoxFuture<'static, Result<AnyValue>> + Send + Sync>;
type InFlight = Shared<BoxFuture<'static, Result<AnyValue>>>;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Known to the cache (e.g. subscribed) but never fetched.
    Idle,
    /// First fetch in flight, no value yet.
    Loading,
    /// Last fetch succeeded.
    Success,
    /// Last fetch failed; any earlier value is still available.
    Error,
}

/// Snapshot of one cache entry.
#[derive(Clone)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub status: QueryStatus,
    /// Last successfully fetched value.
    pub value: Option<AnyValue>,
    /// Error of the last fetch, if it failed.
    pub error: Option<Error>,
    /// When the value was last written.
    pub updated_at: Option<Instant>,
    /// Whether the next read will trigger a refetch.
    pub is_stale: bool,
    /// Whether a fetch is currently in flight.
    pub is_fetching: bool,
    pub subscribers: usize,
}

impl CacheEntry {
    /// The value as `T`, if present and of that type.
    pub fn data<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.clone().and_then(|value| value.downcast::<T>().ok())
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("status", &self.status)
            .field("has_value", &self.value.is_some())
            .field("error", &self.error)
            .field("is_stale", &self.is_stale)
            .field("is_fetching", &self.is_fetching)
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

struct Entry {
    value: Option<AnyValue>,
    error: Option<Error>,
    status: QueryStatus,
    updated_at: Option<Instant>,
    invalidated: bool,
    subscribers: usize,
    idle_since: Option<Instant>,
    generation: u64,
    in_flight: Option<InFlight>,
    loader: Option<Loader>,
    version: watch::Sender<u64>,
}

impl Entry {
    fn new(now: Instant) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            value: None,
            error: None,
            status: QueryStatus::Idle,
            updated_at: None,
            invalidated: false,
            subscribers: 0,
            idle_since: Some(now),
            generation: 0,
            in_flight: None,
            loader: None,
            version,
        }
    }

    fn is_fresh(&self, now: Instant, config: &CacheConfig) -> bool {
        !self.invalidated
            && self
                .updated_at
                .is_some_and(|at| now.saturating_duration_since(at) < config.stale_time)
    }

    fn is_collectable(&self, now: Instant, config: &CacheConfig) -> bool {
        self.subscribers == 0
            && self.in_flight.is_none()
            && self
                .idle_since
                .is_some_and(|since| now.saturating_duration_since(since) >= config.gc_time)
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    fn snapshot(&self, key: &QueryKey, now: Instant, config: &CacheConfig) -> CacheEntry {
        CacheEntry {
            key: key.clone(),
            status: self.status,
            value: self.value.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
            is_stale: !self.is_fresh(now, config),
            is_fetching: self.in_flight.is_some(),
            subscribers: self.subscribers,
        }
    }
}

struct CacheInner {
    config: CacheConfig,
    entries: Mutex<HashMap<QueryKey, Entry>>,
}

/// Keyed cache of server reads. Cloning shares the cache.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

enum Lookup {
    Ready(AnyValue),
    Wait(InFlight),
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                config,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Read `key`, loading it with `loader` when needed.
    ///
    /// - fresh value: returned, `loader` is not called;
    /// - stale value: returned, and one background refetch starts;
    /// - no value: waits for the in-flight fetch of `key`, starting one if
    ///   none is running.
    ///
    /// The most recent `loader` passed for a key is the one used by later
    /// background refetches and invalidations.
    ///
    /// # Errors
    ///
    /// The loader's error after retries, or [`CacheError::TypeMismatch`] if
    /// `key` holds a value of another type.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, loader: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.load(key, loader, false).await
    }

    /// Read `key` from the server even if a value is cached.
    ///
    /// Joins a fetch already in flight, otherwise starts one, and waits for
    /// it. Errors as [`fetch`](Self::fetch).
    pub async fn fetch_fresh<T, F, Fut>(&self, key: QueryKey, loader: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.load(key, loader, true).await
    }

    async fn load<T, F, Fut>(&self, key: QueryKey, loader: F, fresh: bool) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let loader: Loader = Arc::new(move || {
            let fut = loader();
            async move { fut.await.map(|value| Arc::new(value) as AnyValue) }.boxed()
        });

        let lookup = {
            let now = Instant::now();
            let mut entries = lock(&self.inner.entries);
            self.sweep(&mut entries, now);

            let entry = entries.entry(key.clone()).or_insert_with(|| Entry::new(now));
            entry.loader = Some(loader);

            match entry.value.clone() {
                _ if fresh => {
                    debug!(%key, "refetching");
                    Lookup::Wait(Self::start_fetch(&self.inner, &key, entry))
                }
                Some(value) if entry.is_fresh(now, &self.inner.config) => {
                    trace!(%key, "cache hit");
                    Lookup::Ready(value)
                }
                Some(value) => {
                    debug!(%key, "serving stale value, revalidating");
                    Self::start_fetch(&self.inner, &key, entry);
                    Lookup::Ready(value)
                }
                None => {
                    trace!(%key, "cache miss");
                    Lookup::Wait(Self::start_fetch(&self.inner, &key, entry))
                }
            }
        };

        let value = match lookup {
            Lookup::Ready(value) => value,
            Lookup::Wait(in_flight) => in_flight.await?,
        };

        value
            .downcast::<T>()
            .map_err(|_| CacheError::TypeMismatch { key: key.to_string() }.into())
    }

    /// Snapshot of the entry for `key`.
    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        let now = Instant::now();
        let mut entries = lock(&self.inner.entries);
        self.sweep(&mut entries, now);
        entries
            .get(key)
            .map(|entry| entry.snapshot(key, now, &self.inner.config))
    }

    /// The cached value of `key` as `T`, without triggering any fetch.
    pub fn get_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.get(key).and_then(|entry| entry.data::<T>())
    }

    /// Mark every entry under `prefix` stale.
    ///
    /// Entries with subscribers refetch right away; others refetch on their
    /// next read. A fetch already in flight for a matching entry will not be
    /// written when it settles. Returns the number of matching entries.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = lock(&self.inner.entries);
        let mut matched = 0;

        for (key, entry) in entries.iter_mut().filter(|(key, _)| key.starts_with(prefix)) {
            matched += 1;
            entry.invalidated = true;
            entry.generation += 1;
            entry.in_flight = None;

            if entry.subscribers > 0 && entry.loader.is_some() {
                debug!(%key, "invalidated, refetching for subscribers");
                Self::start_fetch(&self.inner, key, entry);
            } else {
                trace!(%key, "invalidated");
                entry.notify();
            }
        }

        matched
    }

    /// Keep `key` alive and observe its changes.
    pub fn subscribe(&self, key: QueryKey) -> Subscription {
        let now = Instant::now();
        let mut entries = lock(&self.inner.entries);
        self.sweep(&mut entries, now);

        let entry = entries.entry(key.clone()).or_insert_with(|| Entry::new(now));
        entry.subscribers += 1;
        entry.idle_since = None;
        let changes = entry.version.subscribe();

        Subscription {
            cache: Arc::downgrade(&self.inner),
            key,
            changes,
        }
    }

    /// Drop every entry under `prefix` regardless of subscribers.
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        let mut entries = lock(&self.inner.entries);
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub fn clear(&self) {
        lock(&self.inner.entries).clear();
    }

    /// Evict idle entries whose collection window has elapsed.
    pub fn collect_garbage(&self) -> usize {
        let mut entries = lock(&self.inner.entries);
        self.sweep(&mut entries, Instant::now())
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(&self, entries: &mut HashMap<QueryKey, Entry>, now: Instant) -> usize {
        let config = &self.inner.config;
        let before = entries.len();
        entries.retain(|key, entry| {
            let keep = !entry.is_collectable(now, config);
            if !keep {
                debug!(%key, "evicting idle entry");
            }
            keep
        });
        before - entries.len()
    }

    /// Join the in-flight fetch of `entry`, or start one.
    ///
    /// The fetch is spawned so it settles even if every caller stops
    /// waiting.
    fn start_fetch(inner: &Arc<CacheInner>, key: &QueryKey, entry: &mut Entry) -> InFlight {
        if let Some(in_flight) = &entry.in_flight {
            trace!(%key, "joining in-flight request");
            return in_flight.clone();
        }

        let in_flight = match entry.loader.clone() {
            Some(loader) => {
                let cache = Arc::downgrade(inner);
                let config = inner.config.clone();
                let generation = entry.generation;
                let key = key.clone();

                async move {
                    let result = load_with_retry(&key, &loader, &config).await;
                    if let Some(inner) = cache.upgrade() {
                        settle(&inner, &key, generation, &result);
                    }
                    result
                }
                .boxed()
                .shared()
            }
            None => {
                let err = Error::not_found(format!("no loader registered for {}", key));
                async move { Err::<AnyValue, _>(err) }.boxed().shared()
            }
        };

        entry.in_flight = Some(in_flight.clone());
        if entry.value.is_none() {
            entry.status = QueryStatus::Loading;
        }
        entry.notify();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(in_flight.clone());
            }
            Err(_) => warn!(%key, "no runtime, fetch will run when first awaited"),
        }

        in_flight
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.inner.config)
            .field("entries", &self.len())
            .finish()
    }
}

async fn load_with_retry(key: &QueryKey, loader: &Loader, config: &CacheConfig) -> Result<AnyValue> {
    let mut attempt = 0;
    loop {
        match loader().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < config.retry && err.is_transient() => {
                attempt += 1;
                warn!(%key, attempt, error = %err, "fetch failed, retrying");
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(err) => {
                debug!(%key, error = %err, "fetch failed");
                return Err(err);
            }
        }
    }
}

fn settle(inner: &CacheInner, key: &QueryKey, generation: u64, result: &Result<AnyValue>) {
    let now = Instant::now();
    let mut entries = lock(&inner.entries);

    let Some(entry) = entries.get_mut(key) else {
        debug!(%key, "entry removed before its fetch settled");
        return;
    };

    if entry.generation != generation {
        debug!(%key, "discarding response for superseded generation");
        return;
    }

    entry.in_flight = None;
    match result {
        Ok(value) => {
            entry.value = Some(Arc::clone(value));
            entry.error = None;
            entry.status = QueryStatus::Success;
            entry.updated_at = Some(now);
            entry.invalidated = false;
        }
        Err(err) => {
            entry.error = Some(err.clone());
            entry.status = QueryStatus::Error;
        }
    }
    if entry.subscribers == 0 {
        entry.idle_since = Some(now);
    }
    entry.notify();
}

/// Keeps an entry alive while held and reports its changes.
///
/// Dropping the subscription releases the entry; once no subscriptions
/// remain, the entry is evicted after the collection window.
pub struct Subscription {
    cache: Weak<CacheInner>,
    key: QueryKey,
    changes: watch::Receiver<u64>,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Wait until the entry is written, invalidated or starts fetching.
    ///
    /// Returns `false` if the entry was removed from the cache.
    pub async fn changed(&mut self) -> bool {
        self.changes.changed().await.is_ok()
    }

    /// Current snapshot of the subscribed entry.
    pub fn entry(&self) -> Option<CacheEntry> {
        let inner = self.cache.upgrade()?;
        let now = Instant::now();
        let entries = lock(&inner.entries);
        entries
            .get(&self.key)
            .map(|entry| entry.snapshot(&self.key, now, &inner.config))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.cache.upgrade() else {
            return;
        };
        let mut entries = lock(&inner.entries);
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entry.idle_since = Some(Instant::now());
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use commu_core::error::{ProtocolError, TransportError};
    use futures_util::future::join_all;

    fn key(name: &str) -> QueryKey {
        QueryKey::new("posts").with(name)
    }

    /// Loader returning the call number after `delay`.
    fn counting_loader(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
    ) -> impl Fn() -> BoxFuture<'static, Result<usize>> + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                tokio::time::sleep(delay).await;
                Ok(n)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fetches_share_one_call() {
        let cache = QueryCache::new(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let fetches = (0..5).map(|_| {
            cache.fetch(key("feed"), counting_loader(&calls, Duration::from_millis(50)))
        });
        let results = join_all(fetches).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(*result.unwrap(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_value_is_served_without_refetch() {
        let cache = QueryCache::new(CacheConfig::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache.fetch(key("feed"), counting_loader(&calls, Duration::ZERO)).await;
        assert_eq!(*first.unwrap(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        let second = cache.fetch(key("feed"), counting_loader(&calls, Duration::ZERO)).await;
        assert_eq!(*second.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_value_is_served_while_revalidating() {
        let cache = QueryCache::new(CacheConfig::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .fetch(key("feed"), counting_loader(&calls, Duration::ZERO))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        let stale = cache
            .fetch(key("feed"), counting_loader(&calls, Duration::from_millis(10)))
            .await
            .unwrap();
        assert_eq!(*stale, 1, "stale value returned immediately");

        // A second stale read joins the running refetch.
        cache
            .fetch(key("feed"), counting_loader(&calls, Duration::from_millis(10)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get_data::<usize>(&key("feed")).as_deref(), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried_once() {
        let cache = QueryCache::new(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let value = cache
            .fetch(key("flaky"), move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(TransportError::Timeout.into())
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(*value, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failure_keeps_last_good_value() {
        let cache = QueryCache::new(CacheConfig::new(Duration::from_secs(10)));
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch(key("feed"), || async { Ok(7u32) }).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;

        let counter = Arc::clone(&calls);
        let stale = cache
            .fetch(key("feed"), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>(ProtocolError::new(503, None, None).into()) }
            })
            .await
            .unwrap();
        assert_eq!(*stale, 7);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2, "initial attempt plus one retry");

        let entry = cache.get(&key("feed")).unwrap();
        assert_eq!(entry.status, QueryStatus::Error);
        assert!(entry.error.is_some());
        assert_eq!(entry.data::<u32>().as_deref(), Some(&7));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_not_retried() {
        let cache = QueryCache::new(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let result = cache
            .fetch(key("missing"), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>(Error::not_found("post 9")) }
            })
            .await;

        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&key("missing")).unwrap().status, QueryStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn type_mismatch_is_reported() {
        let cache = QueryCache::new(CacheConfig::default());
        cache.fetch(key("feed"), || async { Ok(1u32) }).await.unwrap();

        let result = cache.fetch(key("feed"), || async { Ok("text") }).await;
        assert!(matches!(result, Err(Error::Cache(CacheError::TypeMismatch { .. }))));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_refetches_for_subscribers() {
        let cache = QueryCache::new(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut subscription = cache.subscribe(key("feed"));
        assert_eq!(cache.get(&key("feed")).unwrap().status, QueryStatus::Idle);

        cache
            .fetch(key("feed"), counting_loader(&calls, Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(cache.invalidate(&QueryKey::new("posts")), 1);
        assert!(subscription.changed().await);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let entry = subscription.entry().unwrap();
        assert_eq!(entry.data::<usize>().as_deref(), Some(&2));
        assert!(!entry.is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_without_subscribers_defers_refetch() {
        let cache = QueryCache::new(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .fetch(key("feed"), counting_loader(&calls, Duration::ZERO))
            .await
            .unwrap();
        cache.invalidate(&key("feed"));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.get(&key("feed")).unwrap().is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn response_settling_after_invalidation_is_discarded() {
        let cache = QueryCache::new(CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let pending = {
            let cache = cache.clone();
            let loader = counting_loader(&calls, Duration::from_millis(100));
            tokio::spawn(async move { cache.fetch(key("feed"), loader).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        cache.invalidate(&key("feed"));
        let waited = pending.await.unwrap().unwrap();
        assert_eq!(*waited, 1, "the waiting caller still receives its response");

        let entry = cache.get(&key("feed")).unwrap();
        assert!(entry.value.is_none(), "superseded response was not written");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_entries_are_evicted_after_gc_window() {
        let config = CacheConfig::new(Duration::from_secs(60));
        let cache = QueryCache::new(config);

        let subscription = cache.subscribe(key("feed"));
        cache.fetch(key("feed"), || async { Ok(1u8) }).await.unwrap();

        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(cache.get(&key("feed")).is_some(), "subscribed entries survive");

        drop(subscription);
        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(&key("feed")).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(&key("feed")).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_fresh_waits_for_the_server() {
        let cache = QueryCache::new(CacheConfig::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .fetch(key("feed"), counting_loader(&calls, Duration::ZERO))
            .await
            .unwrap();
        let fresh = cache
            .fetch_fresh(key("feed"), counting_loader(&calls, Duration::from_millis(10)))
            .await
            .unwrap();

        assert_eq!(*fresh, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get_data::<usize>(&key("feed")).as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn remove_by_prefix() {
        let cache = QueryCache::new(CacheConfig::default());
        cache.fetch(key("a"), || async { Ok(1u8) }).await.unwrap();
        cache.fetch(key("b"), || async { Ok(2u8) }).await.unwrap();
        cache
            .fetch(QueryKey::new("tags"), || async { Ok(3u8) })
            .await
            .unwrap();

        assert_eq!(cache.remove(&QueryKey::new("posts")), 2);
        assert_eq!(cache.len(), 1);
    }
}
