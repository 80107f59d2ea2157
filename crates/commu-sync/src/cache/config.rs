//! Cache tuning.

use std::time::Duration;

/// Default time a fetched value stays fresh.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(60);

/// Timing and retry policy of a [`QueryCache`](super::QueryCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a successful value is served without refetching.
    pub stale_time: Duration,
    /// How long an entry without subscribers survives before eviction.
    pub gc_time: Duration,
    /// Automatic retries of a transient failure before it is surfaced.
    pub retry: u32,
    /// Pause before each retry.
    pub retry_delay: Duration,
}

impl CacheConfig {
    /// A policy with the given staleness window and a collection window
    /// five times as long.
    pub fn new(stale_time: Duration) -> Self {
        Self {
            stale_time,
            gc_time: stale_time * 5,
            retry: 1,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIME)
    }
}
