//! Debounced value publication.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::lock;
use crate::scheduler::{Scheduler, TaskHandle};

/// Publishes a value only after input has been quiet for a fixed delay.
///
/// Every [`push`](Self::push) cancels the pending publication and schedules
/// a new one. [`flush`](Self::flush) publishes immediately.
pub struct Debouncer<T> {
    delay: Duration,
    scheduler: Scheduler,
    pending: Mutex<Option<TaskHandle>>,
    published: Arc<watch::Sender<T>>,
}

impl<T> Debouncer<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(delay: Duration, initial: T) -> Self {
        Self::with_scheduler(Scheduler::new(), delay, initial)
    }

    /// Create a debouncer sharing an existing scheduler.
    pub fn with_scheduler(scheduler: Scheduler, delay: Duration, initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            delay,
            scheduler,
            pending: Mutex::new(None),
            published: Arc::new(tx),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Publish `value` once `delay` passes without another push.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn push(&self, value: T) {
        let mut pending = lock(&self.pending);
        if let Some(handle) = pending.take() {
            self.scheduler.cancel(&handle);
        }

        let published = Arc::clone(&self.published);
        *pending = Some(self.scheduler.schedule(self.delay, move || {
            published.send_replace(value);
        }));
    }

    /// Drop any pending publication and publish `value` now.
    pub fn flush(&self, value: T) {
        self.cancel();
        self.published.send_replace(value);
    }

    /// Drop the pending publication, if any.
    pub fn cancel(&self) -> bool {
        match lock(&self.pending).take() {
            Some(handle) => self.scheduler.cancel(&handle),
            None => false,
        }
    }

    /// Receiver of published values.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.published.subscribe()
    }
}

impl<T> Debouncer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The last published value.
    pub fn current(&self) -> T {
        self.published.borrow().clone()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.pending).take() {
            self.scheduler.cancel(&handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn publishes_after_quiet_period() {
        let debouncer = Debouncer::new(Duration::from_millis(300), String::new());

        debouncer.push("a".to_string());
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(debouncer.current(), "");

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(debouncer.current(), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_pushes_publish_only_the_last() {
        let debouncer = Debouncer::new(Duration::from_millis(300), String::new());
        let mut rx = debouncer.subscribe();

        for value in ["a", "ab", "abc"] {
            debouncer.push(value.to_string());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(!rx.has_changed().unwrap());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn flush_is_immediate_and_cancels_pending() {
        let debouncer = Debouncer::new(Duration::from_millis(300), "start".to_string());

        debouncer.push("typed".to_string());
        debouncer.flush(String::new());
        assert_eq!(debouncer.current(), "");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(debouncer.current(), "");
    }
}
