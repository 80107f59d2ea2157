//! Optimistic like/bookmark toggles.
//!
//! An [`OptimisticToggle`] owns the displayed state of one boolean relation
//! (liked, bookmarked) plus an optional counter. Activating it flips the
//! state, issues the mutation, and on settlement either confirms or rolls
//! back:
//!
//! ```text
//! Settled(server) --activate--> Predicting(server, predicted)
//! Predicting --ok-->  Settled(predicted)      (or the server's answer when reconciling)
//! Predicting --err--> Settled(server)
//! ```
//!
//! Activations are numbered and only successes are authoritative. A success
//! becomes the confirmed state unless a newer activation was already
//! confirmed, so the highest-numbered successful activation wins regardless
//! of arrival order. A failure leaves the confirmed state alone and takes
//! the display back to the value it had before that activation. Once
//! nothing is in flight the display shows the confirmed state.
//!
//! Dropping an [`activate`](OptimisticToggle::activate) future before it
//! settles counts as a failure of that activation.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, warn};

use commu_core::{Api, Error, Post, PostId, Result, ToggleOutcome};

use crate::cache::{QueryCache, QueryKey};
use crate::lock;

/// Displayed state of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToggleState {
    pub active: bool,
    pub count: Option<u64>,
}

impl ToggleState {
    pub fn new(active: bool, count: Option<u64>) -> Self {
        Self { active, count }
    }

    /// Like state of a post as listed.
    pub fn liked(post: &Post) -> Self {
        Self::new(post.is_liked, Some(post.like_count))
    }

    /// Bookmark state of a post as listed.
    pub fn bookmarked(post: &Post) -> Self {
        Self::new(post.is_bookmarked, None)
    }

    /// The state after one activation: flag flipped, counter moved by one.
    pub fn flipped(self) -> Self {
        let count = self.count.map(|count| {
            if self.active {
                count.saturating_sub(1)
            } else {
                count.saturating_add(1)
            }
        });
        Self::new(!self.active, count)
    }
}

/// Where a toggle is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TogglePhase {
    Settled,
    /// At least one activation is in flight.
    Predicting {
        server: ToggleState,
        predicted: ToggleState,
    },
}

/// Result of [`OptimisticToggle::activate`].
#[derive(Debug, Clone)]
pub enum Activation {
    /// Disabled, or refused by [`InFlightPolicy::Serialize`]. No call was made.
    Ignored,
    /// The server accepted the change.
    Confirmed(ToggleState),
    /// The call failed and the display went back to the confirmed state.
    RolledBack(Error),
    /// A newer activation was already confirmed; this response was ignored.
    Superseded,
}

/// What to do when activated while a call is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InFlightPolicy {
    /// One call per activation.
    #[default]
    Concurrent,
    /// Ignore activations until the running call settles.
    Serialize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleConfig {
    /// Show the predicted state before the call settles.
    pub optimistic: bool,
    pub disabled: bool,
    pub show_label: bool,
    pub show_count: bool,
    pub size: ButtonSize,
    pub in_flight: InFlightPolicy,
    /// Take the server's answer as the confirmed state instead of the
    /// prediction.
    pub reconcile: bool,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            optimistic: true,
            disabled: false,
            show_label: true,
            show_count: true,
            size: ButtonSize::default(),
            in_flight: InFlightPolicy::default(),
            reconcile: false,
        }
    }
}

/// The server call behind a toggle.
#[async_trait]
pub trait ToggleMutation: Send + Sync + 'static {
    /// Labels for the inactive and active states.
    fn labels(&self) -> (&'static str, &'static str);

    /// Set the relation to `active`.
    async fn apply(&self, active: bool) -> Result<ToggleOutcome>;
}

/// Like or unlike a post.
pub struct LikeMutation<A> {
    api: Arc<A>,
    post: PostId,
}

impl<A: Api> LikeMutation<A> {
    pub fn new(api: Arc<A>, post: PostId) -> Self {
        Self { api, post }
    }
}

#[async_trait]
impl<A: Api> ToggleMutation for LikeMutation<A> {
    fn labels(&self) -> (&'static str, &'static str) {
        ("Like", "Liked")
    }

    async fn apply(&self, active: bool) -> Result<ToggleOutcome> {
        self.api.set_like(&self.post, active).await
    }
}

/// Bookmark a post or remove its bookmark.
pub struct BookmarkMutation<A> {
    api: Arc<A>,
    post: PostId,
}

impl<A: Api> BookmarkMutation<A> {
    pub fn new(api: Arc<A>, post: PostId) -> Self {
        Self { api, post }
    }
}

#[async_trait]
impl<A: Api> ToggleMutation for BookmarkMutation<A> {
    fn labels(&self) -> (&'static str, &'static str) {
        ("Bookmark", "Bookmarked")
    }

    async fn apply(&self, active: bool) -> Result<ToggleOutcome> {
        self.api.set_bookmark(&self.post, active).await
    }
}

type ErrorCallback = Box<dyn Fn(&Error) + Send + Sync>;

struct ToggleInner {
    confirmed: ToggleState,
    /// Target of the most recent activation.
    latest: ToggleState,
    next_seq: u64,
    /// Sequence number of the newest confirmed activation.
    last_confirmed: u64,
    in_flight: usize,
}

/// An optimistic toggle over a [`ToggleMutation`].
pub struct OptimisticToggle<M> {
    mutation: M,
    config: ToggleConfig,
    inner: Mutex<ToggleInner>,
    display: watch::Sender<ToggleState>,
    on_error: Option<ErrorCallback>,
    invalidate: Option<(QueryCache, Vec<QueryKey>)>,
}

impl<A: Api> OptimisticToggle<LikeMutation<A>> {
    /// Like toggle for `post`, starting from its listed state.
    pub fn like(api: Arc<A>, post: &Post, config: ToggleConfig) -> Self {
        Self::new(
            LikeMutation::new(api, post.id.clone()),
            ToggleState::liked(post),
            config,
        )
    }
}

impl<A: Api> OptimisticToggle<BookmarkMutation<A>> {
    /// Bookmark toggle for `post`, starting from its listed state.
    pub fn bookmark(api: Arc<A>, post: &Post, config: ToggleConfig) -> Self {
        Self::new(
            BookmarkMutation::new(api, post.id.clone()),
            ToggleState::bookmarked(post),
            config,
        )
    }
}

impl<M: ToggleMutation> OptimisticToggle<M> {
    pub fn new(mutation: M, initial: ToggleState, config: ToggleConfig) -> Self {
        let (display, _) = watch::channel(initial);
        Self {
            mutation,
            config,
            inner: Mutex::new(ToggleInner {
                confirmed: initial,
                latest: initial,
                next_seq: 0,
                last_confirmed: 0,
                in_flight: 0,
            }),
            display,
            on_error: None,
            invalidate: None,
        }
    }

    /// Call `callback` with the error of every rolled back activation.
    pub fn on_error(mut self, callback: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Invalidate `keys` in `cache` after every confirmed activation.
    pub fn invalidates(mut self, cache: QueryCache, keys: Vec<QueryKey>) -> Self {
        self.invalidate = Some((cache, keys));
        self
    }

    pub fn config(&self) -> &ToggleConfig {
        &self.config
    }

    /// The state to render.
    pub fn display_state(&self) -> ToggleState {
        *self.display.borrow()
    }

    /// Receiver of every display change.
    pub fn subscribe(&self) -> watch::Receiver<ToggleState> {
        self.display.subscribe()
    }

    pub fn phase(&self) -> TogglePhase {
        let inner = lock(&self.inner);
        if inner.in_flight == 0 {
            TogglePhase::Settled
        } else {
            TogglePhase::Predicting {
                server: inner.confirmed,
                predicted: inner.latest,
            }
        }
    }

    /// Button text for the displayed state.
    pub fn label(&self) -> String {
        let state = self.display_state();
        let (inactive, active) = self.mutation.labels();
        let mut parts = Vec::new();
        if self.config.show_label {
            parts.push(if state.active { active } else { inactive }.to_string());
        }
        if self.config.show_count {
            if let Some(count) = state.count {
                parts.push(count.to_string());
            }
        }
        parts.join(" ")
    }

    /// Flip the toggle and send the change to the server.
    pub async fn activate(&self) -> Activation {
        let (seq, base, target) = {
            let mut inner = lock(&self.inner);
            if self.config.disabled {
                return Activation::Ignored;
            }
            if self.config.in_flight == InFlightPolicy::Serialize && inner.in_flight > 0 {
                debug!("toggle busy, ignoring activation");
                return Activation::Ignored;
            }

            let base = inner.latest;
            let target = base.flipped();
            inner.latest = target;
            inner.next_seq += 1;
            inner.in_flight += 1;
            if self.config.optimistic {
                self.display.send_replace(target);
            }
            (inner.next_seq, base, target)
        };

        let mut pending = PendingActivation {
            toggle: self,
            seq,
            base,
            armed: true,
        };
        let result = self.mutation.apply(target.active).await;
        pending.armed = false;

        let activation = {
            let mut inner = lock(&self.inner);
            inner.in_flight -= 1;

            if seq < inner.last_confirmed {
                debug!(seq, confirmed = inner.last_confirmed, "newer activation already confirmed");
                if inner.in_flight == 0 {
                    self.settle_display(&mut inner);
                }
                return Activation::Superseded;
            }

            match result {
                Ok(outcome) => {
                    inner.last_confirmed = seq;
                    inner.confirmed = if self.config.reconcile {
                        ToggleState::new(outcome.active, outcome.count.or(target.count))
                    } else {
                        target
                    };
                    if inner.in_flight == 0 {
                        self.settle_display(&mut inner);
                    } else if !self.config.optimistic {
                        self.display.send_replace(inner.confirmed);
                    }
                    Activation::Confirmed(inner.confirmed)
                }
                Err(err) => {
                    warn!(error = %err, "toggle failed, rolling back");
                    self.revert(&mut inner, seq, base);
                    Activation::RolledBack(err)
                }
            }
        };

        match &activation {
            Activation::Confirmed(_) => {
                if let Some((cache, keys)) = &self.invalidate {
                    for key in keys {
                        cache.invalidate(key);
                    }
                }
            }
            Activation::RolledBack(err) => {
                if let Some(callback) = &self.on_error {
                    callback(err);
                }
            }
            _ => {}
        }
        activation
    }

    /// Undo the prediction of activation `seq`, whose pre-action value was
    /// `base`.
    fn revert(&self, inner: &mut ToggleInner, seq: u64, base: ToggleState) {
        if inner.in_flight == 0 {
            self.settle_display(inner);
        } else if seq == inner.next_seq {
            inner.latest = base;
            if self.config.optimistic {
                self.display.send_replace(base);
            }
        }
    }

    fn settle_display(&self, inner: &mut ToggleInner) {
        inner.latest = inner.confirmed;
        self.display.send_replace(inner.confirmed);
    }
}

/// Rolls an activation back if its future is dropped before settling.
struct PendingActivation<'a, M: ToggleMutation> {
    toggle: &'a OptimisticToggle<M>,
    seq: u64,
    base: ToggleState,
    armed: bool,
}

impl<M: ToggleMutation> Drop for PendingActivation<'_, M> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!(seq = self.seq, "activation dropped before settling");
        let mut inner = lock(&self.toggle.inner);
        inner.in_flight -= 1;
        self.toggle.revert(&mut inner, self.seq, self.base);
    }
}

impl<M> fmt::Debug for OptimisticToggle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimisticToggle")
            .field("display", &*self.display.borrow())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
