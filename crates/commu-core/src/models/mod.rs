//! Resource models as the REST API returns them.
//!
//! Field names follow the backend's camelCase JSON. Counters default to zero
//! and flags to `false` when the backend omits them (anonymous requests).

mod community;
mod post;

pub use community::{AuthSession, Channel, ChannelSummary, Tag, UserProfile, UserSummary};
pub use post::{Comment, Post, ToggleOutcome};
