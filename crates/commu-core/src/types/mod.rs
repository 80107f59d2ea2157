//! Validated value types.
//!
//! These types enforce their invariants at construction time, so a request
//! built from them never needs to be rejected for a malformed path segment.

mod api_url;
mod ids;

pub use api_url::ApiUrl;
pub use ids::{ChannelSlug, CommentId, PostId, Username};
