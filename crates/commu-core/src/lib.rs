//! commu-core - Core types and traits for the Commu community client.
//!
//! Holds the resource models, the response envelope, pagination types, the
//! unified [`Error`], and the [`Api`] trait that HTTP (or test) backends
//! implement.

pub mod credentials;
pub mod envelope;
pub mod error;
pub mod models;
pub mod page;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::Credentials;
pub use envelope::ApiResponse;
pub use error::Error;
pub use models::{
    AuthSession, Channel, ChannelSummary, Comment, Post, Tag, ToggleOutcome, UserProfile,
    UserSummary,
};
pub use page::{Page, PageRequest, PaginationMeta, PostFilters, PostScope, SortOrder};
pub use tokens::{AccessToken, RefreshToken};
pub use traits::Api;
pub use types::{ApiUrl, ChannelSlug, CommentId, PostId, Username};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
