//! Error types for the Commu client.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, protocol, not-found, input validation and
//! cache misuse errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for Commu client operations.
///
/// The type is `Clone` so that one settled request can be handed to every
/// caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Network transport errors (connection, timeout, HTTP-level failure).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (invalid credentials, missing session).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Protocol errors (non-success status, `success: false` envelopes).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The requested resource does not exist.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Input validation errors, raised before any request is issued.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Query cache misuse.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl Error {
    /// Create a not-found error for the given resource description.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Error::NotFound {
            resource: resource.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, rate limiting and server-side (5xx) errors are
    /// transient. Validation, authentication and not-found errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Protocol(err) => err.status == 429 || err.status >= 500,
            _ => false,
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("malformed response: {message}")]
    Decode { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication-related errors.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Invalid credentials provided.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The request needs a session but none is active.
    #[error("not logged in")]
    NotLoggedIn,

    /// Session has expired or the token was rejected.
    #[error("session expired")]
    SessionExpired,
}

/// Protocol-level errors from API responses.
#[derive(Debug, Clone)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error code from the envelope (if present).
    pub code: Option<String>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, code: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            code,
            message,
        }
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401
            || self.code.as_deref() == Some("UNAUTHORIZED")
            || self.code.as_deref() == Some("TOKEN_EXPIRED")
    }
}

/// Input validation errors.
#[derive(Debug, Clone, Error)]
pub enum InvalidInputError {
    /// Invalid identifier (post id, comment id, username, channel slug).
    #[error("invalid {kind} '{value}': {reason}")]
    Identifier {
        kind: &'static str,
        value: String,
        reason: String,
    },

    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Page size outside the accepted range.
    #[error("invalid page limit {limit}: must be between 1 and {max}")]
    Limit { limit: u32, max: u32 },

    /// Page numbers start at 1.
    #[error("invalid page number 0")]
    Page,

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

/// Query cache misuse.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// A key was read with a different value type than it was stored with.
    #[error("cache entry '{key}' holds a different value type")]
    TypeMismatch { key: String },
}
