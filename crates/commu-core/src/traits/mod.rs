//! Core traits for the remote API.

mod api;

pub use api::Api;
