//! commu-http - REST implementation of the Commu [`Api`](commu_core::Api).
//!
//! [`ApiClient`] handles transport: base URL, bearer token, the response
//! envelope and status mapping. [`HttpApi`] maps each API operation onto
//! its endpoint.

mod api;
mod client;
pub mod endpoints;

pub use api::HttpApi;
pub use client::ApiClient;
