//! Subcommand implementations.

pub mod auth;
pub mod browse;
pub mod feed;
pub mod post;
pub mod tags;
pub mod toggle;
