//! Popular tags and the debounced suggestion pipeline.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use colored::Colorize;
use tracing::debug;

use commu_core::Api;
use commu_sync::{SuggestConfig, TagSuggestions};

use crate::output;
use crate::session;

/// How long to wait for the last search after typing stops.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Args, Debug)]
pub struct TagsCommand {
    #[command(subcommand)]
    pub command: TagsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum TagsSubcommand {
    /// Most used tags
    Popular(PopularArgs),

    /// Type text into the suggestion box and show what it suggests
    Suggest(SuggestArgs),
}

#[derive(Args, Debug)]
pub struct PopularArgs {
    #[arg(long, default_value_t = 10)]
    pub limit: u32,
}

#[derive(Args, Debug)]
pub struct SuggestArgs {
    pub text: String,

    /// Delay between simulated keystrokes
    #[arg(long, default_value_t = 100)]
    pub delay_ms: u64,
}

pub async fn handle(api: Option<&str>, cmd: TagsCommand) -> Result<()> {
    match cmd.command {
        TagsSubcommand::Popular(args) => popular(api, args).await,
        TagsSubcommand::Suggest(args) => suggest(api, args).await,
    }
}

async fn popular(api: Option<&str>, args: PopularArgs) -> Result<()> {
    let backend = session::connect(api)?;
    let tags = backend
        .api
        .popular_tags(args.limit)
        .await
        .context("Failed to fetch popular tags")?;

    if tags.is_empty() {
        eprintln!("{}", "No tags yet.".dimmed());
    }
    for tag in &tags {
        output::tag_line(tag);
    }
    Ok(())
}

async fn suggest(api: Option<&str>, args: SuggestArgs) -> Result<()> {
    let backend = session::connect(api)?;
    let config = SuggestConfig::default();
    let suggestions = TagSuggestions::new(Arc::clone(&backend.api), backend.cache.clone(), config);

    let mut typed = String::new();
    for ch in args.text.chars() {
        typed.push(ch);
        debug!(query = %typed, "keystroke");
        suggestions.set_query(typed.clone());
        tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
    }

    let target = args.text.trim().to_string();
    let mut states = suggestions.subscribe();
    let wait = states.wait_for(|state| state.debounced_query == target && !state.is_loading);
    let settled = matches!(
        tokio::time::timeout(suggestions.config().debounce + SETTLE_TIMEOUT, wait).await,
        Ok(Ok(_))
    );
    if !settled {
        bail!("Timed out waiting for suggestions");
    }

    let state = suggestions.state();
    if let Some(error) = &state.error {
        bail!("Tag search failed: {}", error);
    }

    if target.chars().count() < suggestions.config().min_length {
        eprintln!("{}", "Query too short, popular tags:".dimmed());
        for tag in &state.popular_tags {
            output::tag_line(tag);
        }
        return Ok(());
    }

    if state.suggestions.is_empty() {
        eprintln!("{}", format!("No tags match '{}'.", target).dimmed());
    }
    for tag in &state.suggestions {
        output::tag_line(tag);
    }
    Ok(())
}
