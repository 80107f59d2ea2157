//! Output formatting helpers.

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use commu_core::{Comment, PaginationMeta, Post, Tag};

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning to stderr.
pub fn warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as compact JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    println!("{}", json);
    Ok(())
}

/// One line per post: id, title, author and counters.
pub fn post_line(post: &Post) {
    let channel = post
        .channel
        .as_ref()
        .map(|channel| format!(" #{}", channel.slug))
        .unwrap_or_default();
    println!(
        "{:>6}  {}  {}{}  {} {}  {}",
        post.id.as_str().dimmed(),
        post.title.bold(),
        format!("@{}", post.author.username).cyan(),
        channel.dimmed(),
        format!("♥{}", post.like_count).red(),
        format!("💬{}", post.comment_count).dimmed(),
        age(post.created_at, Utc::now()).dimmed(),
    );
}

/// Coarse age such as `5m`, `3h` or `2d`.
pub fn age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created);
    if elapsed.num_minutes() < 1 {
        "now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{}m", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{}h", elapsed.num_hours())
    } else {
        format!("{}d", elapsed.num_days())
    }
}

pub fn comment_line(comment: &Comment) {
    println!(
        "{}  {}  {}",
        comment.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
        format!("@{}", comment.author.username).cyan(),
        comment.content
    );
}

pub fn tag_line(tag: &Tag) {
    println!("{}  {}", format!("#{}", tag.name).green(), tag.post_count.to_string().dimmed());
}

/// Footer of a discrete page.
pub fn page_footer(meta: &PaginationMeta) {
    eprintln!(
        "{}",
        format!(
            "Page {} of {} ({} posts)",
            meta.page,
            meta.total_pages.max(1),
            meta.total
        )
        .dimmed()
    );
}
