//! Single posts and their comments.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use futures_util::StreamExt;

use commu_core::{Api, PostId};
use commu_sync::paginate::{CommentSource, InfiniteQuery};

use crate::cli::{CommentArgs, PostArgs};
use crate::output;
use crate::session;

/// Comments fetched per request when listing a thread.
const COMMENT_PAGE_SIZE: u32 = 50;

pub async fn show(api: Option<&str>, args: PostArgs) -> Result<()> {
    let backend = session::connect(api)?;
    let id = PostId::new(&args.id).context("Invalid post id")?;

    let post = backend
        .api
        .get_post(&id)
        .await
        .context("Failed to fetch post")?;

    println!("{}", post.title.bold());
    output::field("Author", post.author.username.as_str());
    if let Some(channel) = &post.channel {
        output::field("Channel", channel.slug.as_str());
    }
    if !post.tags.is_empty() {
        output::field("Tags", &post.tags.join(", "));
    }
    output::field("Likes", &post.like_count.to_string());
    output::field("Posted", &post.created_at.to_rfc3339());
    println!();
    println!("{}", post.content);

    if !args.comments {
        return Ok(());
    }

    println!();
    let thread = InfiniteQuery::new(
        backend.cache.clone(),
        CommentSource::new(Arc::clone(&backend.api)),
        id,
        COMMENT_PAGE_SIZE,
    );
    let mut comments = Box::pin(thread.into_stream());
    let mut count = 0;
    while let Some(comment) = comments.next().await {
        let comment = comment.context("Failed to list comments")?;
        output::comment_line(&comment);
        count += 1;
    }
    if count == 0 {
        eprintln!("{}", "No comments yet.".dimmed());
    }

    Ok(())
}

pub async fn comment(api: Option<&str>, args: CommentArgs) -> Result<()> {
    let backend = session::connect(api)?;
    backend.require_login()?;
    let id = PostId::new(&args.id).context("Invalid post id")?;

    let comment = backend
        .api
        .create_comment(&id, &args.text)
        .await
        .context("Failed to create comment")?;

    output::success("Comment posted");
    output::field("Comment", comment.id.as_str());

    Ok(())
}
