//! Post listings through the viewport-driven feed.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use commu_core::{ChannelSlug, Post, PostFilters, PostScope, Username};
use commu_sync::paginate::{Feed, FeedConfig, FetchMode, FetchNext, PostSource, ViewportClass};

use crate::cli::{FeedArgs, Mine};
use crate::output;
use crate::session;

pub async fn run(api: Option<&str>, args: FeedArgs) -> Result<()> {
    let backend = session::connect(api)?;
    let filters = filters(&args)?;
    if filters.scope.requires_auth() {
        backend.require_login()?;
    }

    let feed = Feed::new(
        backend.cache.clone(),
        PostSource::new(Arc::clone(&backend.api)),
        filters,
        FeedConfig {
            limit: args.limit,
            ..FeedConfig::default()
        },
    );
    feed.set_viewport(ViewportClass::from(args.device));

    match feed.mode() {
        FetchMode::Discrete => {
            let page = feed
                .fetch_page(args.page)
                .await
                .context("Failed to list posts")?;
            if page.is_empty() {
                eprintln!("{}", "No posts found.".dimmed());
            }
            print_posts(&page.items, args.json)?;
            if !args.json {
                output::page_footer(&page.meta);
            }
        }
        FetchMode::Infinite => {
            while feed.state().has_next_page {
                match feed.fetch_next().await.context("Failed to list posts")? {
                    FetchNext::Appended(page) => print_posts(&page.items, args.json)?,
                    _ => break,
                }
            }
            let total = feed.state().data.len();
            eprintln!("{}", format!("{} posts, end of feed", total).dimmed());
        }
    }

    Ok(())
}

fn filters(args: &FeedArgs) -> Result<PostFilters> {
    let scope = if let Some(channel) = &args.channel {
        PostScope::Channel(ChannelSlug::new(channel).context("Invalid channel")?)
    } else if let Some(author) = &args.author {
        PostScope::Author(Username::new(author).context("Invalid username")?)
    } else if let Some(tag) = &args.tag {
        PostScope::Tag(tag.trim_start_matches('#').to_string())
    } else if let Some(search) = &args.search {
        PostScope::Search(search.clone())
    } else {
        match args.mine {
            Some(Mine::Posts) => PostScope::MyPosts,
            Some(Mine::Likes) => PostScope::MyLikes,
            Some(Mine::Bookmarks) => PostScope::MyBookmarks,
            None => PostScope::Feed,
        }
    };
    Ok(PostFilters::new(scope, args.sort.into()))
}

fn print_posts(posts: &[Post], json: bool) -> Result<()> {
    for post in posts {
        if json {
            output::json(post)?;
        } else {
            output::post_line(post);
        }
    }
    Ok(())
}
