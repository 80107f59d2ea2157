//! Channels and user profiles.

use anyhow::{Context, Result};
use colored::Colorize;

use commu_core::{Api, Username};

use crate::cli::UserArgs;
use crate::output;
use crate::session;

pub async fn channels(api: Option<&str>) -> Result<()> {
    let backend = session::connect(api)?;
    let channels = backend
        .api
        .list_channels()
        .await
        .context("Failed to list channels")?;

    if channels.is_empty() {
        eprintln!("{}", "No channels found.".dimmed());
        return Ok(());
    }

    for channel in &channels {
        println!(
            "{}  {}  {}",
            format!("#{}", channel.slug).green(),
            channel.name.bold(),
            format!("{} posts", channel.post_count).dimmed()
        );
        if let Some(description) = &channel.description {
            println!("    {}", description);
        }
    }

    Ok(())
}

pub async fn user(api: Option<&str>, args: UserArgs) -> Result<()> {
    let backend = session::connect(api)?;
    let username = Username::new(&args.username).context("Invalid username")?;

    let profile = backend
        .api
        .get_user(&username)
        .await
        .context("Failed to fetch user")?;

    output::field("User", profile.username.as_str());
    if let Some(name) = &profile.display_name {
        output::field("Name", name);
    }
    if let Some(bio) = &profile.bio {
        output::field("Bio", bio);
    }
    output::field("Posts", &profile.post_count.to_string());
    output::field("Followers", &profile.follower_count.to_string());

    Ok(())
}
