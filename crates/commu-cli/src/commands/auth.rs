//! Login, whoami and logout.

use anyhow::{Context, Result};
use colored::Colorize;

use commu_core::{Api, Credentials};

use crate::cli::LoginArgs;
use crate::output;
use crate::session::{self, storage};

pub async fn login(api: Option<&str>, args: LoginArgs) -> Result<()> {
    let backend = session::connect(api)?;
    let credentials = Credentials::new(&args.email, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let session = backend
        .api
        .login(&credentials)
        .await
        .context("Failed to login")?;

    let base = backend.api.client().base().to_string();
    storage::save_session(&storage::StoredSession::new(&base, &session))
        .context("Failed to save session")?;

    output::success("Logged in successfully");
    println!();
    output::field("User", session.user.username.as_str());
    output::field("API", &base);

    Ok(())
}

pub async fn whoami(api: Option<&str>) -> Result<()> {
    let backend = session::connect(api)?;
    backend.require_login()?;

    let me = backend.api.me().await.context("Failed to fetch profile")?;

    output::field("User", me.username.as_str());
    if let Some(name) = &me.display_name {
        output::field("Name", name);
    }
    output::field("Posts", &me.post_count.to_string());
    output::field("API", &backend.api.client().base().to_string());

    Ok(())
}

pub fn logout() -> Result<()> {
    if storage::clear_session()? {
        output::success("Logged out");
    } else {
        eprintln!("{}", "No active session.".dimmed());
    }
    Ok(())
}
