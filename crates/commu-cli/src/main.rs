//! commu - CLI tool for exploring a Commu community backend.
//!
//! A thin wrapper over `commu-sync` and `commu-http`: every listing goes
//! through the query cache and the pagination adapters, toggles through the
//! optimistic state machine, and tag suggestions through the debounced
//! pipeline.

mod cli;
mod commands;
mod output;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{auth, browse, feed, post, tags, toggle};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    let api = cli.api.as_deref();
    match cli.command {
        Commands::Login(args) => auth::login(api, args).await,
        Commands::Whoami => auth::whoami(api).await,
        Commands::Logout => auth::logout(),
        Commands::Feed(args) => feed::run(api, args).await,
        Commands::Post(args) => post::show(api, args).await,
        Commands::Comment(args) => post::comment(api, args).await,
        Commands::Like(args) => toggle::run(api, toggle::Kind::Like, args).await,
        Commands::Bookmark(args) => toggle::run(api, toggle::Kind::Bookmark, args).await,
        Commands::Channels => browse::channels(api).await,
        Commands::User(args) => browse::user(api, args).await,
        Commands::Tags(cmd) => tags::handle(api, cmd).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
