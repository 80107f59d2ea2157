//! Like and bookmark through the optimistic toggle.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use colored::Colorize;

use commu_core::{Api, PostId};
use commu_http::HttpApi;
use commu_sync::paginate::PostSource;
use commu_sync::{Activation, OptimisticToggle, ToggleConfig, ToggleMutation};

use crate::cli::ToggleArgs;
use crate::output;
use crate::session;

#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Like,
    Bookmark,
}

pub async fn run(api: Option<&str>, kind: Kind, args: ToggleArgs) -> Result<()> {
    let backend = session::connect(api)?;
    backend.require_login()?;
    let id = PostId::new(&args.id).context("Invalid post id")?;

    let post = backend
        .api
        .get_post(&id)
        .await
        .context("Failed to fetch post")?;

    let api = Arc::clone(&backend.api);
    let config = ToggleConfig::default();
    let listings = vec![PostSource::<HttpApi>::resource_key()];

    match kind {
        Kind::Like => {
            let toggle = OptimisticToggle::like(api, &post, config)
                .invalidates(backend.cache.clone(), listings);
            activate(toggle).await
        }
        Kind::Bookmark => {
            let toggle = OptimisticToggle::bookmark(api, &post, config)
                .invalidates(backend.cache.clone(), listings);
            activate(toggle).await
        }
    }
}

async fn activate<M: ToggleMutation>(toggle: OptimisticToggle<M>) -> Result<()> {
    output::field("Current", &toggle.label());

    let mut display = toggle.subscribe();
    let pending = toggle.activate();
    tokio::pin!(pending);

    let activation = tokio::select! {
        biased;
        activation = &mut pending => activation,
        _ = display.changed() => {
            output::field("Predicted", &toggle.label());
            pending.await
        }
    };

    match activation {
        Activation::Confirmed(_) => {
            output::success(&format!("Confirmed: {}", toggle.label()));
            Ok(())
        }
        Activation::RolledBack(err) => {
            eprintln!("{}", format!("Rolled back to: {}", toggle.label()).yellow());
            Err(anyhow!(err).context("Server rejected the change"))
        }
        Activation::Ignored | Activation::Superseded => {
            output::warning("Nothing was changed");
            Ok(())
        }
    }
}
