//! Login state and backend wiring shared by the commands.

pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use commu_core::{AccessToken, ApiUrl};
use commu_http::HttpApi;
use commu_sync::{CacheConfig, QueryCache};

/// Backend used when neither `--api` nor a stored session names one.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Overrides the stored access token.
pub const TOKEN_ENV: &str = "COMMU_TOKEN";

/// API client and query cache of one invocation.
pub struct Backend {
    pub api: Arc<HttpApi>,
    pub cache: QueryCache,
}

impl Backend {
    /// Fail unless a token is attached.
    pub fn require_login(&self) -> Result<()> {
        if self.api.client().has_token() {
            Ok(())
        } else {
            anyhow::bail!("No active session. Run 'commu login' first.")
        }
    }
}

/// Resolve the backend URL and credentials for this invocation.
///
/// The stored token is only sent to the backend it was issued by.
pub fn connect(api: Option<&str>) -> Result<Backend> {
    let session = storage::load_session().context("Failed to load session")?;

    let url = match (api, &session) {
        (Some(url), _) => url.to_string(),
        (None, Some(stored)) => stored.api.clone(),
        (None, None) => DEFAULT_API_URL.to_string(),
    };
    let base = ApiUrl::new(&url).context("Invalid API URL")?;
    let api = HttpApi::new(base.clone()).context("Failed to create HTTP client")?;

    let token = match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.is_empty() => Some(AccessToken::new(token)),
        _ => session
            .as_ref()
            .filter(|stored| stored.api == base.to_string())
            .map(|stored| stored.access_token.clone()),
    };
    let api = match token {
        Some(token) => {
            debug!("using stored access token");
            api.with_token(token)
        }
        None => api,
    };

    Ok(Backend {
        api: Arc::new(api),
        cache: QueryCache::new(CacheConfig::default()),
    })
}
