//! Session storage for persisting login state.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use commu_core::{AccessToken, AuthSession, RefreshToken};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Stored session data.
#[derive(Serialize, Deserialize)]
pub struct StoredSession {
    pub api: String,
    pub username: String,
    pub access_token: AccessToken,
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
}

impl StoredSession {
    pub fn new(api: &str, session: &AuthSession) -> Self {
        Self {
            api: api.to_string(),
            username: session.user.username.to_string(),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
        }
    }
}

/// Get the session file path.
fn session_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "commu").context("Could not determine data directory")?;

    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;

    Ok(data_dir.join("session.json"))
}

/// Save a session to disk.
pub fn save_session(session: &StoredSession) -> Result<()> {
    let path = session_path()?;
    let json = serde_json::to_string_pretty(session)?;

    fs::write(&path, &json).context("Failed to write session file")?;

    // Set restrictive permissions (Unix only)
    #[cfg(unix)]
    {
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&path, perms)?;
    }

    Ok(())
}

/// Load the stored session, if any.
pub fn load_session() -> Result<Option<StoredSession>> {
    let path = session_path()?;

    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(&path).context("Failed to read session file")?;
    let stored = serde_json::from_str(&json).context("Invalid session file")?;
    Ok(Some(stored))
}

/// Clear the stored session. Returns whether there was one.
pub fn clear_session() -> Result<bool> {
    let path = session_path()?;

    if !path.exists() {
        return Ok(false);
    }

    fs::remove_file(&path).context("Failed to remove session file")?;
    Ok(true)
}
