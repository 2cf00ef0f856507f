use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use weighlog_core::auth::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite database in the data directory
    Local,
    /// Firebase Auth + Cloud Firestore
    Firebase,
}

/// What `login` leaves on disk for later commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub backend: Backend,
    #[serde(flatten)]
    pub session: Session,
}

pub fn load(path: &Path) -> Result<Option<StoredSession>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session file: {}", path.display()))?;
    let stored = serde_json::from_str(&raw)
        .with_context(|| format!("Corrupt session file: {}", path.display()))?;
    Ok(Some(stored))
}

pub fn save(path: &Path, stored: &StoredSession) -> Result<()> {
    let raw = serde_json::to_string_pretty(stored)?;
    std::fs::write(path, raw)
        .with_context(|| format!("Failed to write session file: {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .context("Failed to set session file permissions")?;
    }
    Ok(())
}

/// Returns `false` when there was no session to remove.
pub fn clear(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(path)
        .with_context(|| format!("Failed to remove session file: {}", path.display()))?;
    Ok(true)
}
