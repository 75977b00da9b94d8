//! Local session marker.
//!
//! A small JSON file naming the last signed-in user. The background task
//! reads it to decide whom to sync for; signing in and out writes and
//! clears it. It is not an auth token and carries no secrets.
//!
//! Format: `{"userId": "...", "updatedAt": "2025-01-10T08:30:00.000Z"}`

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Contents of the marker file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub user_id: String,
    pub updated_at: String,
}

/// Source of the last signed-in user.
pub trait SessionMarker: Send + Sync + std::fmt::Debug {
    fn current_user(&self) -> Option<String>;
}

/// Marker stored as a file, by default `~/.kicksync/session.json`.
#[derive(Debug, Clone)]
pub struct FileSessionMarker {
    path: PathBuf,
}

impl FileSessionMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Marker at the default location, if a home directory exists.
    #[must_use]
    pub fn default_location() -> Option<Self> {
        super::global_kicksync_dir().map(|dir| Self::new(dir.join("session.json")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the marker. Missing, empty or corrupt files read as no session.
    #[must_use]
    pub fn read(&self) -> Option<SessionEntry> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<SessionEntry>(&content) {
            Ok(entry) if !entry.user_id.trim().is_empty() => Some(entry),
            Ok(_) => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt session marker");
                None
            }
        }
    }

    /// Write the marker: temp file with owner-only permissions, then rename.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn write(&self, user_id: &str, now_iso: &str) -> std::io::Result<()> {
        let entry = SessionEntry {
            user_id: user_id.to_string(),
            updated_at: now_iso.to_string(),
        };
        let json = serde_json::to_string_pretty(&entry)?;

        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut opts = fs::OpenOptions::new();
            opts.write(true).create(true).truncate(true);
            #[cfg(unix)]
            opts.mode(0o600);
            let mut file = opts.open(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.flush()?;
        }
        fs::rename(&temp_path, &self.path)?;
        debug!(user_id, path = %self.path.display(), "Wrote session marker");
        Ok(())
    }

    /// Remove the marker. Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> std::io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl SessionMarker for FileSessionMarker {
    fn current_user(&self) -> Option<String> {
        self.read().map(|entry| entry.user_id)
    }
}

/// A marker with a fixed answer.
#[derive(Debug, Clone, Default)]
pub struct FixedSession(pub Option<String>);

impl FixedSession {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    #[must_use]
    pub const fn signed_out() -> Self {
        Self(None)
    }
}

impl SessionMarker for FixedSession {
    fn current_user(&self) -> Option<String> {
        self.0.clone()
    }
}
