//! User settings from `~/.kicksync/config.json` and the environment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::scheduler::MIN_INTERVAL;
use crate::storage::DEFAULT_CONTENT_TTL;

/// Connection details for the remote backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub url: String,
    pub api_key: String,
    pub access_token: Option<String>,
}

/// Settings file contents. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Only ever taken from `KICKSYNC_ACCESS_TOKEN`.
    #[serde(skip)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub content_ttl_minutes: Option<u64>,
    #[serde(default)]
    pub sync_interval_minutes: Option<u64>,
}

impl Settings {
    /// Load from the default location with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file exists but is not valid JSON.
    pub fn load() -> Result<Self> {
        let mut settings = match super::global_kicksync_dir() {
            Some(dir) => Self::from_file(&dir.join("config.json"))?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Read a settings file. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Config(format!("cannot read {}: {e}", path.display()))),
        };
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid {}: {e}", path.display())))
    }

    /// Overlay `KICKSYNC_REMOTE_URL`, `KICKSYNC_API_KEY` and
    /// `KICKSYNC_ACCESS_TOKEN` as returned by `lookup`. Empty values are
    /// ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get("KICKSYNC_REMOTE_URL") {
            self.remote_url = Some(url);
        }
        if let Some(key) = get("KICKSYNC_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(token) = get("KICKSYNC_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
    }

    /// Remote connection details, when both URL and key are set.
    #[must_use]
    pub fn remote(&self) -> Option<RemoteSettings> {
        Some(RemoteSettings {
            url: self.remote_url.clone()?,
            api_key: self.api_key.clone()?,
            access_token: self.access_token.clone(),
        })
    }

    #[must_use]
    pub fn content_ttl(&self) -> Duration {
        self.content_ttl_minutes
            .map_or(DEFAULT_CONTENT_TTL, |m| Duration::from_secs(m.saturating_mul(60)))
    }

    /// Background sync interval, never below the host minimum.
    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        self.sync_interval_minutes
            .map_or(MIN_INTERVAL, |m| Duration::from_secs(m.saturating_mul(60)))
            .max(MIN_INTERVAL)
    }
}
