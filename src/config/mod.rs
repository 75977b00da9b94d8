//! Configuration management.
//!
//! This module resolves where kicksync keeps its files, loads user settings
//! and reads the local session marker.
//!
//! # Layout
//!
//! Everything lives under `~/.kicksync/`:
//! - `data/kicksync.db` - the local store
//! - `config.json` - remote URL, API key, TTL and interval settings
//! - `session.json` - the last signed-in user

mod session_marker;
mod settings;

pub use session_marker::{FileSessionMarker, FixedSession, SessionEntry, SessionMarker};
pub use settings::{RemoteSettings, Settings};

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};

/// The global kicksync directory, `~/.kicksync/`.
#[must_use]
pub fn global_kicksync_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".kicksync"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `KICKSYNC_DB` environment variable
/// 3. Global location: `~/.kicksync/data/kicksync.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(db_path) = std::env::var("KICKSYNC_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_kicksync_dir().map(|dir| dir.join("data").join("kicksync.db"))
}

/// Resolve the user every owner-scoped command acts for.
///
/// Priority:
/// 1. Explicit `--user` flag
/// 2. `KICKSYNC_USER` environment variable
/// 3. The session marker
/// 4. **Error**
///
/// # Errors
///
/// Returns [`Error::NotSignedIn`] when no source names a user.
pub fn resolve_user(explicit_user: Option<&str>, marker: &dyn SessionMarker) -> Result<String> {
    if let Some(user) = explicit_user.filter(|u| !u.trim().is_empty()) {
        return Ok(user.to_string());
    }

    if let Ok(user) = std::env::var("KICKSYNC_USER") {
        if !user.trim().is_empty() {
            return Ok(user);
        }
    }

    marker.current_user().ok_or(Error::NotSignedIn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/db.sqlite");
        let result = resolve_db_path(Some(&explicit));
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_resolve_db_path_defaults_to_global() {
        if std::env::var("KICKSYNC_DB").is_ok() {
            return;
        }
        let path = resolve_db_path(None).unwrap();
        assert!(path.ends_with("data/kicksync.db"));
    }

    #[test]
    fn test_resolve_user_prefers_flag_over_marker() {
        let marker = FixedSession::signed_in("from-marker");
        assert_eq!(resolve_user(Some("from-flag"), &marker).unwrap(), "from-flag");
    }

    #[test]
    fn test_resolve_user_without_any_source_fails() {
        if std::env::var("KICKSYNC_USER").is_ok() {
            return;
        }
        let err = resolve_user(None, &FixedSession::signed_out()).unwrap_err();
        assert!(matches!(err, Error::NotSignedIn));
        assert!(resolve_user(Some("  "), &FixedSession::signed_in("u9")).is_ok_and(|u| u == "u9"));
    }
}
