//! Error types for kicksync.
//!
//! The engine has four failure families, each with its own type:
//! - [`MigrationError`] - the schema could not be brought up to date (fatal at startup)
//! - [`StoreError`] - a local read or write failed
//! - [`SyncError`] - a push, pull or cache refresh failed for one domain
//! - [`SchedulerError`] - background registration failed
//!
//! The CLI wraps them in [`Error`], which adds machine-readable codes,
//! category exit codes, hints and a structured JSON form.

use thiserror::Error;

use crate::model::Domain;
use crate::remote::RemoteError;
use crate::sync::SyncReport;

/// Result type alias for CLI-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The schema could not be migrated.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("migration {version} ({name}) failed: {source}")]
    Statement {
        version: i64,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database error during migration: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("could not open database: {0}")]
    Open(String),
}

/// A local store operation failed.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("local store unavailable: {0}")]
    Unavailable(String),

    #[error("store task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// A sync cycle failed for one domain, or for several in a full run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{domain}: push rejected: {source}")]
    Push {
        domain: Domain,
        #[source]
        source: RemoteError,
    },

    #[error("{domain}: pull failed: {source}")]
    Pull {
        domain: Domain,
        #[source]
        source: RemoteError,
    },

    #[error("{domain}: local store error: {source}")]
    Store {
        domain: Domain,
        #[source]
        source: StoreError,
    },

    #[error("{domain}: malformed row: {source}")]
    Decode {
        domain: Domain,
        #[source]
        source: serde_json::Error,
    },

    #[error("sync failed for {}", .failed.iter().map(Domain::as_str).collect::<Vec<_>>().join(", "))]
    Partial {
        failed: Vec<Domain>,
        report: SyncReport,
    },
}

impl SyncError {
    /// Domain the error belongs to, if it is a single-domain failure.
    #[must_use]
    pub const fn domain(&self) -> Option<Domain> {
        match self {
            Self::Push { domain, .. }
            | Self::Pull { domain, .. }
            | Self::Store { domain, .. }
            | Self::Decode { domain, .. } => Some(*domain),
            Self::Partial { .. } => None,
        }
    }
}

/// Background registration failed.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The host already holds a definition for this task.
    #[error("task already defined: {0}")]
    AlreadyDefined(String),

    #[error("task not defined: {0}")]
    NotDefined(String),

    #[error("host scheduler error: {0}")]
    Host(String),
}

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Local store (exit 2)
    MigrationFailed,
    StoreError,

    // Session (exit 3)
    NotSignedIn,

    // Validation (exit 4)
    InvalidArgument,

    // Sync (exit 6)
    SyncFailed,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Scheduler (exit 9)
    SchedulerError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::MigrationFailed => "MIGRATION_FAILED",
            Self::StoreError => "STORE_ERROR",
            Self::NotSignedIn => "NOT_SIGNED_IN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::SyncFailed => "SYNC_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::SchedulerError => "SCHEDULER_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-9).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::MigrationFailed | Self::StoreError => 2,
            Self::NotSignedIn => 3,
            Self::InvalidArgument => 4,
            Self::SyncFailed => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
            Self::SchedulerError => 9,
        }
    }

    /// Whether retrying the same command may succeed.
    ///
    /// Sync failures are usually transient network conditions; local store
    /// failures are often lock contention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::SyncFailed | Self::StoreError | Self::InvalidArgument)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors surfaced by the CLI.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("No signed-in user")]
    NotSignedIn,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Migration(_) => ErrorCode::MigrationFailed,
            Self::Store(_) => ErrorCode::StoreError,
            Self::Sync(_) => ErrorCode::SyncFailed,
            Self::Scheduler(_) => ErrorCode::SchedulerError,
            Self::NotSignedIn => ErrorCode::NotSignedIn,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Recovery hint for the person at the terminal.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotSignedIn => Some(
                "Pass --user <id>, set KICKSYNC_USER, or run `kicksync session set <id>`".to_string(),
            ),
            Self::Migration(_) => Some(
                "The local database schema could not be upgraded. Back up the database file and retry."
                    .to_string(),
            ),
            Self::Sync(_) => Some(
                "Local data is intact. Run `kicksync status` to see which domains failed.".to_string(),
            ),
            Self::Config(msg) if msg.contains("remote") => Some(
                "Set KICKSYNC_REMOTE_URL and KICKSYNC_API_KEY, or add them to ~/.kicksync/config.json"
                    .to_string(),
            ),
            Self::InvalidArgument(msg) if msg.contains("domain") => {
                Some("Valid domains: profile, kicks, symptoms, goals, content".to_string())
            }
            _ => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::NotSignedIn.exit_code(), 3);
        assert_eq!(Error::Config("x".into()).exit_code(), 7);
        let store = Error::Store(StoreError::Unavailable("closed".into()));
        assert_eq!(store.exit_code(), 2);
        assert!(store.error_code().is_retryable());
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let json = Error::NotSignedIn.to_structured_json();
        assert_eq!(json["error"]["code"], "NOT_SIGNED_IN");
        assert!(json["error"]["hint"].as_str().is_some());
    }

    #[test]
    fn test_sync_error_names_domain() {
        let err = SyncError::Push {
            domain: Domain::Kicks,
            source: RemoteError::Rejected("boom".into()),
        };
        assert_eq!(err.domain(), Some(Domain::Kicks));
        assert!(err.to_string().starts_with("kicks: push rejected"));
    }
}
