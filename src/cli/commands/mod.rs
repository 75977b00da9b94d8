//! Command implementations.
//!
//! Every command is a synchronous `execute` that builds a tokio runtime and
//! blocks on its async body.

pub mod completions;
pub mod content;
pub mod daemon;
pub mod goals;
pub mod kicks;
pub mod migrate;
pub mod profile;
pub mod session;
pub mod status;
pub mod symptoms;
pub mod sync;
pub mod version;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{FileSessionMarker, Settings, resolve_db_path, resolve_user};
use crate::error::{Error, Result};
use crate::network::{Connectivity, HttpProbe};
use crate::remote::{BoxedRemote, RestRemote};
use crate::storage::Database;
use crate::sync::SyncOrchestrator;

/// Run an async command body to completion.
pub(crate) fn block_on<F: Future<Output = Result<()>>>(body: F) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;
    rt.block_on(body)
}

/// Open the store and apply pending migrations.
pub(crate) async fn open_database(db_path: Option<&PathBuf>) -> Result<Database> {
    let path = resolve_db_path(db_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("cannot determine database location (no home directory)".into()))?;
    let db = Database::open(&path);
    db.init().await?;
    Ok(db)
}

/// The session marker at its default location.
pub(crate) fn session_marker() -> Result<FileSessionMarker> {
    FileSessionMarker::default_location()
        .ok_or_else(|| Error::Config("cannot determine session marker location (no home directory)".into()))
}

/// The user an owner-scoped command acts for.
pub(crate) fn owner(user: Option<&str>) -> Result<String> {
    resolve_user(user, &session_marker()?)
}

/// Build the orchestrator from settings.
pub(crate) fn orchestrator(db: Database, settings: &Settings) -> Result<SyncOrchestrator<BoxedRemote>> {
    let remote_settings = settings
        .remote()
        .ok_or_else(|| Error::Config("remote backend not configured".into()))?;
    let remote = RestRemote::new(
        &remote_settings.url,
        &remote_settings.api_key,
        remote_settings.access_token.clone(),
    )
    .map_err(|e| Error::Config(format!("remote client: {e}")))?;
    let probe = HttpProbe::new(remote_settings.url)
        .map_err(|e| Error::Config(format!("reachability check: {e}")))?;
    let connectivity: Arc<dyn Connectivity> = Arc::new(probe);

    Ok(SyncOrchestrator::new(db, BoxedRemote::new(remote), connectivity).with_content_ttl(settings.content_ttl()))
}

/// Today's local date as `YYYY-MM-DD`.
pub(crate) fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Reject anything that is not a `YYYY-MM-DD` calendar date.
pub(crate) fn check_date(value: &str, what: &str) -> Result<()> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| Error::InvalidArgument(format!("{what} must be YYYY-MM-DD, got '{value}'")))
}
