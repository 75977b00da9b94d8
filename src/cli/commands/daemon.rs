//! Daemon command implementation.
//!
//! Registers the periodic background sync and keeps the process alive until
//! interrupted.

use crate::cli::commands::{block_on, open_database, orchestrator, session_marker};
use crate::config::{FixedSession, SessionMarker, Settings};
use crate::error::{Error, Result};
use crate::scheduler::{BackgroundScheduler, BackgroundSyncTask, PeriodicOptions, TaskHandler, TokioHost};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Execute the daemon command.
///
/// With `user` set the background task always syncs that user; otherwise it
/// follows the session marker on every run, so signing out stops syncing
/// without restarting the daemon.
pub fn execute(db_path: Option<&PathBuf>, user: Option<&str>, now: bool) -> Result<()> {
    let settings = Settings::load()?;
    let interval = settings.sync_interval();

    let session: Arc<dyn SessionMarker> = match user {
        Some(user) => Arc::new(FixedSession::signed_in(user)),
        None => Arc::new(session_marker()?),
    };

    block_on(async {
        let sync = Arc::new(orchestrator(open_database(db_path).await?, &settings)?);
        let handler: Arc<dyn TaskHandler> = Arc::new(BackgroundSyncTask::new(sync, session));

        let scheduler = BackgroundScheduler::new(TokioHost::new(), Arc::clone(&handler))
            .with_options(PeriodicOptions::every(interval));
        scheduler.register()?;
        info!(interval_secs = interval.as_secs(), "Background sync registered");

        if now {
            let result = handler.run().await;
            info!(result = ?result, "Initial sync finished");
        }

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| Error::Other(format!("Failed to listen for shutdown signal: {e}")))?;

        scheduler.unregister()?;
        info!("Background sync unregistered");
        Ok(())
    })
}
