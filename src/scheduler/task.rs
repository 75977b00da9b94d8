//! The background sync handler.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::host::{BackgroundFetchResult, TaskFuture, TaskHandler};
use crate::config::SessionMarker;
use crate::remote::RemoteBackend;
use crate::sync::{SyncOptions, SyncOrchestrator};

/// Runs a full sync, content included, for the last signed-in user.
pub struct BackgroundSyncTask<R> {
    sync: Arc<SyncOrchestrator<R>>,
    session: Arc<dyn SessionMarker>,
}

impl<R: RemoteBackend> BackgroundSyncTask<R> {
    pub fn new(sync: Arc<SyncOrchestrator<R>>, session: Arc<dyn SessionMarker>) -> Self {
        Self { sync, session }
    }

    /// One background run.
    ///
    /// No signed-in user or no connectivity reports [`BackgroundFetchResult::NoData`]
    /// without touching the store.
    pub async fn execute(&self) -> BackgroundFetchResult {
        let Some(owner) = self.session.current_user() else {
            debug!("No signed-in user, skipping background sync");
            return BackgroundFetchResult::NoData;
        };

        if !self.sync.is_online().await {
            debug!(owner = %owner, "Offline, skipping background sync");
            return BackgroundFetchResult::NoData;
        }

        let options = SyncOptions {
            include_content: true,
            skip_if_offline: false,
        };
        match self.sync.sync_all(&owner, options).await {
            Ok(report) => {
                info!(
                    owner = %owner,
                    pushed = report.total_pushed(),
                    pulled = report.total_pulled(),
                    "Background sync complete"
                );
                BackgroundFetchResult::NewData
            }
            Err(e) => {
                warn!(owner = %owner, error = %e, "Background sync failed");
                BackgroundFetchResult::Failed
            }
        }
    }
}

impl<R: RemoteBackend + 'static> TaskHandler for BackgroundSyncTask<R> {
    fn run(&self) -> TaskFuture<'_> {
        Box::pin(self.execute())
    }
}
