//! Periodic background invocation of the sync orchestrator.
//!
//! [`BackgroundScheduler`] owns the register/unregister policy; the host
//! behind [`HostScheduler`] owns the actual timing. Defining a task that
//! the host already knows is expected (the host registry can outlive this
//! process's memory) and is treated as success.

mod host;
mod task;

pub use host::{
    BackgroundFetchResult, HostScheduler, PeriodicOptions, TaskFuture, TaskHandler, TokioHost,
};
pub use task::BackgroundSyncTask;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::SchedulerError;

/// Registry name of the background sync task.
pub const BACKGROUND_SYNC_TASK: &str = "kicksync-background-sync";

/// Shortest interval the host will honor.
pub const MIN_INTERVAL: Duration = Duration::from_secs(15 * 60);

impl PeriodicOptions {
    /// Options for a task that survives restarts and reboots, with
    /// `interval` raised to [`MIN_INTERVAL`] if shorter.
    #[must_use]
    pub fn every(interval: Duration) -> Self {
        Self {
            minimum_interval: interval.max(MIN_INTERVAL),
            stop_on_terminate: false,
            start_on_boot: true,
        }
    }
}

impl Default for PeriodicOptions {
    fn default() -> Self {
        Self::every(MIN_INTERVAL)
    }
}

/// Registers the background sync task with a host scheduler.
pub struct BackgroundScheduler<H> {
    host: H,
    handler: Arc<dyn TaskHandler>,
    options: PeriodicOptions,
}

impl<H: HostScheduler> BackgroundScheduler<H> {
    pub fn new(host: H, handler: Arc<dyn TaskHandler>) -> Self {
        Self {
            host,
            handler,
            options: PeriodicOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: PeriodicOptions) -> Self {
        self.options = PeriodicOptions::every(options.minimum_interval);
        self.options.stop_on_terminate = options.stop_on_terminate;
        self.options.start_on_boot = options.start_on_boot;
        self
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Define the task if needed, then request periodic runs unless the host
    /// already has them scheduled.
    ///
    /// # Errors
    ///
    /// Returns the host's error for anything other than an existing
    /// definition.
    pub fn register(&self) -> Result<(), SchedulerError> {
        match self.host.define_task(BACKGROUND_SYNC_TASK, Arc::clone(&self.handler)) {
            Ok(()) | Err(SchedulerError::AlreadyDefined(_)) => {}
            Err(e) => return Err(e),
        }

        if self.host.is_registered(BACKGROUND_SYNC_TASK) {
            debug!(task = BACKGROUND_SYNC_TASK, "Already registered");
            return Ok(());
        }

        self.host.register_periodic(BACKGROUND_SYNC_TASK, self.options)?;
        info!(
            task = BACKGROUND_SYNC_TASK,
            interval_secs = self.options.minimum_interval.as_secs(),
            "Background sync registered"
        );
        Ok(())
    }

    /// Stop periodic runs. Calling it when not registered is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the host's error if it refuses.
    pub fn unregister(&self) -> Result<(), SchedulerError> {
        if !self.host.is_registered(BACKGROUND_SYNC_TASK) {
            debug!(task = BACKGROUND_SYNC_TASK, "Not registered, nothing to do");
            return Ok(());
        }
        self.host.unregister(BACKGROUND_SYNC_TASK)
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.host.is_registered(BACKGROUND_SYNC_TASK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHandler {
        runs: AtomicUsize,
    }

    impl TaskHandler for CountingHandler {
        fn run(&self) -> TaskFuture<'_> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { BackgroundFetchResult::NewData })
        }
    }

    #[test]
    fn test_interval_floor() {
        let options = PeriodicOptions::every(Duration::from_secs(60));
        assert_eq!(options.minimum_interval, MIN_INTERVAL);
        assert!(options.start_on_boot);
        assert!(!options.stop_on_terminate);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_runs_periodically_and_unregister_stops() {
        let handler = Arc::new(CountingHandler::default());
        let scheduler = BackgroundScheduler::new(TokioHost::new(), handler.clone());

        scheduler.register().unwrap();
        assert!(scheduler.is_registered());

        tokio::time::sleep(MIN_INTERVAL * 2 + Duration::from_secs(1)).await;
        assert_eq!(handler.runs.load(Ordering::SeqCst), 2);

        scheduler.unregister().unwrap();
        assert!(!scheduler.is_registered());
        tokio::time::sleep(MIN_INTERVAL * 2).await;
        assert_eq!(handler.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_register_twice_is_a_no_op() {
        let handler = Arc::new(CountingHandler::default());
        let scheduler = BackgroundScheduler::new(TokioHost::new(), handler);

        scheduler.register().unwrap();
        scheduler.register().unwrap();
        assert!(scheduler.is_registered());
    }

    #[tokio::test]
    async fn test_definition_from_earlier_start_is_tolerated() {
        let host = TokioHost::new();
        let earlier: Arc<dyn TaskHandler> = Arc::new(CountingHandler::default());
        host.define_task(BACKGROUND_SYNC_TASK, earlier).unwrap();

        let scheduler = BackgroundScheduler::new(host, Arc::new(CountingHandler::default()));
        scheduler.register().unwrap();
        assert!(scheduler.is_registered());
    }

    #[tokio::test]
    async fn test_unregister_when_not_registered_is_ok() {
        let scheduler = BackgroundScheduler::new(TokioHost::new(), Arc::new(CountingHandler::default()));
        scheduler.unregister().unwrap();
        scheduler.unregister().unwrap();
    }

    #[test]
    fn test_register_outside_runtime_is_host_error() {
        let scheduler = BackgroundScheduler::new(TokioHost::new(), Arc::new(CountingHandler::default()));
        let err = scheduler.register().unwrap_err();
        assert!(matches!(err, SchedulerError::Host(_)));
    }
}
