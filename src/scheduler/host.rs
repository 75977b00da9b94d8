//! Host task scheduler contract and an in-process implementation.
//!
//! The host owns a registry of named task definitions and decides when a
//! registered periodic task actually runs. Invocation is best effort: the
//! host may defer or skip runs.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::SchedulerError;

/// What a background run produced, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundFetchResult {
    NoData,
    NewData,
    Failed,
}

/// Boxed future returned by [`TaskHandler::run`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = BackgroundFetchResult> + Send + 'a>>;

/// Callback invoked by the host on each periodic run.
pub trait TaskHandler: Send + Sync {
    fn run(&self) -> TaskFuture<'_>;
}

/// How a periodic task should be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicOptions {
    pub minimum_interval: Duration,
    /// Keep the registration after the app process ends.
    pub stop_on_terminate: bool,
    /// Resume the registration after a device reboot.
    pub start_on_boot: bool,
}

/// The host's task registry.
pub trait HostScheduler: Send + Sync {
    /// Attach `handler` to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadyDefined`] if `name` already has a
    /// handler.
    fn define_task(&self, name: &str, handler: Arc<dyn TaskHandler>) -> Result<(), SchedulerError>;

    fn is_registered(&self, name: &str) -> bool;

    /// Request periodic invocation of a defined task.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotDefined`] if `name` has no handler.
    fn register_periodic(&self, name: &str, options: PeriodicOptions) -> Result<(), SchedulerError>;

    /// Stop periodic invocation. Unknown names are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Host`] if the host refuses.
    fn unregister(&self, name: &str) -> Result<(), SchedulerError>;
}

#[derive(Default)]
struct Registry {
    definitions: HashMap<String, Arc<dyn TaskHandler>>,
    running: HashMap<String, JoinHandle<()>>,
}

/// In-process host driving registered tasks on a tokio interval.
///
/// The first run happens one interval after registration. Must be used
/// from within a tokio runtime. Registrations live only as long as the
/// process, so the persistence flags of [`PeriodicOptions`] are ignored.
#[derive(Default)]
pub struct TokioHost {
    registry: Mutex<Registry>,
}

impl TokioHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Registry>, SchedulerError> {
        self.registry
            .lock()
            .map_err(|_| SchedulerError::Host("task registry poisoned".to_string()))
    }
}

impl std::fmt::Debug for TokioHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioHost").finish_non_exhaustive()
    }
}

impl HostScheduler for TokioHost {
    fn define_task(&self, name: &str, handler: Arc<dyn TaskHandler>) -> Result<(), SchedulerError> {
        let mut registry = self.lock()?;
        if registry.definitions.contains_key(name) {
            return Err(SchedulerError::AlreadyDefined(name.to_string()));
        }
        registry.definitions.insert(name.to_string(), handler);
        debug!(task = name, "Defined background task");
        Ok(())
    }

    fn is_registered(&self, name: &str) -> bool {
        self.lock()
            .map(|registry| {
                registry
                    .running
                    .get(name)
                    .is_some_and(|handle| !handle.is_finished())
            })
            .unwrap_or(false)
    }

    fn register_periodic(&self, name: &str, options: PeriodicOptions) -> Result<(), SchedulerError> {
        if options.minimum_interval.is_zero() {
            return Err(SchedulerError::Host("interval must be non-zero".to_string()));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SchedulerError::Host(format!("no async runtime: {e}")))?;

        let mut registry = self.lock()?;
        let handler = registry
            .definitions
            .get(name)
            .cloned()
            .ok_or_else(|| SchedulerError::NotDefined(name.to_string()))?;

        let period = options.minimum_interval;
        let task = name.to_string();
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let result = handler.run().await;
                match result {
                    BackgroundFetchResult::Failed => warn!(task = %task, "Background run failed"),
                    other => debug!(task = %task, result = ?other, "Background run finished"),
                }
            }
        });

        if let Some(previous) = registry.running.insert(name.to_string(), handle) {
            previous.abort();
        }
        info!(task = name, interval_secs = period.as_secs(), "Registered periodic task");
        Ok(())
    }

    fn unregister(&self, name: &str) -> Result<(), SchedulerError> {
        let mut registry = self.lock()?;
        if let Some(handle) = registry.running.remove(name) {
            handle.abort();
            info!(task = name, "Unregistered periodic task");
        }
        Ok(())
    }
}

impl Drop for TokioHost {
    fn drop(&mut self) {
        if let Ok(registry) = self.registry.get_mut() {
            for handle in registry.running.values() {
                handle.abort();
            }
        }
    }
}
