//! Two-way sync between the local store and the remote backend.
//!
//! Each domain runs one cycle per invocation:
//!
//! 1. **Push** - upload rows whose `sync_status` is not `synced` in one
//!    batched upsert, then mark exactly those ids synced
//! 2. **Pull** - fetch the owner's rows (ordered, optionally capped) and
//!    upsert them locally as `synced`
//! 3. **Record** - stamp success or store the error in the sync state
//!
//! A failed push ends the cycle before the pull, so local pending rows are
//! never overwritten by a pull that raced a rejected upload.
//!
//! # Example
//!
//! ```ignore
//! use kicksync::sync::{SyncOptions, SyncOrchestrator};
//!
//! let sync = SyncOrchestrator::new(db, remote, connectivity);
//! let report = sync.sync_all("user-1", SyncOptions { include_content: true, skip_if_offline: true }).await?;
//! ```

mod orchestrator;
mod record;
mod report;

pub use orchestrator::{ARTICLE_PULL_LIMIT, ARTICLES_TABLE, SyncOptions, SyncOrchestrator, TIPS_TABLE};
pub use record::{DomainStore, SYMPTOM_PULL_LIMIT, SyncedRecord};
pub use report::{DomainOutcome, SyncCounts, SyncReport};
