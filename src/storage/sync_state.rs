//! Per-domain sync bookkeeping.
//!
//! One row per domain recording when it last reconciled and why it last
//! failed. Read by the UI for "last synced" display; written only by the
//! orchestrator.

use std::time::Duration;

use rusqlite::{OptionalExtension, params};

use crate::clock::{duration_millis, iso_to_millis};
use crate::error::StoreError;
use crate::model::{Domain, SyncStateEntry};
use crate::storage::Database;

/// Reads and writes the `sync_state` table.
#[derive(Debug, Clone)]
pub struct SyncStateTracker {
    db: Database,
}

impl SyncStateTracker {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Stamp a successful cycle and clear any previous error.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn record_success(&self, domain: Domain) -> Result<(), StoreError> {
        let now = self.db.clock().now_iso();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sync_state (domain, last_success_at, last_error) VALUES (?1, ?2, NULL)
                     ON CONFLICT(domain) DO UPDATE SET
                        last_success_at = excluded.last_success_at,
                        last_error = NULL",
                    params![domain.as_str(), now],
                )?;
                Ok(())
            })
            .await
    }

    /// Record a failed cycle. Any earlier success timestamp is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn record_failure(&self, domain: Domain, error: &str) -> Result<(), StoreError> {
        let error = error.to_string();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sync_state (domain, last_success_at, last_error) VALUES (?1, NULL, ?2)
                     ON CONFLICT(domain) DO UPDATE SET last_error = excluded.last_error",
                    params![domain.as_str(), error],
                )?;
                Ok(())
            })
            .await
    }

    /// State for one domain. A domain never synced reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, domain: Domain) -> Result<SyncStateEntry, StoreError> {
        self.db
            .call(move |conn| {
                let entry = conn
                    .query_row(
                        "SELECT last_success_at, last_error FROM sync_state WHERE domain = ?1",
                        [domain.as_str()],
                        |row| {
                            Ok(SyncStateEntry {
                                last_success_at: row.get(0)?,
                                last_error: row.get(1)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(entry.unwrap_or_default())
            })
            .await
    }

    /// State for every known domain, in sync order.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn all(&self) -> Result<Vec<(Domain, SyncStateEntry)>, StoreError> {
        let mut entries = Vec::with_capacity(Domain::ALL.len());
        for domain in Domain::ALL {
            entries.push((domain, self.get(domain).await?));
        }
        Ok(entries)
    }

    /// True when the domain has an outstanding error, has never succeeded,
    /// or last succeeded more than `max_age` ago.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn needs_attention(&self, domain: Domain, max_age: Duration) -> Result<bool, StoreError> {
        let entry = self.get(domain).await?;
        if entry.last_error.is_some() {
            return Ok(true);
        }
        let Some(last) = entry.last_success_at.as_deref().and_then(iso_to_millis) else {
            return Ok(true);
        };
        let age = self.db.clock().now_millis().saturating_sub(last);
        Ok(age > duration_millis(max_age))
    }
}
