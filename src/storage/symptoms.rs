//! Symptom log store.

use rusqlite::{Connection, Row, params};

use crate::error::StoreError;
use crate::model::{Pulled, SymptomLog, SymptomLogDraft, SyncStatus};
use crate::storage::Database;
use crate::storage::rows::{self, Conflict};

const TABLE: &str = "symptom_logs";
const COLUMNS: &str = "id, user_id, symptom, severity, notes, logged_at, updated_at, sync_status";

/// Default cap for recency reads.
pub const DEFAULT_RECENT_LIMIT: u32 = 50;

/// Local store for symptom logs.
#[derive(Debug, Clone)]
pub struct SymptomStore {
    db: Database,
}

impl SymptomStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or replace a log, returning the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn upsert(&self, draft: SymptomLogDraft) -> Result<SymptomLog, StoreError> {
        let log = draft.into_log(self.db.clock().now_iso());
        let stored = log.clone();
        self.db.call(move |conn| write(conn, &log, Conflict::Replace)).await?;
        Ok(stored)
    }

    /// Merge pulled rows in one transaction.
    ///
    /// New ids are inserted whole. For an existing id, only the columns the
    /// remote row carried are overwritten and the row is marked synced.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; none are applied then.
    pub async fn merge_pulled(&self, pulled: Vec<Pulled<SymptomLog>>) -> Result<(), StoreError> {
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                for row in &pulled {
                    write(&tx, &row.record, Conflict::Merge(&|column: &str| row.carries(column)))?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
    }

    /// The `limit` most recently observed logs for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_recent(&self, user_id: &str, limit: u32) -> Result<Vec<SymptomLog>, StoreError> {
        let user_id = user_id.to_string();
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM {TABLE} WHERE user_id = ?1
                     ORDER BY logged_at DESC LIMIT ?2"
                ))?;
                let rows = stmt
                    .query_map(params![user_id, limit], map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Logs for `user_id` not yet acknowledged by the remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_pending(&self, user_id: &str) -> Result<Vec<SymptomLog>, StoreError> {
        let user_id = user_id.to_string();
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM {TABLE}
                     WHERE user_id = ?1 AND sync_status != 'synced'
                     ORDER BY updated_at ASC"
                ))?;
                let rows = stmt
                    .query_map([user_id], map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Mark logs as acknowledged by the remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_synced(&self, ids: Vec<String>) -> Result<(), StoreError> {
        let now = self.db.clock().now_iso();
        self.db
            .call(move |conn| rows::mark_synced(conn, TABLE, &ids, &now).map(|_| ()))
            .await
    }

    /// Mark pushed rows synced, skipping any edited since the push read them.
    ///
    /// `pushed` pairs each id with the `updated_at` it was pushed with.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn acknowledge(&self, pushed: Vec<(String, String)>) -> Result<(), StoreError> {
        let now = self.db.clock().now_iso();
        self.db
            .call(move |conn| rows::acknowledge_pushed(conn, TABLE, &pushed, &now).map(|_| ()))
            .await
    }
}

fn write(conn: &Connection, log: &SymptomLog, conflict: Conflict<'_>) -> Result<(), StoreError> {
    rows::write_row(
        conn,
        TABLE,
        COLUMNS,
        params![
            log.id,
            log.user_id,
            log.symptom,
            log.severity,
            log.notes,
            log.logged_at,
            log.updated_at,
            log.sync_status.as_str(),
        ],
        conflict,
    )
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<SymptomLog> {
    Ok(SymptomLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        symptom: row.get(2)?,
        severity: row.get(3)?,
        notes: row.get(4)?,
        logged_at: row.get(5)?,
        updated_at: row.get(6)?,
        sync_status: SyncStatus::from_db(&row.get::<_, String>(7)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recent_is_ordered_and_capped() {
        let store = SymptomStore::new(Database::in_memory());
        for (i, symptom) in ["nausea", "back pain", "heartburn"].iter().enumerate() {
            store
                .upsert(SymptomLogDraft::new("u1", *symptom).logged_at(format!("2025-01-1{i}T09:00:00.000Z")))
                .await
                .unwrap();
        }

        let recent = store.get_recent("u1", 2).await.unwrap();
        let names: Vec<&str> = recent.iter().map(|l| l.symptom.as_str()).collect();
        assert_eq!(names, vec!["heartburn", "back pain"]);
    }

    #[tokio::test]
    async fn test_logged_at_defaults_to_write_time() {
        let store = SymptomStore::new(Database::in_memory());
        let log = store
            .upsert(SymptomLogDraft::new("u1", "fatigue").with_severity(2))
            .await
            .unwrap();
        assert_eq!(log.logged_at, log.updated_at);
        assert_eq!(log.severity, Some(2));
    }

    #[tokio::test]
    async fn test_severity_out_of_range_is_rejected() {
        let store = SymptomStore::new(Database::in_memory());
        let result = store
            .upsert(SymptomLogDraft::new("u1", "cramps").with_severity(9))
            .await;
        assert!(matches!(result, Err(StoreError::Database(_))));
        assert!(store.get_pending("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_synced_clears_pending() {
        let store = SymptomStore::new(Database::in_memory());
        let log = store.upsert(SymptomLogDraft::new("u1", "swelling")).await.unwrap();
        store.mark_synced(vec![log.id]).await.unwrap();

        assert!(store.get_pending("u1").await.unwrap().is_empty());
        let recent = store.get_recent("u1", 10).await.unwrap();
        assert_eq!(recent[0].sync_status, SyncStatus::Synced);
    }
}
