//! Kick entry store.

use rusqlite::{Connection, Row, params, params_from_iter};
use tracing::debug;

use crate::error::StoreError;
use crate::model::{DailyKickTotal, KickEntry, KickEntryDraft, Pulled, SyncStatus};
use crate::storage::Database;
use crate::storage::rows::{self, Conflict};

const TABLE: &str = "kick_entries";
const COLUMNS: &str = "id, user_id, date, time_of_day, count, notes, updated_at, sync_status";

/// Filter for kick entry reads. Always scoped to one owner.
#[derive(Debug, Clone, Default)]
pub struct KickFilter {
    pub user_id: String,
    /// Exact `YYYY-MM-DD`
    pub date: Option<String>,
    /// Inclusive lower bound
    pub from: Option<String>,
    /// Inclusive upper bound
    pub to: Option<String>,
}

impl KickFilter {
    /// Every entry for `user_id`.
    pub fn owner(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn on(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    #[must_use]
    pub fn between(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self.to = Some(to.into());
        self
    }

    fn where_clause(&self) -> (String, Vec<String>) {
        let mut clauses = vec!["user_id = ?".to_string()];
        let mut values = vec![self.user_id.clone()];
        if let Some(date) = &self.date {
            clauses.push("date = ?".to_string());
            values.push(date.clone());
        }
        if let Some(from) = &self.from {
            clauses.push("date >= ?".to_string());
            values.push(from.clone());
        }
        if let Some(to) = &self.to {
            clauses.push("date <= ?".to_string());
            values.push(to.clone());
        }
        (clauses.join(" AND "), values)
    }
}

/// Local store for kick entries.
#[derive(Debug, Clone)]
pub struct KickStore {
    db: Database,
}

impl KickStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or replace an entry, returning the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn upsert(&self, draft: KickEntryDraft) -> Result<KickEntry, StoreError> {
        let entry = draft.into_entry(self.db.clock().now_iso());
        let stored = entry.clone();
        self.db.call(move |conn| write(conn, &entry, Conflict::Replace)).await?;
        debug!(id = %stored.id, status = %stored.sync_status, "Upserted kick entry");
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
    pub async fn merge_pulled(&self, pulled: Vec<Pulled<KickEntry>>) -> Result<(), StoreError> {
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

    /// Entries matching `filter`, newest date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, filter: KickFilter) -> Result<Vec<KickEntry>, StoreError> {
        self.db
            .call(move |conn| {
                let (clause, values) = filter.where_clause();
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM {TABLE} WHERE {clause} ORDER BY date DESC, updated_at DESC"
                ))?;
                let rows = stmt
                    .query_map(params_from_iter(values.iter()), map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Entries for one calendar day.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_by_date(&self, user_id: &str, date: &str) -> Result<Vec<KickEntry>, StoreError> {
        self.get(KickFilter::owner(user_id).on(date)).await
    }

    /// Entries between two dates, inclusive.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_range(&self, user_id: &str, from: &str, to: &str) -> Result<Vec<KickEntry>, StoreError> {
        self.get(KickFilter::owner(user_id).between(from, to)).await
    }

    /// Per-day sums of kicks between two dates, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn daily_totals(&self, user_id: &str, from: &str, to: &str) -> Result<Vec<DailyKickTotal>, StoreError> {
        let (user_id, from, to) = (user_id.to_string(), from.to_string(), to.to_string());
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT date, SUM(count), COUNT(*) FROM {TABLE}
                     WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
                     GROUP BY date ORDER BY date ASC"
                ))?;
                let rows = stmt
                    .query_map(params![user_id, from, to], |row| {
                        Ok(DailyKickTotal {
                            date: row.get(0)?,
                            total: row.get(1)?,
                            sessions: row.get(2)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Entries for `user_id` not yet acknowledged by the remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_pending(&self, user_id: &str) -> Result<Vec<KickEntry>, StoreError> {
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

    /// Mark entries as acknowledged by the remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails; no row changes then.
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

fn write(conn: &Connection, entry: &KickEntry, conflict: Conflict<'_>) -> Result<(), StoreError> {
    rows::write_row(
        conn,
        TABLE,
        COLUMNS,
        params![
            entry.id,
            entry.user_id,
            entry.date,
            entry.time_of_day,
            entry.count,
            entry.notes,
            entry.updated_at,
            entry.sync_status.as_str(),
        ],
        conflict,
    )
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<KickEntry> {
    Ok(KickEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        time_of_day: row.get(3)?,
        count: row.get(4)?,
        notes: row.get(5)?,
        updated_at: row.get(6)?,
        sync_status: SyncStatus::from_db(&row.get::<_, String>(7)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KickStore {
        KickStore::new(Database::in_memory())
    }

    #[tokio::test]
    async fn test_upsert_assigns_id_and_defaults_to_pending() {
        let store = store();
        let entry = store
            .upsert(KickEntryDraft::new("u1", "2025-01-10", "morning", 3))
            .await
            .unwrap();

        assert!(!entry.id.is_empty());
        assert_eq!(entry.sync_status, SyncStatus::Pending);

        let pending = store.get_pending("u1").await.unwrap();
        assert_eq!(pending, vec![entry]);
    }

    #[tokio::test]
    async fn test_reupsert_same_id_overwrites() {
        let store = store();
        let first = store
            .upsert(KickEntryDraft::new("u1", "2025-01-10", "morning", 3))
            .await
            .unwrap();
        store
            .upsert(KickEntryDraft::new("u1", "2025-01-10", "morning", 7).with_id(&first.id))
            .await
            .unwrap();

        let rows = store.get_by_date("u1", "2025-01-10").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 7);
    }

    #[tokio::test]
    async fn test_pending_returns_exactly_unsynced_rows_for_owner() {
        let store = store();
        let mut ids = Vec::new();
        for (i, slot) in ["morning", "afternoon", "evening"].iter().enumerate() {
            let entry = store
                .upsert(KickEntryDraft::new("u1", "2025-01-11", *slot, i64::try_from(i).unwrap()))
                .await
                .unwrap();
            ids.push(entry.id);
        }
        store
            .upsert(KickEntryDraft::new("u2", "2025-01-11", "night", 4))
            .await
            .unwrap();

        let pending: Vec<String> = store
            .get_pending("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(pending.len(), 3);
        for id in &ids {
            assert!(pending.contains(id));
        }

        store.mark_synced(vec![ids[0].clone()]).await.unwrap();
        assert_eq!(store.get_pending("u1").await.unwrap().len(), 2);
        assert_eq!(store.get_pending("u2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_local_edit_resets_synced_row_to_pending() {
        let store = store();
        let entry = store
            .upsert(KickEntryDraft::new("u1", "2025-01-10", "morning", 3))
            .await
            .unwrap();
        store.mark_synced(vec![entry.id.clone()]).await.unwrap();
        assert!(store.get_pending("u1").await.unwrap().is_empty());

        store
            .upsert(KickEntryDraft::new("u1", "2025-01-10", "morning", 4).with_id(&entry.id))
            .await
            .unwrap();
        assert_eq!(store.get_pending("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_acknowledge_leaves_rows_edited_after_push_pending() {
        let clock = crate::clock::ManualClock::new(1_736_497_800_000);
        let store = KickStore::new(Database::in_memory().with_clock(std::sync::Arc::new(clock.clone())));
        let entry = store
            .upsert(KickEntryDraft::new("u1", "2025-01-10", "morning", 3))
            .await
            .unwrap();
        let pushed = vec![(entry.id.clone(), entry.updated_at.clone())];

        clock.advance(std::time::Duration::from_secs(5));
        store
            .upsert(KickEntryDraft::new("u1", "2025-01-10", "morning", 4).with_id(&entry.id))
            .await
            .unwrap();

        store.acknowledge(pushed).await.unwrap();
        let pending = store.get_pending("u1").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].count, 4);
    }

    #[tokio::test]
    async fn test_range_and_daily_totals() {
        let store = store();
        for (date, slot, count) in [
            ("2025-01-09", "evening", 2),
            ("2025-01-10", "morning", 3),
            ("2025-01-10", "evening", 5),
            ("2025-01-12", "morning", 1),
        ] {
            store.upsert(KickEntryDraft::new("u1", date, slot, count)).await.unwrap();
        }

        let range = store.get_range("u1", "2025-01-10", "2025-01-11").await.unwrap();
        assert_eq!(range.len(), 2);

        let totals = store.daily_totals("u1", "2025-01-01", "2025-01-31").await.unwrap();
        assert_eq!(
            totals,
            vec![
                DailyKickTotal { date: "2025-01-09".into(), total: 2, sessions: 1 },
                DailyKickTotal { date: "2025-01-10".into(), total: 8, sessions: 2 },
                DailyKickTotal { date: "2025-01-12".into(), total: 1, sessions: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_rows_read_as_empty() {
        let store = store();
        assert!(store.get_by_date("nobody", "2025-01-10").await.unwrap().is_empty());
        store.mark_synced(vec!["missing".into()]).await.unwrap();
    }
}
