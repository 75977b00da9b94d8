//! Profile store.
//!
//! One row per user. Profile edits go straight to the remote, so in a sync
//! cycle this store is only written by pulls; it still tracks pending rows
//! for writes made while offline.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::StoreError;
use crate::model::{Profile, ProfileDraft, Pulled, SyncStatus};
use crate::storage::Database;
use crate::storage::rows::{self, Conflict};

const TABLE: &str = "profiles";
const COLUMNS: &str = "id, user_id, display_name, due_date, pregnancy_week, updated_at, sync_status";

/// Local store for user profiles.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    db: Database,
}

impl ProfileStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or replace the profile, returning the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn upsert(&self, draft: ProfileDraft) -> Result<Profile, StoreError> {
        let profile = draft.into_profile(self.db.clock().now_iso());
        let stored = profile.clone();
        self.db.call(move |conn| write(conn, &profile, Conflict::Replace)).await?;
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
    pub async fn merge_pulled(&self, pulled: Vec<Pulled<Profile>>) -> Result<(), StoreError> {
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

    /// The profile for `user_id`, if one is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let user_id = user_id.to_string();
        self.db
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        &format!(
                            "SELECT {COLUMNS} FROM {TABLE} WHERE user_id = ?1
                             ORDER BY updated_at DESC LIMIT 1"
                        ),
                        [user_id],
                        map_row,
                    )
                    .optional()?)
            })
            .await
    }

    /// Profile rows for `user_id` not yet acknowledged by the remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_pending(&self, user_id: &str) -> Result<Vec<Profile>, StoreError> {
        let user_id = user_id.to_string();
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM {TABLE} WHERE user_id = ?1 AND sync_status != 'synced'"
                ))?;
                let rows = stmt
                    .query_map([user_id], map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Mark profile rows as acknowledged by the remote.
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

fn write(conn: &Connection, profile: &Profile, conflict: Conflict<'_>) -> Result<(), StoreError> {
    rows::write_row(
        conn,
        TABLE,
        COLUMNS,
        params![
            profile.id,
            profile.user_id,
            profile.display_name,
            profile.due_date,
            profile.pregnancy_week,
            profile.updated_at,
            profile.sync_status.as_str(),
        ],
        conflict,
    )
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        display_name: row.get(2)?,
        due_date: row.get(3)?,
        pregnancy_week: row.get(4)?,
        updated_at: row.get(5)?,
        sync_status: SyncStatus::from_db(&row.get::<_, String>(6)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_profile_id_defaults_to_user() {
        let store = ProfileStore::new(Database::in_memory());
        let mut draft = ProfileDraft::new("u1");
        draft.display_name = Some("Ada".into());
        let profile = store.upsert(draft).await.unwrap();

        assert_eq!(profile.id, "u1");
        assert_eq!(store.get("u1").await.unwrap(), Some(profile));
        assert!(store.get("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_synced_write_is_not_pending() {
        let store = ProfileStore::new(Database::in_memory());
        let mut draft = ProfileDraft::new("u1");
        draft.sync_status = Some(SyncStatus::Synced);
        store.upsert(draft).await.unwrap();

        assert!(store.get_pending("u1").await.unwrap().is_empty());
    }
}
