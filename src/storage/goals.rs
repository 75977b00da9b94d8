//! Goal store.

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::error::StoreError;
use crate::model::{Goal, GoalDraft, Pulled, SyncStatus};
use crate::storage::Database;
use crate::storage::rows::{self, Conflict};

const TABLE: &str = "goals";
const COLUMNS: &str = "id, user_id, title, category, target_date, completed, updated_at, sync_status";

/// Local store for goals.
#[derive(Debug, Clone)]
pub struct GoalStore {
    db: Database,
}

impl GoalStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or replace a goal, returning the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn upsert(&self, draft: GoalDraft) -> Result<Goal, StoreError> {
        let goal = draft.into_goal(self.db.clock().now_iso());
        let stored = goal.clone();
        self.db.call(move |conn| write(conn, &goal, Conflict::Replace)).await?;
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
    pub async fn merge_pulled(&self, pulled: Vec<Pulled<Goal>>) -> Result<(), StoreError> {
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

    /// One goal by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, id: &str) -> Result<Option<Goal>, StoreError> {
        let id = id.to_string();
        self.db
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM {TABLE} WHERE id = ?1"),
                        [id],
                        map_row,
                    )
                    .optional()?)
            })
            .await
    }

    /// Every goal for `user_id`: open goals first, then by most recent edit.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_all(&self, user_id: &str) -> Result<Vec<Goal>, StoreError> {
        let user_id = user_id.to_string();
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM {TABLE} WHERE user_id = ?1
                     ORDER BY completed ASC, updated_at DESC"
                ))?;
                let rows = stmt
                    .query_map([user_id], map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Goals for `user_id` not yet acknowledged by the remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_pending(&self, user_id: &str) -> Result<Vec<Goal>, StoreError> {
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

    /// Mark goals as acknowledged by the remote.
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

    /// Delete a goal locally. Removing an unknown id is a no-op.
    ///
    /// The remote has no delete, so a goal that was already pushed comes
    /// back on the next pull.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let owned = id.to_string();
        let removed = self
            .db
            .call(move |conn| rows::delete_by_id(conn, TABLE, &owned))
            .await?;
        debug!(id, removed, "Removed goal");
        Ok(())
    }
}

fn write(conn: &Connection, goal: &Goal, conflict: Conflict<'_>) -> Result<(), StoreError> {
    rows::write_row(
        conn,
        TABLE,
        COLUMNS,
        params![
            goal.id,
            goal.user_id,
            goal.title,
            goal.category,
            goal.target_date,
            goal.completed,
            goal.updated_at,
            goal.sync_status.as_str(),
        ],
        conflict,
    )
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        category: row.get(3)?,
        target_date: row.get(4)?,
        completed: row.get(5)?,
        updated_at: row.get(6)?,
        sync_status: SyncStatus::from_db(&row.get::<_, String>(7)?),
    })
}
