//! Shared handle to the embedded SQLite store.
//!
//! One [`Database`] is constructed per process and cloned into every
//! component that needs it. The connection is opened lazily: the first call
//! opens the file and applies pending migrations, and concurrent first
//! callers all await that same initialization.
//!
//! SQLite work runs on the blocking pool. The connection sits behind a
//! mutex, which is the store's write serialization; callers never hold it
//! across an await point.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{MigrationError, StoreError};
use crate::storage::migrations;

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

#[derive(Debug)]
struct Inner {
    location: Location,
    clock: Arc<dyn Clock>,
    conn: OnceCell<Arc<Mutex<Connection>>>,
}

/// Cloneable handle to the local store.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Database {
    /// Handle for a database file. Nothing is opened until first use.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        Self::with_location(Location::File(path.to_path_buf()), Arc::new(SystemClock))
    }

    /// Handle for a private in-memory database (for testing).
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_location(Location::Memory, Arc::new(SystemClock))
    }

    /// Replace the clock used for timestamps and expiry.
    ///
    /// Must be called before the handle is cloned.
    #[must_use]
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        let location = self.inner.location.clone();
        Self::with_location(location, clock)
    }

    fn with_location(location: Location, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                location,
                clock,
                conn: OnceCell::new(),
            }),
        }
    }

    /// Clock shared by every store on this handle.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Open the store and bring the schema up to date.
    ///
    /// Safe to call repeatedly; only the first call does any work.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError`] if the file cannot be opened or a migration
    /// fails. The process should not continue with an unknown schema.
    pub async fn init(&self) -> Result<(), MigrationError> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> Result<Arc<Mutex<Connection>>, MigrationError> {
        let conn = self
            .inner
            .conn
            .get_or_try_init(|| {
                let location = self.inner.location.clone();
                async move {
                    tokio::task::spawn_blocking(move || open_and_migrate(&location))
                        .await
                        .map_err(|e| MigrationError::Open(e.to_string()))?
                        .map(|conn| Arc::new(Mutex::new(conn)))
                }
            })
            .await?;
        Ok(Arc::clone(conn))
    }

    /// Run `f` against the connection on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or [`StoreError::Unavailable`] if the
    /// store could not be initialized.
    pub async fn call<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self
            .connection()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Task("connection mutex poisoned".to_string()))?;
            f(&mut guard)
        })
        .await?
    }

    /// Schema version currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or read.
    pub async fn schema_version(&self) -> Result<i64, StoreError> {
        self.call(|conn| migrations::current_version(conn).map_err(|e| StoreError::Unavailable(e.to_string())))
            .await
    }

    /// Delete every user-owned row, cached content and sync state.
    ///
    /// Used on sign-out. The schema and its version marker are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is deleted then.
    pub async fn clear_user_data(&self) -> Result<(), StoreError> {
        self.call(|conn| {
            let tx = conn.transaction()?;
            for table in USER_TABLES {
                tx.execute(&format!("DELETE FROM {table}"), [])?;
            }
            tx.commit()?;
            Ok(())
        })
        .await?;
        info!("Cleared local user data");
        Ok(())
    }
}

/// Tables wiped on sign-out.
const USER_TABLES: [&str; 7] = [
    "profiles",
    "kick_entries",
    "symptom_logs",
    "goals",
    "cached_articles",
    "cached_tips",
    "sync_state",
];

fn open_and_migrate(location: &Location) -> Result<Connection, MigrationError> {
    let mut conn = match location {
        Location::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MigrationError::Open(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
            let conn = Connection::open(path)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
            conn
        }
        Location::Memory => Connection::open_in_memory()?,
    };

    conn.busy_timeout(Duration::from_secs(5))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    debug!(location = ?location, "Opened local store");
    migrations::apply_pending(&mut conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_first_callers_share_one_init() {
        let db = Database::in_memory();

        let (a, b, c) = tokio::join!(db.init(), db.init(), db.schema_version());
        a.unwrap();
        b.unwrap();
        assert_eq!(c.unwrap(), migrations::latest_version());

        // A second open would be a fresh in-memory database without our row.
        db.call(|conn| {
            conn.execute("INSERT INTO sync_state (domain) VALUES ('kicks')", [])?;
            Ok(())
        })
        .await
        .unwrap();
        let clone = db.clone();
        let count: i64 = clone
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM sync_state", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kicksync.db");

        let db = Database::open(&path);
        db.call(|conn| {
            conn.execute(
                "INSERT INTO sync_state (domain, last_error) VALUES ('goals', 'offline')",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();
        drop(db);

        let reopened = Database::open(&path);
        assert_eq!(reopened.schema_version().await.unwrap(), migrations::latest_version());
        let err: Option<String> = reopened
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT last_error FROM sync_state WHERE domain = 'goals'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(err.as_deref(), Some("offline"));
    }

    #[tokio::test]
    async fn test_clear_user_data_keeps_schema() {
        let db = Database::in_memory();
        db.call(|conn| {
            conn.execute(
                "INSERT INTO goals (id, user_id, title, updated_at) VALUES ('g1', 'u1', 'Walk', 'now')",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        db.clear_user_data().await.unwrap();

        let goals: i64 = db
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM goals", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(goals, 0);
        assert_eq!(db.schema_version().await.unwrap(), migrations::latest_version());
    }
}
