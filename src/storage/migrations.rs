//! Versioned schema migrations embedded at compile time.
//!
//! Migrations are sourced from `/migrations/` at the repo root and embedded
//! with `include_str!`, so the binary carries its own schema.
//!
//! The applied version is a single row in `schema_version`. Each migration
//! runs inside its own EXCLUSIVE transaction together with the version bump,
//! so a reader never sees a half-applied schema and a failing statement
//! leaves no partial DDL behind.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info};

use crate::error::MigrationError;

/// A single migration with its version and SQL content.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "001_local_domains",
        sql: include_str!("../../migrations/001_local_domains.sql"),
    },
    Migration {
        version: 2,
        name: "002_content_cache",
        sql: include_str!("../../migrations/002_content_cache.sql"),
    },
    Migration {
        version: 3,
        name: "003_sync_state",
        sql: include_str!("../../migrations/003_sync_state.sql"),
    },
    Migration {
        version: 4,
        name: "004_symptom_recency_index",
        sql: include_str!("../../migrations/004_symptom_recency_index.sql"),
    },
];

/// Highest version known to this build.
#[must_use]
pub fn latest_version() -> i64 {
    MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0)
}

/// Apply every embedded migration newer than the stored version.
///
/// # Errors
///
/// Returns [`MigrationError`] if any migration fails. Migrations applied
/// before the failing one stay committed.
pub fn apply_pending(conn: &mut Connection) -> Result<(), MigrationError> {
    apply_migrations(conn, MIGRATIONS)
}

/// Apply `migrations` newer than the stored version, lowest first.
///
/// # Errors
///
/// Returns [`MigrationError::Statement`] naming the first migration whose
/// SQL failed.
pub fn apply_migrations(conn: &mut Connection, migrations: &[Migration]) -> Result<(), MigrationError> {
    let current = current_version(conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let mut pending: Vec<&Migration> = migrations.iter().filter(|m| m.version > current).collect();
    pending.sort_by_key(|m| m.version);

    if pending.is_empty() {
        debug!(version = current, "Schema up to date");
        return Ok(());
    }

    for migration in pending {
        info!(version = migration.version, name = migration.name, "Applying migration");

        let tx = conn.transaction_with_behavior(TransactionBehavior::Exclusive)?;
        tx.execute_batch(migration.sql)
            .map_err(|source| MigrationError::Statement {
                version: migration.version,
                name: migration.name,
                source,
            })?;
        tx.execute(
            "INSERT INTO schema_version (id, version, applied_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET version = excluded.version, applied_at = excluded.applied_at",
            params![migration.version, chrono::Utc::now().timestamp_millis()],
        )?;
        tx.commit()?;

        info!(version = migration.version, "Migration complete");
    }

    Ok(())
}

/// Read the stored schema version: 0 when the marker table is absent or empty.
///
/// # Errors
///
/// Returns an error if the catalog or marker row cannot be read.
pub fn current_version(conn: &Connection) -> Result<i64, MigrationError> {
    let has_table: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
        [],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
            row.get::<_, i64>(0)
        })
        .optional()?;
    Ok(version.unwrap_or(0))
}
