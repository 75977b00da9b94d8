//! Row helpers shared by the domain stores.

use rusqlite::types::ToSql;
use rusqlite::{Connection, params};

use crate::error::StoreError;

/// What a write does when a row with the same id already exists.
#[derive(Clone, Copy)]
pub(crate) enum Conflict<'a> {
    /// Replace every column.
    Replace,
    /// Overwrite only the columns the predicate accepts. `sync_status` is
    /// always overwritten; the id never is.
    Merge(&'a dyn Fn(&str) -> bool),
}

/// Write one row. `values` are bound in `columns` order.
pub(crate) fn write_row(
    conn: &Connection,
    table: &'static str,
    columns: &'static str,
    values: &[&dyn ToSql],
    conflict: Conflict<'_>,
) -> Result<(), StoreError> {
    let names: Vec<&str> = columns.split(',').map(str::trim).collect();
    let placeholders = (1..=names.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");

    let sql = match conflict {
        Conflict::Replace => format!("INSERT OR REPLACE INTO {table} ({columns}) VALUES ({placeholders})"),
        Conflict::Merge(carried) => {
            let updates = names
                .iter()
                .filter(|name| **name != "id" && (**name == "sync_status" || carried(*name)))
                .map(|name| format!("{name} = excluded.{name}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {table} ({columns}) VALUES ({placeholders})
                 ON CONFLICT(id) DO UPDATE SET {updates}"
            )
        }
    };

    conn.execute(&sql, values)?;
    Ok(())
}

/// Flip `ids` to synced in one transaction, stamping a fresh `updated_at`.
///
/// Unknown ids are skipped. Returns the number of rows changed.
pub(crate) fn mark_synced(
    conn: &mut Connection,
    table: &'static str,
    ids: &[String],
    now_iso: &str,
) -> Result<usize, StoreError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    let mut changed = 0;
    {
        let mut stmt = tx.prepare(&format!(
            "UPDATE {table} SET sync_status = 'synced', updated_at = ?1 WHERE id = ?2"
        ))?;
        for id in ids {
            changed += stmt.execute(params![now_iso, id])?;
        }
    }
    tx.commit()?;
    Ok(changed)
}

/// Flip pushed rows to synced, but only those still carrying the
/// `updated_at` they were pushed with. A row edited after it was read for
/// the push stays pending for the next cycle.
///
/// Returns the number of rows changed.
pub(crate) fn acknowledge_pushed(
    conn: &mut Connection,
    table: &'static str,
    pushed: &[(String, String)],
    now_iso: &str,
) -> Result<usize, StoreError> {
    if pushed.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    let mut changed = 0;
    {
        let mut stmt = tx.prepare(&format!(
            "UPDATE {table} SET sync_status = 'synced', updated_at = ?1
             WHERE id = ?2 AND updated_at = ?3"
        ))?;
        for (id, pushed_at) in pushed {
            changed += stmt.execute(params![now_iso, id, pushed_at])?;
        }
    }
    tx.commit()?;
    Ok(changed)
}

/// Delete one row by id. Missing rows are not an error.
pub(crate) fn delete_by_id(conn: &Connection, table: &'static str, id: &str) -> Result<bool, StoreError> {
    let deleted = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id TEXT PRIMARY KEY, name TEXT NOT NULL, note TEXT,
                                 updated_at TEXT NOT NULL, sync_status TEXT NOT NULL)",
        )
        .unwrap();
        conn
    }

    fn read(conn: &Connection, id: &str) -> (String, Option<String>, String, String) {
        conn.query_row(
            "SELECT name, note, updated_at, sync_status FROM items WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap()
    }

    const COLUMNS: &str = "id, name, note, updated_at, sync_status";

    #[test]
    fn test_merge_keeps_columns_not_carried() {
        let conn = conn();
        write_row(&conn, "items", COLUMNS, params!["i1", "a", "keep me", "t1", "pending"], Conflict::Replace).unwrap();

        let carried = |column: &str| column == "name";
        write_row(&conn, "items", COLUMNS, params!["i1", "b", None::<String>, "t2", "synced"], Conflict::Merge(&carried))
            .unwrap();

        let (name, note, updated_at, status) = read(&conn, "i1");
        assert_eq!(name, "b");
        assert_eq!(note.as_deref(), Some("keep me"));
        assert_eq!(updated_at, "t1");
        assert_eq!(status, "synced");
    }

    #[test]
    fn test_merge_inserts_new_rows_whole() {
        let conn = conn();
        let carried = |_: &str| false;
        write_row(&conn, "items", COLUMNS, params!["i2", "n", "x", "t9", "synced"], Conflict::Merge(&carried)).unwrap();
        assert_eq!(read(&conn, "i2"), ("n".into(), Some("x".into()), "t9".into(), "synced".into()));
    }

    #[test]
    fn test_acknowledge_skips_rows_edited_after_push() {
        let mut conn = conn();
        write_row(&conn, "items", COLUMNS, params!["i1", "a", None::<String>, "t1", "pending"], Conflict::Replace).unwrap();
        write_row(&conn, "items", COLUMNS, params!["i2", "b", None::<String>, "t5", "pending"], Conflict::Replace).unwrap();

        let pushed = vec![("i1".to_string(), "t1".to_string()), ("i2".to_string(), "t2".to_string())];
        assert_eq!(acknowledge_pushed(&mut conn, "items", &pushed, "t9").unwrap(), 1);

        assert_eq!(read(&conn, "i1").3, "synced");
        assert_eq!(read(&conn, "i2").3, "pending");
    }
}
