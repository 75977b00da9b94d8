//! In-process remote backend.
//!
//! Holds tables as `id -> row` maps, with failures injectable per table.
//! The orchestrator and scheduler tests run against it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use super::{RemoteBackend, RemoteError, RemoteQuery};

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, BTreeMap<String, Value>>,
    failing: HashSet<String>,
    select_calls: usize,
    upsert_calls: usize,
}

/// Cloneable in-memory backend; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<State>>,
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain maps behind; keep going.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Seed a row as if another device had written it.
    pub fn insert_row(&self, table: &str, row: Value) {
        let id = row_id(&row).unwrap_or_default();
        self.lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(id, row);
    }

    /// Every row in `table`, ordered by id.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock()
            .tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Make every call touching `table` fail until [`heal_table`](Self::heal_table).
    pub fn fail_table(&self, table: &str) {
        self.lock().failing.insert(table.to_string());
    }

    pub fn heal_table(&self, table: &str) {
        self.lock().failing.remove(table);
    }

    /// Number of `select` calls served so far, including failed ones.
    #[must_use]
    pub fn select_calls(&self) -> usize {
        self.lock().select_calls
    }

    /// Number of `upsert` calls served so far, including failed ones.
    #[must_use]
    pub fn upsert_calls(&self) -> usize {
        self.lock().upsert_calls
    }
}

fn row_id(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn compare_field(a: &Value, b: &Value, column: &str) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.get(column), b.get(column)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), Some(_)) => Ordering::Less,
        (Some(_), None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn matches_owner(row: &Value, column: &str, owner: &str) -> bool {
    match row.get(column) {
        Some(Value::String(s)) => s == owner,
        Some(Value::Number(n)) => n.to_string() == owner,
        _ => false,
    }
}

impl RemoteBackend for MemoryRemote {
    async fn select(&self, query: &RemoteQuery) -> Result<Vec<Value>, RemoteError> {
        let mut state = self.lock();
        state.select_calls += 1;
        if state.failing.contains(query.table) {
            return Err(RemoteError::Status {
                status: 503,
                body: format!("{} unavailable", query.table),
            });
        }

        let mut rows: Vec<Value> = state
            .tables
            .get(query.table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        drop(state);

        if let Some((column, owner)) = &query.owner {
            rows.retain(|row| matches_owner(row, column, owner));
        }
        if let Some(order) = query.order {
            rows.sort_by(|a, b| {
                let ord = compare_field(a, b, order.column);
                if order.descending { ord.reverse() } else { ord }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(rows)
    }

    async fn upsert(&self, table: &'static str, rows: Vec<Value>) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.upsert_calls += 1;
        if state.failing.contains(table) {
            return Err(RemoteError::Rejected(format!("{table} refused the batch")));
        }

        // Validate the whole batch before applying any of it.
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row_id(&row)
                .ok_or_else(|| RemoteError::Rejected(format!("row without id in {table}")))?;
            keyed.push((id, row));
        }

        let target = state.tables.entry(table.to_string()).or_default();
        for (id, row) in keyed {
            target.insert(id, row);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_select_filters_orders_and_limits() {
        let remote = MemoryRemote::new();
        for (id, owner, at) in [
            ("a", "u1", "2025-01-01"),
            ("b", "u1", "2025-01-03"),
            ("c", "u2", "2025-01-04"),
            ("d", "u1", "2025-01-02"),
        ] {
            remote.insert_row("symptom_logs", json!({"id": id, "user_id": owner, "logged_at": at}));
        }

        let query = RemoteQuery::table("symptom_logs")
            .owned_by("user_id", "u1")
            .order_by("logged_at", true)
            .limit(Some(2));
        let rows = remote.select(&query).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b", "d"]);
        assert_eq!(remote.select_calls(), 1);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_per_id() {
        let remote = MemoryRemote::new();
        let row = json!({"id": "g1", "user_id": "u1", "title": "Walk"});
        remote.upsert("goals", vec![row.clone()]).await.unwrap();
        remote.upsert("goals", vec![row]).await.unwrap();

        assert_eq!(remote.rows("goals").len(), 1);
        assert_eq!(remote.upsert_calls(), 2);
    }

    #[tokio::test]
    async fn test_batch_with_bad_row_applies_nothing() {
        let remote = MemoryRemote::new();
        let err = remote
            .upsert("goals", vec![json!({"id": "g1"}), json!({"title": "no id"})])
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
        assert!(remote.rows("goals").is_empty());
    }

    #[tokio::test]
    async fn test_failing_table_until_healed() {
        let remote = MemoryRemote::new();
        remote.fail_table("kick_entries");
        assert!(remote.upsert("kick_entries", vec![json!({"id": "k1"})]).await.is_err());
        assert!(remote.select(&RemoteQuery::table("kick_entries")).await.is_err());

        remote.heal_table("kick_entries");
        remote.upsert("kick_entries", vec![json!({"id": "k1"})]).await.unwrap();
        assert_eq!(remote.rows("kick_entries").len(), 1);
    }
}
