//! Per-domain sync configuration.
//!
//! Every queued domain is reconciled by the same push-then-pull routine.
//! What differs between domains (remote table, owner column, pull order and
//! cap, wire mapping) is described by [`SyncedRecord`], and the local side
//! is reached through [`DomainStore`].

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;
use crate::model::{Domain, Goal, KickEntry, Profile, Pulled, SymptomLog, SyncStatus};
use crate::storage::{GoalStore, KickStore, ProfileStore, SymptomStore};

/// Most recent symptom logs pulled per cycle.
pub const SYMPTOM_PULL_LIMIT: u32 = 200;

/// A local record that round-trips through the remote.
pub trait SyncedRecord: Serialize + DeserializeOwned + Send + Sync + 'static {
    const DOMAIN: Domain;
    /// Remote table name.
    const TABLE: &'static str;
    /// Column the remote filters on to select one owner's rows.
    const OWNER_COLUMN: &'static str = "user_id";
    const ORDER_BY: &'static str;
    const DESCENDING: bool = true;
    const PULL_LIMIT: Option<u32> = None;
    /// Whether local edits are queued and pushed. Unqueued domains are
    /// pull-only.
    const QUEUED: bool = true;

    fn id(&self) -> &str;

    /// Local modification stamp, used to confirm a pushed row is unchanged.
    fn updated_at(&self) -> &str;

    /// Stamp a freshly pulled row as synced.
    fn mark_pulled(&mut self, now_iso: &str);

    /// Remote payload: the record minus local-only bookkeeping.
    fn to_remote(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove("sync_status");
        }
        Ok(value)
    }

    /// Local record from a remote row, marked synced, remembering which
    /// fields the row carried.
    fn from_remote(row: Value, now_iso: &str) -> Result<Pulled<Self>, serde_json::Error> {
        let fields: Vec<String> = match &row {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        };
        let mut record: Self = serde_json::from_value(row)?;
        record.mark_pulled(now_iso);
        Ok(Pulled::new(record, fields))
    }
}

fn stamp(updated_at: &mut String, status: &mut SyncStatus, now_iso: &str) {
    *status = SyncStatus::Synced;
    if updated_at.is_empty() {
        *updated_at = now_iso.to_string();
    }
}

impl SyncedRecord for KickEntry {
    const DOMAIN: Domain = Domain::Kicks;
    const TABLE: &'static str = "kick_entries";
    const ORDER_BY: &'static str = "date";

    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> &str {
        &self.updated_at
    }

    fn mark_pulled(&mut self, now_iso: &str) {
        stamp(&mut self.updated_at, &mut self.sync_status, now_iso);
    }
}

impl SyncedRecord for SymptomLog {
    const DOMAIN: Domain = Domain::Symptoms;
    const TABLE: &'static str = "symptom_logs";
    const ORDER_BY: &'static str = "logged_at";
    const PULL_LIMIT: Option<u32> = Some(SYMPTOM_PULL_LIMIT);

    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> &str {
        &self.updated_at
    }

    fn mark_pulled(&mut self, now_iso: &str) {
        stamp(&mut self.updated_at, &mut self.sync_status, now_iso);
    }
}

impl SyncedRecord for Goal {
    const DOMAIN: Domain = Domain::Goals;
    const TABLE: &'static str = "goals";
    const ORDER_BY: &'static str = "updated_at";

    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> &str {
        &self.updated_at
    }

    fn mark_pulled(&mut self, now_iso: &str) {
        stamp(&mut self.updated_at, &mut self.sync_status, now_iso);
    }
}

// Remote profiles are keyed by the account id and carry no separate owner.
impl SyncedRecord for Profile {
    const DOMAIN: Domain = Domain::Profile;
    const TABLE: &'static str = "profiles";
    const OWNER_COLUMN: &'static str = "id";
    const ORDER_BY: &'static str = "updated_at";
    const PULL_LIMIT: Option<u32> = Some(1);
    const QUEUED: bool = false;

    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> &str {
        &self.updated_at
    }

    fn mark_pulled(&mut self, now_iso: &str) {
        if self.user_id.is_empty() {
            self.user_id.clone_from(&self.id);
        }
        stamp(&mut self.updated_at, &mut self.sync_status, now_iso);
    }

    fn to_remote(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove("sync_status");
            map.remove("user_id");
        }
        Ok(value)
    }
}

/// Local side of a synced domain.
pub trait DomainStore: Send + Sync {
    type Record: SyncedRecord;

    /// Rows for `owner` not yet acknowledged by the remote.
    fn pending(&self, owner: &str) -> impl Future<Output = Result<Vec<Self::Record>, StoreError>> + Send;

    /// Flip pushed rows to synced. Each id is paired with the `updated_at`
    /// it was pushed with; rows edited since stay pending.
    fn acknowledge(&self, pushed: Vec<(String, String)>) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Merge pulled rows over their local copies.
    fn store_pulled(&self, records: Vec<Pulled<Self::Record>>) -> impl Future<Output = Result<(), StoreError>> + Send;
}

macro_rules! domain_store {
    ($store:ty, $record:ty) => {
        impl DomainStore for $store {
            type Record = $record;

            fn pending(&self, owner: &str) -> impl Future<Output = Result<Vec<$record>, StoreError>> + Send {
                self.get_pending(owner)
            }

            fn acknowledge(&self, pushed: Vec<(String, String)>) -> impl Future<Output = Result<(), StoreError>> + Send {
                <$store>::acknowledge(self, pushed)
            }

            fn store_pulled(&self, records: Vec<Pulled<$record>>) -> impl Future<Output = Result<(), StoreError>> + Send {
                self.merge_pulled(records)
            }
        }
    };
}

domain_store!(KickStore, KickEntry);
domain_store!(SymptomStore, SymptomLog);
domain_store!(GoalStore, Goal);
domain_store!(ProfileStore, Profile);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_payload_drops_sync_status() {
        let entry = KickEntry {
            id: "k1".into(),
            user_id: "u1".into(),
            date: "2025-01-10".into(),
            time_of_day: "morning".into(),
            count: 3,
            notes: None,
            updated_at: "2025-01-10T08:30:00.000Z".into(),
            sync_status: SyncStatus::Pending,
        };
        let payload = entry.to_remote().unwrap();
        assert_eq!(payload["id"], "k1");
        assert_eq!(payload["count"], 3);
        assert!(payload.get("sync_status").is_none());
    }

    #[test]
    fn test_pulled_row_is_synced_and_stamped() {
        let row = json!({
            "id": "g1",
            "user_id": "u1",
            "title": "Prenatal yoga",
            "category": null,
            "target_date": null,
            "completed": true
        });
        let pulled = Goal::from_remote(row, "2025-01-10T08:30:00.000Z").unwrap();
        assert!(pulled.carries("category"));
        assert!(!pulled.carries("updated_at"));

        let goal = pulled.record;
        assert_eq!(goal.sync_status, SyncStatus::Synced);
        assert_eq!(goal.updated_at, "2025-01-10T08:30:00.000Z");
        assert!(goal.completed);
    }

    #[test]
    fn test_pulled_profile_owner_comes_from_id() {
        let row = json!({"id": "u1", "display_name": "Ada", "due_date": "2025-06-01", "pregnancy_week": 20});
        let profile = Profile::from_remote(row, "now").unwrap().record;
        assert_eq!(profile.user_id, "u1");
        assert!(profile.to_remote().unwrap().get("user_id").is_none());
    }

    #[test]
    fn test_row_missing_required_field_is_rejected() {
        let row = json!({"id": "k1", "user_id": "u1"});
        assert!(KickEntry::from_remote(row, "now").is_err());
    }
}
