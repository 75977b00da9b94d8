//! Symptom log entries.

use serde::{Deserialize, Serialize};

use super::{SyncStatus, new_record_id};

/// A symptom the user logged at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomLog {
    pub id: String,
    pub user_id: String,
    pub symptom: String,
    /// 1 (mild) to 5 (severe), when given
    pub severity: Option<i64>,
    pub notes: Option<String>,
    /// ISO-8601 time the symptom was observed
    pub logged_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

/// Input for a local symptom write.
#[derive(Debug, Clone, Default)]
pub struct SymptomLogDraft {
    pub id: Option<String>,
    pub user_id: String,
    pub symptom: String,
    pub severity: Option<i64>,
    pub notes: Option<String>,
    /// Defaults to the write time
    pub logged_at: Option<String>,
    pub sync_status: Option<SyncStatus>,
}

impl SymptomLogDraft {
    pub fn new(user_id: impl Into<String>, symptom: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            symptom: symptom.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_severity(mut self, severity: i64) -> Self {
        self.severity = Some(severity);
        self
    }

    #[must_use]
    pub fn logged_at(mut self, at: impl Into<String>) -> Self {
        self.logged_at = Some(at.into());
        self
    }

    #[must_use]
    pub fn into_log(self, now_iso: String) -> SymptomLog {
        SymptomLog {
            id: self.id.unwrap_or_else(new_record_id),
            user_id: self.user_id,
            symptom: self.symptom,
            severity: self.severity,
            notes: self.notes,
            logged_at: self.logged_at.unwrap_or_else(|| now_iso.clone()),
            updated_at: now_iso,
            sync_status: self.sync_status.unwrap_or_default(),
        }
    }
}
