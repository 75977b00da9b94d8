//! Kick count entries.

use serde::{Deserialize, Serialize};

use super::{SyncStatus, new_record_id};

/// A kick count recorded for one part of one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KickEntry {
    pub id: String,

    /// Owner (user id)
    pub user_id: String,

    /// Calendar date, `YYYY-MM-DD`
    pub date: String,

    /// Free-form slot such as "morning" or "evening"
    pub time_of_day: String,

    pub count: i64,

    pub notes: Option<String>,

    /// ISO-8601 timestamp of the last mutation
    #[serde(default)]
    pub updated_at: String,

    #[serde(default)]
    pub sync_status: SyncStatus,
}

/// Input for a local kick entry write. A missing `id` is synthesized.
#[derive(Debug, Clone, Default)]
pub struct KickEntryDraft {
    pub id: Option<String>,
    pub user_id: String,
    pub date: String,
    pub time_of_day: String,
    pub count: i64,
    pub notes: Option<String>,
    pub sync_status: Option<SyncStatus>,
}

impl KickEntryDraft {
    /// Start a draft for a new entry.
    pub fn new(user_id: impl Into<String>, date: impl Into<String>, time_of_day: impl Into<String>, count: i64) -> Self {
        Self {
            user_id: user_id.into(),
            date: date.into(),
            time_of_day: time_of_day.into(),
            count,
            ..Self::default()
        }
    }

    /// Target an existing entry instead of creating a new one.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Materialize the row, stamping `updated_at`.
    #[must_use]
    pub fn into_entry(self, now_iso: String) -> KickEntry {
        KickEntry {
            id: self.id.unwrap_or_else(new_record_id),
            user_id: self.user_id,
            date: self.date,
            time_of_day: self.time_of_day,
            count: self.count,
            notes: self.notes,
            updated_at: now_iso,
            sync_status: self.sync_status.unwrap_or_default(),
        }
    }
}

/// Sum of kicks recorded on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyKickTotal {
    pub date: String,
    pub total: i64,
    pub sessions: i64,
}
