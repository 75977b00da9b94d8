//! Data models for kicksync.
//!
//! This module contains the record types for every synchronized domain:
//! - Profile
//! - KickEntry
//! - SymptomLog
//! - Goal
//! - Article / Tip (cached reference content)
//!
//! plus the bookkeeping types shared by the store and the orchestrator.

pub mod content;
pub mod goal;
pub mod kick;
pub mod profile;
pub mod symptom;

pub use content::{Article, Tip};
pub use goal::{Goal, GoalDraft};
pub use kick::{DailyKickTotal, KickEntry, KickEntryDraft};
pub use profile::{Profile, ProfileDraft};
pub use symptom::{SymptomLog, SymptomLogDraft};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Sync state of a local row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local mutation not yet acknowledged by the remote.
    #[default]
    Pending,
    /// Matches the last acknowledged remote copy.
    Synced,
    /// Last push attempt was rejected.
    Failed,
}

impl SyncStatus {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }

    /// Parse from the stored string. Unknown values read as pending so the
    /// row is pushed again rather than silently dropped.
    #[must_use]
    pub fn from_db(s: &str) -> Self {
        match s {
            "synced" => Self::Synced,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A category of synchronized data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Profile,
    Kicks,
    Symptoms,
    Goals,
    Content,
}

impl Domain {
    /// Every domain, in the order a full sync visits them.
    pub const ALL: [Self; 5] = [
        Self::Profile,
        Self::Kicks,
        Self::Symptoms,
        Self::Goals,
        Self::Content,
    ];

    /// Key used in the sync state table and in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Kicks => "kicks",
            Self::Symptoms => "symptoms",
            Self::Goals => "goals",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "profile" => Ok(Self::Profile),
            "kicks" | "kick" => Ok(Self::Kicks),
            "symptoms" | "symptom" => Ok(Self::Symptoms),
            "goals" | "goal" => Ok(Self::Goals),
            "content" => Ok(Self::Content),
            other => Err(format!("unknown domain '{other}'")),
        }
    }
}

/// A record decoded from a remote row, together with the field names the
/// row actually carried. Fields the row omitted keep their local value when
/// merged into an existing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pulled<T> {
    pub record: T,
    fields: BTreeSet<String>,
}

impl<T> Pulled<T> {
    pub fn new(record: T, fields: impl IntoIterator<Item = String>) -> Self {
        Self {
            record,
            fields: fields.into_iter().collect(),
        }
    }

    /// Whether the remote row had `field`, even as null.
    #[must_use]
    pub fn carries(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

/// Last reconciliation outcome for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStateEntry {
    /// ISO-8601 time of the last successful cycle.
    pub last_success_at: Option<String>,
    /// Message of the last failed cycle, cleared on success.
    pub last_error: Option<String>,
}

/// Generate a client-side record identifier.
#[must_use]
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
