//! User profile.

use serde::{Deserialize, Serialize};

use super::SyncStatus;

/// The signed-in user's profile. One row per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same value as `user_id`
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub display_name: Option<String>,
    /// `YYYY-MM-DD`
    pub due_date: Option<String>,
    pub pregnancy_week: Option<i64>,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

/// Input for a local profile write.
#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    /// Defaults to `user_id`
    pub id: Option<String>,
    pub user_id: String,
    pub display_name: Option<String>,
    pub due_date: Option<String>,
    pub pregnancy_week: Option<i64>,
    pub sync_status: Option<SyncStatus>,
}

impl ProfileDraft {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn into_profile(self, now_iso: String) -> Profile {
        let id = self.id.unwrap_or_else(|| self.user_id.clone());
        Profile {
            id,
            user_id: self.user_id,
            display_name: self.display_name,
            due_date: self.due_date,
            pregnancy_week: self.pregnancy_week,
            updated_at: now_iso,
            sync_status: self.sync_status.unwrap_or_default(),
        }
    }
}
