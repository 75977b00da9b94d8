//! Personal goals.

use serde::{Deserialize, Serialize};

use super::{SyncStatus, new_record_id};

/// A goal the user set for themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: Option<String>,
    /// `YYYY-MM-DD`
    pub target_date: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

/// Input for a local goal write.
#[derive(Debug, Clone, Default)]
pub struct GoalDraft {
    pub id: Option<String>,
    pub user_id: String,
    pub title: String,
    pub category: Option<String>,
    pub target_date: Option<String>,
    pub completed: bool,
    pub sync_status: Option<SyncStatus>,
}

impl GoalDraft {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn into_goal(self, now_iso: String) -> Goal {
        Goal {
            id: self.id.unwrap_or_else(new_record_id),
            user_id: self.user_id,
            title: self.title,
            category: self.category,
            target_date: self.target_date,
            completed: self.completed,
            updated_at: now_iso,
            sync_status: self.sync_status.unwrap_or_default(),
        }
    }
}

impl From<Goal> for GoalDraft {
    /// Edit an existing goal: the next upsert resets it to pending.
    fn from(goal: Goal) -> Self {
        Self {
            id: Some(goal.id),
            user_id: goal.user_id,
            title: goal.title,
            category: goal.category,
            target_date: goal.target_date,
            completed: goal.completed,
            sync_status: None,
        }
    }
}
