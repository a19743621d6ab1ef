use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};
use crate::suggest::SuggestedAction;
use crate::types::ActionStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: String,
    pub workspace_id: String,
    pub pulse_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<String>,
    pub status: ActionStatus,
    pub due_date: Option<NaiveDate>,
    pub ai_generated: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields a member supplies when creating an item by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewActionItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl ActionItem {
    fn base(workspace_id: &str, title: String, status: ActionStatus) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: workspace_id.to_string(),
            pulse_id: None,
            title,
            description: None,
            assignee_id: None,
            status,
            due_date: None,
            ai_generated: false,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// A member-created item; starts out committed.
    pub fn manual(workspace_id: &str, new: NewActionItem) -> Result<Self> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(PulseError::InvalidInput("title must not be empty".into()));
        }
        let mut item = Self::base(workspace_id, title.to_string(), ActionStatus::Committed);
        item.description = non_blank(new.description);
        item.assignee_id = non_blank(new.assignee_id);
        item.due_date = new.due_date;
        Ok(item)
    }

    /// A generated suggestion awaiting a member's decision.
    pub fn suggested(workspace_id: &str, pulse_id: Option<&str>, s: SuggestedAction) -> Self {
        let mut item = Self::base(workspace_id, s.title, ActionStatus::Suggested);
        item.pulse_id = pulse_id.map(str::to_string);
        item.description = non_blank(s.description);
        item.ai_generated = true;
        item
    }

    /// `completed_at` is set exactly while the status is `completed`.
    pub fn set_status(&mut self, status: ActionStatus, now: DateTime<Utc>) {
        self.completed_at = match status {
            ActionStatus::Completed => self.completed_at.or(Some(now)),
            _ => None,
        };
        self.status = status;
    }

    pub fn is_open(&self) -> bool {
        self.status != ActionStatus::Completed
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
