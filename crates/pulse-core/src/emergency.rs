use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CallStatus;

/// One agenda entry of a mediation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub title: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub description: String,
}

impl AgendaItem {
    fn new(title: &str, duration: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            duration: duration.to_string(),
            description: description.to_string(),
        }
    }
}

/// The fixed agenda used when a generated one cannot be read.
pub fn default_agenda() -> Vec<AgendaItem> {
    vec![
        AgendaItem::new(
            "Opening & Ground Rules",
            "5 mins",
            "Set the tone and establish guidelines for respectful dialogue",
        ),
        AgendaItem::new(
            "Individual Perspectives",
            "15 mins",
            "Each co-founder shares their perspective without interruption",
        ),
        AgendaItem::new(
            "Core Issues Discussion",
            "20 mins",
            "Identify and discuss the main areas of misalignment",
        ),
        AgendaItem::new(
            "Finding Common Ground",
            "15 mins",
            "Explore shared values and goals",
        ),
        AgendaItem::new(
            "Action Items & Commitments",
            "10 mins",
            "Agree on concrete next steps",
        ),
        AgendaItem::new(
            "Closing & Check-in Schedule",
            "5 mins",
            "Summarize and plan follow-up",
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgendaSource {
    Parsed,
    Fallback,
}

impl AgendaSource {
    pub fn as_str(self) -> &'static str {
        match self {
            AgendaSource::Parsed => "parsed",
            AgendaSource::Fallback => "fallback",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s == "parsed" {
            AgendaSource::Parsed
        } else {
            AgendaSource::Fallback
        }
    }
}

/// A generated mediation artifact. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyCall {
    pub id: String,
    pub workspace_id: String,
    pub triggered_by: String,
    pub alignment_score: u32,
    pub mediation_script: String,
    pub agenda: Vec<AgendaItem>,
    pub agenda_source: AgendaSource,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
}
