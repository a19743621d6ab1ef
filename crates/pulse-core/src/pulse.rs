//! Pulses and their completion state machine.
//!
//! ```text
//! pending ──(first response)──▶ partial ──(submitted ≥ expected)──▶ completed
//!    └────────────(submitted ≥ expected on first response)────────────┘
//! ```
//!
//! Status is re-derived from fresh counts on every response upsert and never
//! on membership changes. Nothing leaves `completed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::score::{self, Scores};
use crate::types::PulseStatus;
use crate::week::WeekStart;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One workspace's check-in for one calendar week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    pub id: String,
    pub workspace_id: String,
    pub week_start: WeekStart,
    pub status: PulseStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Pulse {
    pub fn new(workspace_id: impl Into<String>, week_start: WeekStart, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: workspace_id.into(),
            week_start,
            status: PulseStatus::Pending,
            created_at: now,
            completed_at: None,
        }
    }

    /// Re-derive status after a response upsert.
    ///
    /// `submitted` is the number of distinct members who have responded,
    /// `expected` the workspace's current member count. Returns `true` if the
    /// status or completion timestamp changed and must be written back.
    pub fn reevaluate(&mut self, submitted: usize, expected: usize, now: DateTime<Utc>) -> bool {
        let next = next_status(self.status, submitted, expected);
        let mut changed = next != self.status;
        self.status = next;
        if next == PulseStatus::Completed && self.completed_at.is_none() {
            self.completed_at = Some(now);
            changed = true;
        }
        changed
    }

    pub fn is_completed(&self) -> bool {
        self.status == PulseStatus::Completed
    }
}

/// Pure transition function.
///
/// A workspace with zero members can never complete a pulse.
pub fn next_status(current: PulseStatus, submitted: usize, expected: usize) -> PulseStatus {
    if current == PulseStatus::Completed {
        return PulseStatus::Completed;
    }
    if expected > 0 && submitted >= expected {
        return PulseStatus::Completed;
    }
    if submitted >= 1 {
        return PulseStatus::Partial;
    }
    current
}

/// Status of a possibly-missing pulse row.
pub fn status_of(pulse: Option<&Pulse>) -> PulseStatus {
    pulse.map(|p| p.status).unwrap_or(PulseStatus::Pending)
}

/// One member's answers for one pulse. At most one per `(pulse, member)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseResponse {
    pub id: String,
    pub pulse_id: String,
    pub member_id: String,
    pub scores: Scores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl PulseResponse {
    pub fn new(
        pulse_id: impl Into<String>,
        member_id: impl Into<String>,
        scores: Scores,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            pulse_id: pulse_id.into(),
            member_id: member_id.into(),
            scores,
            feedback: normalize_feedback(feedback),
            submitted_at: now,
        }
    }
}

/// Blank feedback is stored as absent.
pub fn normalize_feedback(feedback: Option<String>) -> Option<String> {
    feedback
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
}

/// A pulse joined with its responses, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseWithResponses {
    pub pulse: Pulse,
    pub responses: Vec<PulseResponse>,
}

impl PulseWithResponses {
    pub fn scores(&self) -> Vec<Scores> {
        self.responses.iter().map(|r| r.scores).collect()
    }

    pub fn alignment_score(&self) -> Option<u32> {
        score::alignment_score(&self.scores())
    }

    pub fn submitted_count(&self) -> usize {
        let mut members: Vec<&str> = self.responses.iter().map(|r| r.member_id.as_str()).collect();
        members.sort_unstable();
        members.dedup();
        members.len()
    }
}

// ---------------------------------------------------------------------------
// PulseProgress
// ---------------------------------------------------------------------------

/// "x of y submitted" view of the week's pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseProgress {
    pub week_start: WeekStart,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse_id: Option<String>,
    pub status: PulseStatus,
    pub submitted: usize,
    pub expected: usize,
    pub submitted_by_me: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PulseProgress {
    pub fn new(
        week_start: WeekStart,
        pulse: Option<&PulseWithResponses>,
        expected: usize,
        member_id: &str,
    ) -> Self {
        Self {
            week_start,
            pulse_id: pulse.map(|p| p.pulse.id.clone()),
            status: status_of(pulse.map(|p| &p.pulse)),
            submitted: pulse.map(|p| p.submitted_count()).unwrap_or(0),
            expected,
            submitted_by_me: pulse
                .map(|p| p.responses.iter().any(|r| r.member_id == member_id))
                .unwrap_or(false),
            completed_at: pulse.and_then(|p| p.pulse.completed_at),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
