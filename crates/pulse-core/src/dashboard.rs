//! Read models assembled from the store for the dashboard views.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::action_item::ActionItem;
use crate::config::Config;
use crate::db::PulseDb;
use crate::error::Result;
use crate::feedback::{recent_entries, FeedbackEntry};
use crate::pulse::{PulseProgress, PulseWithResponses};
use crate::score::{weekly_series, WeeklyScore};
use crate::trend::Alignment;
use crate::types::PulseStatus;
use crate::week::WeekStart;

/// Alignment reading plus the chart series it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentSummary {
    pub alignment: Alignment,
    pub series: Vec<WeeklyScore>,
}

impl AlignmentSummary {
    pub fn from_pulses(pulses_desc: &[PulseWithResponses], config: &Config) -> Self {
        let alignment = Alignment::from_pulses(
            pulses_desc,
            config.scoring.default_score,
            &config.alerts.thresholds(),
        );
        let scores: Vec<_> = pulses_desc.iter().map(|p| p.scores()).collect();
        let series = weekly_series(
            pulses_desc
                .iter()
                .zip(&scores)
                .map(|(p, s)| (p.pulse.week_start, s.as_slice())),
        );
        Self { alignment, series }
    }

    pub fn load(db: &PulseDb, workspace_id: &str, config: &Config) -> Result<Self> {
        let pulses = db.recent_pulses(workspace_id, None, config.dashboard.history_weeks)?;
        Ok(Self::from_pulses(&pulses, config))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub workspace_name: String,
    pub member_count: usize,
    #[serde(flatten)]
    pub summary: AlignmentSummary,
    pub current_pulse: PulseProgress,
    pub open_actions: Vec<ActionItem>,
    pub recent_feedback: Vec<FeedbackEntry>,
}

impl Dashboard {
    /// Assemble the dashboard for `member_id` as of `today`.
    pub fn load(
        db: &PulseDb,
        workspace_id: &str,
        member_id: &str,
        config: &Config,
        today: NaiveDate,
    ) -> Result<Self> {
        let workspace = db.workspace(workspace_id)?;
        let member_count = db.count_members(workspace_id)?;
        let pulses = db.recent_pulses(workspace_id, None, config.dashboard.history_weeks)?;

        let week = WeekStart::of(today);
        let current = pulses.iter().find(|p| p.pulse.week_start == week);
        let current_pulse = PulseProgress::new(week, current, member_count, member_id);

        let completed: Vec<PulseWithResponses> = pulses
            .iter()
            .filter(|p| p.pulse.status == PulseStatus::Completed)
            .cloned()
            .collect();
        let recent_feedback = recent_entries(&completed, config.feedback.recent_items);

        let open_actions =
            db.action_items(workspace_id, true, Some(config.dashboard.open_actions))?;

        Ok(Self {
            workspace_name: workspace.name,
            member_count,
            summary: AlignmentSummary::from_pulses(&pulses, config),
            current_pulse,
            open_actions,
            recent_feedback,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
