use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PulseError;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// One of the five questions every pulse response answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Vision,
    Workload,
    Communication,
    Strategy,
    Wellbeing,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Vision,
            Category::Workload,
            Category::Communication,
            Category::Strategy,
            Category::Wellbeing,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Vision => "vision",
            Category::Workload => "workload",
            Category::Communication => "communication",
            Category::Strategy => "strategy",
            Category::Wellbeing => "wellbeing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vision" => Ok(Category::Vision),
            "workload" => Ok(Category::Workload),
            "communication" => Ok(Category::Communication),
            "strategy" => Ok(Category::Strategy),
            "wellbeing" => Ok(Category::Wellbeing),
            _ => Err(PulseError::InvalidInput(format!("unknown category '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// PulseStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseStatus {
    Pending,
    Partial,
    Completed,
}

impl PulseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PulseStatus::Pending => "pending",
            PulseStatus::Partial => "partial",
            PulseStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PulseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PulseStatus {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PulseStatus::Pending),
            "partial" => Ok(PulseStatus::Partial),
            "completed" => Ok(PulseStatus::Completed),
            _ => Err(PulseError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Suggested,
    Committed,
    InProgress,
    Completed,
}

impl ActionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionStatus::Suggested => "suggested",
            ActionStatus::Committed => "committed",
            ActionStatus::InProgress => "in_progress",
            ActionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionStatus {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suggested" => Ok(ActionStatus::Suggested),
            "committed" => Ok(ActionStatus::Committed),
            "in_progress" | "in-progress" => Ok(ActionStatus::InProgress),
            "completed" => Ok(ActionStatus::Completed),
            _ => Err(PulseError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// CallStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Generated,
    Scheduled,
    Completed,
}

impl CallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Generated => "generated",
            CallStatus::Scheduled => "scheduled",
            CallStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallStatus {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(CallStatus::Generated),
            "scheduled" => Ok(CallStatus::Scheduled),
            "completed" => Ok(CallStatus::Completed),
            _ => Err(PulseError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn from_delta(delta: i32) -> Self {
        match delta.signum() {
            1 => Trend::Up,
            -1 => Trend::Down,
            _ => Trend::Stable,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AlignmentBand
// ---------------------------------------------------------------------------

/// Coarse reading of an alignment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentBand {
    Healthy,
    Caution,
    Critical,
}

impl AlignmentBand {
    pub fn of(score: u32) -> Self {
        if score >= 70 {
            AlignmentBand::Healthy
        } else if score >= 50 {
            AlignmentBand::Caution
        } else {
            AlignmentBand::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlignmentBand::Healthy => "healthy",
            AlignmentBand::Caution => "caution",
            AlignmentBand::Critical => "critical",
        }
    }
}

impl fmt::Display for AlignmentBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_status_parse_and_display() {
        for s in ["pending", "partial", "completed"] {
            let status: PulseStatus = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("done".parse::<PulseStatus>().is_err());
    }

    #[test]
    fn pulse_status_orders_along_lifecycle() {
        assert!(PulseStatus::Pending < PulseStatus::Partial);
        assert!(PulseStatus::Partial < PulseStatus::Completed);
    }

    #[test]
    fn action_status_accepts_hyphenated_in_progress() {
        assert_eq!(
            "in-progress".parse::<ActionStatus>().unwrap(),
            ActionStatus::InProgress
        );
        assert_eq!(ActionStatus::InProgress.as_str(), "in_progress");
    }

    #[test]
    fn action_status_serializes_snake_case() {
        let json = serde_json::to_string(&ActionStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn trend_from_delta() {
        assert_eq!(Trend::from_delta(5), Trend::Up);
        assert_eq!(Trend::from_delta(-1), Trend::Down);
        assert_eq!(Trend::from_delta(0), Trend::Stable);
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(AlignmentBand::of(70), AlignmentBand::Healthy);
        assert_eq!(AlignmentBand::of(69), AlignmentBand::Caution);
        assert_eq!(AlignmentBand::of(50), AlignmentBand::Caution);
        assert_eq!(AlignmentBand::of(49), AlignmentBand::Critical);
    }

    #[test]
    fn category_all_has_five() {
        assert_eq!(Category::all().len(), 5);
        assert_eq!("wellbeing".parse::<Category>().unwrap(), Category::Wellbeing);
    }
}
