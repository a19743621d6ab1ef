use serde::{Deserialize, Serialize};

use crate::pulse::PulseWithResponses;
use crate::types::{AlignmentBand, Trend};

pub const DEFAULT_WARNING_DROP: u32 = 20;
pub const DEFAULT_EMERGENCY_BELOW: u32 = 50;

/// Alert thresholds, in score points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// A week-over-week drop of at least this much raises a warning.
    pub warning_drop: u32,
    /// A current score strictly below this raises an emergency.
    pub emergency_below: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            warning_drop: DEFAULT_WARNING_DROP,
            emergency_below: DEFAULT_EMERGENCY_BELOW,
        }
    }
}

/// Current alignment reading with its alert flags. Recomputed on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    pub current: u32,
    pub previous: u32,
    pub delta: i32,
    pub trend: Trend,
    pub band: AlignmentBand,
    pub warning: bool,
    pub emergency: bool,
}

impl Alignment {
    /// A missing `previous` reads as no change. Emergency suppresses warning.
    pub fn evaluate(current: u32, previous: Option<u32>, thresholds: &AlertThresholds) -> Self {
        let previous = previous.unwrap_or(current);
        let delta = current as i32 - previous as i32;
        let emergency = current < thresholds.emergency_below;
        let warning = !emergency && delta <= -(thresholds.warning_drop as i32);
        Self {
            current,
            previous,
            delta,
            trend: Trend::from_delta(delta),
            band: AlignmentBand::of(current),
            warning,
            emergency,
        }
    }

    /// Alignment from pulses ordered newest first.
    ///
    /// A pulse with no responses scores `default_score`. With no second pulse
    /// the previous score equals the current one.
    pub fn from_pulses(
        pulses_desc: &[PulseWithResponses],
        default_score: u32,
        thresholds: &AlertThresholds,
    ) -> Self {
        let score_of = |p: &PulseWithResponses| p.alignment_score().unwrap_or(default_score);
        let current = pulses_desc.first().map(score_of).unwrap_or(default_score);
        let previous = pulses_desc.get(1).map(score_of);
        Self::evaluate(current, previous, thresholds)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
