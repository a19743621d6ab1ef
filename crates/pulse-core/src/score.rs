use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};
use crate::types::Category;
use crate::week::WeekStart;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

/// Number of categories each response answers.
const CATEGORIES: u64 = 5;

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// The five sub-scores of one pulse response, each in `[1, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub vision: u8,
    pub workload: u8,
    pub communication: u8,
    pub strategy: u8,
    pub wellbeing: u8,
}

impl Scores {
    pub fn uniform(value: u8) -> Self {
        Self {
            vision: value,
            workload: value,
            communication: value,
            strategy: value,
            wellbeing: value,
        }
    }

    pub fn get(&self, category: Category) -> u8 {
        match category {
            Category::Vision => self.vision,
            Category::Workload => self.workload,
            Category::Communication => self.communication,
            Category::Strategy => self.strategy,
            Category::Wellbeing => self.wellbeing,
        }
    }

    pub fn sum(&self) -> u64 {
        Category::all().iter().map(|&c| self.get(c) as u64).sum()
    }

    pub fn validate(&self) -> Result<()> {
        for &c in Category::all() {
            check_range(c, self.get(c) as i64)?;
        }
        Ok(())
    }
}

fn check_range(category: Category, value: i64) -> Result<u8> {
    if value < MIN_SCORE as i64 || value > MAX_SCORE as i64 {
        return Err(PulseError::InvalidScore {
            category: category.to_string(),
            value,
        });
    }
    Ok(value as u8)
}

// ---------------------------------------------------------------------------
// Answers
// ---------------------------------------------------------------------------

/// Raw answers as submitted. Every category is mandatory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Answers {
    #[serde(default)]
    pub vision: Option<i64>,
    #[serde(default)]
    pub workload: Option<i64>,
    #[serde(default)]
    pub communication: Option<i64>,
    #[serde(default)]
    pub strategy: Option<i64>,
    #[serde(default)]
    pub wellbeing: Option<i64>,
}

impl Answers {
    fn get(&self, category: Category) -> Option<i64> {
        match category {
            Category::Vision => self.vision,
            Category::Workload => self.workload,
            Category::Communication => self.communication,
            Category::Strategy => self.strategy,
            Category::Wellbeing => self.wellbeing,
        }
    }

    /// Validate presence and range of every answer.
    pub fn into_scores(self) -> Result<Scores> {
        let pick = |c: Category| -> Result<u8> {
            let v = self
                .get(c)
                .ok_or_else(|| PulseError::MissingAnswer(c.to_string()))?;
            check_range(c, v)
        };
        Ok(Scores {
            vision: pick(Category::Vision)?,
            workload: pick(Category::Workload)?,
            communication: pick(Category::Communication)?,
            strategy: pick(Category::Strategy)?,
            wellbeing: pick(Category::Wellbeing)?,
        })
    }
}

impl From<Scores> for Answers {
    fn from(s: Scores) -> Self {
        Self {
            vision: Some(s.vision as i64),
            workload: Some(s.workload as i64),
            communication: Some(s.communication as i64),
            strategy: Some(s.strategy as i64),
            wellbeing: Some(s.wellbeing as i64),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------
//
// Scores are carried in tenths so the two averaging steps stay exact:
// a response's mean sub-score times ten is `sum * 10 / 5 = 2 * sum`, an
// integer. Rounding half-up happens once, after the mean across responses.

fn response_tenths(scores: &Scores) -> u64 {
    scores.sum() * 10 / CATEGORIES
}

/// `round_half_up(total / count)` for non-negative integers.
fn rounded_mean(total: u64, count: u64) -> u32 {
    ((2 * total + count) / (2 * count)) as u32
}

/// Overall alignment score for one pulse, in `[10, 100]`.
///
/// Two-step mean: each response's sub-scores are averaged first, then those
/// per-response averages are averaged across the pulse and scaled by ten.
/// Returns `None` for a pulse with no responses; the caller picks the
/// fallback (see `ScoringConfig::default_score`).
pub fn alignment_score(responses: &[Scores]) -> Option<u32> {
    if responses.is_empty() {
        return None;
    }
    let total: u64 = responses.iter().map(response_tenths).sum();
    Some(rounded_mean(total, responses.len() as u64))
}

/// Same rule applied to a single category, in `[10, 100]`.
pub fn category_score(responses: &[Scores], category: Category) -> Option<u32> {
    if responses.is_empty() {
        return None;
    }
    let total: u64 = responses.iter().map(|s| s.get(category) as u64 * 10).sum();
    Some(rounded_mean(total, responses.len() as u64))
}

// ---------------------------------------------------------------------------
// WeeklyScore
// ---------------------------------------------------------------------------

/// One point of the alignment trend chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyScore {
    pub week: WeekStart,
    pub label: String,
    pub responses: usize,
    pub score: Option<u32>,
    pub vision: Option<u32>,
    pub workload: Option<u32>,
    pub communication: Option<u32>,
    pub strategy: Option<u32>,
    pub wellbeing: Option<u32>,
}

impl WeeklyScore {
    pub fn compute(week: WeekStart, responses: &[Scores]) -> Self {
        Self {
            week,
            label: week.label(),
            responses: responses.len(),
            score: alignment_score(responses),
            vision: category_score(responses, Category::Vision),
            workload: category_score(responses, Category::Workload),
            communication: category_score(responses, Category::Communication),
            strategy: category_score(responses, Category::Strategy),
            wellbeing: category_score(responses, Category::Wellbeing),
        }
    }
}

/// Chart series from pulses given newest first; the output is oldest first.
pub fn weekly_series<'a, I>(pulses_desc: I) -> Vec<WeeklyScore>
where
    I: IntoIterator<Item = (WeekStart, &'a [Scores])>,
{
    let mut series: Vec<WeeklyScore> = pulses_desc
        .into_iter()
        .map(|(week, responses)| WeeklyScore::compute(week, responses))
        .collect();
    series.reverse();
    series
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
