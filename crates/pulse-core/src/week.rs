//! Week bucketing: every calendar day maps to the Monday that starts its
//! Monday–Sunday span. The resulting [`WeekStart`] is the uniqueness key for
//! pulses, so it carries no time-of-day and no timezone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{PulseError, Result};

const FORMAT: &str = "%Y-%m-%d";

/// Monday of the span containing `date`.
///
/// Sunday counts as the seventh day of the previous week, so it moves back six
/// days; every other day moves back `day_of_week - 1` days.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let dow = date.weekday().num_days_from_sunday() as i64;
    let back = if dow == 0 { 6 } else { dow - 1 };
    date - Duration::days(back)
}

// ---------------------------------------------------------------------------
// WeekStart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekStart(NaiveDate);

impl WeekStart {
    pub fn of(date: NaiveDate) -> Self {
        Self(week_start(date))
    }

    /// Bucket a timestamp by the calendar fields of its own timezone.
    pub fn of_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self::of(at.date_naive())
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self::of)
            .ok_or_else(|| PulseError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
    }

    /// Parse any `YYYY-MM-DD` date and bucket it.
    pub fn bucket_str(s: &str) -> Result<Self> {
        NaiveDate::parse_from_str(s.trim(), FORMAT)
            .map(Self::of)
            .map_err(|_| PulseError::InvalidDate(s.to_string()))
    }

    /// Parse a stored week key. The date must already be a Monday.
    pub fn parse(s: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(s.trim(), FORMAT)
            .map_err(|_| PulseError::InvalidDate(s.to_string()))?;
        if date.weekday() != Weekday::Mon {
            return Err(PulseError::InvalidDate(format!("{s} is not a Monday")));
        }
        Ok(Self(date))
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Sunday closing this week.
    pub fn end(self) -> NaiveDate {
        self.0 + Duration::days(6)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.0 && date <= self.end()
    }

    pub fn previous(self) -> Self {
        Self(self.0 - Duration::days(7))
    }

    /// Short chart label, e.g. "Nov 4".
    pub fn label(self) -> String {
        format!("{} {}", self.0.format("%b"), self.0.day())
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl std::str::FromStr for WeekStart {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for WeekStart {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekStart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        WeekStart::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
