//! Feedback extraction for generation prompts, and the shared helpers for
//! reading structured data back out of free-form generated text.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::pulse::PulseWithResponses;
use crate::week::WeekStart;

pub const NO_FEEDBACK_PLACEHOLDER: &str = "No recent feedback available";

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Non-blank feedback strings from `pulses_desc` (newest pulse first), keeping
/// response order within a pulse, truncated to `max_items`.
pub fn extract_feedback(pulses_desc: &[PulseWithResponses], max_items: usize) -> Vec<String> {
    pulses_desc
        .iter()
        .flat_map(|p| p.responses.iter())
        .filter_map(|r| r.feedback.as_deref())
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .take(max_items)
        .map(str::to_string)
        .collect()
}

/// One entry of the dashboard's recent-feedback feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub text: String,
    pub week: WeekStart,
    pub submitted_at: DateTime<Utc>,
}

pub fn recent_entries(pulses_desc: &[PulseWithResponses], limit: usize) -> Vec<FeedbackEntry> {
    pulses_desc
        .iter()
        .flat_map(|p| {
            p.responses.iter().filter_map(move |r| {
                let text = r.feedback.as_deref()?.trim();
                (!text.is_empty()).then(|| FeedbackEntry {
                    text: text.to_string(),
                    week: p.pulse.week_start,
                    submitted_at: r.submitted_at,
                })
            })
        })
        .take(limit)
        .collect()
}

/// Feedback rendered for a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackContext {
    items: Vec<String>,
}

impl FeedbackContext {
    pub fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for FeedbackContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            return f.write_str(NO_FEEDBACK_PLACEHOLDER);
        }
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}. {}", i + 1, item)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parsing generated text
// ---------------------------------------------------------------------------

/// Whether a value was read from generated text or substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum Parsed<T> {
    Parsed(T),
    Fallback(T),
}

impl<T> Parsed<T> {
    pub fn into_inner(self) -> T {
        match self {
            Parsed::Parsed(v) | Parsed::Fallback(v) => v,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Parsed::Parsed(v) | Parsed::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Parsed::Fallback(_))
    }
}

/// Byte range of the balanced `[...]` span opening at `start`.
///
/// Brackets inside JSON string literals are ignored.
fn balanced_from(text: &str, start: usize) -> Option<Range<usize>> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start..start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Every balanced top-level `[...]` span, in order of appearance.
pub fn json_array_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(found) = text[pos..].find('[') {
        let start = pos + found;
        match balanced_from(text, start) {
            Some(span) => {
                pos = span.end;
                spans.push(span);
            }
            None => pos = start + 1,
        }
    }
    spans
}

/// First balanced `[...]` span in `text`.
pub fn find_json_array(text: &str) -> Option<&str> {
    json_array_spans(text).into_iter().next().map(|r| &text[r])
}

/// Outcome of looking for a JSON array in generated text.
#[derive(Debug)]
pub enum ArrayScan<T> {
    /// A span decoded; its byte range and the items.
    Decoded(Range<usize>, Vec<T>),
    /// At least one span was found but none decoded.
    Undecodable,
    /// No bracketed span at all.
    Missing,
}

/// Decode the first bracketed span that parses as `Vec<T>`.
pub fn scan_json_array<T: DeserializeOwned>(text: &str) -> ArrayScan<T> {
    let spans = json_array_spans(text);
    if spans.is_empty() {
        return ArrayScan::Missing;
    }
    for span in spans {
        if let Ok(items) = serde_json::from_str::<Vec<T>>(&text[span.clone()]) {
            return ArrayScan::Decoded(span, items);
        }
    }
    ArrayScan::Undecodable
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::{Pulse, PulseResponse};
    use crate::score::Scores;

    fn pulse(week: WeekStart, feedback: &[Option<&str>]) -> PulseWithResponses {
        let pulse = Pulse::new("ws", week, Utc::now());
        let responses = feedback
            .iter()
            .enumerate()
            .map(|(i, f)| PulseResponse {
                id: format!("r{i}"),
                pulse_id: pulse.id.clone(),
                member_id: format!("m{i}"),
                scores: Scores::uniform(7),
                feedback: f.map(str::to_string),
                submitted_at: Utc::now(),
            })
            .collect();
        PulseWithResponses { pulse, responses }
    }

    fn texts(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn pulse_of(week: WeekStart, items: &[String]) -> PulseWithResponses {
        let refs: Vec<Option<&str>> = items.iter().map(|s| Some(s.as_str())).collect();
        pulse(week, &refs)
    }

    #[test]
    fn truncates_across_pulses_newest_first() {
        let w = WeekStart::from_ymd(2026, 10, 12).unwrap();
        let a = texts("a", 3);
        let c = texts("c", 5);
        let d = texts("d", 2);
        let pulses = [
            pulse_of(w, &a),
            pulse_of(w.previous(), &[]),
            pulse_of(w.previous().previous(), &c),
            pulse_of(w.previous().previous().previous(), &d),
        ];
        let out = extract_feedback(&pulses, 10);
        let mut expected = a.clone();
        expected.extend(c.clone());
        expected.extend(d.clone());
        assert_eq!(out, expected);

        let capped = extract_feedback(&pulses, 4);
        assert_eq!(capped, vec!["a0", "a1", "a2", "c0"]);
    }

    #[test]
    fn skips_missing_and_blank_feedback() {
        let w = WeekStart::from_ymd(2026, 10, 12).unwrap();
        let pulses = [pulse(w, &[None, Some("  "), Some(" keep "), Some("")])];
        assert_eq!(extract_feedback(&pulses, 10), vec!["keep"]);
        let entries = recent_entries(&pulses, 5);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].week, w);
    }

    #[test]
    fn context_renders_numbered_list_or_placeholder() {
        let ctx = FeedbackContext::new(vec!["one".into(), "two".into()]);
        assert_eq!(ctx.to_string(), "1. one\n2. two");
        let empty = FeedbackContext::default();
        assert!(empty.is_empty());
        assert_eq!(empty.to_string(), NO_FEEDBACK_PLACEHOLDER);
    }

    #[test]
    fn finds_first_balanced_array() {
        let text = r#"Here you go: [{"title": "a [b]"}, {"title": "c"}] and [1]"#;
        assert_eq!(
            find_json_array(text),
            Some(r#"[{"title": "a [b]"}, {"title": "c"}]"#)
        );
        assert_eq!(find_json_array("no array"), None);
        assert_eq!(find_json_array("[unterminated"), None);
    }

    #[test]
    fn string_escapes_do_not_end_literal() {
        let text = r#"["quote \" ] still inside", "x"] tail"#;
        assert_eq!(find_json_array(text), Some(r#"["quote \" ] still inside", "x"]"#));
    }

    #[test]
    fn scan_skips_non_json_brackets() {
        let text = r#"See [note] then [{"n": 1}]"#;
        match scan_json_array::<serde_json::Value>(text) {
            ArrayScan::Decoded(range, items) => {
                assert_eq!(&text[range], r#"[{"n": 1}]"#);
                assert_eq!(items.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            scan_json_array::<u32>("[oops]"),
            ArrayScan::Undecodable
        ));
        assert!(matches!(scan_json_array::<u32>("plain"), ArrayScan::Missing));
    }

    #[test]
    fn parsed_accessors() {
        let p: Parsed<Vec<u8>> = Parsed::Fallback(vec![1]);
        assert!(p.is_fallback());
        assert_eq!(p.value(), &vec![1]);
        assert_eq!(Parsed::Parsed(3).into_inner(), 3);
    }
}
