use serde::{Deserialize, Serialize};

use crate::feedback::{scan_json_array, ArrayScan, FeedbackContext, Parsed};

/// One generated action-item suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub fn suggestion_prompt(feedback: &FeedbackContext) -> String {
    format!(
        "Based on the following co-founder feedback, suggest 3-5 concrete action items \
that would improve alignment between the founders. Each item should be achievable \
within one to two weeks.

Feedback:
{feedback}

Respond with a JSON array of objects, each with a \"title\" and a \"description\" field, \
for example:
[
  {{\"title\": \"Hold a weekly priorities sync\", \"description\": \"Book a recurring 30-minute call to agree on the week's top three goals\"}}
]

Return only the JSON array."
    )
}

/// Suggestions from a generated reply.
///
/// Anything that does not decode degrades to an empty fallback. Entries with
/// a blank title are dropped and blank descriptions become absent.
pub fn parse_suggestions(text: &str) -> Parsed<Vec<SuggestedAction>> {
    match scan_json_array::<SuggestedAction>(text) {
        ArrayScan::Decoded(_, items) => Parsed::Parsed(
            items
                .into_iter()
                .filter_map(|s| {
                    let title = s.title.trim();
                    (!title.is_empty()).then(|| SuggestedAction {
                        title: title.to_string(),
                        description: s
                            .description
                            .map(|d| d.trim().to_string())
                            .filter(|d| !d.is_empty()),
                    })
                })
                .collect(),
        ),
        ArrayScan::Undecodable | ArrayScan::Missing => {
            tracing::warn!("action suggestions unparseable; returning none");
            Parsed::Fallback(Vec::new())
        }
    }
}
