//! Prompt building and reply parsing for mediation calls.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::emergency::{default_agenda, AgendaItem, AgendaSource, EmergencyCall};
use crate::feedback::{scan_json_array, ArrayScan, FeedbackContext, Parsed};
use crate::types::CallStatus;

const FALLBACK_COMPANY: &str = "Startup";
const NO_CONTEXT: &str = "None provided";

static AGENDA_BLOCK_RE: OnceLock<Regex> = OnceLock::new();
static SCRIPT_LABEL_RE: OnceLock<Regex> = OnceLock::new();

fn agenda_block_re() -> &'static Regex {
    AGENDA_BLOCK_RE.get_or_init(|| Regex::new(r"(?s)AGENDA.*?MEDIATION SCRIPT:").unwrap())
}

fn script_label_re() -> &'static Regex {
    SCRIPT_LABEL_RE.get_or_init(|| Regex::new(r"(?i)^MEDIATION SCRIPT:?\s*").unwrap())
}

/// Inputs for a mediation prompt.
#[derive(Debug, Clone)]
pub struct MediationRequest<'a> {
    pub alignment_score: u32,
    pub workspace_name: &'a str,
    pub context: Option<&'a str>,
    pub feedback: &'a FeedbackContext,
}

pub fn mediation_prompt(req: &MediationRequest<'_>) -> String {
    let company = Some(req.workspace_name.trim())
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_COMPANY);
    let context = req
        .context
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(NO_CONTEXT);
    format!(
        "You are an experienced, neutral mediator for startup co-founders. Prepare a \
mediation script and a meeting agenda for a co-founder alignment call.

CONTEXT:
- Current alignment score: {score}/100 (below 50 is critical)
- Company: {company}
- Additional context from the co-founder: {context}
- Recent anonymous feedback:
{feedback}

REQUIREMENTS:
1. Stay neutral and never take sides.
2. Focus on understanding perspectives rather than assigning blame.
3. Include specific talking points and suggested phrases.
4. Give the agenda explicit time allocations.
5. Include de-escalation techniques.
6. Finish with concrete next steps and commitments.

Produce the following sections:

AGENDA (format as JSON array):
5-6 items, each an object with \"title\", \"duration\" (e.g. \"10 mins\") and \"description\".

MEDIATION SCRIPT:
A detailed script a neutral facilitator can read from: an opening statement, ground \
rules, key questions for each co-founder, reflective listening prompts, de-escalation \
phrases, a summary and commitments section, and closing remarks.",
        score = req.alignment_score,
        feedback = req.feedback,
    )
}

/// Agenda and script read out of a generated reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediationPlan {
    pub agenda: Parsed<Vec<AgendaItem>>,
    pub script: String,
}

impl MediationPlan {
    pub fn agenda_source(&self) -> AgendaSource {
        if self.agenda.is_fallback() {
            AgendaSource::Fallback
        } else {
            AgendaSource::Parsed
        }
    }

    /// Freeze the plan into a stored call artifact.
    pub fn into_call(
        self,
        workspace_id: &str,
        triggered_by: &str,
        alignment_score: u32,
        now: DateTime<Utc>,
    ) -> EmergencyCall {
        let agenda_source = self.agenda_source();
        EmergencyCall {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: workspace_id.to_string(),
            triggered_by: triggered_by.to_string(),
            alignment_score,
            mediation_script: self.script,
            agenda: self.agenda.into_inner(),
            agenda_source,
            status: CallStatus::Generated,
            created_at: now,
        }
    }
}

/// Split a reply into agenda and script.
///
/// A missing, undecodable or empty agenda becomes the default agenda. The
/// agenda span is cut from the script only when it was read successfully.
pub fn parse_mediation(text: &str) -> MediationPlan {
    let (agenda, remainder) = match scan_json_array::<AgendaItem>(text) {
        ArrayScan::Decoded(span, items) => {
            let items: Vec<AgendaItem> = items
                .into_iter()
                .filter(|a| !a.title.trim().is_empty())
                .collect();
            if items.is_empty() {
                tracing::warn!("mediation agenda empty; using default agenda");
                (Parsed::Fallback(default_agenda()), text.to_string())
            } else {
                let mut rest = String::with_capacity(text.len());
                rest.push_str(&text[..span.start]);
                rest.push_str(&text[span.end..]);
                (Parsed::Parsed(items), rest)
            }
        }
        ArrayScan::Undecodable | ArrayScan::Missing => {
            tracing::warn!("mediation agenda unparseable; using default agenda");
            (Parsed::Fallback(default_agenda()), text.to_string())
        }
    };
    MediationPlan {
        agenda,
        script: clean_script(remainder.trim()),
    }
}

fn clean_script(text: &str) -> String {
    let without_block = agenda_block_re().replace(text, "");
    let without_label = script_label_re().replace(without_block.trim_start(), "");
    without_label.trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
