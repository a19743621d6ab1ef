use axum::extract::State;
use axum::Json;
use pulse_core::feedback::{extract_feedback, FeedbackContext};
use pulse_core::mediation::{mediation_prompt, parse_mediation, MediationRequest};
use pulse_core::types::PulseStatus;
use pulse_core::PulseError;
use pulse_llm::GenerationRequest;

use crate::error::AppError;
use crate::identity::CurrentMember;
use crate::state::AppState;

#[derive(Debug, Default, serde::Deserialize)]
pub struct EmergencyCallBody {
    #[serde(default)]
    pub context: Option<String>,
}

/// POST /api/emergency-call - generate and store a mediation script and
/// agenda for the caller's workspace.
///
/// The score is the latest completed pulse's alignment, or the configured
/// default when no pulse has completed yet.
pub async fn create_emergency_call(
    State(app): State<AppState>,
    member: CurrentMember,
    Json(body): Json<EmergencyCallBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let workspace_id = member.workspace_id().to_string();

    let db = app.db.clone();
    let ws = workspace_id.clone();
    let window = app.config.feedback.pulse_window;
    let max_items = app.config.feedback.max_items;
    let default_score = app.config.scoring.default_score;
    let (workspace, score, feedback) = tokio::task::spawn_blocking(move || {
        let workspace = db.workspace(&ws)?;
        let pulses = db.recent_pulses(&ws, Some(PulseStatus::Completed), window)?;
        let score = pulses
            .first()
            .and_then(|p| p.alignment_score())
            .unwrap_or(default_score);
        Ok::<_, PulseError>((workspace, score, extract_feedback(&pulses, max_items)))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let feedback = FeedbackContext::new(feedback);
    let prompt = mediation_prompt(&MediationRequest {
        alignment_score: score,
        workspace_name: &workspace.name,
        context: body.context.as_deref(),
        feedback: &feedback,
    });
    let generation = &app.config.generation;
    let reply = app
        .generator
        .generate(GenerationRequest::new(
            prompt,
            generation.mediation_max_tokens,
            generation.temperature,
        ))
        .await
        .map_err(|e| PulseError::GenerationFailed(e.to_string()))?;

    let call = parse_mediation(&reply).into_call(
        &workspace_id,
        member.id(),
        score,
        chrono::Utc::now(),
    );

    let db = app.db.clone();
    let call = tokio::task::spawn_blocking(move || {
        db.insert_emergency_call(&call)?;
        Ok::<_, PulseError>(call)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    tracing::info!(
        workspace = %workspace_id,
        score,
        agenda = call.agenda_source.as_str(),
        "emergency call generated"
    );
    Ok(Json(serde_json::json!({ "emergency_call": call })))
}

/// GET /api/emergency-call/latest - the most recent mediation artifact, or
/// `null` when none exists.
pub async fn latest_emergency_call(
    State(app): State<AppState>,
    member: CurrentMember,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = tokio::task::spawn_blocking(move || {
        let call = app.db.latest_emergency_call(member.workspace_id())?;
        Ok::<_, PulseError>(serde_json::json!({ "emergency_call": call }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}
