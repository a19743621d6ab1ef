use axum::extract::State;
use axum::Json;
use pulse_core::pulse::PulseProgress;
use pulse_core::score::Answers;
use pulse_core::week::WeekStart;

use crate::error::AppError;
use crate::identity::CurrentMember;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct SubmitPulseBody {
    #[serde(flatten)]
    pub answers: Answers,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// GET /api/pulse/current - this week's progress for the caller's workspace.
pub async fn current_pulse(
    State(app): State<AppState>,
    member: CurrentMember,
) -> Result<Json<serde_json::Value>, AppError> {
    let week = WeekStart::of(chrono::Local::now().date_naive());
    let result = tokio::task::spawn_blocking(move || {
        let pulse = app.db.pulse_for_week(member.workspace_id(), week)?;
        let expected = app.db.count_members(member.workspace_id())?;
        let progress = PulseProgress::new(week, pulse.as_ref(), expected, member.id());
        Ok::<_, pulse_core::PulseError>(serde_json::to_value(progress)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// POST /api/pulse - record the caller's answers for the current week.
///
/// Resubmitting within the same week replaces the caller's earlier answers.
pub async fn submit_pulse(
    State(app): State<AppState>,
    member: CurrentMember,
    Json(body): Json<SubmitPulseBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let now = chrono::Local::now();
    let result = tokio::task::spawn_blocking(move || {
        let scores = body.answers.into_scores()?;
        let submission = app.db.submit_response(
            member.workspace_id(),
            member.id(),
            scores,
            body.feedback,
            &now,
        )?;

        Ok::<_, pulse_core::PulseError>(serde_json::json!({
            "pulse": submission.pulse,
            "response": submission.response,
            "submitted": submission.submitted,
            "expected": submission.expected,
        }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}
