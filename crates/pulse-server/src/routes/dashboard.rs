use axum::extract::State;
use axum::Json;
use pulse_core::dashboard::{AlignmentSummary, Dashboard};

use crate::error::AppError;
use crate::identity::CurrentMember;
use crate::state::AppState;

/// GET /api/dashboard - alignment, chart series, current pulse, open actions
/// and the recent feedback feed for the caller's workspace.
pub async fn get_dashboard(
    State(app): State<AppState>,
    member: CurrentMember,
) -> Result<Json<serde_json::Value>, AppError> {
    let today = chrono::Local::now().date_naive();
    let result = tokio::task::spawn_blocking(move || {
        let dashboard = Dashboard::load(
            &app.db,
            member.workspace_id(),
            member.id(),
            &app.config,
            today,
        )?;
        Ok::<_, pulse_core::PulseError>(serde_json::to_value(dashboard)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// GET /api/alignment - current alignment reading with its weekly series.
pub async fn get_alignment(
    State(app): State<AppState>,
    member: CurrentMember,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = tokio::task::spawn_blocking(move || {
        let summary = AlignmentSummary::load(&app.db, member.workspace_id(), &app.config)?;
        Ok::<_, pulse_core::PulseError>(serde_json::to_value(summary)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}
