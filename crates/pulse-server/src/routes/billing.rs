use axum::extract::State;
use axum::Json;
use pulse_core::PulseError;

use crate::error::AppError;
use crate::identity::CurrentMember;
use crate::state::AppState;

/// POST /api/billing/portal - open a billing-portal session for the
/// caller's workspace and return its URL.
pub async fn create_portal_session(
    State(app): State<AppState>,
    member: CurrentMember,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = app.db.clone();
    let workspace_id = member.workspace_id().to_string();
    let workspace = tokio::task::spawn_blocking(move || db.workspace(&workspace_id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let customer_id = workspace
        .billing
        .customer_id
        .ok_or(PulseError::NoBillingAccount)?;
    let url = app
        .billing
        .create_portal_session(&customer_id, &app.config.billing.return_url)
        .await
        .map_err(|e| PulseError::Billing(e.to_string()))?;

    tracing::info!(workspace = %workspace.id, "billing portal session created");
    Ok(Json(serde_json::json!({ "url": url })))
}
