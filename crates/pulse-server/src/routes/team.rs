use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::identity::CurrentMember;
use crate::state::AppState;

/// GET /api/team - workspace details, invite code and members.
pub async fn get_team(
    State(app): State<AppState>,
    member: CurrentMember,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = tokio::task::spawn_blocking(move || {
        let workspace = app.db.workspace(member.workspace_id())?;
        let members: Vec<serde_json::Value> = app
            .db
            .members(&workspace.id)?
            .into_iter()
            .map(|m| {
                serde_json::json!({
                    "id": m.id,
                    "email": m.email,
                    "full_name": m.full_name,
                    "display_name": m.display_name(),
                    "initials": m.initials(),
                    "role": m.role,
                    "is_me": m.id == member.id(),
                })
            })
            .collect();

        Ok::<_, pulse_core::PulseError>(serde_json::json!({
            "workspace": {
                "id": workspace.id,
                "name": workspace.name,
                "invite_code": workspace.invite_code,
                "plan": workspace.billing.plan,
                "subscription_status": workspace.billing.subscription_status,
            },
            "members": members,
        }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}
