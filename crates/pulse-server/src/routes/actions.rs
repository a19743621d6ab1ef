use axum::extract::{Path, Query, State};
use axum::Json;
use pulse_core::action_item::{ActionItem, NewActionItem};
use pulse_core::feedback::{extract_feedback, FeedbackContext, Parsed};
use pulse_core::suggest::{parse_suggestions, suggestion_prompt};
use pulse_core::types::{ActionStatus, PulseStatus};
use pulse_core::PulseError;
use pulse_llm::GenerationRequest;

use crate::error::AppError;
use crate::identity::CurrentMember;
use crate::state::AppState;

#[derive(Debug, Default, serde::Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(serde::Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// GET /api/actions - action items, newest first. `?open=true` hides
/// completed items.
pub async fn list_actions(
    State(app): State<AppState>,
    member: CurrentMember,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = tokio::task::spawn_blocking(move || {
        let items = app
            .db
            .action_items(member.workspace_id(), query.open, query.limit)?;
        Ok::<_, PulseError>(serde_json::json!({ "items": items }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// POST /api/actions - create an item by hand.
pub async fn create_action(
    State(app): State<AppState>,
    member: CurrentMember,
    Json(body): Json<NewActionItem>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = tokio::task::spawn_blocking(move || {
        let item = ActionItem::manual(member.workspace_id(), body)?;
        app.db.insert_action_item(&item)?;
        Ok::<_, PulseError>(serde_json::to_value(item)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// PUT /api/actions/{id}/status - move an item to a new status.
pub async fn update_action_status(
    State(app): State<AppState>,
    member: CurrentMember,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status: ActionStatus = body.status.parse()?;
    let result = tokio::task::spawn_blocking(move || {
        let item = app.db.update_action_status(
            member.workspace_id(),
            &id,
            status,
            chrono::Utc::now(),
        )?;
        Ok::<_, PulseError>(serde_json::to_value(item)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// DELETE /api/actions/{id} - remove an item.
pub async fn delete_action(
    State(app): State<AppState>,
    member: CurrentMember,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = tokio::task::spawn_blocking(move || {
        app.db.delete_action_item(member.workspace_id(), &id)?;
        Ok::<_, PulseError>(serde_json::json!({ "deleted": id }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// POST /api/actions/generate - ask the generator for suggestions based on
/// recent feedback and store them as suggested items.
///
/// A failed call or an unreadable reply stores nothing and returns an
/// empty list tagged `fallback`.
pub async fn generate_actions(
    State(app): State<AppState>,
    member: CurrentMember,
) -> Result<Json<serde_json::Value>, AppError> {
    let workspace_id = member.workspace_id().to_string();

    let db = app.db.clone();
    let ws = workspace_id.clone();
    let window = app.config.feedback.pulse_window;
    let max_items = app.config.feedback.max_items;
    let (pulse_id, feedback) = tokio::task::spawn_blocking(move || {
        let pulses = db.recent_pulses(&ws, Some(PulseStatus::Completed), window)?;
        let pulse_id = pulses.first().map(|p| p.pulse.id.clone());
        Ok::<_, PulseError>((pulse_id, extract_feedback(&pulses, max_items)))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let generation = &app.config.generation;
    let context = FeedbackContext::new(feedback);
    let reply = app
        .generator
        .generate(GenerationRequest::new(
            suggestion_prompt(&context),
            generation.action_max_tokens,
            generation.temperature,
        ))
        .await;

    let parsed = match reply {
        Ok(text) => parse_suggestions(&text),
        Err(e) => {
            tracing::warn!(workspace = %workspace_id, error = %e, "suggestion generation failed");
            Parsed::Fallback(Vec::new())
        }
    };
    let source = if parsed.is_fallback() { "fallback" } else { "parsed" };
    let items: Vec<ActionItem> = parsed
        .into_inner()
        .into_iter()
        .map(|s| ActionItem::suggested(&workspace_id, pulse_id.as_deref(), s))
        .collect();

    let db = app.db.clone();
    let items = tokio::task::spawn_blocking(move || {
        db.insert_action_items(&items)?;
        Ok::<_, PulseError>(items)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    tracing::info!(workspace = %workspace_id, count = items.len(), source, "action items generated");
    Ok(Json(serde_json::json!({ "items": items, "source": source })))
}
