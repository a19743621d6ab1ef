//! Caller identity taken from the trusted header set by the upstream proxy.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pulse_core::workspace::Member;
use pulse_core::PulseError;

use crate::error::AppError;
use crate::state::AppState;

/// The authenticated member making the request.
#[derive(Debug, Clone)]
pub struct CurrentMember(pub Member);

impl CurrentMember {
    pub fn workspace_id(&self) -> &str {
        &self.0.workspace_id
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }
}

impl FromRequestParts<AppState> for CurrentMember {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let member_id = parts
            .headers
            .get(state.config.server.identity_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError(PulseError::Unauthorized.into()))?;

        let db = state.db.clone();
        let member = tokio::task::spawn_blocking(move || db.member(&member_id))
            .await
            .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
        Ok(CurrentMember(member))
    }
}
