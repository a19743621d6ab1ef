use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pulse_core::PulseError;

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
///
/// The body is always `{"error": message}`. Caller mistakes (bad input,
/// unknown ids, missing identity) are echoed back; system failures get a
/// fixed message and the detail goes to the log only.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

fn classify(e: &PulseError) -> (StatusCode, Option<&'static str>) {
    match e {
        PulseError::Unauthorized => (StatusCode::UNAUTHORIZED, None),
        PulseError::WorkspaceNotFound(_)
        | PulseError::MemberNotFound(_)
        | PulseError::PulseNotFound(_)
        | PulseError::ActionItemNotFound(_) => (StatusCode::NOT_FOUND, None),
        PulseError::InvalidScore { .. }
        | PulseError::MissingAnswer(_)
        | PulseError::InvalidDate(_)
        | PulseError::InvalidStatus(_)
        | PulseError::InvalidInput(_) => (StatusCode::BAD_REQUEST, None),
        PulseError::NoBillingAccount => (StatusCode::BAD_REQUEST, Some("No billing account")),
        PulseError::StoreWriteFailed(_) | PulseError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Some("failed to save data"),
        ),
        PulseError::GenerationFailed(_) => {
            (StatusCode::BAD_GATEWAY, Some("text generation failed"))
        }
        PulseError::Billing(_) => (StatusCode::BAD_GATEWAY, Some("billing provider unavailable")),
        PulseError::Io(_) | PulseError::Yaml(_) | PulseError::Json(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Some("internal error"))
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, fixed) = match self.0.downcast_ref::<PulseError>() {
            Some(e) => classify(e),
            None => (StatusCode::INTERNAL_SERVER_ERROR, Some("internal error")),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %format!("{:#}", self.0), "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self.0, "request rejected");
        }

        let message = fixed.map(str::to_string).unwrap_or_else(|| self.0.to_string());
        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
