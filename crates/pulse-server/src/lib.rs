//! `pulse-server`: JSON HTTP API over the pulse core.
//!
//! Every `/api` route except health resolves the caller through
//! [`identity::CurrentMember`] and scopes all reads and writes to that
//! member's workspace.

pub mod billing;
pub mod error;
pub mod identity;
pub mod routes;
pub mod state;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(routes::health::health))
        // Dashboard
        .route("/api/dashboard", get(routes::dashboard::get_dashboard))
        .route("/api/alignment", get(routes::dashboard::get_alignment))
        // Pulse
        .route("/api/pulse", post(routes::pulse::submit_pulse))
        .route("/api/pulse/current", get(routes::pulse::current_pulse))
        // Action items
        .route(
            "/api/actions",
            get(routes::actions::list_actions).post(routes::actions::create_action),
        )
        .route(
            "/api/actions/generate",
            post(routes::actions::generate_actions),
        )
        .route(
            "/api/actions/{id}/status",
            put(routes::actions::update_action_status),
        )
        .route("/api/actions/{id}", delete(routes::actions::delete_action))
        // Emergency call
        .route(
            "/api/emergency-call",
            post(routes::emergency::create_emergency_call),
        )
        .route(
            "/api/emergency-call/latest",
            get(routes::emergency::latest_emergency_call),
        )
        // Team & billing
        .route("/api/team", get(routes::team::get_team))
        .route(
            "/api/billing/portal",
            post(routes::billing::create_portal_session),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server on `port`.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(state, listener).await
}

/// Start the API server on a pre-bound listener.
///
/// Lets the caller read the actual port first when binding to port 0.
pub async fn serve_on(state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let port = listener.local_addr()?.port();
    let app = build_router(state);

    tracing::info!("pulse API listening on http://localhost:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}
