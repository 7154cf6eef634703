//! HTTP server for build-server notifications.
//!
//! Provides endpoints for:
//! - Receiving stage-status events
//! - The notification subscription handshake
//! - Validating webhook settings
//! - Inspecting currently failing stages
//! - Health checks

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use notify::{NotifySettings, SettingsProblem};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handler::{HandlerResponse, StageStatusHandler};
use crate::registry::FailingStage;

/// Notification types this service subscribes to.
pub const INTERESTED_IN: &[&str] = &["stage-status"];

/// Server state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Stage-status handler (owns the failure registry)
    pub handler: Arc<StageStatusHandler>,
    /// Webhook settings passed to every notification
    pub settings: Arc<NotifySettings>,
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/notifications/stage-status", post(stage_status_handler))
        .route("/notifications/interested-in", get(interested_in_handler))
        .route("/settings/validate", post(validate_settings_handler))
        .route("/api/failing", get(failing_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// # Errors
///
/// Returns an error if the server fails to bind or serve.
pub async fn run_server(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Stage-watch server listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Request/Response types
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Subscription handshake response.
#[derive(Debug, Serialize)]
struct InterestedInResponse {
    notifications: &'static [&'static str],
}

/// Settings submitted for validation.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsRequest {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_user: Option<String>,
    #[serde(default)]
    pub go_server_url: Option<String>,
}

/// Failing stages snapshot.
#[derive(Debug, Serialize)]
struct FailingResponse {
    count: usize,
    failing: Vec<FailingStage>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Stage-status handler. Always answers 200; failures are in the body.
async fn stage_status_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<HandlerResponse> {
    Json(state.handler.handle(&body, &state.settings).await)
}

async fn interested_in_handler() -> impl IntoResponse {
    Json(InterestedInResponse {
        notifications: INTERESTED_IN,
    })
}

async fn validate_settings_handler(
    Json(request): Json<SettingsRequest>,
) -> Json<Vec<SettingsProblem>> {
    let settings = NotifySettings {
        api_url: request.api_url,
        api_user: request.api_user,
        go_server_url: request.go_server_url,
        ..NotifySettings::default()
    };

    Json(settings.validate())
}

async fn failing_handler(State(state): State<AppState>) -> impl IntoResponse {
    let failing = state.handler.registry().snapshot();

    Json(FailingResponse {
        count: failing.len(),
        failing,
    })
}
