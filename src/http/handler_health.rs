//! Handles GET /healthz - Liveness and storage check

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;

use super::context::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    storage: &'static str,
    uptime_seconds: i64,
    checked_at: String,
}

/// GET /healthz
///
/// Answers 503 when the store cannot serve a read.
pub async fn handle_health(State(state): State<AppState>) -> Response {
    let (status, storage) = match state.oauth_storage.list_clients(Some(1)).await {
        Ok(_) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!(error = ?e, "health check storage read failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    let now = Utc::now();
    let body = HealthResponse {
        status: if status == StatusCode::OK { "ok" } else { "degraded" },
        storage,
        uptime_seconds: (now - state.started_at).num_seconds(),
        checked_at: now.to_rfc3339(),
    };

    (
        status,
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(body),
    )
        .into_response()
}
