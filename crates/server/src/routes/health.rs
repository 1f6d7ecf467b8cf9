use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Liveness: 200 while the process runs.
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "lostfound-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime().as_secs(),
    }))
}

/// Readiness: the item store must answer.
pub async fn readiness_check(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    state.service.store().ping()?;

    Ok(Json(json!({
        "status": "ready",
        "service": "lostfound-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime().as_secs(),
        "components": {
            "store": "ready",
            "feed_subscribers": state.service.store().subscriber_count(),
            "open_claims": state.service.claims().open_claims(),
            "accounts": state.accounts.len(),
        }
    })))
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let handle = state.metrics.as_ref().ok_or(ServerError::NotFound)?;
    Ok((
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
