//! API route handlers
//!
//! - `health`: liveness, readiness and metrics
//! - `session`: sign-in and sign-out
//! - `pages`: page access rules for the web client
//! - `items`: reports, the live feed and returns
//! - `matching`: candidates for a lost report
//! - `claims`: ownership verification
//! - `functions`: the raw AI callables

pub mod claims;
pub mod functions;
pub mod health;
pub mod items;
pub mod matching;
pub mod pages;
pub mod session;

use crate::error::{ServerError, ServerResult};
use axum::extract::FromRequest;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// JSON body whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct ApiJson<T>(pub T);

/// API version and base info
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Campus Lost & Found",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/session",
            "/api/v1/items",
            "/api/v1/items/feed",
            "/api/v1/items/lost",
            "/api/v1/items/found",
            "/api/v1/items/found/draft",
            "/api/v1/matches",
            "/api/v1/claims",
            "/api/v1/functions/analyze-item-image",
            "/api/v1/functions/verify-claim",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
