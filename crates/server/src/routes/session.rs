use crate::error::ServerResult;
use crate::middleware::SESSION_COOKIE;
use crate::routes::ApiJson;
use crate::state::ServerState;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, TimeZone, Utc};
use lostfound::Principal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(alias = "idToken")]
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub principal: Principal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn session_cookie(state: &ServerState, value: &str, max_age: u64) -> String {
    let secure = if state.config.secure_cookies {
        "; Secure"
    } else {
        ""
    };
    format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}")
}

/// Exchange an ID token for a session cookie.
///
/// Off-campus accounts get the access-restricted message here, before any
/// other page is reached.
pub async fn sign_in(
    State(state): State<Arc<ServerState>>,
    ApiJson(request): ApiJson<SignInRequest>,
) -> ServerResult<impl IntoResponse> {
    let token = request.id_token.trim();
    let claims = state.verifier.verify(token)?;
    let principal = state.accounts.admit(&claims)?;
    tracing::info!(target: "lostfound::auth", uid = %principal.uid, "signed in");

    let remaining = (claims.exp - Utc::now().timestamp()).max(0) as u64;
    let cookie = session_cookie(&state, token, remaining);
    let body = SessionResponse {
        principal,
        expires_at: Utc.timestamp_opt(claims.exp, 0).single(),
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)))
}

/// Clear the session cookie.
pub async fn sign_out(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let cookie = session_cookie(&state, "", 0);
    (StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)])
}

/// The signed-in principal.
pub async fn me(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(SessionResponse {
        principal,
        expires_at: None,
    })
}
