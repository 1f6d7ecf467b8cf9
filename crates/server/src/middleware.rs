use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use crate::telemetry;
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use lostfound::Principal;
use std::sync::Arc;

/// Cookie set by `POST /api/v1/session`.
pub const SESSION_COOKIE: &str = "lf_session";

/// Request id attached to every request's extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// ID token from `Authorization: Bearer` or, failing that, the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}

/// Verify the presented token and admit its owner.
pub fn authenticate(state: &ServerState, headers: &HeaderMap) -> ServerResult<Principal> {
    let token = session_token(headers).ok_or_else(|| {
        ServerError::Authentication(
            "sign in required: send 'Authorization: Bearer <id token>' or the session cookie"
                .to_string(),
        )
    })?;
    let claims = state
        .verifier
        .verify(&token)
        .inspect_err(|_| telemetry::record_auth_rejection("token"))?;
    state.accounts.admit(&claims)
}

/// Session authentication for `/api/v1/*`.
///
/// The admitted [`Principal`] is placed in the request extensions.
pub async fn session_auth(
    State(state): State<Arc<ServerState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let principal = authenticate(&state, request.headers())?;

    if !state.check_rate_limit(&principal.uid) {
        return Err(ServerError::RateLimitExceeded);
    }

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Request ID injection middleware
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Logging middleware
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = std::time::Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    tracing::debug!(
        method = %method,
        path = %path,
        request_id = %request_id,
        "request started"
    );

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %path,
        status = %status,
        duration_ms = %duration.as_millis(),
        request_id = %request_id,
        "request completed"
    );

    response
}
