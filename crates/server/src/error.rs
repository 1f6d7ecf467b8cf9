use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lostfound::{AssistError, ClaimError, ItemError, LostFoundError, MatchError, StoreError};
use serde::{Deserialize, Serialize};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("{0}")]
    DomainRejected(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Item(#[from] ItemError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Assist(#[from] AssistError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub next_step: String,
}

/// Status, stable code and recovery hint for one error.
struct Classification {
    status: StatusCode,
    code: &'static str,
    next_step: &'static str,
}

const fn class(status: StatusCode, code: &'static str, next_step: &'static str) -> Classification {
    Classification {
        status,
        code,
        next_step,
    }
}

const STORE_RETRY: &str = "The item store is unavailable. Try again in a moment.";

fn classify_item(err: &ItemError) -> Classification {
    match err {
        ItemError::DomainRejected(_) => {
            class(StatusCode::FORBIDDEN, "DOMAIN_REJECTED", err.next_step())
        }
        _ => class(
            StatusCode::UNPROCESSABLE_ENTITY,
            "VALIDATION_FAILED",
            err.next_step(),
        ),
    }
}

fn classify_store(err: &StoreError) -> Classification {
    match err {
        StoreError::Invalid(inner) => classify_item(inner),
        StoreError::NotFound(_) => class(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Refresh the feed; the item may have been removed.",
        ),
        StoreError::AlreadyReturned(_) => class(
            StatusCode::CONFLICT,
            "CONFLICT",
            "The item is already marked as returned.",
        ),
        StoreError::NotOwner(_) => class(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Only the person who reported the item can change it.",
        ),
        _ => class(StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE", STORE_RETRY),
    }
}

fn classify_claim(err: &ClaimError) -> Classification {
    let hint = err.next_step();
    match err {
        ClaimError::ItemNotFound(_) | ClaimError::ClaimNotFound(_) => {
            class(StatusCode::NOT_FOUND, "NOT_FOUND", hint)
        }
        ClaimError::ProofTooShort { .. } | ClaimError::NotClaimable(_) => {
            class(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED", hint)
        }
        ClaimError::OwnItem => class(StatusCode::FORBIDDEN, "FORBIDDEN", hint),
        ClaimError::ItemReturned(_)
        | ClaimError::AlreadyProcessing
        | ClaimError::InvalidTransition { .. } => class(StatusCode::CONFLICT, "CONFLICT", hint),
        ClaimError::Timeout(_) => class(StatusCode::BAD_GATEWAY, "ASSIST_FAILED", hint),
        ClaimError::Store(inner) => classify_store(inner),
        ClaimError::Assist(inner) => classify_assist(inner),
    }
}

fn classify_assist(err: &AssistError) -> Classification {
    match err {
        AssistError::MissingInput(_) => class(
            StatusCode::UNPROCESSABLE_ENTITY,
            "VALIDATION_FAILED",
            "Provide the missing input and try again.",
        ),
        AssistError::InvalidConfig(_) => class(
            StatusCode::INTERNAL_SERVER_ERROR,
            "CONFIG_ERROR",
            "Contact the service administrator.",
        ),
        _ => class(
            StatusCode::BAD_GATEWAY,
            "ASSIST_FAILED",
            "The AI service could not answer. Try again shortly.",
        ),
    }
}

impl ServerError {
    fn classify(&self) -> Classification {
        match self {
            ServerError::Authentication(_) => class(
                StatusCode::UNAUTHORIZED,
                "AUTH_FAILED",
                "Sign in again with your campus account.",
            ),
            ServerError::DomainRejected(_) => class(
                StatusCode::FORBIDDEN,
                "DOMAIN_REJECTED",
                "Sign in again with your campus email account.",
            ),
            ServerError::RateLimitExceeded => class(
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                "Slow down and retry in a minute.",
            ),
            ServerError::BadRequest(_) => class(
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                "Check the request body and try again.",
            ),
            ServerError::Item(err) => classify_item(err),
            ServerError::Store(err) => classify_store(err),
            ServerError::Match(MatchError::Store(err)) => classify_store(err),
            ServerError::Match(MatchError::InvalidConfig(_)) | ServerError::Config(_) => class(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Contact the service administrator.",
            ),
            ServerError::Claim(err) => classify_claim(err),
            ServerError::Assist(err) => classify_assist(err),
            ServerError::Internal(_) => class(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Try again; report the request id if it keeps failing.",
            ),
            ServerError::NotFound => class(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Check the address and try again.",
            ),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.classify().status
    }

    pub fn error_code(&self) -> &'static str {
        self.classify().code
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let Classification {
            status,
            code,
            next_step,
        } = self.classify();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                next_step: next_step.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<LostFoundError> for ServerError {
    fn from(err: LostFoundError) -> Self {
        match err {
            LostFoundError::Config(e) => ServerError::Config(e.to_string()),
            LostFoundError::Item(e) => ServerError::Item(e),
            LostFoundError::Store(e) => ServerError::Store(e),
            LostFoundError::Match(e) => ServerError::Match(e),
            LostFoundError::Assist(e) => ServerError::Assist(e),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}
