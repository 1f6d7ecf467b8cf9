use crate::error::ServerResult;
use crate::routes::ApiJson;
use crate::state::ServerState;
use crate::telemetry;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use lostfound::{ClaimStep, Principal};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct OpenClaimRequest {
    #[serde(alias = "itemId")]
    pub item_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ProofRequest {
    #[serde(default, alias = "proofDescription")]
    pub proof: String,
}

pub async fn open_claim(
    State(state): State<Arc<ServerState>>,
    Extension(principal): Extension<Principal>,
    ApiJson(request): ApiJson<OpenClaimRequest>,
) -> ServerResult<impl IntoResponse> {
    let view = state.service.claims().open(&request.item_id, &principal)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_claim(
    State(state): State<Arc<ServerState>>,
    Extension(principal): Extension<Principal>,
    Path(claim_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    Ok(Json(state.service.claims().view(&claim_id, &principal)?))
}

pub async fn close_claim(
    State(state): State<Arc<ServerState>>,
    Extension(principal): Extension<Principal>,
    Path(claim_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    state.service.claims().close(&claim_id, &principal)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit proof and answer with the verdict. Collaborator failures and
/// timeouts come back as a `fail` claim, not as an error.
pub async fn submit_proof(
    State(state): State<Arc<ServerState>>,
    Extension(principal): Extension<Principal>,
    Path(claim_id): Path<String>,
    ApiJson(request): ApiJson<ProofRequest>,
) -> ServerResult<impl IntoResponse> {
    let view = state
        .service
        .claims()
        .submit_proof(&claim_id, &principal, &request.proof)
        .await?;
    if matches!(view.step, ClaimStep::Success | ClaimStep::Fail) {
        telemetry::record_claim(view.step.as_str());
    }
    Ok(Json(view))
}

pub async fn retry_claim(
    State(state): State<Arc<ServerState>>,
    Extension(principal): Extension<Principal>,
    Path(claim_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    Ok(Json(state.service.claims().retry(&claim_id, &principal)?))
}
