//! Direct AI callables. Unlike the claim and draft flows these report
//! collaborator failures as errors.

use crate::error::ServerResult;
use crate::routes::ApiJson;
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use lostfound::{ItemError, Principal};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    pub image_base64: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyClaimRequest {
    pub item_id: String,
    pub proof_description: String,
}

pub async fn analyze_item_image(
    State(state): State<Arc<ServerState>>,
    ApiJson(request): ApiJson<AnalyzeImageRequest>,
) -> ServerResult<impl IntoResponse> {
    let image = state
        .service
        .decode_image(request.mime_type.as_deref(), &request.image_base64)?;
    let analysis = state
        .service
        .analyzer()
        .analyze(image.base64(), image.mime())
        .await?;
    Ok(Json(analysis))
}

/// Scores proof for an item the caller could claim. The same item rules as
/// opening a claim apply.
pub async fn verify_claim(
    State(state): State<Arc<ServerState>>,
    Extension(principal): Extension<Principal>,
    ApiJson(request): ApiJson<VerifyClaimRequest>,
) -> ServerResult<impl IntoResponse> {
    if request.item_id.trim().is_empty() {
        return Err(ItemError::MissingField("itemId").into());
    }
    let assessment = state
        .service
        .claims()
        .assess(
            request.item_id.trim(),
            &principal,
            &request.proof_description,
        )
        .await?;
    Ok(Json(assessment))
}
