use crate::error::{ServerError, ServerResult};
use crate::routes::ApiJson;
use crate::state::ServerState;
use crate::telemetry;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use lostfound::{Category, LostQuery, Principal, PublicItem, MAX_CLIENT_SEQ};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// The lost form as typed so far.
#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    #[serde(default)]
    pub title: String,
    pub category: String,
    /// Client sequence number; a response for an older number than one
    /// already seen is marked stale.
    #[serde(default)]
    pub seq: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub seq: u64,
    /// A newer query from the same user superseded this one; ignore it.
    pub stale: bool,
    /// The title was too short to search.
    pub skipped: bool,
    pub total_matches: usize,
    pub candidates: Vec<PublicItem>,
}

impl MatchResponse {
    fn stale(seq: u64) -> Self {
        Self {
            seq,
            stale: true,
            skipped: false,
            total_matches: 0,
            candidates: Vec::new(),
        }
    }
}

/// Candidates for a lost report, re-issued as the user types.
pub async fn find_matches(
    State(state): State<Arc<ServerState>>,
    Extension(principal): Extension<Principal>,
    ApiJson(request): ApiJson<MatchRequest>,
) -> ServerResult<impl IntoResponse> {
    let category = Category::from_str(request.category.trim())?;
    if let Some(seq) = request.seq.filter(|seq| *seq > MAX_CLIENT_SEQ) {
        return Err(ServerError::BadRequest(format!(
            "seq {seq} exceeds the maximum of {MAX_CLIENT_SEQ}"
        )));
    }

    let guard = state.match_guard(&principal.uid);
    let ticket = match request.seq {
        Some(seq) => match guard.observe(seq) {
            Some(ticket) => ticket,
            None => return Ok(Json(MatchResponse::stale(seq))),
        },
        None => guard.issue(),
    };

    let matcher = Arc::clone(state.service.matcher());
    let query = LostQuery::new(request.title, category);
    let outcome = tokio::task::spawn_blocking(move || matcher.find_candidates(&query))
        .await
        .map_err(|e| ServerError::Internal(format!("match task failed: {e}")))?;
    telemetry::record_match_query(outcome.skipped);

    let Some(outcome) = guard.accept(ticket, outcome) else {
        return Ok(Json(MatchResponse::stale(ticket.seq())));
    };
    if let Some(err) = outcome.failure {
        return Err(err.into());
    }
    Ok(Json(MatchResponse {
        seq: ticket.seq(),
        stale: false,
        skipped: outcome.skipped,
        total_matches: outcome.candidates.len(),
        candidates: outcome.candidates,
    }))
}
