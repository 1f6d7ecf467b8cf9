use crate::middleware::authenticate;
use crate::navigation::{decide, Navigation, Page};
use crate::state::ServerState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use lostfound::Principal;
use serde::Serialize;
use std::sync::Arc;

/// What the web client needs to draw a page.
#[derive(Debug, Serialize)]
pub struct PageView {
    pub page: Page,
    pub path: &'static str,
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Principal>,
}

fn visit(page: Page, state: &ServerState, headers: &HeaderMap) -> Response {
    let principal = authenticate(state, headers).ok();
    match decide(page, principal.is_some()) {
        Navigation::Redirect(to) => Redirect::to(to).into_response(),
        Navigation::Render(page) => Json(PageView {
            page,
            path: page.path(),
            title: page.title(),
            user: principal,
        })
        .into_response(),
    }
}

pub async fn landing(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    visit(Page::Landing, &state, &headers)
}

pub async fn dashboard(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    visit(Page::Dashboard, &state, &headers)
}

pub async fn report_found(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    visit(Page::ReportFound, &state, &headers)
}

pub async fn report_lost(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    visit(Page::ReportLost, &state, &headers)
}
