use crate::error::{ServerError, ServerResult};
use crate::routes::ApiJson;
use crate::state::ServerState;
use crate::telemetry;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::NaiveDate;
use futures::stream::{self, Stream};
use lostfound::{
    Category, FoundReport, ItemDraft, ItemQuery, ItemStatus, ItemType, LostReport, Principal,
    PublicItem, StoreError,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;

/// `?type=all|lost|found&status=open|returned`
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub status: Option<String>,
}

impl ListParams {
    fn to_query(&self) -> ServerResult<ItemQuery> {
        let item_type = match self.item_type.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(other) => Some(ItemType::from_str(other)?),
        };
        let query = ItemQuery::all().with_type(item_type);
        Ok(match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => query,
            Some("open") => query.with_status(ItemStatus::Open),
            Some("returned") => query.with_status(ItemStatus::Returned),
            Some(other) => {
                return Err(ServerError::BadRequest(format!("unknown status: {other}")))
            }
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ItemList {
    pub count: usize,
    pub items: Vec<PublicItem>,
}

/// Form fields of a lost report. Everything is optional here so that
/// missing fields come back as validation errors naming the field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LostItemRequest {
    pub title: String,
    pub category: String,
    pub description: String,
    pub location: String,
    pub date_lost: Option<NaiveDate>,
    pub color: String,
    pub brand: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FoundItemRequest {
    pub title: String,
    pub category: String,
    pub color: String,
    pub brand: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub location: String,
    pub hidden_details: String,
    /// Raw base64 or a `data:` URL.
    #[serde(alias = "imageBase64", alias = "image_url")]
    pub image_base64: String,
    #[serde(alias = "mimeType")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DraftRequest {
    #[serde(alias = "imageBase64")]
    pub image_base64: String,
    #[serde(alias = "mimeType")]
    pub mime_type: Option<String>,
}

fn parse_category(raw: &str) -> ServerResult<Category> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(lostfound::ItemError::MissingField("category").into());
    }
    Ok(Category::from_str(raw)?)
}

fn record_created(state: &ServerState, draft: ItemDraft, principal: &Principal) -> ServerResult<PublicItem> {
    let item_type = draft.item_type();
    let item = state.service.report(draft, principal)?;
    telemetry::record_item_created(item_type.as_str());
    Ok(item)
}

pub async fn list_items(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<ListParams>,
) -> ServerResult<impl IntoResponse> {
    let items = state.service.store().query_public(&params.to_query()?)?;
    Ok(Json(ItemList {
        count: items.len(),
        items,
    }))
}

pub async fn get_item(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let item = state
        .service
        .store()
        .get_public(&id)?
        .ok_or(StoreError::NotFound(id))?;
    Ok(Json(item))
}

pub async fn report_lost(
    State(state): State<Arc<ServerState>>,
    Extension(principal): Extension<Principal>,
    ApiJson(request): ApiJson<LostItemRequest>,
) -> ServerResult<impl IntoResponse> {
    let category = parse_category(&request.category)?;
    let draft = ItemDraft::Lost(LostReport {
        title: request.title,
        category,
        description: request.description,
        location: request.location,
        date_lost: request.date_lost,
        color: request.color,
        brand: request.brand,
        tags: request.tags,
    });
    let item = record_created(&state, draft, &principal)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn report_found(
    State(state): State<Arc<ServerState>>,
    Extension(principal): Extension<Principal>,
    ApiJson(request): ApiJson<FoundItemRequest>,
) -> ServerResult<impl IntoResponse> {
    let image = state
        .service
        .decode_image(request.mime_type.as_deref(), &request.image_base64)?;
    let category = parse_category(&request.category)?;
    let draft = ItemDraft::Found(FoundReport {
        title: request.title,
        category,
        color: request.color,
        brand: request.brand,
        description: request.description,
        tags: request.tags,
        location: request.location,
        hidden_details: request.hidden_details,
        image,
    });
    let item = record_created(&state, draft, &principal)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Prefill a found report from its photo. Analysis failures still answer
/// 200 with empty fields and a notice.
pub async fn draft_found(
    State(state): State<Arc<ServerState>>,
    ApiJson(request): ApiJson<DraftRequest>,
) -> ServerResult<impl IntoResponse> {
    let image = state
        .service
        .decode_image(request.mime_type.as_deref(), &request.image_base64)?;
    Ok(Json(state.service.draft_found_report(&image).await))
}

/// Owner-only `open -> returned`.
pub async fn mark_returned(
    State(state): State<Arc<ServerState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let record = state.service.store().mark_returned(&id, &principal)?;
    tracing::info!(target: "lostfound::items", item_id = %id, uid = %principal.uid, "item returned");
    Ok(Json(PublicItem::from(record)))
}

/// Live feed as Server-Sent Events. Each `snapshot` event carries the full
/// ordered list; the subscription ends when the client disconnects.
pub async fn feed(
    State(state): State<Arc<ServerState>>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<ListParams>,
) -> ServerResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let subscription = state.service.store().subscribe(params.to_query()?);
    tracing::debug!(target: "lostfound::items", uid = %principal.uid, "feed subscribed");

    let events = stream::unfold(subscription, |mut subscription| async move {
        let event = match subscription.next().await {
            Ok(items) => Event::default()
                .event("snapshot")
                .json_data(&items)
                .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
            Err(err) => {
                tracing::warn!(target: "lostfound::items", error = %err, "feed refresh failed");
                Event::default().event("error").data(err.to_string())
            }
        };
        Some((Ok(event), subscription))
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
