//! HTTP API layer exposing trip document endpoints.
//!
//! Every endpoint takes an optional `chat_id` (query string or body) that
//! defaults to the single-tenant `default` document.

mod error;

pub use error::ApiError;

use axum::{
    extract::{Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use trip_hub_core::{
    CollectionPath, PrincipalId, StoreError, TenantKey, TripDocument, TripFields, TripService,
};

/// Chat identifier as sent by clients: Telegram group ids arrive as numbers
/// from the bot and as strings from the web app.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Numeric(i64),
    Text(String),
}

impl ChatId {
    pub fn tenant(&self) -> TenantKey {
        match self {
            ChatId::Numeric(id) => TenantKey::resolve(id),
            ChatId::Text(id) => TenantKey::resolve(id),
        }
    }
}

fn tenant_of(chat_id: &Option<ChatId>) -> TenantKey {
    chat_id
        .as_ref()
        .map(ChatId::tenant)
        .unwrap_or_else(TenantKey::default_tenant)
}

/// Shared application state containing the trip service.
#[derive(Clone)]
pub struct AppState {
    pub trips: TripService,
}

#[derive(Deserialize)]
struct TenantQuery {
    #[serde(default)]
    chat_id: Option<ChatId>,
}

#[derive(Deserialize)]
struct IsAdminQuery {
    user_id: PrincipalId,
    #[serde(default)]
    chat_id: Option<ChatId>,
}

#[derive(Deserialize)]
struct AddAdminRequest {
    requester_id: PrincipalId,
    user_id: PrincipalId,
    #[serde(default)]
    chat_id: Option<ChatId>,
}

#[derive(Deserialize)]
struct AppendRequest {
    #[serde(default)]
    chat_id: Option<ChatId>,
    user_id: PrincipalId,
    collection: CollectionPath,
    item: Value,
}

#[derive(Deserialize)]
struct RemoveRequest {
    #[serde(default)]
    chat_id: Option<ChatId>,
    user_id: PrincipalId,
    collection: CollectionPath,
    index: usize,
}

#[derive(Deserialize)]
struct TripUpdateRequest {
    #[serde(default)]
    chat_id: Option<ChatId>,
    user_id: PrincipalId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    dates: Option<String>,
}

#[derive(Deserialize)]
struct ProgressRequest {
    #[serde(default)]
    chat_id: Option<ChatId>,
    user_id: PrincipalId,
    key: String,
    checked: bool,
}

pub fn router(trips: TripService) -> Router {
    let app_state = AppState { trips };
    Router::new()
        .route("/api/data", get(get_data).post(save_data).put(save_data))
        .route("/api/is_admin", get(is_admin))
        .route("/api/addadmin", post(add_admin))
        .route("/api/items", post(append_item).delete(remove_item))
        .route("/api/trip", put(update_trip))
        .route("/api/progress", put(set_progress))
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Runs a store call on tokio's blocking pool. Store calls do file I/O with
/// fsync and may wait on a tenant lock, neither of which belongs on a worker
/// thread.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> trip_hub_core::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError(StoreError::storage(format!("store task failed: {e}"))))?
        .map_err(ApiError::from)
}

async fn get_data(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<TripDocument>, ApiError> {
    let tenant = tenant_of(&query.chat_id);
    let trips = state.trips;
    let doc = blocking(move || trips.get_document(&tenant)).await?;
    Ok(Json(doc))
}

async fn save_data(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let tenant = tenant_of(&query.chat_id);
    let trips = state.trips;
    blocking(move || trips.replace_document(&tenant, body)).await?;
    Ok(Json(json!({"ok": true})))
}

async fn is_admin(
    State(state): State<AppState>,
    Query(query): Query<IsAdminQuery>,
) -> Result<Json<Value>, ApiError> {
    let tenant = tenant_of(&query.chat_id);
    let trips = state.trips;
    let allowed = blocking(move || trips.is_authorized(&tenant, query.user_id)).await?;
    Ok(Json(json!({"is_admin": allowed})))
}

async fn add_admin(
    State(state): State<AppState>,
    Json(req): Json<AddAdminRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = tenant_of(&req.chat_id);
    let trips = state.trips;
    blocking(move || trips.add_admin(&tenant, req.requester_id, req.user_id)).await?;
    Ok(Json(json!({"ok": true})))
}

async fn append_item(
    State(state): State<AppState>,
    Json(req): Json<AppendRequest>,
) -> Result<Json<TripDocument>, ApiError> {
    let tenant = tenant_of(&req.chat_id);
    let trips = state.trips;
    let doc = blocking(move || {
        trips.append_to_collection(&tenant, req.user_id, &req.collection, req.item)
    })
    .await?;
    Ok(Json(doc))
}

async fn remove_item(
    State(state): State<AppState>,
    Json(req): Json<RemoveRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = tenant_of(&req.chat_id);
    let trips = state.trips;
    let removed = blocking(move || {
        trips.remove_by_index(&tenant, req.user_id, &req.collection, req.index)
    })
    .await?;
    Ok(Json(json!({"removed": removed})))
}

async fn update_trip(
    State(state): State<AppState>,
    Json(req): Json<TripUpdateRequest>,
) -> Result<Json<TripDocument>, ApiError> {
    let tenant = tenant_of(&req.chat_id);
    let fields = TripFields {
        name: req.name,
        dates: req.dates,
    };
    let trips = state.trips;
    let doc = blocking(move || trips.replace_scalar_fields(&tenant, req.user_id, fields)).await?;
    Ok(Json(doc))
}

async fn set_progress(
    State(state): State<AppState>,
    Json(req): Json<ProgressRequest>,
) -> Result<Json<TripDocument>, ApiError> {
    let tenant = tenant_of(&req.chat_id);
    let trips = state.trips;
    let doc = blocking(move || trips.set_progress(&tenant, req.user_id, &req.key, req.checked))
        .await?;
    Ok(Json(doc))
}
