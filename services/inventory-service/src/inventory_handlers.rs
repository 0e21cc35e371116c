use crate::error::EngineError;
use crate::model::{
    InventoryItem, MovementContext, MovementType, PageMeta, PageParams, DEFAULT_LOCATION,
};
use crate::query::{self, MovementFilter};
use crate::store::{self, ListFilter, NewItem, SettingsPatch};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use common_http_errors::ApiError;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, Default)]
pub struct ListInventoryParams {
    pub sku: Option<String>,
    pub location: Option<String>,
    pub in_stock: Option<bool>,
    pub low_stock: Option<bool>,
    pub out_of_stock: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LocationParam {
    pub location: Option<String>,
}

impl LocationParam {
    fn location(&self) -> &str {
        self.location.as_deref().unwrap_or(DEFAULT_LOCATION)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub sku: String,
    pub location: Option<String>,
    #[serde(default)]
    pub quantity_on_hand: i32,
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
    #[serde(default)]
    pub backorderable: bool,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
    pub backorderable: Option<bool>,
    pub metadata: Option<serde_json::Value>,
    /// Optional optimistic guard; mismatches are rejected with 409.
    pub lock_version: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct StockOperationRequest {
    pub quantity: i32,
    pub reason: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl StockOperationRequest {
    fn context(&self) -> MovementContext {
        MovementContext {
            reason: self.reason.clone(),
            reference_type: self.reference_type.clone(),
            reference_id: self.reference_id.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CountRequest {
    pub actual_quantity: i32,
    pub reason: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub sku: String,
    pub source_location: String,
    pub destination_location: String,
    pub quantity: i32,
    pub reason: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAdjustRequest {
    pub adjustments: Vec<BulkAdjustment>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAdjustment {
    pub sku: String,
    pub location: Option<String>,
    pub quantity: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MovementHistoryParams {
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// `{data: [...], meta: {...}}` plus the pagination headers.
pub(crate) fn paginated<T: serde::Serialize>(data: &[T], meta: &PageMeta) -> Response {
    let mut resp = Json(json!({ "data": data, "meta": meta })).into_response();
    let headers = resp.headers_mut();
    headers.insert("X-Total-Count", HeaderValue::from(meta.total_count));
    headers.insert("X-Page", HeaderValue::from(meta.page));
    headers.insert("X-Per-Page", HeaderValue::from(meta.per_page));
    resp
}

pub(crate) fn parse_rfc3339(
    value: &str,
    field: &'static str,
) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ApiError::bad_request("bad_input", format!("invalid {field} timestamp")))
}

pub(crate) fn parse_movement_type(value: &str) -> Result<MovementType, ApiError> {
    MovementType::from_str(value)
        .ok_or_else(|| ApiError::bad_request("bad_input", format!("unknown movement_type '{value}'")))
}

fn validate_reorder_fields(
    reorder_point: Option<i32>,
    reorder_quantity: Option<i32>,
) -> Result<(), ApiError> {
    if reorder_point.is_some_and(|v| v < 0) {
        return Err(ApiError::unprocessable("validation_error", "reorder_point must be >= 0"));
    }
    if reorder_quantity.is_some_and(|v| v < 0) {
        return Err(ApiError::unprocessable("validation_error", "reorder_quantity must be >= 0"));
    }
    Ok(())
}

pub async fn list_inventory(
    State(state): State<AppState>,
    Query(params): Query<ListInventoryParams>,
) -> Result<Response, ApiError> {
    let filter = ListFilter {
        sku: params.sku.clone(),
        location: params.location.clone(),
        in_stock: params.in_stock.unwrap_or(false),
        low_stock: params.low_stock.unwrap_or(false),
        out_of_stock: params.out_of_stock.unwrap_or(false),
    };
    let page = PageParams { page: params.page, per_page: params.per_page };
    let (items, total) = store::list_items(&state.db, &filter, &page)
        .await
        .map_err(ApiError::internal)?;
    Ok(paginated(&items, &PageMeta::new(total, &page)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let item = fetch_item(&state, &sku, params.location()).await?;
    Ok(Json(json!({ "data": item })))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<Response, ApiError> {
    let sku = payload.sku.trim().to_string();
    if sku.is_empty() {
        return Err(ApiError::unprocessable("validation_error", "sku must not be blank"));
    }
    let location = payload
        .location
        .as_deref()
        .map(str::trim)
        .filter(|loc| !loc.is_empty())
        .unwrap_or(DEFAULT_LOCATION)
        .to_string();
    validate_reorder_fields(payload.reorder_point, payload.reorder_quantity)?;

    let item = store::insert_item(
        &state.db,
        &NewItem {
            sku,
            location,
            quantity_on_hand: payload.quantity_on_hand,
            reorder_point: payload.reorder_point,
            reorder_quantity: payload.reorder_quantity,
            backorderable: payload.backorderable,
            metadata: payload.metadata.unwrap_or_else(|| json!({})),
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": item }))).into_response())
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate_reorder_fields(payload.reorder_point, payload.reorder_quantity)?;
    let patch = SettingsPatch {
        reorder_point: payload.reorder_point,
        reorder_quantity: payload.reorder_quantity,
        backorderable: payload.backorderable,
        metadata: payload.metadata,
        lock_version: payload.lock_version,
    };
    let item = store::update_settings(&state.db, &sku, params.location(), &patch).await?;
    Ok(Json(json!({ "data": item })))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
) -> Result<StatusCode, ApiError> {
    let deleted = store::delete_item(&state.db, &sku, params.location())
        .await
        .map_err(ApiError::internal)?;
    if !deleted {
        return Err(not_found(&sku, params.location()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<StockOperationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transition = state
        .engine
        .adjust(&sku, params.location(), payload.quantity, &payload.context())
        .await?;
    Ok(Json(json!({ "data": transition.item, "movement": transition.movement })))
}

pub async fn reserve_stock(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<StockOperationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state
        .engine
        .reserve(&sku, params.location(), payload.quantity, &payload.context())
        .await?;
    Ok(Json(json!({
        "data": outcome.item,
        "movement": outcome.movement,
        "reservation_id": outcome.reservation_id,
    })))
}

pub async fn release_stock(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<StockOperationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transition = state
        .engine
        .release(&sku, params.location(), payload.quantity, &payload.context())
        .await?;
    Ok(Json(json!({ "data": transition.item, "movement": transition.movement })))
}

pub async fn commit_stock(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<StockOperationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transition = state
        .engine
        .commit_reservation(&sku, params.location(), payload.quantity, &payload.context())
        .await?;
    Ok(Json(json!({ "data": transition.item, "movement": transition.movement })))
}

pub async fn sell_stock(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<StockOperationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transition = state
        .engine
        .sell(&sku, params.location(), payload.quantity, &payload.context())
        .await?;
    Ok(Json(json!({ "data": transition.item, "movement": transition.movement })))
}

pub async fn return_stock(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<StockOperationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transition = state
        .engine
        .return_stock(&sku, params.location(), payload.quantity, &payload.context())
        .await?;
    Ok(Json(json!({ "data": transition.item, "movement": transition.movement })))
}

pub async fn damage_stock(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<StockOperationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transition = state
        .engine
        .record_damage(&sku, params.location(), payload.quantity, &payload.context())
        .await?;
    Ok(Json(json!({ "data": transition.item, "movement": transition.movement })))
}

pub async fn lose_stock(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<StockOperationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transition = state
        .engine
        .record_loss(&sku, params.location(), payload.quantity, &payload.context())
        .await?;
    Ok(Json(json!({ "data": transition.item, "movement": transition.movement })))
}

pub async fn find_stock(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<StockOperationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transition = state
        .engine
        .record_found(&sku, params.location(), payload.quantity, &payload.context())
        .await?;
    Ok(Json(json!({ "data": transition.item, "movement": transition.movement })))
}

pub async fn receive_stock(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<StockOperationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transition = state
        .engine
        .receive(&sku, params.location(), payload.quantity, &payload.context())
        .await?;
    Ok(Json(json!({ "data": transition.item, "movement": transition.movement })))
}

pub async fn count_stock(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<LocationParam>,
    Json(payload): Json<CountRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ctx = MovementContext {
        reason: payload.reason,
        metadata: payload.metadata,
        ..Default::default()
    };
    let outcome = state
        .engine
        .count_adjustment(&sku, params.location(), payload.actual_quantity, &ctx)
        .await?;
    Ok(Json(json!({
        "data": outcome.item,
        "movement": outcome.movement,
        "difference": outcome.difference,
    })))
}

pub async fn transfer_stock(
    State(state): State<AppState>,
    Json(payload): Json<TransferRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ctx = MovementContext {
        reason: payload.reason,
        reference_type: payload.reference_type,
        reference_id: payload.reference_id,
        metadata: payload.metadata,
    };
    let outcome = state
        .engine
        .transfer(
            &payload.sku,
            &payload.source_location,
            &payload.destination_location,
            payload.quantity,
            &ctx,
        )
        .await?;
    Ok(Json(json!({
        "data": { "source": outcome.source, "destination": outcome.destination },
        "movements": [outcome.outbound, outcome.inbound],
        "transfer_id": outcome.transfer_id,
    })))
}

pub async fn item_movements(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(params): Query<MovementHistoryParams>,
) -> Result<Response, ApiError> {
    let location = params.location.as_deref().unwrap_or(DEFAULT_LOCATION);
    let item = fetch_item(&state, &sku, location).await?;

    let mut filter = MovementFilter {
        reference_type: params.reference_type.clone(),
        reference_id: params.reference_id.clone(),
        ..Default::default()
    };
    if let Some(raw) = params.movement_type.as_deref() {
        filter.movement_type = Some(parse_movement_type(raw)?);
    }
    if let Some(raw) = params.start_date.as_deref() {
        filter.start_date = Some(parse_rfc3339(raw, "start_date")?);
    }
    if let Some(raw) = params.end_date.as_deref() {
        filter.end_date = Some(parse_rfc3339(raw, "end_date")?);
    }

    let page = PageParams { page: params.page, per_page: params.per_page };
    let (movements, total) = query::movements_for(&state.db, item.id, &filter, &page)
        .await
        .map_err(ApiError::internal)?;
    Ok(paginated(&movements, &PageMeta::new(total, &page)))
}

pub async fn low_stock_items(
    State(state): State<AppState>,
    Query(params): Query<ListInventoryParams>,
) -> Result<Response, ApiError> {
    let page = PageParams { page: params.page, per_page: params.per_page };
    let (items, total) = query::low_stock(&state.db, &page).await.map_err(ApiError::internal)?;
    Ok(paginated(&items, &PageMeta::new(total, &page)))
}

pub async fn locations(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let locations = store::distinct_locations(&state.db).await.map_err(ApiError::internal)?;
    Ok(Json(json!({ "data": locations })))
}

/// Per-SKU totals across all locations.
pub async fn aggregate(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rows = query::aggregate_by_sku(&state.db).await.map_err(ApiError::internal)?;
    Ok(Json(json!({ "data": rows })))
}

/// Runs every adjustment in its own transaction and reports per-entry
/// outcomes; one bad entry does not abort the rest.
pub async fn bulk_adjust(
    State(state): State<AppState>,
    Json(payload): Json<BulkAdjustRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.adjustments.is_empty() {
        return Err(ApiError::bad_request("bad_input", "adjustments must not be empty"));
    }
    let mut results = Vec::with_capacity(payload.adjustments.len());
    for entry in payload.adjustments {
        let location = entry.location.as_deref().unwrap_or(DEFAULT_LOCATION).to_string();
        let ctx = MovementContext { reason: entry.reason.clone(), ..Default::default() };
        match state.engine.adjust(&entry.sku, &location, entry.quantity, &ctx).await {
            Ok(transition) => results.push(json!({
                "sku": entry.sku,
                "location": location,
                "success": true,
                "data": transition.item,
                "movement": transition.movement,
            })),
            Err(err) => {
                let message = err.to_string();
                let api: ApiError = err.into();
                results.push(json!({
                    "sku": entry.sku,
                    "location": location,
                    "success": false,
                    "error": api.code(),
                    "message": message,
                }));
            }
        }
    }
    Ok(Json(json!({ "data": results })))
}

async fn fetch_item(state: &AppState, sku: &str, location: &str) -> Result<InventoryItem, ApiError> {
    store::get_item(&state.db, sku, location)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| not_found(sku, location))
}

fn not_found(sku: &str, location: &str) -> ApiError {
    EngineError::NotFound { sku: sku.into(), location: location.into() }.into()
}
