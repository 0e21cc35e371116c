use crate::inventory_handlers::{paginated, parse_movement_type, parse_rfc3339};
use crate::model::{PageMeta, PageParams};
use crate::query::{self, MovementFilter};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use common_http_errors::ApiError;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize, Default)]
pub struct MovementBrowseParams {
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn list_stock_movements(
    State(state): State<AppState>,
    Query(params): Query<MovementBrowseParams>,
) -> Result<Response, ApiError> {
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
    let (movements, total) = query::list_movements(&state.db, &filter, &page)
        .await
        .map_err(ApiError::internal)?;
    Ok(paginated(&movements, &PageMeta::new(total, &page)))
}

pub async fn get_stock_movement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let movement = query::get_movement(&state.db, id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::not_found("not_found", format!("no stock movement {id}")))?;
    Ok(Json(json!({ "data": movement })))
}
