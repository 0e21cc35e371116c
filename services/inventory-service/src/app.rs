use crate::inventory_handlers::{
    adjust_stock, aggregate, bulk_adjust, commit_stock, count_stock, create_item, damage_stock,
    delete_item, find_stock, get_item, item_movements, list_inventory, locations, lose_stock,
    low_stock_items, receive_stock, release_stock, reserve_stock, return_stock, sell_stock,
    transfer_stock, update_item,
};
use crate::movement_handlers::{get_stock_movement, list_stock_movements};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{middleware, routing::post, Router};
use common_http_errors::http_error_metrics_layer;
use prometheus::{Encoder, TextEncoder};
use tower_http::cors::CorsLayer;

pub async fn health() -> &'static str {
    "ok"
}

async fn health_ready(State(state): State<AppState>) -> Result<&'static str, (StatusCode, String)> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, format!("database unreachable: {e}")))?;
    Ok("ready")
}

async fn metrics(State(state): State<AppState>) -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    // Service registry plus the process-wide default one (HTTP error counters).
    let _ = encoder.encode(&state.metrics.registry.gather(), &mut buffer);
    let _ = encoder.encode(&prometheus::default_registry().gather(), &mut buffer);
    match String::from_utf8(buffer) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/inventory", get(list_inventory).post(create_item))
        .route("/inventory/low_stock", get(low_stock_items))
        .route("/inventory/locations", get(locations))
        .route("/inventory/aggregate", get(aggregate))
        .route("/inventory/bulk_adjust", post(bulk_adjust))
        .route("/inventory/transfer", post(transfer_stock))
        .route("/inventory/:sku", get(get_item).patch(update_item).delete(delete_item))
        .route("/inventory/:sku/adjust", post(adjust_stock))
        .route("/inventory/:sku/receive", post(receive_stock))
        .route("/inventory/:sku/sell", post(sell_stock))
        .route("/inventory/:sku/return", post(return_stock))
        .route("/inventory/:sku/damage", post(damage_stock))
        .route("/inventory/:sku/loss", post(lose_stock))
        .route("/inventory/:sku/found", post(find_stock))
        .route("/inventory/:sku/reserve", post(reserve_stock))
        .route("/inventory/:sku/release", post(release_stock))
        .route("/inventory/:sku/commit", post(commit_stock))
        .route("/inventory/:sku/count", post(count_stock))
        .route("/inventory/:sku/movements", get(item_movements))
        .route("/stock_movements", get(list_stock_movements))
        .route("/stock_movements/:id", get(get_stock_movement));

    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(health))
        .route("/health/ready", get(health_ready))
        .route("/internal/metrics", get(metrics))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(http_error_metrics_layer("inventory-service")))
}
