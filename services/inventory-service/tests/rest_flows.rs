//! REST and RPC adapters against ephemeral Postgres: envelopes, pagination,
//! optimistic updates, bulk outcomes. Gated by ENABLE_ITESTS=1.

mod support;

use axum::http::StatusCode;
use inventory_service::proto::inventory_service_server::InventoryService;
use inventory_service::proto::{CheckAvailabilityRequest, GetStockRequest, ReserveStockRequest};
use inventory_service::rpc::InventoryRpc;
use serde_json::json;
use tonic::Request;

#[tokio::test]
async fn item_crud_and_stock_operations() {
    if !support::itests_enabled() {
        return;
    }
    let db = support::start_postgres().await;
    let app = inventory_service::app::build_router(support::app_state(db.pool.clone()));

    // Create
    let (status, body) = support::send_json(
        &app,
        "POST",
        "/api/v1/inventory",
        Some(json!({
            "sku": "WIDGET-001",
            "quantity_on_hand": 10,
            "reorder_point": 3,
            "reorder_quantity": 20,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["sku"], "WIDGET-001");
    assert_eq!(body["data"]["location"], "default");
    assert_eq!(body["data"]["quantity_available"], 10);
    let lock_version = body["data"]["lock_version"].as_i64().unwrap();

    // Duplicate (sku, location) violates the unique constraint.
    let (status, body) = support::send_json(
        &app,
        "POST",
        "/api/v1/inventory",
        Some(json!({ "sku": "WIDGET-001" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    // Patch settings with the current version, then retry with the stale one.
    let (status, body) = support::send_json(
        &app,
        "PATCH",
        "/api/v1/inventory/WIDGET-001",
        Some(json!({ "reorder_point": 5, "lock_version": lock_version })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reorder_point"], 5);

    let (status, body) = support::send_json(
        &app,
        "PATCH",
        "/api/v1/inventory/WIDGET-001",
        Some(json!({ "reorder_point": 9, "lock_version": lock_version })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    // Adjust carries the movement in the envelope.
    let (status, body) = support::send_json(
        &app,
        "POST",
        "/api/v1/inventory/WIDGET-001/adjust",
        Some(json!({ "quantity": -2, "reason": "shrinkage" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["quantity_on_hand"], 8);
    assert_eq!(body["movement"]["movement_type"], "adjustment");
    assert_eq!(body["movement"]["quantity"], -2);
    assert_eq!(body["movement"]["reason"], "shrinkage");

    // Reserve returns the audit handle.
    let (status, body) = support::send_json(
        &app,
        "POST",
        "/api/v1/inventory/WIDGET-001/reserve",
        Some(json!({ "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reservation_id"].as_str().unwrap().starts_with("RES-"));
    assert_eq!(body["data"]["quantity_reserved"], 3);

    // Ledger browsing with a type filter.
    let (status, body) = support::send_json(
        &app,
        "GET",
        "/api/v1/inventory/WIDGET-001/movements?type=reservation",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total_count"], 1);
    assert_eq!(body["data"][0]["movement_type"], "reservation");
    assert_eq!(body["data"][0]["quantity"], -3);

    // Release, then delete; a deleted item is gone from reads.
    let (status, _) = support::send_json(
        &app,
        "POST",
        "/api/v1/inventory/WIDGET-001/release",
        Some(json!({ "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = support::send_json(&app, "DELETE", "/api/v1/inventory/WIDGET-001", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = support::send_json(&app, "GET", "/api/v1/inventory/WIDGET-001", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn list_pagination_meta_and_headers() {
    if !support::itests_enabled() {
        return;
    }
    let db = support::start_postgres().await;
    let state = support::app_state(db.pool.clone());
    let app = inventory_service::app::build_router(state);
    support::seed_item(&db.pool, "ALPHA", "default", 5, false).await;
    support::seed_item(&db.pool, "BRAVO", "default", 0, false).await;
    support::seed_item(&db.pool, "CHARLIE", "west", 2, false).await;

    use tower::ServiceExt;
    let resp = app
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .uri("/api/v1/inventory?per_page=2")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("X-Total-Count").unwrap(), "3");
    assert_eq!(resp.headers().get("X-Page").unwrap(), "1");
    assert_eq!(resp.headers().get("X-Per-Page").unwrap(), "2");
    use http_body_util::BodyExt;
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"], json!({
        "total_count": 3, "page": 1, "per_page": 2, "total_pages": 2
    }));

    // Stock filters.
    let (_, body) = support::send_json(&app, "GET", "/api/v1/inventory?out_of_stock=true", None).await;
    assert_eq!(body["meta"]["total_count"], 1);
    assert_eq!(body["data"][0]["sku"], "BRAVO");
    let (_, body) = support::send_json(&app, "GET", "/api/v1/inventory?in_stock=true", None).await;
    assert_eq!(body["meta"]["total_count"], 2);

    // Distinct locations.
    let (_, body) = support::send_json(&app, "GET", "/api/v1/inventory/locations", None).await;
    assert_eq!(body["data"], json!(["default", "west"]));
}

#[tokio::test]
async fn low_stock_listing_uses_reorder_point() {
    if !support::itests_enabled() {
        return;
    }
    let db = support::start_postgres().await;
    let app = inventory_service::app::build_router(support::app_state(db.pool.clone()));

    let (_, created) = support::send_json(
        &app,
        "POST",
        "/api/v1/inventory",
        Some(json!({ "sku": "LOW-1", "quantity_on_hand": 2, "reorder_point": 5 })),
    )
    .await;
    assert_eq!(created["data"]["reorder_point"], 5);
    support::seed_item(&db.pool, "NO-POINT", "default", 0, false).await;

    let (status, body) = support::send_json(&app, "GET", "/api/v1/inventory/low_stock", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total_count"], 1);
    assert_eq!(body["data"][0]["sku"], "LOW-1");
}

#[tokio::test]
async fn bulk_adjust_reports_per_entry_outcomes() {
    if !support::itests_enabled() {
        return;
    }
    let db = support::start_postgres().await;
    let app = inventory_service::app::build_router(support::app_state(db.pool.clone()));
    support::seed_item(&db.pool, "ALPHA", "default", 5, false).await;

    let (status, body) = support::send_json(
        &app,
        "POST",
        "/api/v1/inventory/bulk_adjust",
        Some(json!({
            "adjustments": [
                { "sku": "ALPHA", "quantity": 5, "reason": "recount" },
                { "sku": "GHOST", "quantity": 1 },
                { "sku": "ALPHA", "quantity": -100 },
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[0]["data"]["quantity_on_hand"], 10);
    assert_eq!(results[1]["success"], false);
    assert_eq!(results[1]["error"], "not_found");
    assert_eq!(results[2]["success"], false);
    assert_eq!(results[2]["error"], "insufficient_stock");
}

#[tokio::test]
async fn rpc_surface_encodes_business_errors() {
    if !support::itests_enabled() {
        return;
    }
    let db = support::start_postgres().await;
    let state = support::app_state(db.pool.clone());
    support::seed_item(&db.pool, "WIDGET-001", "default", 2, false).await;
    support::seed_item(&db.pool, "WIDGET-001", "west", 4, true).await;
    let rpc = InventoryRpc::new(state);

    // Empty location falls back to "default".
    let resp = rpc
        .get_stock(Request::new(GetStockRequest { sku: "WIDGET-001".into(), location: String::new() }))
        .await
        .unwrap()
        .into_inner();
    assert!(resp.success);
    assert_eq!(resp.quantity_on_hand, 2);
    assert!(resp.in_stock);

    let resp = rpc
        .get_stock(Request::new(GetStockRequest { sku: "GHOST".into(), location: String::new() }))
        .await
        .unwrap()
        .into_inner();
    assert!(!resp.success);
    assert!(resp.error.starts_with("NotFound"));

    let resp = rpc
        .reserve_stock(Request::new(ReserveStockRequest {
            sku: "WIDGET-001".into(),
            location: String::new(),
            quantity: 3,
            reference_type: "order".into(),
            reference_id: "ORD-9".into(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(!resp.success);
    assert_eq!(resp.error, "InsufficientStock: requested 3, available 2");

    let resp = rpc
        .reserve_stock(Request::new(ReserveStockRequest {
            sku: "WIDGET-001".into(),
            location: String::new(),
            quantity: 2,
            reference_type: String::new(),
            reference_id: String::new(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(resp.success);
    assert!(resp.reservation_id.starts_with("RES-"));
    assert_eq!(resp.quantity_reserved, 2);
    assert_eq!(resp.quantity_available, 0);

    // Availability sums across locations; the backorderable west row makes
    // any request fulfillable.
    let resp = rpc
        .check_availability(Request::new(CheckAvailabilityRequest {
            sku: "WIDGET-001".into(),
            quantity: 50,
            location: String::new(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(resp.success);
    assert_eq!(resp.total_available, 4);
    assert!(resp.is_available);
    assert!(resp.backorderable);
    assert_eq!(resp.locations.len(), 2);
}
