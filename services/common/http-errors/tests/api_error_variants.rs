use axum::http::StatusCode;
use axum::response::IntoResponse;
use common_http_errors::ApiError;

#[test]
fn not_found_variant() {
    let err = ApiError::NotFound { code: "not_found", message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "not_found");
}

#[test]
fn bad_request_variant() {
    let err = ApiError::BadRequest { code: "bad_input", message: Some("quantity must be positive".into()) };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "bad_input");
}

#[test]
fn unprocessable_variant() {
    let err = ApiError::Unprocessable {
        code: "insufficient_stock",
        message: Some("requested 3, available 2".into()),
        details: Some(serde_json::json!({"requested": 3, "available": 2})),
    };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "insufficient_stock");
}

#[test]
fn conflict_variant() {
    let err = ApiError::Conflict { code: "conflict", message: Some("stale lock_version".into()) };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "conflict");
}

#[test]
fn internal_variant() {
    let err = ApiError::Internal { message: Some("boom".into()) };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "internal_error");
}

#[tokio::test]
async fn body_carries_status_and_error_fields() {
    use http_body_util::BodyExt;
    let err = ApiError::unprocessable("insufficient_reservation", "requested 5, reserved 2");
    let resp = err.into_response();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "insufficient_reservation");
    assert_eq!(body["status"], 422);
    assert_eq!(body["message"], "requested 5, reserved 2");
}
