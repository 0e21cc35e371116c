use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Wire shape for every error response: `{error, message?, details?, status}`.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub status: u16,
}

/// API error taxonomy shared by the inventory adapters.
///
/// `code` is the machine-readable token carried in the body and in the
/// `X-Error-Code` header; callers pass taxonomy names (`not_found`,
/// `bad_input`, `insufficient_stock`, ...) or a more specific token when one
/// exists.
#[derive(Debug)]
pub enum ApiError {
    NotFound { code: &'static str, message: Option<String> },
    BadRequest { code: &'static str, message: Option<String> },
    Unprocessable { code: &'static str, message: Option<String>, details: Option<serde_json::Value> },
    Conflict { code: &'static str, message: Option<String> },
    Internal { message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal { message: Some(e.to_string()) }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound { code, message: Some(message.into()) }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest { code, message: Some(message.into()) }
    }

    pub fn unprocessable(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unprocessable { code, message: Some(message.into()), details: None }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound { code, .. }
            | ApiError::BadRequest { code, .. }
            | ApiError::Unprocessable { code, .. }
            | ApiError::Conflict { code, .. } => code,
            ApiError::Internal { .. } => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let (message, details) = match self {
            ApiError::NotFound { message, .. }
            | ApiError::BadRequest { message, .. }
            | ApiError::Conflict { message, .. }
            | ApiError::Internal { message } => (message, None),
            ApiError::Unprocessable { message, details, .. } => (message, details),
        };
        let body = ErrorBody {
            error: code.into(),
            message,
            details,
            status: status.as_u16(),
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(code) {
            resp.headers_mut().insert("X-Error-Code", val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// Shared HTTP error metrics middleware helper
use axum::{body::Body, http::Request};
use axum::middleware::Next;
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};
use std::collections::HashSet;
use std::sync::Mutex;

static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new(
            "http_errors_total",
            "Count of HTTP error responses emitted (status >= 400)",
        ),
        &["service", "code", "status"],
    ).expect("http_errors_total");
    let _ = prometheus::default_registry().register(Box::new(c.clone()));
    c
});

static HTTP_ERROR_CODE_OVERFLOW_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "http_error_code_overflow_total",
        "Count of error responses whose code label was folded into the overflow label",
    ).expect("http_error_code_overflow_total");
    let _ = prometheus::default_registry().register(Box::new(c.clone()));
    c
});

// Cardinality guard: bound the distinct code labels so a misbehaving caller
// cannot blow up the metric series.
const MAX_ERROR_CODES: usize = 40;
static OBSERVED_CODES: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));
const OVERFLOW_CODE: &str = "_overflow";

/// Returns an Axum middleware function that records HTTP error counts.
/// Usage: .layer(axum::middleware::from_fn(http_error_metrics_layer("service-name")))
pub fn http_error_metrics_layer(service_name: &'static str) -> impl Fn(Request<Body>, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = axum::response::Response> + Send>> + Clone + Send + Sync + 'static {
    move |req: Request<Body>, next: Next| {
        let svc = service_name;
        Box::pin(async move {
            let resp = next.run(req).await;
            let status = resp.status();
            if status.as_u16() >= 400 {
                let raw_code = resp
                    .headers()
                    .get("X-Error-Code")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                let code = {
                    let mut seen = OBSERVED_CODES.lock().expect("lock observed codes");
                    if seen.contains(raw_code) {
                        raw_code
                    } else if seen.len() < MAX_ERROR_CODES {
                        seen.insert(raw_code.to_string());
                        raw_code
                    } else {
                        HTTP_ERROR_CODE_OVERFLOW_TOTAL.inc();
                        OVERFLOW_CODE
                    }
                };
                HTTP_ERRORS_TOTAL.with_label_values(&[svc, code, status.as_str()]).inc();
            }
            resp
        })
    }
}

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use super::*;
    use axum::body::to_bytes;
    use axum::response::IntoResponse;

    /// Assert the rendered shape of an ApiError: code in the body and header,
    /// status matching the variant.
    pub async fn assert_error_shape(err: ApiError, expected_code: &str) {
        let expected_status = err.status();
        let resp = err.into_response();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body_bytes = to_bytes(resp.into_body(), 1024 * 64).await.expect("read body");
        let text = String::from_utf8(body_bytes.to_vec()).expect("utf8 body");
        assert_eq!(status, expected_status);
        assert!(
            text.contains(&format!("\"error\":\"{}\"", expected_code)),
            "body missing expected code: {} in {}",
            expected_code,
            text
        );
        assert!(
            text.contains(&format!("\"status\":{}", status.as_u16())),
            "body missing status field: {text}"
        );
        assert_eq!(
            headers.get("X-Error-Code").and_then(|v| v.to_str().ok()),
            Some(expected_code),
        );
    }
}

/// Test-only assertion macro for validating an ApiError's rendered response structure.
/// Usage:
/// assert_api_error!(err, "insufficient_stock");
#[cfg(any(test, feature = "test-helpers"))]
#[macro_export]
macro_rules! assert_api_error {
    ($err:expr, $code:expr) => {{
        let err: $crate::ApiError = $err;
        $crate::test_helpers::assert_error_shape(err, $code).await;
    }};
}
