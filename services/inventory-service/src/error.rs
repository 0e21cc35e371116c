use common_http_errors::ApiError;
use thiserror::Error;

/// Closed error set for stock transitions and reads.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no inventory item for sku {sku} at location {location}")]
    NotFound { sku: String, location: String },
    #[error("{0}")]
    BadInput(String),
    #[error("{0}")]
    Validation(String),
    #[error("requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },
    #[error("requested {requested}, reserved {reserved}")]
    InsufficientReservation { requested: i32, reserved: i32 },
    #[error("stale lock_version for sku {sku} at location {location}")]
    Conflict { sku: String, location: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EngineError {
    pub fn bad_input(msg: impl Into<String>) -> Self {
        EngineError::BadInput(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "NotFound",
            EngineError::BadInput(_) => "BadInput",
            EngineError::Validation(_) => "ValidationError",
            EngineError::InsufficientStock { .. } => "InsufficientStock",
            EngineError::InsufficientReservation { .. } => "InsufficientReservation",
            EngineError::Conflict { .. } => "Conflict",
            EngineError::Database(_) => "Internal",
        }
    }

    /// Error string for the RPC surface. Storage faults are masked; the
    /// remaining kinds carry their detail.
    pub fn rpc_error(&self) -> String {
        match self {
            EngineError::Database(_) => "Internal error".to_string(),
            other => format!("{}: {}", other.kind(), other),
        }
    }
}

/// Fold Postgres constraint violations on insert/update into the validation
/// kind so schema-enforced invariants surface as 422s, not 500s.
pub fn map_constraint_violation(err: sqlx::Error) -> EngineError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            // unique_violation: (sku, location) already exists
            Some("23505") => {
                return EngineError::Validation(
                    "inventory item already exists for this sku and location".to_string(),
                )
            }
            // check_violation: non-negativity constraints
            Some("23514") => {
                return EngineError::Validation(format!(
                    "constraint violation: {}",
                    db_err.constraint().unwrap_or("check failed")
                ))
            }
            _ => {}
        }
    }
    EngineError::Database(err)
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound { .. } => ApiError::not_found("not_found", err.to_string()),
            EngineError::BadInput(msg) => ApiError::bad_request("bad_input", msg),
            EngineError::Validation(msg) => ApiError::unprocessable("validation_error", msg),
            EngineError::InsufficientStock { requested, available } => ApiError::Unprocessable {
                code: "insufficient_stock",
                message: Some(err.to_string()),
                details: Some(serde_json::json!({
                    "requested": requested,
                    "available": available,
                })),
            },
            EngineError::InsufficientReservation { requested, reserved } => ApiError::Unprocessable {
                code: "insufficient_reservation",
                message: Some(err.to_string()),
                details: Some(serde_json::json!({
                    "requested": requested,
                    "reserved": reserved,
                })),
            },
            EngineError::Conflict { .. } => ApiError::Conflict {
                code: "conflict",
                message: Some(err.to_string()),
            },
            EngineError::Database(e) => ApiError::internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn engine_errors_map_to_expected_statuses() {
        let cases: Vec<(EngineError, StatusCode, &str)> = vec![
            (
                EngineError::NotFound { sku: "A".into(), location: "default".into() },
                StatusCode::NOT_FOUND,
                "not_found",
            ),
            (
                EngineError::bad_input("quantity must be positive"),
                StatusCode::BAD_REQUEST,
                "bad_input",
            ),
            (
                EngineError::Validation("sku must not be blank".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
            ),
            (
                EngineError::InsufficientStock { requested: 3, available: 2 },
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_stock",
            ),
            (
                EngineError::InsufficientReservation { requested: 5, reserved: 2 },
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_reservation",
            ),
            (
                EngineError::Conflict { sku: "A".into(), location: "default".into() },
                StatusCode::CONFLICT,
                "conflict",
            ),
        ];
        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn rpc_error_masks_database_failures() {
        let err = EngineError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.rpc_error(), "Internal error");

        let err = EngineError::InsufficientStock { requested: 3, available: 2 };
        assert_eq!(err.rpc_error(), "InsufficientStock: requested 3, available 2");
    }
}
