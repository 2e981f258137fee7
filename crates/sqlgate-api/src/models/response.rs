//! Response envelope for dynamic route execution.
//!
//! # Example success response
//! ```json
//! {
//!   "status": "success",
//!   "result": {"id": 1, "name": "Alice"},
//!   "took_ms": 15
//! }
//! ```
//!
//! # Example error response
//! ```json
//! {
//!   "status": "error",
//!   "took_ms": 5,
//!   "error": {
//!     "code": "PARAMETER_VALIDATION",
//!     "message": "parameter validation failed (2 field(s))",
//!     "fields": [
//!       {"field": "id", "message": "required parameter missing"},
//!       {"field": "age", "message": "expected number, got 'abc'"}
//!     ]
//!   }
//! }
//! ```

use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlgate_commons::{FieldError, GatewayError};

/// Envelope for every dynamic-route response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// "success" or "error"
    pub status: String,

    /// Normalized task result; absent on error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,

    /// Total execution time in milliseconds
    pub took_ms: u64,

    /// Error details when status is "error"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// Structured error payload with a stable machine-readable code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    /// Per-field messages for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

impl ApiResponse {
    pub fn success(result: JsonValue, took_ms: u64) -> Self {
        Self { status: "success".to_string(), result: Some(result), took_ms, error: None }
    }

    pub fn error(code: &str, message: impl Into<String>, took_ms: u64) -> Self {
        Self {
            status: "error".to_string(),
            result: None,
            took_ms,
            error: Some(ErrorDetail { code: code.to_string(), message: message.into(), fields: None }),
        }
    }

    /// Build the envelope for an engine error, attaching per-field messages
    /// for validation failures.
    pub fn from_gateway_error(err: &GatewayError, took_ms: u64) -> Self {
        let mut response = Self::error(err.code(), err.to_string(), took_ms);
        if let GatewayError::ParameterValidation(fields) = err {
            if let Some(detail) = response.error.as_mut() {
                detail.fields = Some(fields.clone());
            }
        }
        response
    }
}

/// Deterministic HTTP status for each error kind.
pub fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::ParameterValidation(_) => StatusCode::BAD_REQUEST,
        GatewayError::MissingParameter(_) => StatusCode::BAD_REQUEST,
        GatewayError::DatasourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::StatementExecution { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let resp = ApiResponse::success(json!({"a": 1}), 12);
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value, json!({"status": "success", "result": {"a": 1}, "took_ms": 12}));
    }

    #[test]
    fn test_validation_error_carries_fields() {
        let err = GatewayError::ParameterValidation(vec![
            FieldError::new("id", "required parameter missing"),
        ]);
        let resp = ApiResponse::from_gateway_error(&err, 3);
        let detail = resp.error.unwrap();
        assert_eq!(detail.code, "PARAMETER_VALIDATION");
        assert_eq!(detail.fields.unwrap().len(), 1);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&GatewayError::ParameterValidation(vec![])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&GatewayError::MissingParameter("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&GatewayError::DatasourceUnavailable("d".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&GatewayError::StatementExecution {
                statement_id: "s".into(),
                message: "m".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(&GatewayError::internal("x")), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
