//! Error types for sqlgate.
//!
//! Every failure crossing a crate boundary is typed by kind so calling
//! layers can branch deterministically — never by matching message text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One validation failure for one declared parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    /// Declared parameter name
    pub field: String,
    /// Human-readable reason ("required parameter missing", "expected number")
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// Errors surfaced by the task execution engine.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// One or more declared parameters failed validation. Collected
    /// exhaustively, never fail-fast on the first field. Caller-facing
    /// (400-equivalent).
    #[error("parameter validation failed ({} field(s))", .0.len())]
    ParameterValidation(Vec<FieldError>),

    /// The task's datasource has no usable pool or cannot produce a
    /// connection.
    #[error("datasource '{0}' is unavailable")]
    DatasourceUnavailable(String),

    /// A SQL template referenced a placeholder absent from the parameter
    /// map (and without a declared default). No statement is executed.
    #[error("missing parameter '{0}' referenced by SQL template")]
    MissingParameter(String),

    /// A statement failed during execution. Carries the underlying driver
    /// message; for transactional tasks the rollback already happened.
    #[error("statement '{statement_id}' failed: {message}")]
    StatementExecution { statement_id: String, message: String },

    /// Unexpected failure (driver-level begin/commit errors, poisoned
    /// state). 500-equivalent.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable tag for the API envelope.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::ParameterValidation(_) => "PARAMETER_VALIDATION",
            GatewayError::DatasourceUnavailable(_) => "DATASOURCE_UNAVAILABLE",
            GatewayError::MissingParameter(_) => "MISSING_PARAMETER",
            GatewayError::StatementExecution { .. } => "STATEMENT_EXECUTION",
            GatewayError::Internal(_) => "INTERNAL",
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result alias used across sqlgate crates.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
