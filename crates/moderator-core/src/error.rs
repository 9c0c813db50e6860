//! Error types module
//!
//! All errors are unified under the `AppError` enum which can represent database,
//! validation, provider and other domain-specific errors. Each variant describes its
//! own HTTP presentation through the `ErrorMetadata` trait.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use serde::{Deserialize, Serialize};
use std::io;
use utoipa::ToSchema;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like upstream provider failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DATABASE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// A single validation failure, located by its path in the request
/// (e.g. `["query", "user"]` or `["body", "text"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldViolation {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

impl FieldViolation {
    pub fn new(
        loc: impl IntoIterator<Item = impl Into<String>>,
        msg: impl Into<String>,
        error_type: impl Into<String>,
    ) -> Self {
        Self {
            loc: loc.into_iter().map(Into::into).collect(),
            msg: msg.into(),
            error_type: error_type.into(),
        }
    }

    /// A required field that was not supplied.
    pub fn missing(location: &str, field: &str) -> Self {
        Self::new([location, field], "field required", "value_error.missing")
    }

    /// Flatten `validator` errors into violations under the given location
    /// (`"query"`, `"body"` or `"form"`). Ordered by field name.
    pub fn from_validation_errors(
        location: &str,
        errors: &validator::ValidationErrors,
    ) -> Vec<Self> {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(move |e| Self::from_validation_error(location, &field, e))
            })
            .collect()
    }

    fn from_validation_error(
        location: &str,
        field: &str,
        error: &validator::ValidationError,
    ) -> Self {
        let param = |name: &str| -> Option<String> {
            error.params.get(name).map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        };

        let (default_msg, error_type): (String, &str) = match error.code.as_ref() {
            "required" => ("field required".to_string(), "value_error.missing"),
            "range" => match (param("min"), param("max")) {
                (Some(min), Some(max)) => (
                    format!("ensure this value is between {} and {}", min, max),
                    "value_error.number.not_in_range",
                ),
                (Some(min), None) => (
                    format!("ensure this value is greater than or equal to {}", min),
                    "value_error.number.not_ge",
                ),
                (None, Some(max)) => (
                    format!("ensure this value is less than or equal to {}", max),
                    "value_error.number.not_le",
                ),
                (None, None) => ("value out of range".to_string(), "value_error.number"),
            },
            "length" => match param("min") {
                Some(min) => (
                    format!("ensure this value has at least {} characters", min),
                    "value_error.any_str.min_length",
                ),
                None => ("invalid length".to_string(), "value_error.any_str"),
            },
            other => (other.to_string(), "value_error"),
        };

        let msg = error
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or(default_msg);

        Self::new([location, field], msg, error_type)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation failed: {} field(s)", .0.len())]
    Validation(Vec<FieldViolation>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Moderation provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", true, true, LogLevel::Error),
        AppError::Validation(_) => (422, "VALIDATION_ERROR", false, false, LogLevel::Debug),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, false, LogLevel::Debug),
        AppError::PayloadTooLarge(_) => (413, "PAYLOAD_TOO_LARGE", false, false, LogLevel::Debug),
        AppError::Provider(_) => (502, "PROVIDER_ERROR", true, true, LogLevel::Warn),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, true, LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", true, true, LogLevel::Error),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Validation(_) => "Validation",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Provider(_) => "Provider",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Validation(violations) => violations
                .iter()
                .map(|v| format!("{}: {}", v.loc.join("."), v.msg))
                .collect::<Vec<_>>()
                .join("; "),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Provider(_) => "Moderation provider unavailable".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("No moderation requests found for user: a@x.com".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(
            err.client_message(),
            "No moderation requests found for user: a@x.com"
        );
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_validation() {
        let err = AppError::Validation(vec![FieldViolation::missing("query", "user")]);
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(err.client_message(), "query.user: field required");
    }

    #[test]
    fn test_provider_error_is_hidden_from_clients() {
        let err = AppError::Provider("401 invalid api key sk-...".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert!(err.is_sensitive());
        assert!(!err.client_message().contains("sk-"));
    }

    #[derive(Validate)]
    struct Probe {
        #[validate(required)]
        user: Option<String>,
        #[validate(range(min = 1, max = 100))]
        limit: i64,
    }

    #[test]
    fn test_violations_from_validator_errors() {
        let probe = Probe {
            user: None,
            limit: 500,
        };
        let errors = probe.validate().unwrap_err();
        let violations = FieldViolation::from_validation_errors("query", &errors);

        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].loc, vec!["query", "limit"]);
        assert_eq!(violations[0].msg, "ensure this value is between 1 and 100");
        assert_eq!(violations[1], FieldViolation::missing("query", "user"));
    }

    #[test]
    fn test_violation_serializes_type_field() {
        let json = serde_json::to_value(FieldViolation::missing("query", "user")).unwrap();
        assert_eq!(json["loc"], serde_json::json!(["query", "user"]));
        assert_eq!(json["type"], "value_error.missing");
    }
}
