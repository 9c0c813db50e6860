//! HTTP error response conversion
//!
//! **Handler pattern:** return `Result<impl IntoResponse, HttpAppError>` and use `?`
//! on anything convertible into `AppError`, so every failure renders with the same
//! status, body and logging.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use moderator_core::{AppError, ErrorMetadata, FieldViolation, LogLevel};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// `detail` is a plain message, or the list of violations for 422 responses.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Violations(Vec<FieldViolation>),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(value_type = Object)]
    pub detail: ErrorDetail,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse (orphan rule: both
/// `IntoResponse` and `AppError` live in other crates).
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Pull the field name out of serde's "missing field `name`" message.
fn missing_field_name(message: &str) -> Option<&str> {
    let start = message.find("missing field `")? + "missing field `".len();
    let rest = &message[start..];
    let end = rest.find('`')?;
    Some(&rest[..end])
}

fn deserialize_violation(location: &str, body_text: &str) -> FieldViolation {
    match missing_field_name(body_text) {
        Some(field) => FieldViolation::missing(location, field),
        None => FieldViolation::new([location], body_text, "type_error"),
    }
}

/// Body deserialization failures are reported like validation failures.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        let violation = match &rejection {
            JsonRejection::JsonSyntaxError(_) => FieldViolation::new(
                ["body"],
                rejection.body_text(),
                "value_error.jsondecode",
            ),
            JsonRejection::MissingJsonContentType(_) => FieldViolation::new(
                ["body"],
                "Expected request with `Content-Type: application/json`",
                "value_error.content_type",
            ),
            _ => deserialize_violation("body", &rejection.body_text()),
        };
        HttpAppError(AppError::Validation(vec![violation]))
    }
}

impl From<QueryRejection> for HttpAppError {
    fn from(rejection: QueryRejection) -> Self {
        HttpAppError(AppError::Validation(vec![deserialize_violation(
            "query",
            &rejection.body_text(),
        )]))
    }
}

impl From<PathRejection> for HttpAppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(rejection = %rejection.body_text(), "Path rejected");
        HttpAppError(AppError::Validation(vec![FieldViolation::new(
            ["path", "request_id"],
            "value is not a valid integer",
            "type_error.integer",
        )]))
    }
}

/// JSON body extractor that deserializes, then runs `validator` rules.
/// Both kinds of failure come back as a 422 with located violations.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        inner.validate().map_err(|errors| {
            HttpAppError(AppError::Validation(FieldViolation::from_validation_errors(
                "body", &errors,
            )))
        })?;
        Ok(ValidatedJson(inner))
    }
}

/// Query string counterpart of [`ValidatedJson`].
#[derive(Debug, Clone, Copy)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(inner) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(HttpAppError::from)?;
        inner.validate().map_err(|errors| {
            HttpAppError(AppError::Validation(FieldViolation::from_validation_errors(
                "query", &errors,
            )))
        })?;
        Ok(ValidatedQuery(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(
                error = %error.detailed_message(),
                error_type = error_type,
                "Error occurred"
            );
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl HttpAppError {
    fn to_body(&self, is_production: bool) -> ErrorResponse {
        let app_error = &self.0;
        let detail = match app_error {
            AppError::Validation(violations) => ErrorDetail::Violations(violations.clone()),
            other => ErrorDetail::Message(other.client_message()),
        };
        let error_type = if is_production || app_error.is_sensitive() {
            None
        } else {
            Some(app_error.error_type().to_string())
        };

        ErrorResponse {
            detail,
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            error_type,
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(&self.0);

        (status, Json(self.to_body(is_production_env()))).into_response()
    }
}
