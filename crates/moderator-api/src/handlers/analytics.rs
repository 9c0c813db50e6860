use axum::{extract::State, response::IntoResponse, Json};
use moderator_core::analytics::summarize;
use moderator_core::models::{AnalyticsQuery, AnalyticsSummary};
use moderator_core::{AppError, FieldViolation};
use std::sync::Arc;

use crate::error::{ErrorResponse, HttpAppError, ValidatedQuery};
use crate::state::AppState;

/// Aggregate every request a user has submitted.
///
/// Users with no requests get a 404 rather than an all-zero summary.
#[utoipa::path(
    get,
    path = "/api/v1/analytics/summary",
    tag = "analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Usage summary for the user", body = AnalyticsSummary),
        (status = 404, description = "No moderation requests for the user", body = ErrorResponse),
        (status = 422, description = "Missing or empty user", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query))]
pub async fn get_user_summary(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<AnalyticsQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = query
        .user
        .ok_or_else(|| AppError::Validation(vec![FieldViolation::missing("query", "user")]))?;

    let rows = state.store.user_request_rows(&user).await?;
    let summary = summarize(&user, &rows).ok_or_else(|| {
        AppError::NotFound(format!("No moderation requests found for user: {}", user))
    })?;

    tracing::debug!(total_requests = summary.total_requests, "Analytics summary built");
    Ok(Json(summary))
}
