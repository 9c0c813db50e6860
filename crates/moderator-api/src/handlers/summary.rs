use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::IntoResponse,
    Json,
};
use moderator_core::models::{
    AnalysisSummaryListResponse, AnalysisSummaryResponse, RequestFilter, SummaryListQuery,
};
use moderator_core::AppError;
use std::sync::Arc;

use crate::error::{ErrorResponse, HttpAppError, ValidatedQuery};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/summary/{request_id}",
    tag = "summary",
    params(
        ("request_id" = i64, Path, description = "Moderation request ID")
    ),
    responses(
        (status = 200, description = "Request with its result", body = AnalysisSummaryResponse),
        (status = 404, description = "Moderation request not found", body = ErrorResponse),
        (status = 422, description = "Request ID is not an integer", body = ErrorResponse)
    )
)]
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    request_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Path(request_id) = request_id?;

    let record = state
        .store
        .get_request(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Moderation request not found".to_string()))?;

    Ok(Json(AnalysisSummaryResponse::from(record)))
}

/// Page through requests, newest first.
#[utoipa::path(
    get,
    path = "/api/summary",
    tag = "summary",
    params(SummaryListQuery),
    responses(
        (status = 200, description = "One page of requests", body = AnalysisSummaryListResponse),
        (status = 422, description = "Invalid paging or filter value", body = ErrorResponse)
    )
)]
pub async fn list_summaries(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<SummaryListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let filter = RequestFilter {
        content_type: query.content_type,
        status: query.status,
        offset: query.skip,
        limit: query.limit,
    };

    let (total, records) = state.store.list_requests(&filter).await?;

    Ok(Json(AnalysisSummaryListResponse {
        total,
        summaries: records
            .into_iter()
            .map(AnalysisSummaryResponse::from)
            .collect(),
    }))
}
