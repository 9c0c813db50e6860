use axum::{extract::State, response::IntoResponse, Json};
use moderator_core::models::{ModerationResponse, TextModerationRequest};
use std::sync::Arc;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::{Submission, SubmittedContent};
use crate::state::AppState;

/// Classify a piece of text.
///
/// The request is stored before the provider is called. A provider failure
/// still answers 200, with `status: failed` and the reason in `message`.
#[utoipa::path(
    post,
    path = "/api/text/moderate",
    tag = "moderation",
    request_body = TextModerationRequest,
    responses(
        (status = 200, description = "Moderation finished (completed or failed)", body = ModerationResponse),
        (status = 422, description = "Missing or empty text", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn moderate_text(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<TextModerationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let outcome = state
        .moderation
        .submit(Submission::new(
            SubmittedContent::Text(payload.text),
            payload.user_email,
            payload.content_id,
        ))
        .await?;

    Ok(Json(ModerationResponse {
        request_id: outcome.request_id,
        status: outcome.status,
        message: outcome.message,
    }))
}
