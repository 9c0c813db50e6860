//! OpenAPI documentation served at `/api/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::constants::SERVICE_VERSION;
use crate::error;
use crate::handlers;
use moderator_core::models;

/// Returns the OpenAPI document with the crate version filled in.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();
    spec.info.version = SERVICE_VERSION.to_string();
    spec
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Smart Content Moderator",
        description = "Classifies user-submitted text and images as appropriate or inappropriate, records every request and its result, alerts on inappropriate content and reports per-user usage analytics."
    ),
    paths(
        handlers::text_moderation::moderate_text,
        handlers::image_moderation::moderate_image,
        handlers::summary::get_summary,
        handlers::summary::list_summaries,
        handlers::analytics::get_user_summary,
    ),
    components(
        schemas(
            models::TextModerationRequest,
            models::ModerationResponse,
            models::ContentType,
            models::RequestStatus,
            models::Classification,
            models::ModerationResultDetail,
            models::AnalysisSummaryResponse,
            models::AnalysisSummaryListResponse,
            models::AnalyticsSummary,
            handlers::image_moderation::ImageModerationForm,
            error::ErrorResponse,
            moderator_core::FieldViolation,
        )
    ),
    tags(
        (name = "moderation", description = "Submit text or images for classification"),
        (name = "summary", description = "Look up stored requests and results"),
        (name = "analytics", description = "Per-user usage statistics"),
    )
)]
pub struct ApiDoc;
