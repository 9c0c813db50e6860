use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::RequestStatus;

/// Body of `POST /api/text/moderate`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TextModerationRequest {
    /// Text to classify
    #[validate(length(min = 1))]
    #[schema(example = "Have a lovely day")]
    pub text: String,
    /// Caller-side identifier of the content
    #[serde(default)]
    pub content_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

/// Response to a text or image submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModerationResponse {
    pub request_id: i64,
    pub status: RequestStatus,
    #[schema(example = "Text moderation completed. Classification: appropriate")]
    pub message: String,
}
