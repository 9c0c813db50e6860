use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{Classification, ContentType, ModerationRecord, RequestStatus};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModerationResultDetail {
    pub classification: Classification,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
}

/// A request and its result as served by the summary endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisSummaryResponse {
    pub request_id: i64,
    pub content_type: ContentType,
    pub content_hash: String,
    pub status: RequestStatus,
    pub user_email: Option<String>,
    pub content_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub result: Option<ModerationResultDetail>,
}

impl From<ModerationRecord> for AnalysisSummaryResponse {
    fn from(record: ModerationRecord) -> Self {
        let ModerationRecord { request, result } = record;
        AnalysisSummaryResponse {
            request_id: request.id,
            content_type: request.content_type,
            content_hash: request.content_hash,
            status: request.status,
            user_email: request.user_email,
            content_id: request.content_id,
            failure_reason: request.failure_reason,
            created_at: request.created_at,
            result: result.map(|r| ModerationResultDetail {
                classification: r.classification,
                confidence: r.confidence,
                reasoning: r.reasoning,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisSummaryListResponse {
    pub total: i64,
    pub summaries: Vec<AnalysisSummaryResponse>,
}

fn default_limit() -> i64 {
    10
}

/// Paging and filters for `GET /api/summary`.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryListQuery {
    /// Number of records to skip (min: 0)
    #[serde(default)]
    #[validate(range(min = 0))]
    #[param(minimum = 0, example = 0)]
    pub skip: i64,

    /// Maximum number of records to return (1 to 100)
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    #[param(minimum = 1, maximum = 100, example = 10)]
    pub limit: i64,

    pub content_type: Option<ContentType>,

    pub status: Option<RequestStatus>,
}

impl Default for SummaryListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
            content_type: None,
            status: None,
        }
    }
}
