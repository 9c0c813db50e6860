use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{Classification, ContentType, RequestStatus};

/// Query parameters for the per-user analytics summary.
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// User email to aggregate over (exact match)
    #[validate(required, length(min = 1))]
    #[param(example = "a@x.com")]
    pub user: Option<String>,
}

/// Aggregate statistics over every request a user submitted.
///
/// Breakdowns only carry keys with a non-zero count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsSummary {
    pub user_email: String,
    pub total_requests: i64,
    #[schema(value_type = Object, example = json!({"text": 1, "image": 1}))]
    pub content_type_breakdown: BTreeMap<ContentType, i64>,
    #[schema(value_type = Object, example = json!({"appropriate": 1}))]
    pub classification_breakdown: BTreeMap<Classification, i64>,
    #[schema(value_type = Object, example = json!({"completed": 1, "failed": 1}))]
    pub status_breakdown: BTreeMap<RequestStatus, i64>,
    pub average_confidence: Option<f64>,
    pub first_request_date: Option<DateTime<Utc>>,
    pub last_request_date: Option<DateTime<Utc>>,
}
