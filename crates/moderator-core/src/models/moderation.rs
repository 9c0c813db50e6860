use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// Kind of content submitted for moderation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentType::Text),
            "image" => Ok(ContentType::Image),
            _ => Err(anyhow::anyhow!("Invalid content type: {}", s)),
        }
    }
}

/// Lifecycle of a moderation request: `pending` until the provider answers,
/// then `completed` or `failed` (terminal).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "completed" => Ok(RequestStatus::Completed),
            "failed" => Ok(RequestStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid request status: {}", s)),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Appropriate,
    Inappropriate,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Appropriate => "appropriate",
            Classification::Inappropriate => "inappropriate",
        }
    }
}

impl Display for Classification {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appropriate" => Ok(Classification::Appropriate),
            "inappropriate" => Ok(Classification::Inappropriate),
            _ => Err(anyhow::anyhow!("Invalid classification: {}", s)),
        }
    }
}

/// A stored moderation request row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ModerationRequest {
    pub id: i64,
    pub content_type: ContentType,
    pub content_hash: String,
    pub status: RequestStatus,
    pub user_email: Option<String>,
    pub content_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a request; it always starts out `pending`.
#[derive(Debug, Clone)]
pub struct NewModerationRequest {
    pub content_type: ContentType,
    pub content_hash: String,
    pub user_email: Option<String>,
    pub content_id: Option<String>,
}

/// A stored moderation result row (at most one per request).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ModerationResult {
    pub id: i64,
    pub request_id: i64,
    pub classification: Classification,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub provider_response: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewModerationResult {
    pub classification: Classification,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub provider_response: Option<serde_json::Value>,
}

/// A request together with its result, if one was attached.
#[derive(Debug, Clone)]
pub struct ModerationRecord {
    pub request: ModerationRequest,
    pub result: Option<ModerationResult>,
}

/// One row of the per-user analytics join: a request and the result columns
/// that matter for aggregation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserRequestRow {
    pub content_type: ContentType,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub classification: Option<Classification>,
    pub confidence: Option<f64>,
}

/// Filters and paging for request listings.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub content_type: Option<ContentType>,
    pub status: Option<RequestStatus>,
    pub offset: i64,
    pub limit: i64,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Slack,
    Email,
}

impl Display for NotificationChannel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            NotificationChannel::Slack => write!(f, "slack"),
            NotificationChannel::Email => write!(f, "email"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

impl Display for NotificationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            NotificationStatus::Sent => write!(f, "sent"),
            NotificationStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct NotificationLog {
    pub id: i64,
    pub request_id: i64,
    pub channel: NotificationChannel,
    pub status: NotificationStatus,
    pub sent_at: DateTime<Utc>,
}
