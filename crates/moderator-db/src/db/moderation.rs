use chrono::{DateTime, Utc};
use moderator_core::models::{
    Classification, ContentType, ModerationRecord, ModerationRequest, ModerationResult,
    NewModerationRequest, NewModerationResult, NotificationChannel, NotificationLog,
    NotificationStatus, RequestFilter, RequestStatus, UserRequestRow,
};
use moderator_core::AppError;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Trait for moderation persistence.
///
/// A request starts `pending` and moves exactly once to `completed` (with a
/// result) or `failed` (with a reason and no result).
#[async_trait::async_trait]
pub trait ModerationStore: Send + Sync {
    /// Insert a new `pending` request.
    async fn create_request(
        &self,
        request: NewModerationRequest,
    ) -> Result<ModerationRequest, AppError>;

    /// Fetch a request together with its result, if any.
    async fn get_request(&self, id: i64) -> Result<Option<ModerationRecord>, AppError>;

    /// Attach the result and mark the request `completed` atomically.
    /// Fails with `InvalidInput` if the request is not pending.
    async fn complete_request(
        &self,
        id: i64,
        result: NewModerationResult,
    ) -> Result<ModerationResult, AppError>;

    /// Mark a pending request `failed` with the provider's error text.
    async fn fail_request(&self, id: i64, reason: &str) -> Result<(), AppError>;

    /// Total matching the filter plus one page, newest first.
    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<(i64, Vec<ModerationRecord>), AppError>;

    /// All requests of a user joined with their result columns (exact email match).
    async fn user_request_rows(&self, user_email: &str) -> Result<Vec<UserRequestRow>, AppError>;

    async fn record_notification(
        &self,
        request_id: i64,
        channel: NotificationChannel,
        status: NotificationStatus,
    ) -> Result<NotificationLog, AppError>;

    async fn list_notifications(&self, request_id: i64) -> Result<Vec<NotificationLog>, AppError>;

    /// Cheap connectivity check for health endpoints.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Flattened `moderation_requests LEFT JOIN moderation_results` row.
#[derive(sqlx::FromRow)]
struct RecordRow {
    id: i64,
    content_type: ContentType,
    content_hash: String,
    status: RequestStatus,
    user_email: Option<String>,
    content_id: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    result_id: Option<i64>,
    classification: Option<Classification>,
    confidence: Option<f64>,
    reasoning: Option<String>,
    provider_response: Option<serde_json::Value>,
}

impl From<RecordRow> for ModerationRecord {
    fn from(row: RecordRow) -> Self {
        let result = match (row.result_id, row.classification) {
            (Some(result_id), Some(classification)) => Some(ModerationResult {
                id: result_id,
                request_id: row.id,
                classification,
                confidence: row.confidence,
                reasoning: row.reasoning,
                provider_response: row.provider_response,
            }),
            _ => None,
        };

        ModerationRecord {
            request: ModerationRequest {
                id: row.id,
                content_type: row.content_type,
                content_hash: row.content_hash,
                status: row.status,
                user_email: row.user_email,
                content_id: row.content_id,
                failure_reason: row.failure_reason,
                created_at: row.created_at,
            },
            result,
        }
    }
}

const RECORD_SELECT: &str = r#"
    SELECT r.id, r.content_type, r.content_hash, r.status, r.user_email, r.content_id,
           r.failure_reason, r.created_at,
           m.id AS result_id, m.classification, m.confidence, m.reasoning, m.provider_response
    FROM moderation_requests r
    LEFT JOIN moderation_results m ON m.request_id = r.id
"#;

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &RequestFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(content_type) = filter.content_type {
        builder.push(" AND r.content_type = ").push_bind(content_type);
    }
    if let Some(status) = filter.status {
        builder.push(" AND r.status = ").push_bind(status);
    }
}

#[derive(Clone)]
pub struct PostgresModerationRepository {
    pool: PgPool,
}

impl PostgresModerationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ModerationStore for PostgresModerationRepository {
    #[tracing::instrument(skip(self, request), fields(
        db.table = "moderation_requests",
        db.operation = "insert",
        content_type = %request.content_type
    ))]
    async fn create_request(
        &self,
        request: NewModerationRequest,
    ) -> Result<ModerationRequest, AppError> {
        let created = sqlx::query_as::<Postgres, ModerationRequest>(
            r#"
            INSERT INTO moderation_requests (content_type, content_hash, status, user_email, content_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, content_type, content_hash, status, user_email, content_id,
                      failure_reason, created_at
            "#,
        )
        .bind(request.content_type)
        .bind(&request.content_hash)
        .bind(RequestStatus::Pending)
        .bind(&request.user_email)
        .bind(&request.content_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "moderation_requests", db.operation = "select"))]
    async fn get_request(&self, id: i64) -> Result<Option<ModerationRecord>, AppError> {
        let sql = format!("{} WHERE r.id = $1", RECORD_SELECT);
        let row = sqlx::query_as::<Postgres, RecordRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ModerationRecord::from))
    }

    #[tracing::instrument(skip(self, result), fields(
        db.table = "moderation_results",
        db.operation = "insert",
        classification = %result.classification
    ))]
    async fn complete_request(
        &self,
        id: i64,
        result: NewModerationResult,
    ) -> Result<ModerationResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE moderation_requests SET status = $2 WHERE id = $1 AND status = $3",
        )
        .bind(id)
        .bind(RequestStatus::Completed)
        .bind(RequestStatus::Pending)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::InvalidInput(format!(
                "Moderation request {} is not pending",
                id
            )));
        }

        let stored = sqlx::query_as::<Postgres, ModerationResult>(
            r#"
            INSERT INTO moderation_results (request_id, classification, confidence, reasoning, provider_response)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, request_id, classification, confidence, reasoning, provider_response
            "#,
        )
        .bind(id)
        .bind(result.classification)
        .bind(result.confidence)
        .bind(&result.reasoning)
        .bind(&result.provider_response)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(stored)
    }

    #[tracing::instrument(skip(self, reason), fields(db.table = "moderation_requests", db.operation = "update"))]
    async fn fail_request(&self, id: i64, reason: &str) -> Result<(), AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE moderation_requests
            SET status = $2, failure_reason = $3
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(id)
        .bind(RequestStatus::Failed)
        .bind(reason)
        .bind(RequestStatus::Pending)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::InvalidInput(format!(
                "Moderation request {} is not pending",
                id
            )));
        }

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "moderation_requests", db.operation = "select"))]
    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<(i64, Vec<ModerationRecord>), AppError> {
        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM moderation_requests r");
        push_filters(&mut count_query, filter);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page_query = QueryBuilder::<Postgres>::new(RECORD_SELECT);
        push_filters(&mut page_query, filter);
        page_query
            .push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows = page_query
            .build_query_as::<RecordRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((total, rows.into_iter().map(ModerationRecord::from).collect()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "moderation_requests", db.operation = "aggregate"))]
    async fn user_request_rows(&self, user_email: &str) -> Result<Vec<UserRequestRow>, AppError> {
        let rows = sqlx::query_as::<Postgres, UserRequestRow>(
            r#"
            SELECT r.content_type, r.status, r.created_at, m.classification, m.confidence
            FROM moderation_requests r
            LEFT JOIN moderation_results m ON m.request_id = r.id
            WHERE r.user_email = $1
            ORDER BY r.created_at ASC
            "#,
        )
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "notification_logs", db.operation = "insert"))]
    async fn record_notification(
        &self,
        request_id: i64,
        channel: NotificationChannel,
        status: NotificationStatus,
    ) -> Result<NotificationLog, AppError> {
        let log = sqlx::query_as::<Postgres, NotificationLog>(
            r#"
            INSERT INTO notification_logs (request_id, channel, status)
            VALUES ($1, $2, $3)
            RETURNING id, request_id, channel, status, sent_at
            "#,
        )
        .bind(request_id)
        .bind(channel)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }

    #[tracing::instrument(skip(self), fields(db.table = "notification_logs", db.operation = "select"))]
    async fn list_notifications(&self, request_id: i64) -> Result<Vec<NotificationLog>, AppError> {
        let logs = sqlx::query_as::<Postgres, NotificationLog>(
            r#"
            SELECT id, request_id, channel, status, sent_at
            FROM notification_logs
            WHERE request_id = $1
            ORDER BY sent_at ASC, id ASC
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
