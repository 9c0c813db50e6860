//! In-memory `ModerationStore`, mirroring the PostgreSQL semantics closely
//! enough for handler and service tests.

use chrono::Utc;
use moderator_core::models::{
    ModerationRecord, ModerationRequest, ModerationResult, NewModerationRequest,
    NewModerationResult, NotificationChannel, NotificationLog, NotificationStatus, RequestFilter,
    RequestStatus, UserRequestRow,
};
use moderator_core::AppError;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::moderation::ModerationStore;

#[derive(Default)]
struct MemoryState {
    next_request_id: i64,
    next_result_id: i64,
    next_notification_id: i64,
    requests: BTreeMap<i64, ModerationRequest>,
    results: HashMap<i64, ModerationResult>,
    notifications: Vec<NotificationLog>,
}

impl MemoryState {
    fn record(&self, request: &ModerationRequest) -> ModerationRecord {
        ModerationRecord {
            request: request.clone(),
            result: self.results.get(&request.id).cloned(),
        }
    }

    fn pending_mut(&mut self, id: i64) -> Result<&mut ModerationRequest, AppError> {
        match self.requests.get_mut(&id) {
            Some(request) if request.status == RequestStatus::Pending => Ok(request),
            _ => Err(AppError::InvalidInput(format!(
                "Moderation request {} is not pending",
                id
            ))),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryModerationRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryModerationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a request as-is (status, timestamps and all). Used to seed fixtures.
    pub async fn insert_request(
        &self,
        mut request: ModerationRequest,
        result: Option<NewModerationResult>,
    ) -> ModerationRequest {
        let mut state = self.state.lock().await;
        state.next_request_id += 1;
        request.id = state.next_request_id;

        if let Some(result) = result {
            state.next_result_id += 1;
            let stored = ModerationResult {
                id: state.next_result_id,
                request_id: request.id,
                classification: result.classification,
                confidence: result.confidence,
                reasoning: result.reasoning,
                provider_response: result.provider_response,
            };
            state.results.insert(request.id, stored);
        }

        state.requests.insert(request.id, request.clone());
        request
    }
}

#[async_trait::async_trait]
impl ModerationStore for InMemoryModerationRepository {
    async fn create_request(
        &self,
        request: NewModerationRequest,
    ) -> Result<ModerationRequest, AppError> {
        let mut state = self.state.lock().await;
        state.next_request_id += 1;

        let created = ModerationRequest {
            id: state.next_request_id,
            content_type: request.content_type,
            content_hash: request.content_hash,
            status: RequestStatus::Pending,
            user_email: request.user_email,
            content_id: request.content_id,
            failure_reason: None,
            created_at: Utc::now(),
        };
        state.requests.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get_request(&self, id: i64) -> Result<Option<ModerationRecord>, AppError> {
        let state = self.state.lock().await;
        Ok(state.requests.get(&id).map(|r| state.record(r)))
    }

    async fn complete_request(
        &self,
        id: i64,
        result: NewModerationResult,
    ) -> Result<ModerationResult, AppError> {
        let mut state = self.state.lock().await;
        state.pending_mut(id)?.status = RequestStatus::Completed;

        state.next_result_id += 1;
        let stored = ModerationResult {
            id: state.next_result_id,
            request_id: id,
            classification: result.classification,
            confidence: result.confidence,
            reasoning: result.reasoning,
            provider_response: result.provider_response,
        };
        state.results.insert(id, stored.clone());

        Ok(stored)
    }

    async fn fail_request(&self, id: i64, reason: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        let request = state.pending_mut(id)?;
        request.status = RequestStatus::Failed;
        request.failure_reason = Some(reason.to_string());
        Ok(())
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<(i64, Vec<ModerationRecord>), AppError> {
        let state = self.state.lock().await;

        let mut matching: Vec<&ModerationRequest> = state
            .requests
            .values()
            .filter(|r| filter.content_type.map_or(true, |ct| r.content_type == ct))
            .filter(|r| filter.status.map_or(true, |st| r.status == st))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .map(|r| state.record(r))
            .collect();

        Ok((total, page))
    }

    async fn user_request_rows(&self, user_email: &str) -> Result<Vec<UserRequestRow>, AppError> {
        let state = self.state.lock().await;

        let mut rows: Vec<UserRequestRow> = state
            .requests
            .values()
            .filter(|r| r.user_email.as_deref() == Some(user_email))
            .map(|r| {
                let result = state.results.get(&r.id);
                UserRequestRow {
                    content_type: r.content_type,
                    status: r.status,
                    created_at: r.created_at,
                    classification: result.map(|m| m.classification),
                    confidence: result.and_then(|m| m.confidence),
                }
            })
            .collect();
        rows.sort_by_key(|r| r.created_at);

        Ok(rows)
    }

    async fn record_notification(
        &self,
        request_id: i64,
        channel: NotificationChannel,
        status: NotificationStatus,
    ) -> Result<NotificationLog, AppError> {
        let mut state = self.state.lock().await;
        if !state.requests.contains_key(&request_id) {
            return Err(AppError::NotFound(format!(
                "Moderation request {} not found",
                request_id
            )));
        }

        state.next_notification_id += 1;
        let log = NotificationLog {
            id: state.next_notification_id,
            request_id,
            channel,
            status,
            sent_at: Utc::now(),
        };
        state.notifications.push(log.clone());

        Ok(log)
    }

    async fn list_notifications(&self, request_id: i64) -> Result<Vec<NotificationLog>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
