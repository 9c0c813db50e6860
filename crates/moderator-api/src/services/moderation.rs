//! Submission pipeline: persist, classify, record the outcome, alert.

use chrono::Utc;
use moderator_core::hashing::{content_hash, text_hash};
use moderator_core::models::{
    ContentType, ModerationRequest, NewModerationRequest, NewModerationResult, RequestStatus,
};
use moderator_core::AppError;
use moderator_db::ModerationStore;
use moderator_providers::{ModerationAnalysis, ModerationProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::notification::{ModerationAlert, NotificationService};

#[derive(Debug, Clone)]
pub enum SubmittedContent {
    Text(String),
    Image { bytes: Vec<u8>, content_type: String },
}

impl SubmittedContent {
    pub fn content_type(&self) -> ContentType {
        match self {
            SubmittedContent::Text(_) => ContentType::Text,
            SubmittedContent::Image { .. } => ContentType::Image,
        }
    }

    fn hash(&self) -> String {
        match self {
            SubmittedContent::Text(text) => text_hash(text),
            SubmittedContent::Image { bytes, .. } => content_hash(bytes),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SubmittedContent::Text(_) => "Text",
            SubmittedContent::Image { .. } => "Image",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub content: SubmittedContent,
    pub user_email: Option<String>,
    pub content_id: Option<String>,
}

impl Submission {
    /// `user_email` is an exact-match analytics key, so identifiers are kept
    /// verbatim. Only empty values are dropped, on every route alike.
    pub fn new(
        content: SubmittedContent,
        user_email: Option<String>,
        content_id: Option<String>,
    ) -> Self {
        Self {
            content,
            user_email: user_email.filter(|v| !v.is_empty()),
            content_id: content_id.filter(|v| !v.is_empty()),
        }
    }
}

/// Terminal state of a submission as reported to the client.
#[derive(Debug, Clone)]
pub struct ModerationOutcome {
    pub request_id: i64,
    pub status: RequestStatus,
    pub message: String,
}

#[derive(Clone)]
pub struct ModerationService {
    store: Arc<dyn ModerationStore>,
    provider: Arc<dyn ModerationProvider>,
    notifications: NotificationService,
    provider_timeout: Duration,
}

impl ModerationService {
    pub fn new(
        store: Arc<dyn ModerationStore>,
        provider: Arc<dyn ModerationProvider>,
        notifications: NotificationService,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            notifications,
            provider_timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run one submission to a terminal state.
    ///
    /// Provider failures mark the request `failed` and are reported in the
    /// outcome; only storage errors are returned as `Err`. Once the pending row
    /// exists the pipeline runs on its own task, so a dropped caller (client
    /// disconnect, request timeout) cannot leave it `pending`.
    #[tracing::instrument(
        skip(self, submission),
        fields(
            content_type = %submission.content.content_type(),
            provider = %self.provider.name(),
            request_id = tracing::field::Empty
        )
    )]
    pub async fn submit(&self, submission: Submission) -> Result<ModerationOutcome, AppError> {
        let Submission {
            content,
            user_email,
            content_id,
        } = submission;

        let request = self
            .store
            .create_request(NewModerationRequest {
                content_type: content.content_type(),
                content_hash: content.hash(),
                user_email,
                content_id,
            })
            .await?;
        tracing::Span::current().record("request_id", request.id);

        let request_id = request.id;
        let service = self.clone();
        tokio::spawn(
            async move { service.process(request, content).await }
                .instrument(tracing::Span::current()),
        )
        .await
        .map_err(|e| {
            AppError::Internal(format!(
                "Moderation task for request {} did not finish: {}",
                request_id, e
            ))
        })?
    }

    async fn process(
        &self,
        request: ModerationRequest,
        content: SubmittedContent,
    ) -> Result<ModerationOutcome, AppError> {
        match self.analyze(&content).await {
            Ok(analysis) => self.complete(&request, &content, analysis).await,
            Err(reason) => {
                self.store.fail_request(request.id, &reason).await?;
                Ok(ModerationOutcome {
                    request_id: request.id,
                    status: RequestStatus::Failed,
                    message: format!("{} moderation failed: {}", content.label(), reason),
                })
            }
        }
    }

    /// Call the provider under the configured timeout.
    ///
    /// The returned reason is shown to clients and stored on the request, so it
    /// is only the outermost error message. The full chain goes to the log.
    async fn analyze(&self, content: &SubmittedContent) -> Result<ModerationAnalysis, String> {
        let call = async {
            match content {
                SubmittedContent::Text(text) => self.provider.analyze_text(text).await,
                SubmittedContent::Image {
                    bytes,
                    content_type,
                } => self.provider.analyze_image(bytes, content_type).await,
            }
        };

        match tokio::time::timeout(self.provider_timeout, call).await {
            Ok(Ok(analysis)) => Ok(analysis),
            Ok(Err(e)) => {
                tracing::warn!(error = %format_args!("{:#}", e), "Moderation provider failed");
                Err(e.to_string())
            }
            Err(_) => {
                let reason = format!(
                    "Provider timed out after {}s",
                    self.provider_timeout.as_secs()
                );
                tracing::warn!(reason = %reason, "Moderation provider failed");
                Err(reason)
            }
        }
    }

    async fn complete(
        &self,
        request: &ModerationRequest,
        content: &SubmittedContent,
        analysis: ModerationAnalysis,
    ) -> Result<ModerationOutcome, AppError> {
        let classification = analysis.classification;
        let stored = self
            .store
            .complete_request(
                request.id,
                NewModerationResult {
                    classification,
                    confidence: Some(analysis.confidence),
                    reasoning: Some(analysis.reasoning.clone()),
                    provider_response: analysis.raw_response.clone(),
                },
            )
            .await;
        let result = match stored {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(request_id = request.id, error = %e, "Failed to store moderation result");
                if let Err(fail_err) = self
                    .store
                    .fail_request(request.id, "Failed to store moderation result")
                    .await
                {
                    tracing::error!(
                        request_id = request.id,
                        error = %fail_err,
                        "Failed to mark request as failed"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            request_id = request.id,
            classification = %classification,
            confidence = analysis.confidence,
            "Moderation completed"
        );

        if analysis.is_inappropriate() && self.notifications.has_channels() {
            let alert = ModerationAlert {
                request_id: request.id,
                content_type: content.content_type(),
                classification,
                confidence: analysis.confidence,
                reasoning: analysis.reasoning,
                flagged_categories: analysis.flagged_categories,
                detected_at: Utc::now(),
            };
            self.notifications.dispatch(&self.store, &alert).await;
        }

        Ok(ModerationOutcome {
            request_id: result.request_id,
            status: RequestStatus::Completed,
            message: format!(
                "{} moderation completed. Classification: {}",
                content.label(),
                classification
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moderator_core::models::{Classification, NotificationChannel, NotificationStatus};
    use moderator_db::InMemoryModerationRepository;
    use moderator_providers::KeywordProvider;

    #[derive(Debug)]
    struct SlowProvider;

    #[async_trait::async_trait]
    impl ModerationProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn analyze_text(&self, _text: &str) -> anyhow::Result<ModerationAnalysis> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ModerationAnalysis::new(Classification::Appropriate, 1.0, ""))
        }

        async fn analyze_image(
            &self,
            _image: &[u8],
            _content_type: &str,
        ) -> anyhow::Result<ModerationAnalysis> {
            Err(anyhow::anyhow!("upstream returned 500"))
        }
    }

    /// Answers after a fixed delay.
    #[derive(Debug)]
    struct DelayedProvider(Duration);

    #[async_trait::async_trait]
    impl ModerationProvider for DelayedProvider {
        fn name(&self) -> &str {
            "delayed"
        }

        async fn analyze_text(&self, _text: &str) -> anyhow::Result<ModerationAnalysis> {
            tokio::time::sleep(self.0).await;
            Ok(ModerationAnalysis::new(Classification::Appropriate, 0.9, "ok"))
        }

        async fn analyze_image(
            &self,
            _image: &[u8],
            _content_type: &str,
        ) -> anyhow::Result<ModerationAnalysis> {
            tokio::time::sleep(self.0).await;
            Ok(ModerationAnalysis::new(Classification::Appropriate, 0.9, "ok"))
        }
    }

    /// Fails with a credential buried in the error chain, like a transport
    /// error that prints the request URL.
    #[derive(Debug)]
    struct UnreachableProvider;

    #[async_trait::async_trait]
    impl ModerationProvider for UnreachableProvider {
        fn name(&self) -> &str {
            "unreachable"
        }

        async fn analyze_text(&self, _text: &str) -> anyhow::Result<ModerationAnalysis> {
            use anyhow::Context;
            Err(anyhow::anyhow!(
                "error sending request for url (http://127.0.0.1:1/models?key=SECRET-KEY-123)"
            ))
            .context("Failed to send request to upstream")
        }

        async fn analyze_image(
            &self,
            image: &[u8],
            _content_type: &str,
        ) -> anyhow::Result<ModerationAnalysis> {
            self.analyze_text(&String::from_utf8_lossy(image)).await
        }
    }

    fn service(
        store: &InMemoryModerationRepository,
        provider: Arc<dyn ModerationProvider>,
        notifications: NotificationService,
    ) -> ModerationService {
        ModerationService::new(
            Arc::new(store.clone()),
            provider,
            notifications,
            Duration::from_millis(200),
        )
    }

    fn text(body: &str) -> Submission {
        Submission {
            content: SubmittedContent::Text(body.to_string()),
            user_email: Some("a@x.com".to_string()),
            content_id: Some("post-1".to_string()),
        }
    }

    #[test]
    fn submission_keeps_identifiers_verbatim() {
        let submission = Submission::new(
            SubmittedContent::Text("hi".to_string()),
            Some(" a@x.com ".to_string()),
            Some(String::new()),
        );
        assert_eq!(submission.user_email.as_deref(), Some(" a@x.com "));
        assert_eq!(submission.content_id, None);
    }

    #[tokio::test]
    async fn clean_text_completes_with_result() {
        let store = InMemoryModerationRepository::new();
        let service = service(
            &store,
            Arc::new(KeywordProvider::new()),
            NotificationService::default(),
        );

        let outcome = service.submit(text("Have a lovely day")).await.unwrap();
        assert_eq!(outcome.status, RequestStatus::Completed);
        assert_eq!(
            outcome.message,
            "Text moderation completed. Classification: appropriate"
        );

        let record = store.get_request(outcome.request_id).await.unwrap().unwrap();
        assert_eq!(record.request.status, RequestStatus::Completed);
        assert_eq!(record.request.content_hash, text_hash("Have a lovely day"));
        assert_eq!(record.request.user_email.as_deref(), Some("a@x.com"));
        let result = record.result.unwrap();
        assert_eq!(result.classification, Classification::Appropriate);
        assert_eq!(result.confidence, Some(0.85));
    }

    #[tokio::test]
    async fn provider_error_marks_request_failed() {
        let store = InMemoryModerationRepository::new();
        let service = service(&store, Arc::new(SlowProvider), NotificationService::default());

        let outcome = service
            .submit(Submission {
                content: SubmittedContent::Image {
                    bytes: vec![1, 2, 3],
                    content_type: "image/png".to_string(),
                },
                user_email: None,
                content_id: None,
            })
            .await
            .unwrap();

        assert_eq!(outcome.status, RequestStatus::Failed);
        assert_eq!(
            outcome.message,
            "Image moderation failed: upstream returned 500"
        );
        let record = store.get_request(outcome.request_id).await.unwrap().unwrap();
        assert_eq!(record.request.status, RequestStatus::Failed);
        assert_eq!(
            record.request.failure_reason.as_deref(),
            Some("upstream returned 500")
        );
        assert!(record.result.is_none());
    }

    #[tokio::test]
    async fn provider_timeout_marks_request_failed() {
        let store = InMemoryModerationRepository::new();
        let service = service(&store, Arc::new(SlowProvider), NotificationService::default());

        let outcome = service.submit(text("hello")).await.unwrap();
        assert_eq!(outcome.status, RequestStatus::Failed);
        assert!(outcome.message.contains("timed out"));
    }

    #[tokio::test]
    async fn failure_reason_hides_provider_error_chain() {
        let store = InMemoryModerationRepository::new();
        let service = service(
            &store,
            Arc::new(UnreachableProvider),
            NotificationService::default(),
        );

        let outcome = service.submit(text("hello")).await.unwrap();
        assert_eq!(outcome.status, RequestStatus::Failed);
        assert_eq!(
            outcome.message,
            "Text moderation failed: Failed to send request to upstream"
        );
        assert!(!outcome.message.contains("SECRET-KEY-123"));

        let record = store.get_request(outcome.request_id).await.unwrap().unwrap();
        let reason = record.request.failure_reason.unwrap();
        assert!(!reason.contains("SECRET-KEY-123"));
    }

    #[tokio::test]
    async fn dropped_submission_still_reaches_terminal_state() {
        let store = InMemoryModerationRepository::new();
        let service = service(
            &store,
            Arc::new(DelayedProvider(Duration::from_millis(100))),
            NotificationService::default(),
        );

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), service.submit(text("hello"))).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;

        let record = store.get_request(1).await.unwrap().unwrap();
        assert_eq!(record.request.status, RequestStatus::Completed);
        assert!(record.result.is_some());
    }

    #[tokio::test]
    async fn inappropriate_text_logs_slack_attempt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/slack")
            .with_status(500)
            .create_async()
            .await;

        let store = InMemoryModerationRepository::new();
        let notifications = NotificationService::new(
            Some(crate::services::SlackNotifier::new(format!("{}/slack", server.url())).unwrap()),
            None,
        );
        let service = service(&store, Arc::new(KeywordProvider::new()), notifications);

        let outcome = service.submit(text("this is a threat")).await.unwrap();
        mock.assert_async().await;
        assert_eq!(outcome.status, RequestStatus::Completed);

        let logs = store.list_notifications(outcome.request_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].channel, NotificationChannel::Slack);
        assert_eq!(logs[0].status, NotificationStatus::Failed);
    }
}
