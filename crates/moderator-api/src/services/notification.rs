//! Alert fan-out for inappropriate content.
//!
//! Each configured channel is attempted once and every attempt is written to
//! the notification log. Delivery failures never fail the submission.

use chrono::{DateTime, Utc};
use moderator_core::models::{
    Classification, ContentType, NotificationChannel, NotificationStatus,
};
use moderator_core::Config;
use moderator_db::ModerationStore;
use std::sync::Arc;

use super::email::EmailService;
use super::slack::SlackNotifier;

/// Facts about one flagged submission, rendered by each channel.
#[derive(Debug, Clone)]
pub struct ModerationAlert {
    pub request_id: i64,
    pub content_type: ContentType,
    pub classification: Classification,
    pub confidence: f64,
    pub reasoning: String,
    pub flagged_categories: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

impl ModerationAlert {
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }

    pub fn categories_text(&self) -> String {
        if self.flagged_categories.is_empty() {
            "None".to_string()
        } else {
            self.flagged_categories.join(", ")
        }
    }

    pub fn subject(&self) -> String {
        format!(
            "Content Moderation Alert - {} {} (request {})",
            self.classification.to_string().to_uppercase(),
            self.content_type,
            self.request_id
        )
    }

    pub fn plain_text(&self) -> String {
        format!(
            "Inappropriate content was detected.\n\n\
             Request ID: {}\n\
             Content Type: {}\n\
             Classification: {}\n\
             Confidence: {}\n\
             Reasoning: {}\n\
             Flagged Categories: {}\n\
             Detected at: {}\n",
            self.request_id,
            self.content_type,
            self.classification,
            self.confidence_percent(),
            self.reasoning,
            self.categories_text(),
            self.detected_at.to_rfc3339(),
        )
    }
}

#[derive(Clone, Default)]
pub struct NotificationService {
    slack: Option<SlackNotifier>,
    email: Option<EmailService>,
}

impl NotificationService {
    pub fn new(slack: Option<SlackNotifier>, email: Option<EmailService>) -> Self {
        Self { slack, email }
    }

    /// Build the channels that are configured; unconfigured ones are skipped.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let slack = match config.slack_webhook_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Some(SlackNotifier::new(url)?),
            _ => None,
        };
        let email = EmailService::from_config(config);

        tracing::info!(
            slack = slack.is_some(),
            email = email.is_some(),
            "Notification channels configured"
        );

        Ok(Self::new(slack, email))
    }

    pub fn has_channels(&self) -> bool {
        self.slack.is_some() || self.email.is_some()
    }

    /// Deliver the alert on every channel and log each attempt.
    #[tracing::instrument(skip(self, store, alert), fields(request_id = alert.request_id))]
    pub async fn dispatch(&self, store: &Arc<dyn ModerationStore>, alert: &ModerationAlert) {
        if let Some(slack) = &self.slack {
            let outcome = slack.send_alert(alert).await;
            Self::record(store, alert.request_id, NotificationChannel::Slack, outcome).await;
        }
        if let Some(email) = &self.email {
            let outcome = email.send_alert(alert).await;
            Self::record(store, alert.request_id, NotificationChannel::Email, outcome).await;
        }
    }

    async fn record(
        store: &Arc<dyn ModerationStore>,
        request_id: i64,
        channel: NotificationChannel,
        outcome: Result<(), String>,
    ) {
        let status = match outcome {
            Ok(()) => NotificationStatus::Sent,
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Alert delivery failed");
                NotificationStatus::Failed
            }
        };
        if let Err(e) = store.record_notification(request_id, channel, status).await {
            tracing::error!(channel = %channel, error = %e, "Failed to record notification");
        }
    }
}
