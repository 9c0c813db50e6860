//! Slack incoming-webhook alerts

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::time::Duration;

use super::notification::ModerationAlert;

const SLACK_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
pub struct SlackNotifier {
    http_client: reqwest::Client,
    webhook_url: String,
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The webhook URL is a credential
        f.debug_struct("SlackNotifier").finish_non_exhaustive()
    }
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SLACK_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client for Slack webhook")?;

        Ok(Self {
            http_client,
            webhook_url: webhook_url.into(),
        })
    }

    fn payload(alert: &ModerationAlert) -> Value {
        let classification = alert.classification.to_string().to_uppercase();
        json!({
            "attachments": [{
                "color": "danger",
                "blocks": [
                    {
                        "type": "header",
                        "text": {
                            "type": "plain_text",
                            "text": format!("⚠️ Content Moderation Alert - {}", classification),
                        }
                    },
                    {
                        "type": "section",
                        "fields": [
                            { "type": "mrkdwn", "text": format!("*Request ID:*\n{}", alert.request_id) },
                            { "type": "mrkdwn", "text": format!("*Content Type:*\n{}", alert.content_type) },
                            { "type": "mrkdwn", "text": format!("*Classification:*\n{}", alert.classification) },
                            { "type": "mrkdwn", "text": format!("*Confidence:*\n{}", alert.confidence_percent()) },
                        ]
                    },
                    {
                        "type": "section",
                        "text": { "type": "mrkdwn", "text": format!("*Reasoning:*\n{}", alert.reasoning) }
                    },
                    {
                        "type": "section",
                        "text": {
                            "type": "mrkdwn",
                            "text": format!("*Flagged Categories:*\n{}", alert.categories_text()),
                        }
                    },
                    {
                        "type": "context",
                        "elements": [{
                            "type": "mrkdwn",
                            "text": format!("Detected at {}", alert.detected_at.to_rfc3339()),
                        }]
                    }
                ]
            }]
        })
    }

    pub async fn send_alert(&self, alert: &ModerationAlert) -> Result<(), String> {
        let response = self
            .http_client
            .post(&self.webhook_url)
            .json(&Self::payload(alert))
            .send()
            .await
            .map_err(|e| format!("Slack webhook request failed: {}", e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(format!("Slack webhook failed: {} - {}", status, error_text));
        }

        tracing::info!(request_id = alert.request_id, "Slack alert sent");
        Ok(())
    }
}
