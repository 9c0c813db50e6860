//! OpenAI moderation endpoint provider

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use moderator_core::models::Classification;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::provider::{upstream_status_error, ModerationAnalysis, ModerationProvider};

pub struct OpenAiProvider {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl Debug for OpenAiProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResultItem>,
}

#[derive(Debug, Deserialize)]
struct ModerationResultItem {
    flagged: bool,
    #[serde(default)]
    categories: BTreeMap<String, bool>,
    #[serde(default)]
    category_scores: BTreeMap<String, f64>,
}

impl OpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for OpenAI moderation API")?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    async fn moderate(&self, input: serde_json::Value) -> Result<ModerationAnalysis> {
        let url = format!("{}/moderations", self.base_url);
        let request_body = json!({
            "model": self.model,
            "input": input,
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to OpenAI moderation API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(upstream_status_error("OpenAI moderation", status, &error_text));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to parse OpenAI moderation response")?;

        Self::interpret(raw)
    }

    fn interpret(raw: serde_json::Value) -> Result<ModerationAnalysis> {
        let parsed: ModerationResponse = serde_json::from_value(raw.clone())
            .context("Unexpected OpenAI moderation response shape")?;
        let item = parsed
            .results
            .into_iter()
            .next()
            .context("OpenAI moderation response contained no results")?;

        let top = item
            .category_scores
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(name, score)| (name.clone(), *score));
        let top_score = top.as_ref().map(|(_, s)| *s).unwrap_or(0.0);

        let flagged: Vec<String> = item
            .categories
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.clone())
            .collect();

        let analysis = if item.flagged {
            let reasoning = if flagged.is_empty() {
                "Content flagged by OpenAI moderation".to_string()
            } else {
                format!("Flagged categories: {}", flagged.join(", "))
            };
            ModerationAnalysis::new(Classification::Inappropriate, top_score, reasoning)
        } else {
            let reasoning = match &top {
                Some((name, score)) => format!(
                    "No policy violations detected (highest score: {} {:.3})",
                    name, score
                ),
                None => "No policy violations detected".to_string(),
            };
            ModerationAnalysis::new(Classification::Appropriate, 1.0 - top_score, reasoning)
        };

        Ok(analysis
            .with_flagged_categories(flagged)
            .with_raw_response(raw))
    }
}

#[async_trait]
impl ModerationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[tracing::instrument(skip(self, text), fields(provider = "openai", text_len = text.len()))]
    async fn analyze_text(&self, text: &str) -> Result<ModerationAnalysis> {
        self.moderate(json!(text)).await
    }

    #[tracing::instrument(skip(self, image), fields(provider = "openai", image_len = image.len()))]
    async fn analyze_image(&self, image: &[u8], content_type: &str) -> Result<ModerationAnalysis> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let data_uri = format!("data:{};base64,{}", content_type, encoded);
        self.moderate(json!([{
            "type": "image_url",
            "image_url": { "url": data_uri }
        }]))
        .await
    }
}
