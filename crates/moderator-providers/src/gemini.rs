//! Google Gemini provider
//!
//! Sends the content with a classification prompt to `generateContent`. Gemini's
//! own safety filters are relaxed to `BLOCK_NONE` so the model can reason about
//! harmful input instead of refusing it; the verdict comes back as JSON text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use moderator_core::models::Classification;
use serde::Deserialize;
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::provider::{
    parse_json_payload, upstream_status_error, ModerationAnalysis, ModerationProvider,
};

const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const RESPONSE_FORMAT: &str = r#"Respond with only a JSON object of the form:
{"classification": "appropriate" | "inappropriate", "confidence": <number between 0 and 1>, "reasoning": "<one or two sentences>", "flagged_categories": ["<category>", ...]}"#;

pub struct GeminiProvider {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl Debug for GeminiProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    classification: String,
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    flagged_categories: Vec<String>,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for Gemini API")?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn safety_settings() -> Vec<serde_json::Value> {
        HARM_CATEGORIES
            .iter()
            .map(|category| json!({ "category": category, "threshold": "BLOCK_NONE" }))
            .collect()
    }

    async fn generate(&self, parts: Vec<serde_json::Value>) -> Result<ModerationAnalysis> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request_body = json!({
            "contents": [{ "parts": parts }],
            "safetySettings": Self::safety_settings(),
            "generationConfig": { "temperature": 0.0 },
        });

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(upstream_status_error("Gemini API", status, &error_text));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to parse Gemini API response")?;

        Self::interpret(raw)
    }

    fn interpret(raw: serde_json::Value) -> Result<ModerationAnalysis> {
        let parsed: GenerateContentResponse = serde_json::from_value(raw.clone())
            .context("Unexpected Gemini response shape")?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(anyhow::anyhow!("Gemini blocked the prompt: {}", reason));
        }

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .context("Gemini response contained no candidates")?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "Gemini returned no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ));
        }

        let verdict: Verdict = serde_json::from_value(parse_json_payload(&text)?)
            .context("Gemini verdict is missing required fields")?;
        let classification: Classification = verdict
            .classification
            .trim()
            .to_lowercase()
            .parse()
            .context("Gemini returned an unknown classification")?;

        Ok(ModerationAnalysis::new(
            classification,
            verdict.confidence.unwrap_or(0.0),
            verdict.reasoning,
        )
        .with_flagged_categories(verdict.flagged_categories)
        .with_raw_response(raw))
    }
}

#[async_trait]
impl ModerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[tracing::instrument(skip(self, text), fields(provider = "gemini", text_len = text.len()))]
    async fn analyze_text(&self, text: &str) -> Result<ModerationAnalysis> {
        let prompt = format!(
            "You are a content moderator. Classify the following user text as appropriate or inappropriate \
             (harassment, hate speech, sexually explicit, dangerous or violent content).\n\n\
             Text: \"{}\"\n\n{}",
            text, RESPONSE_FORMAT
        );
        self.generate(vec![json!({ "text": prompt })]).await
    }

    #[tracing::instrument(skip(self, image), fields(provider = "gemini", image_len = image.len()))]
    async fn analyze_image(&self, image: &[u8], content_type: &str) -> Result<ModerationAnalysis> {
        let prompt = format!(
            "You are a content moderator. Classify this image as appropriate or inappropriate \
             (nudity, graphic violence, hate symbols, dangerous activities).\n\n{}",
            RESPONSE_FORMAT
        );
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        self.generate(vec![
            json!({ "inline_data": { "mime_type": content_type, "data": encoded } }),
            json!({ "text": prompt }),
        ])
        .await
    }
}
