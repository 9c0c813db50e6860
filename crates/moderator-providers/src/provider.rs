//! Provider abstraction shared by all moderation backends.

use anyhow::{Context, Result};
use async_trait::async_trait;
use moderator_core::models::Classification;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Outcome of classifying one piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationAnalysis {
    pub classification: Classification,
    /// Always within [0, 1]
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub flagged_categories: Vec<String>,
    /// Raw provider payload, kept for audit
    #[serde(default)]
    pub raw_response: Option<serde_json::Value>,
}

impl ModerationAnalysis {
    pub fn new(classification: Classification, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            classification,
            confidence: clamp_confidence(confidence),
            reasoning: reasoning.into(),
            flagged_categories: Vec::new(),
            raw_response: None,
        }
    }

    pub fn with_flagged_categories(mut self, categories: Vec<String>) -> Self {
        self.flagged_categories = categories;
        self
    }

    pub fn with_raw_response(mut self, raw: serde_json::Value) -> Self {
        self.raw_response = Some(raw);
        self
    }

    pub fn is_inappropriate(&self) -> bool {
        self.classification == Classification::Inappropriate
    }
}

/// A moderation backend.
///
/// Implementations return `Err` for transport failures, non-success responses
/// and payloads they cannot interpret; callers record those as failed requests.
#[async_trait]
pub trait ModerationProvider: Send + Sync + Debug {
    /// Short identifier (e.g. "keyword", "openai")
    fn name(&self) -> &str;

    async fn analyze_text(&self, text: &str) -> Result<ModerationAnalysis>;

    async fn analyze_image(&self, image: &[u8], content_type: &str) -> Result<ModerationAnalysis>;
}

pub(crate) fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Error for a non-success upstream response.
///
/// The outer message carries only the status. The body, truncated, sits
/// underneath it and only shows up when the whole chain is formatted.
#[cfg_attr(not(any(feature = "openai", feature = "gemini")), allow(dead_code))]
pub(crate) fn upstream_status_error(
    api: &str,
    status: impl std::fmt::Display,
    body: &str,
) -> anyhow::Error {
    let body = body.trim();
    let mut snippet: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        snippet.push_str("...");
    }
    anyhow::anyhow!("response body: {}", snippet)
        .context(format!("{} request failed: {}", api, status))
}

/// Parse a JSON object out of model output, tolerating markdown code fences.
pub fn parse_json_payload(text: &str) -> Result<serde_json::Value> {
    let json_text = if text.contains("```json") {
        text.split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(text)
            .trim()
    } else if text.contains("```") {
        text.split("```")
            .nth(1)
            .unwrap_or(text)
            .trim()
    } else {
        text.trim()
    };

    serde_json::from_str(json_text).context("Failed to parse provider output as JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_keeps_body_out_of_outer_message() {
        let body = "x".repeat(500);
        let err = upstream_status_error("Test API", "500 Internal Server Error", &body);

        assert_eq!(err.to_string(), "Test API request failed: 500 Internal Server Error");
        let chain = format!("{:#}", err);
        assert!(chain.ends_with("..."));
        assert!(chain.len() < 300);
    }

    #[test]
    fn parses_fenced_and_bare_json() {
        let fenced = "Here you go:\n```json\n{\"classification\": \"appropriate\"}\n```";
        assert_eq!(
            parse_json_payload(fenced).unwrap()["classification"],
            "appropriate"
        );

        let plain_fence = "```\n{\"confidence\": 0.4}\n```";
        assert_eq!(parse_json_payload(plain_fence).unwrap()["confidence"], 0.4);

        assert!(parse_json_payload("  {\"a\": 1}  ").is_ok());
        assert!(parse_json_payload("not json").is_err());
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(ModerationAnalysis::new(Classification::Appropriate, 1.7, "").confidence, 1.0);
        assert_eq!(ModerationAnalysis::new(Classification::Appropriate, -0.2, "").confidence, 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
    }
}
