//! Offline provider: keyword matching for text, header inspection for images.

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::ImageReader;
use moderator_core::models::Classification;
use serde_json::json;
use std::io::Cursor;

use crate::provider::{ModerationAnalysis, ModerationProvider};

pub const INAPPROPRIATE_KEYWORDS: &[&str] = &["violence", "hate", "explicit", "abuse", "threat"];

const FLAGGED_CONFIDENCE: f64 = 0.95;
const CLEAN_CONFIDENCE: f64 = 0.85;
const IMAGE_CONFIDENCE: f64 = 0.75;

#[derive(Debug, Clone, Default)]
pub struct KeywordProvider;

impl KeywordProvider {
    pub fn new() -> Self {
        Self
    }

    fn flagged_keywords(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        INAPPROPRIATE_KEYWORDS
            .iter()
            .filter(|keyword| lowered.contains(*keyword))
            .map(|keyword| keyword.to_string())
            .collect()
    }
}

#[async_trait]
impl ModerationProvider for KeywordProvider {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn analyze_text(&self, text: &str) -> Result<ModerationAnalysis> {
        let flagged = Self::flagged_keywords(text);
        let raw = json!({
            "analysis": "Basic keyword-based analysis",
            "flagged_terms": flagged,
            "text_length": text.chars().count(),
        });

        let analysis = if flagged.is_empty() {
            ModerationAnalysis::new(
                Classification::Appropriate,
                CLEAN_CONFIDENCE,
                "No inappropriate content detected.",
            )
        } else {
            ModerationAnalysis::new(
                Classification::Inappropriate,
                FLAGGED_CONFIDENCE,
                format!("Flagged keywords found: {}", flagged.join(", ")),
            )
            .with_flagged_categories(flagged)
        };

        Ok(analysis.with_raw_response(raw))
    }

    async fn analyze_image(&self, image: &[u8], _content_type: &str) -> Result<ModerationAnalysis> {
        let reader = ImageReader::new(Cursor::new(image))
            .with_guessed_format()
            .context("Failed to read image data")?;
        let format = reader
            .format()
            .map(|f| format!("{:?}", f).to_uppercase())
            .context("Unrecognized image format")?;
        let (width, height) = reader
            .into_dimensions()
            .context("Failed to decode image dimensions")?;

        tracing::debug!(width, height, format = %format, "Image inspected");

        Ok(ModerationAnalysis::new(
            Classification::Appropriate,
            IMAGE_CONFIDENCE,
            format!("Image analyzed: {}x{} pixels, format: {}", width, height, format),
        )
        .with_raw_response(json!({
            "analysis": "Basic image validation",
            "dimensions": { "width": width, "height": height },
            "format": format,
        })))
    }
}
