//! Test fixtures: encoded images and seeded moderation requests.

use chrono::{DateTime, Duration, Utc};
use image::{DynamicImage, ImageFormat, RgbImage};
use moderator_core::models::{
    Classification, ContentType, ModerationRequest, NewModerationResult, RequestStatus,
};
use moderator_db::InMemoryModerationRepository;
use std::io::Cursor;

/// Encoded image of the given size.
pub fn create_test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode test image");
    buf
}

pub fn create_minimal_png() -> Vec<u8> {
    create_test_image(1, 1, ImageFormat::Png)
}

/// Fixed reference time so ordering assertions are stable.
pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub struct SeedRequest {
    pub content_type: ContentType,
    pub status: RequestStatus,
    pub user_email: Option<&'static str>,
    pub minutes_after_base: i64,
    pub result: Option<(Classification, Option<f64>)>,
}

impl SeedRequest {
    pub fn completed(
        content_type: ContentType,
        classification: Classification,
        confidence: f64,
    ) -> Self {
        Self {
            content_type,
            status: RequestStatus::Completed,
            user_email: None,
            minutes_after_base: 0,
            result: Some((classification, Some(confidence))),
        }
    }

    pub fn failed(content_type: ContentType) -> Self {
        Self {
            content_type,
            status: RequestStatus::Failed,
            user_email: None,
            minutes_after_base: 0,
            result: None,
        }
    }

    pub fn by(mut self, email: &'static str) -> Self {
        self.user_email = Some(email);
        self
    }

    pub fn at(mut self, minutes_after_base: i64) -> Self {
        self.minutes_after_base = minutes_after_base;
        self
    }
}

/// Insert a request with a chosen status, owner and timestamp.
pub async fn seed(store: &InMemoryModerationRepository, seed: SeedRequest) -> ModerationRequest {
    let request = ModerationRequest {
        id: 0,
        content_type: seed.content_type,
        content_hash: format!("{:064x}", seed.minutes_after_base),
        status: seed.status,
        user_email: seed.user_email.map(str::to_string),
        content_id: None,
        failure_reason: (seed.status == RequestStatus::Failed)
            .then(|| "provider unavailable".to_string()),
        created_at: base_time() + Duration::minutes(seed.minutes_after_base),
    };
    let result = seed
        .result
        .map(|(classification, confidence)| NewModerationResult {
            classification,
            confidence,
            reasoning: Some("seeded".to_string()),
            provider_response: None,
        });

    store.insert_request(request, result).await
}
