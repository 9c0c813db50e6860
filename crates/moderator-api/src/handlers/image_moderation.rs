use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use moderator_core::models::ModerationResponse;
use moderator_core::{AppError, Config, FieldViolation};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError};
use crate::services::{Submission, SubmittedContent};
use crate::state::AppState;

/// Multipart body of `POST /api/image/moderate` (documentation only).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageModerationForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
    pub content_id: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug)]
struct ImageUpload {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
struct ImageForm {
    image: Option<ImageUpload>,
    content_id: Option<String>,
    user_email: Option<String>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the upload limit".to_string())
    } else {
        AppError::InvalidInput(format!("Failed to read multipart: {}", e.body_text()))
    }
}

/// Lowercased MIME type without parameters (`image/PNG; q=1` -> `image/png`).
fn normalize_mime_type(raw: &str) -> String {
    raw.split(';').next().unwrap_or(raw).trim().to_lowercase()
}

/// Read the form, rejecting a disallowed type before buffering the file.
async fn read_image_form(mut multipart: Multipart, config: &Config) -> Result<ImageForm, AppError> {
    let mut form = ImageForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            "image" => {
                if form.image.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple image fields are not allowed".to_string(),
                    ));
                }
                let content_type = field
                    .content_type()
                    .map(normalize_mime_type)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                if !config.is_image_type_allowed(&content_type) {
                    return Err(AppError::InvalidInput(format!(
                        "Invalid file type. Allowed types: {}",
                        config.allowed_image_content_types.join(", ")
                    )));
                }
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                });
            }
            "content_id" => {
                form.content_id = Some(field.text().await.map_err(multipart_error)?);
            }
            "user_email" => {
                form.user_email = Some(field.text().await.map_err(multipart_error)?);
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

fn validate_image_size(size: usize, max_size: usize) -> Result<(), AppError> {
    if size == 0 {
        return Err(AppError::InvalidInput("Uploaded image is empty".to_string()));
    }
    if size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "Image size {} bytes exceeds maximum of {} MB",
            size,
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Classify an uploaded image.
#[utoipa::path(
    post,
    path = "/api/image/moderate",
    tag = "moderation",
    request_body(content = ImageModerationForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Moderation finished (completed or failed)", body = ModerationResponse),
        (status = 400, description = "Disallowed content type or empty file", body = ErrorResponse),
        (status = 413, description = "Image exceeds the size limit", body = ErrorResponse),
        (status = 422, description = "Missing image part", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn moderate_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = read_image_form(multipart, &state.config).await?;

    let image = form.image.ok_or_else(|| {
        AppError::Validation(vec![FieldViolation::missing("body", "image")])
    })?;
    validate_image_size(image.bytes.len(), state.config.max_image_size_bytes)?;

    tracing::debug!(
        size = image.bytes.len(),
        content_type = %image.content_type,
        "Image received"
    );

    let outcome = state
        .moderation
        .submit(Submission::new(
            SubmittedContent::Image {
                bytes: image.bytes,
                content_type: image.content_type,
            },
            form.user_email,
            form.content_id,
        ))
        .await?;

    Ok(Json(ModerationResponse {
        request_id: outcome.request_id,
        status: outcome.status,
        message: outcome.message,
    }))
}
