//! Configuration validation
//!
//! Startup checks on top of `Config::validate` for values that would only
//! fail later at runtime.

use anyhow::Result;
use moderator_core::Config;

pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.db_max_connections == 0 {
        return Err(anyhow::anyhow!("Database max connections cannot be 0"));
    }

    if config.db_timeout_seconds == 0 {
        return Err(anyhow::anyhow!("Database timeout cannot be 0"));
    }

    if config.max_image_size_bytes == 0 {
        return Err(anyhow::anyhow!("Max image size cannot be 0"));
    }

    if config.allowed_image_content_types.is_empty() {
        return Err(anyhow::anyhow!(
            "ALLOWED_IMAGE_CONTENT_TYPES must list at least one type"
        ));
    }

    if config.provider_timeout_secs == 0 {
        return Err(anyhow::anyhow!("Provider timeout cannot be 0"));
    }

    if config.provider_timeout_secs >= config.request_timeout_secs {
        tracing::warn!(
            provider_timeout_secs = config.provider_timeout_secs,
            request_timeout_secs = config.request_timeout_secs,
            "Provider timeout is not shorter than the request timeout - slow providers will surface as 408 instead of a failed request"
        );
    }

    tracing::info!("Configuration validation passed");
    Ok(())
}
