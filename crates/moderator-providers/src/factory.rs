use anyhow::Result;
use moderator_core::{Config, ProviderKind};
use std::sync::Arc;
#[cfg(any(feature = "openai", feature = "gemini"))]
use std::time::Duration;

use crate::keyword::KeywordProvider;
use crate::provider::ModerationProvider;

/// Build the provider selected by `MODERATION_PROVIDER`.
pub fn create_provider(config: &Config) -> Result<Arc<dyn ModerationProvider>> {
    match config.provider {
        ProviderKind::Keyword => {
            tracing::info!("Using keyword moderation provider");
            Ok(Arc::new(KeywordProvider::new()))
        }
        #[cfg(feature = "openai")]
        ProviderKind::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY must be set"))?;
            tracing::info!(
                model = %config.openai_moderation_model,
                "Using OpenAI moderation provider"
            );
            Ok(Arc::new(crate::openai::OpenAiProvider::new(
                api_key,
                config.openai_base_url.clone(),
                config.openai_moderation_model.clone(),
                Duration::from_secs(config.provider_timeout_secs),
            )?))
        }
        #[cfg(feature = "gemini")]
        ProviderKind::Gemini => {
            let api_key = config
                .gemini_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY must be set"))?;
            tracing::info!(model = %config.gemini_model, "Using Gemini moderation provider");
            Ok(Arc::new(crate::gemini::GeminiProvider::new(
                api_key,
                config.gemini_base_url.clone(),
                config.gemini_model.clone(),
                Duration::from_secs(config.provider_timeout_secs),
            )?))
        }
        #[allow(unreachable_patterns)]
        other => Err(anyhow::anyhow!(
            "Moderation provider '{}' is not compiled into this build",
            other
        )),
    }
}
