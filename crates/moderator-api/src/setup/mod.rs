//! Application setup and initialization
//!
//! Everything `main` needs to turn a `Config` into a served router.

pub mod database;
pub mod routes;
pub mod server;
pub mod validation;

use crate::services::NotificationService;
use crate::state::AppState;
use anyhow::{Context, Result};
use moderator_core::Config;
use moderator_db::PostgresModerationRepository;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        provider = %config.provider,
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let store = Arc::new(PostgresModerationRepository::new(pool));

    let provider = moderator_providers::create_provider(&config)
        .context("Failed to initialize moderation provider")?;
    let notifications = NotificationService::from_config(&config)
        .context("Failed to initialize notification channels")?;

    let state = Arc::new(AppState::new(config, store, provider, notifications));
    tracing::info!(
        provider = %state.moderation.provider_name(),
        "Moderation service ready"
    );

    let router = routes::setup_routes(&state.config, state.clone())?;

    Ok((state, router))
}
