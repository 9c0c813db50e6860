//! Shared application state handed to every handler as `Arc<AppState>`.

use moderator_core::Config;
use moderator_db::ModerationStore;
use moderator_providers::ModerationProvider;
use std::sync::Arc;
use std::time::Duration;

use crate::services::{ModerationService, NotificationService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ModerationStore>,
    pub moderation: ModerationService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ModerationStore>,
        provider: Arc<dyn ModerationProvider>,
        notifications: NotificationService,
    ) -> Self {
        let moderation = ModerationService::new(
            store.clone(),
            provider,
            notifications,
            Duration::from_secs(config.provider_timeout_secs),
        );

        Self {
            config: Arc::new(config),
            store,
            moderation,
        }
    }
}
