//! Test helpers: build AppState and router for integration tests.
//!
//! Everything runs against the in-memory store and the keyword provider, so no
//! database or network access is needed. Run with `cargo test -p moderator-api`.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::TestServer;
use moderator_api::services::NotificationService;
use moderator_api::setup::routes;
use moderator_api::state::AppState;
use moderator_core::Config;
use moderator_db::InMemoryModerationRepository;
use moderator_providers::KeywordProvider;
use std::sync::Arc;

pub const TEST_USER: &str = "a@x.com";

/// Test application: server plus a handle on the store behind it.
pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryModerationRepository,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Config from defaults plus the given overrides.
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let overrides: Vec<(String, String)> = overrides
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(move |key| {
        if let Some((_, v)) = overrides.iter().find(|(k, _)| k == key) {
            return Some(v.clone());
        }
        match key {
            "DATABASE_URL" => Some("postgres://localhost/moderator_test".to_string()),
            "ENVIRONMENT" => Some("test".to_string()),
            _ => None,
        }
    })
    .expect("test config")
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

pub async fn setup_test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let config = test_config(overrides);
    let store = InMemoryModerationRepository::new();
    let notifications = NotificationService::from_config(&config).expect("notification channels");

    let state = Arc::new(AppState::new(
        config,
        Arc::new(store.clone()),
        Arc::new(KeywordProvider::new()),
        notifications,
    ));
    let router = routes::setup_routes(&state.config, state.clone()).expect("router");
    let server = TestServer::new(router).expect("test server");

    TestApp { server, store }
}
