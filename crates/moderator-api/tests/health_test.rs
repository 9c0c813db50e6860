//! Service banner, health and documentation endpoints.

mod helpers;

use helpers::setup_test_app;
use serde_json::Value;

#[tokio::test]
async fn test_root_lists_endpoints() {
    let app = setup_test_app().await;

    let response = app.client().get("/").await;

    assert_eq!(response.status_code(), 200);
    let body = response.json::<Value>();
    assert_eq!(body["status"], "online");
    assert_eq!(body["service"], "Smart Content Moderator");
    assert_eq!(body["endpoints"]["text_moderation"], "/api/text/moderate");
    assert_eq!(
        body["endpoints"]["analytics_summary"],
        "/api/v1/analytics/summary?user=<email>"
    );
}

#[tokio::test]
async fn test_health_reports_database() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["provider"], "keyword");
}

#[tokio::test]
async fn test_liveness() {
    let app = setup_test_app().await;

    let response = app.client().get("/live").await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["status"], "alive");
}

#[tokio::test]
async fn test_request_id_is_generated_and_propagated() {
    let app = setup_test_app().await;

    let generated = app.client().get("/live").await;
    assert!(!generated.header("x-request-id").is_empty());

    let propagated = app
        .client()
        .get("/live")
        .add_header("X-Request-ID", "trace-123")
        .await;
    assert_eq!(propagated.header("x-request-id"), "trace-123");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/openapi.json").await;

    assert_eq!(response.status_code(), 200);
    let body = response.json::<Value>();
    assert_eq!(body["info"]["title"], "Smart Content Moderator");
    assert!(body["paths"]["/api/v1/analytics/summary"].is_object());
}
