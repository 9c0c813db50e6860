//! Route configuration and setup.
//!
//! Health checks live in [health](health).

mod health;

use crate::constants::{
    API_PREFIX, API_V1_PREFIX, MULTIPART_OVERHEAD_BYTES, SERVICE_NAME, SERVICE_VERSION,
};
use crate::handlers;
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use moderator_core::Config;
use std::sync::Arc;
use std::time::Duration;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const DEFAULT_HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let body_limit = config.max_image_size_bytes + MULTIPART_OVERHEAD_BYTES;

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_HTTP_CONCURRENCY_LIMIT)
        .max(1);
    tracing::info!(
        http_concurrency_limit,
        request_timeout_secs = config.request_timeout_secs,
        "HTTP limits configured"
    );

    let app = public_routes()
        .merge(moderation_routes(body_limit))
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs.max(1),
        )))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Service banner listing the main endpoints.
async fn service_info() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "online",
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "endpoints": {
            "text_moderation": format!("{}/text/moderate", API_PREFIX),
            "image_moderation": format!("{}/image/moderate", API_PREFIX),
            "summary_by_id": format!("{}/summary/{{request_id}}", API_PREFIX),
            "summary_list": format!("{}/summary", API_PREFIX),
            "analytics_summary": format!("{}/analytics/summary?user=<email>", API_V1_PREFIX),
            "docs": "/docs",
        }
    }))
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health::health_check))
        .route("/live", get(health::liveness_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

fn moderation_routes(body_limit: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/text/moderate", API_PREFIX),
            post(handlers::text_moderation::moderate_text),
        )
        .route(
            &format!("{}/image/moderate", API_PREFIX),
            post(handlers::image_moderation::moderate_image)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            &format!("{}/summary", API_PREFIX),
            get(handlers::summary::list_summaries),
        )
        .route(
            &format!("{}/summary/{{request_id}}", API_PREFIX),
            get(handlers::summary::get_summary),
        )
        .route(
            &format!("{}/analytics/summary", API_V1_PREFIX),
            get(handlers::analytics::get_user_summary),
        )
        // Unversioned alias kept for existing clients
        .route("/analytics/summary", get(handlers::analytics::get_user_summary))
}
