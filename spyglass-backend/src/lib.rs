pub mod config;
mod error;
pub mod poller;
mod routes;
pub mod upstream;
mod validation;

use axum::{
    Router,
    http::{Method, StatusCode, header},
    routing::{get, post},
};
use spyglass_roster::{RosterController, ServerSummary};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

pub struct AppState {
    pub controller: RosterController,
    /// Occupancy from the server-detail endpoint, written by the poller
    pub summary: RwLock<Option<ServerSummary>>,
}

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per second for /view
    pub view_per_sec: u64,
    /// Burst size for /view
    pub view_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            view_per_sec: 10,
            view_burst: 20,
        }
    }
}

/// Create the application router over an already-wired controller
pub fn create_app(
    state: Arc<AppState>,
    request_body_limit: usize,
    request_timeout: Duration,
    rate_limit: RateLimitConfig,
) -> Router {
    // Rate limit for /view - the only endpoint that changes server-side state
    let view_governor = GovernorConfigBuilder::default()
        .per_second(rate_limit.view_per_sec)
        .burst_size(rate_limit.view_burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .unwrap();

    let view_routes = Router::new()
        .route("/view", post(routes::update_view))
        .layer(GovernorLayer::new(view_governor));

    // Read endpoints serve the latest published snapshot, no rate limit
    let read_routes = Router::new()
        .route("/players", get(routes::get_players))
        .route("/status", get(routes::get_status));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(view_routes)
        .merge(read_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(request_body_limit))
        // Browser dashboards are served from another origin
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .allow_origin(Any),
        )
        .with_state(state)
}
