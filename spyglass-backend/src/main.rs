use spyglass_backend::config::Config;
use spyglass_backend::poller;
use spyglass_backend::upstream::{UpstreamClient, UpstreamConfig};
use spyglass_backend::{AppState, RateLimitConfig, create_app};
use spyglass_roster::{
    ControllerOptions, IdentityLookup, PageSize, RosterController, RosterSource, ViewState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting Spyglass backend server...");
    // Load configuration from environment variables or use defaults
    let config = Config::from_env();
    tracing::info!(
        "Configuration: port={}, roster_url={}, shape={:?}, refresh={}s, body_limit={}KB, timeout={}s",
        config.port,
        config.roster_url,
        config.roster_shape,
        config.refresh_interval.as_secs(),
        config.request_body_limit / 1024,
        config.request_timeout.as_secs()
    );
    tracing::info!(
        "Upstream extras: server_info={}, discord_lookup={}, rate limit view={}/sec (burst {})",
        config.server_info_url.as_deref().unwrap_or("disabled"),
        config.discord_lookup_url.as_deref().unwrap_or("disabled"),
        config.rate_limit_view_per_sec,
        config.rate_limit_view_burst
    );

    let http = reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .build()
        .expect("Error creating upstream HTTP client");
    let upstream = Arc::new(UpstreamClient::new(
        http,
        UpstreamConfig {
            roster_url: config.roster_url.clone(),
            roster_shape: config.roster_shape,
            server_info_url: config.server_info_url.clone(),
            discord_lookup_url: config.discord_lookup_url.clone(),
        },
    ));

    // Profile resolution stays off when no lookup endpoint is configured
    let lookup = upstream
        .has_lookup()
        .then(|| Arc::clone(&upstream) as Arc<dyn IdentityLookup>);
    let controller = RosterController::new(
        Arc::clone(&upstream) as Arc<dyn RosterSource>,
        lookup,
        ControllerOptions {
            initial_view: ViewState {
                page_size: PageSize::limited(config.default_page_size),
                ..ViewState::default()
            },
            placeholder_avatar: config.placeholder_avatar.clone(),
        },
    );

    let state = Arc::new(AppState {
        controller,
        summary: RwLock::new(None),
    });
    let rate_limit = RateLimitConfig {
        view_per_sec: config.rate_limit_view_per_sec,
        view_burst: config.rate_limit_view_burst,
    };
    let app = create_app(
        Arc::clone(&state),
        config.request_body_limit,
        config.request_timeout,
        rate_limit,
    );
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await.unwrap();
    tracing::info!("Server listening on {}", addr);

    tokio::select! {
        result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()) => {
            if let Err(e) = result {
                tracing::error!("Axum server error: {}", e);
            }
        }
        _ = poller::run(state, upstream, config.refresh_interval) => {
            tracing::error!("Poller exited unexpectedly");
        }
    }
}
