use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;

use crate::upstream::RosterShape;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    /// Env: PORT (default: 8080)
    pub port: u16,

    /// Roster endpoint URL
    /// Env: ROSTER_URL (default: "http://127.0.0.1:30120/players.json")
    pub roster_url: String,

    /// Roster payload shape: "players" (bare array) or "playerlist" (wrapper)
    /// Env: ROSTER_SHAPE (default: players)
    pub roster_shape: RosterShape,

    /// Server-detail endpoint URL
    /// Env: SERVER_INFO_URL (optional; occupancy reporting disabled when unset)
    pub server_info_url: Option<String>,

    /// Discord lookup URL template with an {id} placeholder
    /// Env: DISCORD_LOOKUP_URL (optional; profile resolution disabled when unset)
    pub discord_lookup_url: Option<String>,

    /// Seconds between roster refreshes
    /// Env: REFRESH_INTERVAL_SECS (default: 15)
    pub refresh_interval: Duration,

    /// Per-request timeout for upstream fetches
    /// Env: UPSTREAM_TIMEOUT_SECS (default: 10)
    pub upstream_timeout: Duration,

    /// Rows per page before any view intent arrives (0 = unbounded)
    /// Env: DEFAULT_PAGE_SIZE (default: 15)
    pub default_page_size: usize,

    /// Avatar URL served for players without a resolved Discord profile
    /// Env: PLACEHOLDER_AVATAR_URL
    pub placeholder_avatar: String,

    /// Request body size limit in bytes
    /// Env: REQUEST_BODY_LIMIT (default: 65536 = 64KB)
    pub request_body_limit: usize,

    /// Request timeout in seconds
    /// Env: REQUEST_TIMEOUT_SECS (default: 30)
    pub request_timeout: Duration,

    /// Rate limit for the /view endpoint (requests per second)
    /// Env: RATE_LIMIT_VIEW_PER_SEC (default: 10)
    /// The only publicly writable endpoint, so the only one governed
    pub rate_limit_view_per_sec: u64,

    /// Burst size for the /view endpoint
    /// Env: RATE_LIMIT_VIEW_BURST (default: 20)
    pub rate_limit_view_burst: u32,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv();
        Self {
            port: env_or_default("PORT", 8080),
            roster_url: env_or_default_string("ROSTER_URL", "http://127.0.0.1:30120/players.json"),
            roster_shape: RosterShape::parse_or_default(&env_or_default_string(
                "ROSTER_SHAPE",
                "players",
            )),
            server_info_url: env_optional("SERVER_INFO_URL"),
            discord_lookup_url: env_optional("DISCORD_LOOKUP_URL"),
            refresh_interval: Duration::from_secs(env_or_default("REFRESH_INTERVAL_SECS", 15)),
            upstream_timeout: Duration::from_secs(env_or_default("UPSTREAM_TIMEOUT_SECS", 10)),
            default_page_size: env_or_default("DEFAULT_PAGE_SIZE", spyglass_roster::DEFAULT_PAGE_SIZE),
            placeholder_avatar: env_or_default_string(
                "PLACEHOLDER_AVATAR_URL",
                spyglass_roster::PLACEHOLDER_AVATAR,
            ),
            request_body_limit: env_or_default("REQUEST_BODY_LIMIT", 64 * 1024),
            request_timeout: Duration::from_secs(env_or_default("REQUEST_TIMEOUT_SECS", 30)),
            rate_limit_view_per_sec: env_or_default("RATE_LIMIT_VIEW_PER_SEC", 10),
            rate_limit_view_burst: env_or_default("RATE_LIMIT_VIEW_BURST", 20),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            roster_url: "http://127.0.0.1:30120/players.json".to_string(),
            roster_shape: RosterShape::PlayerArray,
            server_info_url: None,
            discord_lookup_url: None,
            refresh_interval: Duration::from_secs(15),
            upstream_timeout: Duration::from_secs(10),
            default_page_size: spyglass_roster::DEFAULT_PAGE_SIZE,
            placeholder_avatar: spyglass_roster::PLACEHOLDER_AVATAR.to_string(),
            request_body_limit: 64 * 1024,
            request_timeout: Duration::from_secs(30),
            rate_limit_view_per_sec: 10,
            rate_limit_view_burst: 20,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional environment variable; empty counts as unset
fn env_optional(key: &str) -> Option<String> {
    var(key).ok().filter(|val| !val.is_empty())
}
