use async_trait::async_trait;
use serde::Deserialize;
use spyglass_roster::{
    DiscordId, DiscordProfile, IdentityLookup, Player, PlayerIdentity, Result, RosterSource,
    ServerSummary, SourceError,
};

/// Wire shape of the roster endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterShape {
    /// Bare JSON array of players with raw identifier strings
    PlayerArray,
    /// `{"playerlist": [...]}` wrapper with pre-split profile fields
    PlayerListWrapper,
}

impl RosterShape {
    /// Parse a shape name, falling back to the bare array on anything unknown
    pub fn parse_or_default(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "playerlist" => Self::PlayerListWrapper,
            _ => Self::PlayerArray,
        }
    }
}

/// Endpoints the client talks to
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub roster_url: String,
    pub roster_shape: RosterShape,
    pub server_info_url: Option<String>,
    /// URL template with an {id} placeholder, e.g. "https://api.example.com/lookup/{id}"
    pub discord_lookup_url: Option<String>,
}

/// HTTP client for the game server's JSON endpoints
pub struct UpstreamClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(http: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { http, config }
    }

    /// Whether a Discord lookup endpoint is configured
    pub fn has_lookup(&self) -> bool {
        self.config.discord_lookup_url.is_some()
    }

    /// Fetch current occupancy, or None when no server-detail endpoint is configured
    pub async fn fetch_server_summary(&self) -> Result<Option<ServerSummary>> {
        let Some(url) = &self.config.server_info_url else {
            return Ok(None);
        };
        let detail: ServerDetailPayload = self.get_json(url).await?;
        Ok(Some(ServerSummary {
            players_online: detail.totalplayer,
            max_players: detail.maxplayer,
        }))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| SourceError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|err| SourceError::Payload(err.to_string()))
    }
}

#[async_trait]
impl RosterSource for UpstreamClient {
    async fn fetch_roster(&self) -> Result<Vec<Player>> {
        match self.config.roster_shape {
            RosterShape::PlayerArray => {
                let raw: Vec<RawPlayer> = self.get_json(&self.config.roster_url).await?;
                Ok(raw.into_iter().map(Player::from).collect())
            }
            RosterShape::PlayerListWrapper => {
                let payload: PlayerListPayload = self.get_json(&self.config.roster_url).await?;
                Ok(payload.playerlist.into_iter().map(Player::from).collect())
            }
        }
    }
}

#[async_trait]
impl IdentityLookup for UpstreamClient {
    async fn fetch_profile(&self, id: DiscordId) -> Result<DiscordProfile> {
        let Some(template) = &self.config.discord_lookup_url else {
            return Err(SourceError::Request(
                "no discord lookup endpoint configured".to_string(),
            ));
        };
        let url = template.replace("{id}", &id.to_string());
        let payload: LookupPayload = self.get_json(&url).await?;
        Ok(DiscordProfile {
            username: payload.username,
            avatar_url: payload.avatar,
        })
    }
}

// ===== Wire payloads =====

/// Player row as served by the bare-array roster endpoint
#[derive(Debug, Deserialize)]
struct RawPlayer {
    id: u32,
    name: String,
    ping: u32,
    #[serde(default)]
    identifiers: Vec<String>,
}

impl From<RawPlayer> for Player {
    fn from(raw: RawPlayer) -> Self {
        let identity = PlayerIdentity::from_identifiers(&raw.identifiers);
        Player {
            id: raw.id,
            name: raw.name,
            ping: raw.ping,
            identity,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlayerListPayload {
    playerlist: Vec<WrappedPlayer>,
}

/// Player row as served inside the playerlist wrapper
#[derive(Debug, Deserialize)]
struct WrappedPlayer {
    id: u32,
    name: String,
    ping: u32,
    #[serde(rename = "steamProfileUrl")]
    steam_profile_url: Option<String>,
}

impl From<WrappedPlayer> for Player {
    fn from(raw: WrappedPlayer) -> Self {
        Player {
            id: raw.id,
            name: raw.name,
            ping: raw.ping,
            identity: PlayerIdentity {
                discord: None,
                steam: raw.steam_profile_url.filter(|url| !url.is_empty()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupPayload {
    username: String,
    avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerDetailPayload {
    totalplayer: u32,
    maxplayer: u32,
}
