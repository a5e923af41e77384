use serde::Serialize;
use std::fmt;

use crate::view::ViewState;

/// Discord snowflake parsed from a `discord:<id>` identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscordId(pub u64);

impl fmt::Display for DiscordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

/// Typed view of a player's upstream identifier list.
///
/// FiveM-style APIs report namespaced identifier strings such as
/// `"discord:271923767462264832"` or `"steam:110000112345678"`. Parsing
/// happens once at ingestion; only the namespaces this service consumes are
/// kept, and the first usable value per namespace wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerIdentity {
  pub discord: Option<DiscordId>,
  /// Opaque steam identifier value (never interpreted, only displayed).
  pub steam: Option<String>,
}

impl PlayerIdentity {
  /// Parse a raw identifier list.
  ///
  /// Unknown namespaces, malformed entries without a `:` separator and
  /// non-numeric discord values are skipped.
  pub fn from_identifiers<I, S>(identifiers: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut identity = Self::default();
    for raw in identifiers {
      let Some((namespace, value)) = raw.as_ref().split_once(':') else {
        continue;
      };
      match namespace {
        "discord" if identity.discord.is_none() => {
          if let Ok(id) = value.parse::<u64>() {
            identity.discord = Some(DiscordId(id));
          }
        }
        "steam" if identity.steam.is_none() => {
          if !value.is_empty() {
            identity.steam = Some(value.to_string());
          }
        }
        _ => {}
      }
    }
    identity
  }
}

/// A connected player as last reported by the roster endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
  /// Server-assigned slot id. Unique within one roster, not stable across
  /// refreshes.
  pub id: u32,
  pub name: String,
  /// Round-trip latency in milliseconds, informational only.
  pub ping: u32,
  pub identity: PlayerIdentity,
}

/// Identity data resolved from the Discord lookup endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscordProfile {
  pub username: String,
  pub avatar_url: Option<String>,
}

/// A visible roster row with profile data joined in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerCard {
  pub id: u32,
  pub name: String,
  pub ping: u32,
  /// Empty until the player's Discord profile resolves.
  pub discord_username: String,
  /// Placeholder URL until a profile with an avatar resolves.
  pub avatar_url: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub steam: Option<String>,
}

/// Freshness bookkeeping for the roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshHealth {
  /// Refresh attempts issued since startup.
  pub generation: u64,
  /// Unix timestamp of the last applied refresh.
  pub last_success_unix: Option<i64>,
  pub consecutive_failures: u32,
}

impl RefreshHealth {
  /// True when the newest refresh attempt did not succeed, i.e. the served
  /// roster is older than one polling interval.
  pub fn is_stale(&self) -> bool {
    self.consecutive_failures > 0
  }
}

/// Occupancy numbers from the server-detail endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerSummary {
  pub players_online: u32,
  pub max_players: u32,
}

/// The published derived view: the filtered, sorted, truncated roster plus
/// everything the presentation layer needs alongside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterSnapshot {
  pub players: Vec<PlayerCard>,
  pub view: ViewState,
  /// Connected players before filtering.
  pub roster_total: usize,
  /// Players matching the search term, before pagination.
  pub matching: usize,
  pub health: RefreshHealth,
}
