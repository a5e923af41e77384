use async_trait::async_trait;

use crate::Result;
use crate::models::{DiscordId, DiscordProfile, Player};

/// Where rosters come from. Implemented by the HTTP adapter in production
/// and by in-memory stubs in tests.
#[async_trait]
pub trait RosterSource: Send + Sync {
  /// Fetch the complete current roster. A malformed payload is a failure of
  /// the whole fetch, never a partial roster.
  async fn fetch_roster(&self) -> Result<Vec<Player>>;
}

/// Resolves a Discord id to profile data.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
  async fn fetch_profile(&self, id: DiscordId) -> Result<DiscordProfile>;
}
