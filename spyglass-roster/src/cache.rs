//! In-memory cache of resolved Discord profiles.
//!
//! Additive-only for the process lifetime: an entry is created the first time
//! a Discord id resolves and is never refreshed or evicted. A restart is the
//! invalidation mechanism; profiles change rarely enough that this matches
//! how the dashboard is actually operated.

use crate::models::{DiscordId, DiscordProfile, Player};

/// Thread-safe profile store. Uses scc::HashMap for lock-free access while
/// lookups fan out concurrently.
pub struct ProfileCache {
    profiles: scc::HashMap<DiscordId, DiscordProfile>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self {
            profiles: scc::HashMap::new(),
        }
    }

    /// Insert a resolved profile. The first write for an id wins; later
    /// writes are dropped so cached data never changes mid-session.
    /// Returns whether the profile was actually inserted.
    pub async fn insert(&self, id: DiscordId, profile: DiscordProfile) -> bool {
        self.profiles.insert_async(id, profile).await.is_ok()
    }

    /// Look up a cached profile.
    pub async fn get(&self, id: DiscordId) -> Option<DiscordProfile> {
        self.profiles.read_async(&id, |_, profile| profile.clone()).await
    }

    pub async fn contains(&self, id: DiscordId) -> bool {
        self.profiles.contains_async(&id).await
    }

    /// Number of cached profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Distinct Discord ids present in the roster with no cached profile.
    pub async fn pending_ids(&self, roster: &[Player]) -> Vec<DiscordId> {
        let mut pending = Vec::new();
        for player in roster {
            let Some(id) = player.identity.discord else {
                continue;
            };
            if !pending.contains(&id) && !self.contains(id).await {
                pending.push(id);
            }
        }
        pending
    }
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new()
    }
}
