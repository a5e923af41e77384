mod cache;
mod error;
mod models;
mod source;
mod view;

pub use cache::ProfileCache;
pub use error::{Result, SourceError};
pub use models::{
  DiscordId, DiscordProfile, Player, PlayerCard, PlayerIdentity, RefreshHealth, RosterSnapshot,
  ServerSummary,
};
pub use source::{IdentityLookup, RosterSource};
pub use view::{
  DEFAULT_PAGE_SIZE, PageSize, SortDirection, SortKey, ViewState, apply_view, match_count,
};

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Avatar served for players without a resolved Discord profile.
pub const PLACEHOLDER_AVATAR: &str = "https://i.imgur.com/vneLxLB.png";

/// Construction parameters for [`RosterController`].
#[derive(Debug, Clone)]
pub struct ControllerOptions {
  /// View parameters before any intent arrives.
  pub initial_view: ViewState,
  /// Avatar URL substituted for missing profiles.
  pub placeholder_avatar: String,
}

impl Default for ControllerOptions {
  fn default() -> Self {
    Self {
      initial_view: ViewState::default(),
      placeholder_avatar: PLACEHOLDER_AVATAR.to_string(),
    }
  }
}

/// What a finished refresh did to the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
  /// The fetched roster replaced the previous one wholesale.
  Applied { players: usize },
  /// A newer refresh was issued while this one was in flight; the late
  /// result was discarded, whatever it was.
  Superseded,
}

/// Counts from one profile-resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupReport {
  pub resolved: usize,
  pub failed: usize,
}

/// Owns the roster, the view parameters and the profile cache, and publishes
/// a fresh [`RosterSnapshot`] on every observable change.
///
/// Cheap to clone; clones share state. Collaborators are injected, so the
/// whole refresh/resolve lifecycle can be driven in tests without a network.
#[derive(Clone)]
pub struct RosterController {
  source: Arc<dyn RosterSource>,
  lookup: Option<Arc<dyn IdentityLookup>>,
  state: Arc<Mutex<ControllerState>>,
  cache: Arc<ProfileCache>,
  snapshots: Arc<watch::Sender<RosterSnapshot>>,
  placeholder_avatar: Arc<str>,
}

#[derive(Debug)]
struct ControllerState {
  roster: Vec<Player>,
  view: ViewState,
  health: RefreshHealth,
}

impl RosterController {
  /// Build a controller over the given collaborators.
  ///
  /// `lookup` may be absent (deployment without a Discord lookup endpoint);
  /// profile resolution is then a no-op and every player keeps placeholder
  /// identity.
  pub fn new(
    source: Arc<dyn RosterSource>,
    lookup: Option<Arc<dyn IdentityLookup>>,
    options: ControllerOptions,
  ) -> Self {
    let initial = RosterSnapshot {
      players: Vec::new(),
      view: options.initial_view.clone(),
      roster_total: 0,
      matching: 0,
      health: RefreshHealth::default(),
    };
    let (snapshots, _) = watch::channel(initial);

    Self {
      source,
      lookup,
      state: Arc::new(Mutex::new(ControllerState {
        roster: Vec::new(),
        view: options.initial_view,
        health: RefreshHealth::default(),
      })),
      cache: Arc::new(ProfileCache::new()),
      snapshots: Arc::new(snapshots),
      placeholder_avatar: options.placeholder_avatar.into(),
    }
  }

  // ==========================================================================
  // Refresh
  // ==========================================================================

  /// Fetch the roster and replace the previous one wholesale.
  ///
  /// Exactly one fetch per call, issued outside the state lock. If another
  /// refresh is issued while this one's response is in flight, the late
  /// result is discarded and the newer refresh wins regardless of arrival
  /// order. A failed fetch leaves the previous roster untouched; subscribers
  /// see the failure only through [`RefreshHealth`].
  pub async fn refresh_roster(&self) -> Result<RefreshOutcome> {
    let generation = {
      let mut state = self.state.lock().await;
      state.health.generation += 1;
      state.health.generation
    };

    let fetched = self.source.fetch_roster().await;

    let mut state = self.state.lock().await;
    if state.health.generation != generation {
      match fetched {
        Ok(_) => debug!(generation, "discarding superseded roster"),
        Err(error) => debug!(generation, %error, "discarding superseded refresh failure"),
      }
      return Ok(RefreshOutcome::Superseded);
    }

    match fetched {
      Ok(roster) => {
        let players = roster.len();
        state.roster = roster;
        state.health.last_success_unix = Some(unix_now());
        state.health.consecutive_failures = 0;
        self.publish(&state).await;
        debug!(players, generation, "roster replaced");
        Ok(RefreshOutcome::Applied { players })
      }
      Err(error) => {
        state.health.consecutive_failures += 1;
        self.publish(&state).await;
        Err(error)
      }
    }
  }

  // ==========================================================================
  // Profile resolution
  // ==========================================================================

  /// Resolve Discord profiles for roster members that have none cached.
  ///
  /// One lookup per distinct id, all in flight at once. Lookups succeed or
  /// fail independently: each success is cached and published immediately,
  /// each failure leaves that player on placeholder identity until a later
  /// pass. The cache only ever grows, so completion order does not matter.
  pub async fn resolve_profiles(&self) -> LookupReport {
    let Some(lookup) = self.lookup.clone() else {
      return LookupReport::default();
    };

    let roster = {
      let state = self.state.lock().await;
      state.roster.clone()
    };
    let pending = self.cache.pending_ids(&roster).await;
    if pending.is_empty() {
      return LookupReport::default();
    }

    let mut lookups = JoinSet::new();
    for id in pending {
      let lookup = Arc::clone(&lookup);
      lookups.spawn(async move { (id, lookup.fetch_profile(id).await) });
    }

    let mut report = LookupReport::default();
    while let Some(joined) = lookups.join_next().await {
      let Ok((id, resolved)) = joined else {
        report.failed += 1;
        continue;
      };
      match resolved {
        Ok(profile) => {
          if self.cache.insert(id, profile).await {
            report.resolved += 1;
            let state = self.state.lock().await;
            self.publish(&state).await;
            debug!(%id, "discord profile cached");
          }
        }
        Err(error) => {
          report.failed += 1;
          warn!(%id, %error, "discord lookup failed");
        }
      }
    }
    report
  }

  // ==========================================================================
  // View transitions & snapshots
  // ==========================================================================

  /// Replace the search term and republish the derived view. No I/O.
  pub async fn set_search_term(&self, term: impl Into<String>) {
    let mut state = self.state.lock().await;
    state.view.search_term = term.into();
    self.publish(&state).await;
  }

  /// Replace the page size and republish the derived view. No I/O.
  pub async fn set_page_size(&self, page_size: PageSize) {
    let mut state = self.state.lock().await;
    state.view.page_size = page_size;
    self.publish(&state).await;
  }

  /// Replace the sort column and direction together and republish. No I/O.
  pub async fn set_sort(&self, key: SortKey, direction: SortDirection) {
    let mut state = self.state.lock().await;
    state.view.sort_key = key;
    state.view.sort_direction = direction;
    self.publish(&state).await;
  }

  /// Current view parameters.
  pub async fn view(&self) -> ViewState {
    self.state.lock().await.view.clone()
  }

  /// Subscribe to snapshot updates. The receiver always holds the latest
  /// published snapshot and is notified on every roster replacement, cached
  /// profile and view transition.
  pub fn subscribe(&self) -> watch::Receiver<RosterSnapshot> {
    self.snapshots.subscribe()
  }

  /// The latest published snapshot.
  pub fn snapshot(&self) -> RosterSnapshot {
    self.snapshots.borrow().clone()
  }

  /// Resolved-profile count, for status reporting.
  pub fn cached_profiles(&self) -> usize {
    self.cache.len()
  }

  async fn publish(&self, state: &ControllerState) {
    let visible = apply_view(&state.roster, &state.view);
    let mut players = Vec::with_capacity(visible.len());
    for player in visible {
      players.push(self.card(player).await);
    }

    let snapshot = RosterSnapshot {
      players,
      view: state.view.clone(),
      roster_total: state.roster.len(),
      matching: match_count(&state.roster, &state.view.search_term),
      health: state.health.clone(),
    };
    self.snapshots.send_replace(snapshot);
  }

  async fn card(&self, player: Player) -> PlayerCard {
    let profile = match player.identity.discord {
      Some(id) => self.cache.get(id).await,
      None => None,
    };
    let (discord_username, avatar_url) = match profile {
      Some(profile) => (
        profile.username,
        profile
          .avatar_url
          .unwrap_or_else(|| self.placeholder_avatar.to_string()),
      ),
      None => (String::new(), self.placeholder_avatar.to_string()),
    };

    PlayerCard {
      id: player.id,
      name: player.name,
      ping: player.ping,
      discord_username,
      avatar_url,
      steam: player.identity.steam,
    }
  }
}

fn unix_now() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs() as i64)
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::collections::{HashMap, VecDeque};
  use std::sync::atomic::{AtomicUsize, Ordering};
  use tokio::sync::Notify;

  fn player(id: u32, name: &str, ping: u32) -> Player {
    Player {
      id,
      name: name.to_string(),
      ping,
      identity: PlayerIdentity::default(),
    }
  }

  fn player_with_discord(id: u32, name: &str, ping: u32, discord: u64) -> Player {
    Player {
      id,
      name: name.to_string(),
      ping,
      identity: PlayerIdentity {
        discord: Some(DiscordId(discord)),
        steam: None,
      },
    }
  }

  fn profile(username: &str, avatar_url: Option<&str>) -> DiscordProfile {
    DiscordProfile {
      username: username.to_string(),
      avatar_url: avatar_url.map(str::to_string),
    }
  }

  /// Returns the same roster on every fetch.
  struct StaticRoster(Vec<Player>);

  #[async_trait]
  impl RosterSource for StaticRoster {
    async fn fetch_roster(&self) -> Result<Vec<Player>> {
      Ok(self.0.clone())
    }
  }

  /// Returns scripted responses in order, then errors.
  struct ScriptedRoster(std::sync::Mutex<VecDeque<Result<Vec<Player>>>>);

  impl ScriptedRoster {
    fn new(responses: Vec<Result<Vec<Player>>>) -> Self {
      Self(std::sync::Mutex::new(responses.into_iter().collect()))
    }
  }

  #[async_trait]
  impl RosterSource for ScriptedRoster {
    async fn fetch_roster(&self) -> Result<Vec<Player>> {
      self
        .0
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(SourceError::Request("script exhausted".to_string())))
    }
  }

  /// First fetch blocks until released, later fetches return immediately.
  struct StallingRoster {
    entered: Arc<Notify>,
    release: Arc<Notify>,
    calls: AtomicUsize,
  }

  #[async_trait]
  impl RosterSource for StallingRoster {
    async fn fetch_roster(&self) -> Result<Vec<Player>> {
      if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(vec![player(9, "Stale", 99)])
      } else {
        Ok(vec![player(1, "Fresh", 10)])
      }
    }
  }

  /// Resolves from a fixed map, counting every fetch.
  struct MapLookup {
    profiles: HashMap<u64, DiscordProfile>,
    calls: AtomicUsize,
  }

  impl MapLookup {
    fn new(entries: Vec<(u64, DiscordProfile)>) -> Self {
      Self {
        profiles: entries.into_iter().collect(),
        calls: AtomicUsize::new(0),
      }
    }
  }

  #[async_trait]
  impl IdentityLookup for MapLookup {
    async fn fetch_profile(&self, id: DiscordId) -> Result<DiscordProfile> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self
        .profiles
        .get(&id.0)
        .cloned()
        .ok_or(SourceError::Status(404))
    }
  }

  /// Blocks every lookup until released.
  struct GatedLookup {
    release: Arc<Notify>,
    profile: DiscordProfile,
  }

  #[async_trait]
  impl IdentityLookup for GatedLookup {
    async fn fetch_profile(&self, _id: DiscordId) -> Result<DiscordProfile> {
      self.release.notified().await;
      Ok(self.profile.clone())
    }
  }

  #[tokio::test]
  async fn test_refresh_replaces_roster_wholesale() {
    let source = Arc::new(ScriptedRoster::new(vec![
      Ok(vec![player(1, "Ann", 10), player(2, "bob", 20)]),
      Ok(vec![player(7, "Cid", 30)]),
    ]));
    let controller = RosterController::new(source, None, ControllerOptions::default());

    let outcome = controller.refresh_roster().await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Applied { players: 2 });
    assert_eq!(controller.snapshot().roster_total, 2);

    // The second roster fully replaces the first; nothing is merged.
    controller.refresh_roster().await.unwrap();
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.roster_total, 1);
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(snapshot.players[0].id, 7);
  }

  #[tokio::test]
  async fn test_refresh_failure_keeps_previous_roster() {
    let source = Arc::new(ScriptedRoster::new(vec![
      Ok(vec![player(1, "Ann", 10), player(2, "bob", 20)]),
      Err(SourceError::Status(500)),
      Ok(vec![player(1, "Ann", 10)]),
    ]));
    let controller = RosterController::new(source, None, ControllerOptions::default());

    controller.refresh_roster().await.unwrap();
    let before = controller.snapshot();

    // The failing refresh reports the error to the caller but subscribers
    // keep the previous roster, flagged stale.
    let result = controller.refresh_roster().await;
    assert!(result.is_err());

    let after = controller.snapshot();
    assert_eq!(after.players, before.players);
    assert_eq!(after.roster_total, 2);
    assert_eq!(after.health.consecutive_failures, 1);
    assert!(after.health.is_stale());

    // A later success clears the staleness.
    controller.refresh_roster().await.unwrap();
    let recovered = controller.snapshot();
    assert_eq!(recovered.roster_total, 1);
    assert_eq!(recovered.health.consecutive_failures, 0);
    assert!(!recovered.health.is_stale());
  }

  #[tokio::test]
  async fn test_refresh_failure_with_empty_roster_stays_empty() {
    let source = Arc::new(ScriptedRoster::new(vec![Err(SourceError::Request(
      "connection refused".to_string(),
    ))]));
    let controller = RosterController::new(source, None, ControllerOptions::default());

    assert!(controller.refresh_roster().await.is_err());
    let snapshot = controller.snapshot();
    assert!(snapshot.players.is_empty());
    assert!(snapshot.health.is_stale());
  }

  #[tokio::test]
  async fn test_superseded_refresh_is_discarded() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let source = Arc::new(StallingRoster {
      entered: entered.clone(),
      release: release.clone(),
      calls: AtomicUsize::new(0),
    });
    let controller = RosterController::new(source, None, ControllerOptions::default());

    // First refresh stalls inside its fetch.
    let stalled = tokio::spawn({
      let controller = controller.clone();
      async move { controller.refresh_roster().await }
    });
    entered.notified().await;

    // Second refresh completes while the first is still in flight.
    let outcome = controller.refresh_roster().await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Applied { players: 1 });

    // The stalled response arrives last but loses to the newer generation.
    release.notify_one();
    let outcome = stalled.await.unwrap().unwrap();
    assert_eq!(outcome, RefreshOutcome::Superseded);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(snapshot.players[0].name, "Fresh");
  }

  #[tokio::test]
  async fn test_resolve_profiles_populates_cards_progressively() {
    let source = Arc::new(StaticRoster(vec![
      player_with_discord(1, "Ann", 10, 111),
      player(2, "bob", 20),
    ]));
    let release = Arc::new(Notify::new());
    let lookup = Arc::new(GatedLookup {
      release: release.clone(),
      profile: profile("ann#0", Some("https://cdn.example/ann.png")),
    });
    let controller = RosterController::new(source, Some(lookup), ControllerOptions::default());

    controller.refresh_roster().await.unwrap();

    let resolving = tokio::spawn({
      let controller = controller.clone();
      async move { controller.resolve_profiles().await }
    });

    // Roster renders before the lookup lands.
    let before = controller.snapshot();
    assert_eq!(before.players.len(), 2);
    assert_eq!(before.players[0].discord_username, "");
    assert_eq!(before.players[0].avatar_url, PLACEHOLDER_AVATAR);

    release.notify_one();
    let report = resolving.await.unwrap();
    assert_eq!(report, LookupReport { resolved: 1, failed: 0 });

    // Same membership and order, identity filled in.
    let after = controller.snapshot();
    let ids: Vec<u32> = after.players.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(after.players[0].discord_username, "ann#0");
    assert_eq!(after.players[0].avatar_url, "https://cdn.example/ann.png");
    assert_eq!(after.players[1].discord_username, "");
    assert!(controller.cache.get(DiscordId(111)).await.is_some());
  }

  #[tokio::test]
  async fn test_resolve_profiles_failures_are_isolated() {
    let source = Arc::new(StaticRoster(vec![
      player_with_discord(1, "Ann", 10, 111),
      player_with_discord(2, "bob", 20, 222),
    ]));
    let lookup = Arc::new(MapLookup::new(vec![(111, profile("ann#0", None))]));
    let controller = RosterController::new(source, Some(lookup), ControllerOptions::default());

    controller.refresh_roster().await.unwrap();
    let report = controller.resolve_profiles().await;
    assert_eq!(report, LookupReport { resolved: 1, failed: 1 });

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.players[0].discord_username, "ann#0");
    assert_eq!(snapshot.players[1].discord_username, "");
    assert_eq!(snapshot.players[1].avatar_url, PLACEHOLDER_AVATAR);
  }

  #[tokio::test]
  async fn test_profile_cache_grows_monotonically() {
    let source = Arc::new(ScriptedRoster::new(vec![
      Ok(vec![player_with_discord(1, "Ann", 10, 111)]),
      Ok(vec![
        player_with_discord(1, "Ann", 10, 111),
        player_with_discord(2, "bob", 20, 222),
      ]),
    ]));
    let lookup = Arc::new(MapLookup::new(vec![
      (111, profile("ann#0", None)),
      (222, profile("bob#1", None)),
    ]));
    let controller =
      RosterController::new(source, Some(lookup.clone()), ControllerOptions::default());

    controller.refresh_roster().await.unwrap();
    controller.resolve_profiles().await;
    assert_eq!(controller.cached_profiles(), 1);

    controller.refresh_roster().await.unwrap();
    controller.resolve_profiles().await;
    assert_eq!(controller.cached_profiles(), 2);

    // The earlier entry survived and the cached id was not fetched again.
    let cached = controller.cache.get(DiscordId(111)).await.unwrap();
    assert_eq!(cached.username, "ann#0");
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_resolve_profiles_without_lookup_is_a_noop() {
    let source = Arc::new(StaticRoster(vec![player_with_discord(1, "Ann", 10, 111)]));
    let controller = RosterController::new(source, None, ControllerOptions::default());

    controller.refresh_roster().await.unwrap();
    let report = controller.resolve_profiles().await;
    assert_eq!(report, LookupReport::default());
    assert_eq!(controller.cached_profiles(), 0);
  }

  #[tokio::test]
  async fn test_setters_republish_the_derived_view() {
    let source = Arc::new(StaticRoster(vec![
      player(1, "Ann", 30),
      player(2, "bob", 10),
      player(3, "Abe", 20),
    ]));
    let controller = RosterController::new(source, None, ControllerOptions::default());
    controller.refresh_roster().await.unwrap();

    controller.set_search_term("a").await;
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.view.search_term, "a");
    assert_eq!(snapshot.matching, 2);
    let ids: Vec<u32> = snapshot.players.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 3]);

    controller.set_sort(SortKey::Ping, SortDirection::Descending).await;
    controller.set_page_size(PageSize::limited(1)).await;
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(snapshot.players[0].id, 1);
    assert_eq!(snapshot.matching, 2);
  }

  #[tokio::test]
  async fn test_subscribers_see_every_update() {
    let source = Arc::new(StaticRoster(vec![player(1, "Ann", 10)]));
    let controller = RosterController::new(source, None, ControllerOptions::default());
    let mut updates = controller.subscribe();

    assert!(updates.borrow().players.is_empty());

    controller.refresh_roster().await.unwrap();
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow_and_update().players.len(), 1);

    controller.set_search_term("nobody").await;
    updates.changed().await.unwrap();
    assert!(updates.borrow_and_update().players.is_empty());
  }

  #[tokio::test]
  async fn test_avatar_falls_back_when_profile_has_none() {
    let source = Arc::new(StaticRoster(vec![player_with_discord(1, "Ann", 10, 111)]));
    let lookup = Arc::new(MapLookup::new(vec![(111, profile("ann#0", None))]));
    let controller = RosterController::new(source, Some(lookup), ControllerOptions::default());

    controller.refresh_roster().await.unwrap();
    controller.resolve_profiles().await;

    let card = &controller.snapshot().players[0];
    assert_eq!(card.discord_username, "ann#0");
    assert_eq!(card.avatar_url, PLACEHOLDER_AVATAR);
  }

  #[tokio::test]
  async fn test_steam_identity_passes_through_to_cards() {
    let source = Arc::new(StaticRoster(vec![Player {
      id: 1,
      name: "Ann".to_string(),
      ping: 10,
      identity: PlayerIdentity {
        discord: None,
        steam: Some("110000112345678".to_string()),
      },
    }]));
    let controller = RosterController::new(source, None, ControllerOptions::default());

    controller.refresh_roster().await.unwrap();
    let card = &controller.snapshot().players[0];
    assert_eq!(card.steam.as_deref(), Some("110000112345678"));
    assert_eq!(card.discord_username, "");
    assert_eq!(card.avatar_url, PLACEHOLDER_AVATAR);
  }
}
