use std::sync::Arc;
use std::time::Duration;

use spyglass_roster::RefreshOutcome;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use crate::AppState;
use crate::upstream::UpstreamClient;

/// Drive the refresh lifecycle on a fixed interval, forever
///
/// Each tick refreshes the roster, resolves missing Discord profiles and
/// updates occupancy. A failed refresh is logged and the previous roster
/// stays up; the next tick tries again.
pub async fn run(state: Arc<AppState>, upstream: Arc<UpstreamClient>, refresh_interval: Duration) {
    let mut ticker = interval(refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        match state.controller.refresh_roster().await {
            Ok(RefreshOutcome::Applied { players }) => {
                debug!("Roster refreshed: {} players", players);
            }
            Ok(RefreshOutcome::Superseded) => {
                debug!("Roster refresh superseded by a newer one");
            }
            Err(e) => {
                warn!("Roster refresh failed, serving previous roster: {}", e);
            }
        }

        let report = state.controller.resolve_profiles().await;
        if report.resolved > 0 || report.failed > 0 {
            debug!(
                "Profile lookups finished: {} resolved, {} failed",
                report.resolved, report.failed
            );
        }

        match upstream.fetch_server_summary().await {
            Ok(Some(summary)) => {
                *state.summary.write().await = Some(summary);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Server detail fetch failed: {}", e);
            }
        }
    }
}
