use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum_macros::debug_handler;
use serde::{Deserialize, Serialize};
use spyglass_roster::{RefreshHealth, RosterSnapshot, ServerSummary, SortDirection, SortKey};

use crate::AppState;
use crate::error::ApiError;
use crate::validation::{self, PageSizeParam};

/// Requested changes to the derived view
///
/// Every field is optional; absent fields keep their current value. Sort key
/// and direction can be sent alone, the other half is carried over.
#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    pub search_term: Option<String>,
    pub page_size: Option<PageSizeParam>,
    pub sort_key: Option<String>,
    pub sort_direction: Option<String>,
}

/// Status payload: occupancy plus roster freshness
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerSummary>,
    pub roster_total: usize,
    pub cached_profiles: usize,
    pub stale: bool,
    pub health: RefreshHealth,
}

/// Get the latest published roster snapshot
#[debug_handler]
pub async fn get_players(State(state): State<Arc<AppState>>) -> Json<RosterSnapshot> {
    Json(state.controller.snapshot())
}

/// Apply a view intent and return the resulting snapshot
pub async fn update_view(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ViewRequest>,
) -> Result<Json<RosterSnapshot>, ApiError> {
    // Validate the whole intent before applying any part of it.
    if let Some(term) = &request.search_term {
        validation::validate_search_term(term)?;
    }
    let page_size = request
        .page_size
        .as_ref()
        .map(validation::parse_page_size)
        .transpose()?;

    if let Some(term) = request.search_term {
        state.controller.set_search_term(term).await;
    }
    if let Some(page_size) = page_size {
        state.controller.set_page_size(page_size).await;
    }
    if request.sort_key.is_some() || request.sort_direction.is_some() {
        let current = state.controller.view().await;
        let key = request
            .sort_key
            .as_deref()
            .map(SortKey::parse_or_default)
            .unwrap_or(current.sort_key);
        let direction = request
            .sort_direction
            .as_deref()
            .map(SortDirection::parse_or_default)
            .unwrap_or(current.sort_direction);
        state.controller.set_sort(key, direction).await;
    }

    Ok(Json(state.controller.snapshot()))
}

/// Get server occupancy and roster freshness
#[debug_handler]
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.controller.snapshot();
    let server = *state.summary.read().await;

    Json(StatusResponse {
        server,
        roster_total: snapshot.roster_total,
        cached_profiles: state.controller.cached_profiles(),
        stale: snapshot.health.is_stale(),
        health: snapshot.health,
    })
}
