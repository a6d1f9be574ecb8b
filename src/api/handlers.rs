//! API Handlers
//!
//! HTTP request handlers for each cache service endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{CacheCoordinator, CacheKey, IncrementalUpdater};
use crate::error::{CacheError, Result};
use crate::models::{
    requests::validate_key, HealthResponse, InvalidateResponse, StatsResponse, TreeResponse,
    UpdateNodeRequest, UpdateNodeResponse,
};
use crate::refresh::RefreshOrchestrator;
use crate::source::TreeSource;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Stale-while-revalidate front door
    pub orchestrator: RefreshOrchestrator,
    /// Single-node update helper
    pub updater: IncrementalUpdater,
}

impl AppState {
    /// Creates a new AppState over an orchestrator.
    pub fn new(orchestrator: RefreshOrchestrator) -> Self {
        let updater = IncrementalUpdater::new(orchestrator.coordinator().clone());
        Self {
            orchestrator,
            updater,
        }
    }

    /// Wires the full stack: coordinator, source, orchestrator, updater.
    pub fn wire(
        coordinator: Arc<CacheCoordinator>,
        source: Arc<dyn TreeSource>,
        poll_interval: Option<Duration>,
    ) -> Self {
        Self::new(RefreshOrchestrator::new(coordinator, source, poll_interval))
    }
}

fn parse_key(raw: &str) -> Result<CacheKey> {
    if let Some(error_msg) = validate_key(raw) {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    Ok(CacheKey::parse(raw))
}

/// Handler for GET /tree/:key
///
/// Returns the cached tree immediately when one exists (revalidating in the
/// background), otherwise fetches it from the source in the foreground.
pub async fn load_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TreeResponse>> {
    let cache_key = parse_key(&key)?;
    let snapshot = state.orchestrator.load(&cache_key).await?;
    Ok(Json(TreeResponse::new(key, snapshot)))
}

/// Handler for POST /tree/:key/refresh
///
/// Forces a revalidation and awaits its result. Joins an already-running
/// revalidation instead of fetching twice.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TreeResponse>> {
    let cache_key = parse_key(&key)?;
    let snapshot = state.orchestrator.refresh(&cache_key).await?;
    Ok(Json(TreeResponse::new(key, snapshot)))
}

/// Handler for PATCH /tree/:key/nodes/:node_id
///
/// Replaces a single node (and its subtree) in the cached tree, rebuilding
/// only the ancestor chain. 404 when the entry or node id is unknown.
pub async fn update_node_handler(
    State(state): State<AppState>,
    Path((key, node_id)): Path<(String, String)>,
    Json(req): Json<UpdateNodeRequest>,
) -> Result<Json<UpdateNodeResponse>> {
    let cache_key = parse_key(&key)?;
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    if !state.updater.apply(&cache_key, &node_id, &req.node).await {
        return Err(CacheError::NotFound(format!(
            "No cached node '{}' under key '{}'",
            node_id, key
        )));
    }
    Ok(Json(UpdateNodeResponse::new(key, node_id)))
}

/// Handler for DELETE /tree/:key
///
/// Removes one entry from every tier.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let cache_key = parse_key(&key)?;
    state.orchestrator.invalidate(Some(&cache_key)).await;
    Ok(Json(InvalidateResponse::for_key(key)))
}

/// Handler for DELETE /tree
///
/// Clears the entire cache namespace in every tier.
pub async fn invalidate_all_handler(
    State(state): State<AppState>,
) -> Json<InvalidateResponse> {
    state.orchestrator.invalidate(None).await;
    Json(InvalidateResponse::for_all())
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.orchestrator.coordinator().stats().await;
    Json(StatsResponse::new(stats))
}

/// Handler for GET /health
///
/// Returns health status of the service.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
