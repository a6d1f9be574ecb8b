//! Cache Warming Task
//!
//! Preloads the configured root keys at startup so first reads are instant.
//! Runs once in the background; failures are logged, never fatal.

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheKey;
use crate::refresh::RefreshOrchestrator;

/// How old a cached entry may be before warming refetches it.
const WARM_MAX_AGE_MS: u64 = 60 * 60 * 1000;

/// Spawns a one-shot task that preloads `keys` whose cache is missing or
/// stale. Each key is loaded independently so one failure does not stop the
/// rest.
pub fn spawn_warmup_task(orchestrator: RefreshOrchestrator, keys: Vec<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if keys.is_empty() {
            return;
        }
        info!(count = keys.len(), "warming cache");

        for raw in keys {
            let key = CacheKey::parse(&raw);
            if !orchestrator.coordinator().is_stale(&key, WARM_MAX_AGE_MS).await {
                debug!(key = %key, "cache already warm");
                continue;
            }
            match orchestrator.load(&key).await {
                Ok(snapshot) => {
                    debug!(key = %key, nodes = snapshot.node_count, "cache warmed");
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "cache warming failed");
                }
            }
        }
    })
}
