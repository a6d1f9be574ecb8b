//! Expired-Entry Cleanup Task
//!
//! Background task that periodically sweeps expired entries out of every
//! tier, keeping the durable namespaces from accumulating dead files.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheCoordinator;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task runs until aborted, sleeping for the configured interval between
/// sweeps. The returned handle is used to abort it during graceful shutdown.
pub fn spawn_cleanup_task(
    coordinator: Arc<CacheCoordinator>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting cache cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = coordinator.sweep_expired().await;
            if removed > 0 {
                info!("Cache cleanup: removed {} expired entries", removed);
            } else {
                debug!("Cache cleanup: no expired entries found");
            }
        }
    })
}
