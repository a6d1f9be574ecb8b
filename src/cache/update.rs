//! Incremental Update Module
//!
//! Helper for callers that already know a single node changed and want to
//! avoid a full tree refetch.

use std::sync::Arc;

use crate::cache::{CacheCoordinator, CacheKey};
use crate::tree::TreeNode;

// == Incremental Updater ==
/// Applies single-node replacements through the coordinator.
///
/// The replacement carries its own subtree; everything outside the target
/// node and its rebuilt ancestor chain is carried into the new entry
/// unchanged.
#[derive(Debug, Clone)]
pub struct IncrementalUpdater {
    coordinator: Arc<CacheCoordinator>,
}

impl IncrementalUpdater {
    /// Creates an updater over the given coordinator.
    pub fn new(coordinator: Arc<CacheCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Replaces `node_id` in the cached tree under `key` and stores the
    /// rebuilt entry. Returns false when the entry or node id is not found.
    pub async fn apply(&self, key: &CacheKey, node_id: &str, replacement: &TreeNode) -> bool {
        self.coordinator.update_node(key, node_id, replacement).await
    }
}
