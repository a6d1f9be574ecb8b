//! Refresh Module
//!
//! Stale-while-revalidate orchestration: serve cached trees immediately,
//! refresh them in the background, and republish only when the structure
//! actually changed.

mod orchestrator;
mod subscription;

pub use orchestrator::RefreshOrchestrator;
pub use subscription::TreeSubscription;

use serde::Serialize;

use crate::cache::{CacheEntry, CacheKey};
use crate::tree::TreeNode;

// == Tree Snapshot ==
/// What consumers receive: the tree plus the metadata needed to reason about
/// freshness and change.
#[derive(Debug, Clone, Serialize)]
pub struct TreeSnapshot {
    /// Root of the tree
    pub root: TreeNode,
    /// Structural fingerprint at publish time
    pub checksum: String,
    /// Last write time of the backing entry (Unix milliseconds)
    pub timestamp: u64,
    /// Number of nodes in the tree
    pub node_count: usize,
}

impl From<&CacheEntry> for TreeSnapshot {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            root: entry.root_node.clone(),
            checksum: entry.metadata.checksum.clone(),
            timestamp: entry.metadata.timestamp,
            node_count: entry.metadata.node_count,
        }
    }
}

// == Tree Event ==
/// Broadcast to subscribers when revalidation republishes a changed tree.
#[derive(Debug, Clone)]
pub struct TreeEvent {
    /// Key whose tree changed
    pub key: CacheKey,
    /// The republished snapshot
    pub snapshot: TreeSnapshot,
}
