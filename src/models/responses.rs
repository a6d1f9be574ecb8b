//! Response DTOs for the cache service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::refresh::TreeSnapshot;
use crate::tree::TreeNode;

/// Response body for tree reads (GET /tree/:key, POST /tree/:key/refresh)
#[derive(Debug, Clone, Serialize)]
pub struct TreeResponse {
    /// The requested cache key
    pub key: String,
    /// Structural fingerprint of the returned tree
    pub checksum: String,
    /// Last write time of the backing entry (Unix milliseconds)
    pub timestamp: u64,
    /// Number of nodes in the tree
    pub node_count: usize,
    /// The tree itself
    pub root: TreeNode,
}

impl TreeResponse {
    /// Creates a TreeResponse from a published snapshot.
    pub fn new(key: impl Into<String>, snapshot: TreeSnapshot) -> Self {
        Self {
            key: key.into(),
            checksum: snapshot.checksum,
            timestamp: snapshot.timestamp,
            node_count: snapshot.node_count,
            root: snapshot.root,
        }
    }
}

/// Response body for the node update operation
/// (PATCH /tree/:key/nodes/:node_id)
#[derive(Debug, Clone, Serialize)]
pub struct UpdateNodeResponse {
    /// Success message
    pub message: String,
    /// The cache key that was updated
    pub key: String,
    /// The node id that was replaced
    pub node_id: String,
}

impl UpdateNodeResponse {
    /// Creates a new UpdateNodeResponse.
    pub fn new(key: impl Into<String>, node_id: impl Into<String>) -> Self {
        let key = key.into();
        let node_id = node_id.into();
        Self {
            message: format!("Node '{}' updated in '{}'", node_id, key),
            key,
            node_id,
        }
    }
}

/// Response body for invalidation (DELETE /tree/:key, DELETE /tree)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    /// The invalidated key, absent for a full clear
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl InvalidateResponse {
    /// Creates a response for a single-key invalidation.
    pub fn for_key(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' invalidated across all tiers", key),
            key: Some(key),
        }
    }

    /// Creates a response for a full cache clear.
    pub fn for_all() -> Self {
        Self {
            message: "Cache cleared across all tiers".to_string(),
            key: None,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of reads served from any tier
    pub hits: u64,
    /// Number of reads that missed every tier
    pub misses: u64,
    /// Number of hits promoted upward from a slower tier
    pub promotions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Entries in the memory tier
    pub memory_entries: usize,
    /// Entries in the persistent tier namespace
    pub persistent_entries: usize,
    /// Bytes used by the persistent tier namespace
    pub persistent_bytes: u64,
    /// Entries in the bulk tier namespace
    pub bulk_entries: usize,
    /// Whether the bulk tier is available
    pub bulk_available: bool,
}

impl StatsResponse {
    /// Creates a StatsResponse from a coordinator snapshot.
    pub fn new(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            promotions: stats.promotions,
            memory_entries: stats.memory_entries,
            persistent_entries: stats.persistent_entries,
            persistent_bytes: stats.persistent_bytes,
            bulk_entries: stats.bulk_entries,
            bulk_available: stats.bulk_available,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp.
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;

    fn snapshot() -> TreeSnapshot {
        TreeSnapshot {
            root: TreeNode::new("root-1", "Root", NodeKind::Root),
            checksum: "abcd1234".to_string(),
            timestamp: 1_700_000_000_000,
            node_count: 1,
        }
    }

    #[test]
    fn test_tree_response_serialize() {
        let resp = TreeResponse::new("root-1", snapshot());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("root-1"));
        assert!(json.contains("abcd1234"));
        assert!(json.contains("node_count"));
    }

    #[test]
    fn test_update_node_response_serialize() {
        let resp = UpdateNodeResponse::new("root-1", "a1");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("a1"));
        assert!(json.contains("updated"));
    }

    #[test]
    fn test_invalidate_response_shapes() {
        let single = serde_json::to_string(&InvalidateResponse::for_key("root-1")).unwrap();
        assert!(single.contains("root-1"));

        let all = serde_json::to_string(&InvalidateResponse::for_all()).unwrap();
        assert!(!all.contains("\"key\""));
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 8,
            misses: 2,
            ..Default::default()
        };
        let resp = StatsResponse::new(stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
