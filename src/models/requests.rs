//! Request DTOs for the cache service API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::tree::TreeNode;

/// Maximum accepted cache key length in characters.
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the node update operation
/// (PATCH /tree/:key/nodes/:node_id)
///
/// # Fields
/// - `node`: Replacement node, including any replacement subtree
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNodeRequest {
    /// The replacement node
    pub node: TreeNode,
}

impl UpdateNodeRequest {
    /// Validates the request data.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.node.id.is_empty() {
            return Some("Replacement node id cannot be empty".to_string());
        }
        None
    }
}

/// Validates a cache key taken from the request path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}
