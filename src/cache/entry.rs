//! Cache Entry Module
//!
//! Defines the cache key and the per-key unit stored by every tier.

use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::cache::checksum;
use crate::cache::STORAGE_KEY_PREFIX;
use crate::tree::TreeNode;

// == Cache Key ==
/// Identifies a cached tree: a root node id plus an optional lens qualifier.
///
/// A lens is an alternate resolution context for the same root (child
/// references resolve differently under it), so two lenses over one root are
/// distinct entries that share no tier state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CacheKey {
    root: String,
    lens: Option<String>,
}

impl CacheKey {
    /// Creates a key for a root id without a lens.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            lens: None,
        }
    }

    /// Creates a key for a root id viewed through a lens.
    pub fn with_lens(root: impl Into<String>, lens: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            lens: Some(lens.into()),
        }
    }

    /// Parses the `root` or `root::lens` textual form.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once("::") {
            Some((root, lens)) if !lens.is_empty() => Self::with_lens(root, lens),
            _ => Self::new(raw),
        }
    }

    /// The root node id this key caches.
    pub fn root_id(&self) -> &str {
        &self.root
    }

    /// The lens qualifier, if any.
    pub fn lens(&self) -> Option<&str> {
        self.lens.as_deref()
    }

    /// Namespaced, filesystem-safe key used by the durable tiers.
    ///
    /// All keys share a fixed prefix so the durable stores can be scanned and
    /// cleared without touching unrelated data in the same directory.
    pub fn storage_key(&self) -> String {
        let mut key = format!("{}-{}", STORAGE_KEY_PREFIX, sanitize(&self.root));
        if let Some(lens) = &self.lens {
            key.push_str("--");
            key.push_str(&sanitize(lens));
        }
        key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lens {
            Some(lens) => write!(f, "{}::{}", self.root, lens),
            None => write!(f, "{}", self.root),
        }
    }
}

impl From<String> for CacheKey {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}

/// Maps key text onto the characters the durable tiers accept in file names.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// == Cache Metadata ==
/// Bookkeeping persisted alongside every cached tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Cache format version the entry was written with
    pub version: String,
    /// Last write time (Unix milliseconds)
    pub timestamp: u64,
    /// Number of nodes reachable from the root
    pub node_count: usize,
    /// Structural fingerprint of the tree
    pub checksum: String,
    /// Textual form of the cache key
    pub root_key: String,
}

// == Cache Entry ==
/// The unit stored per key: the tree, its metadata, and a flattened index.
///
/// `node_map` is always exactly the set of nodes reachable from `root_node`;
/// it is rebuilt on every write and never maintained independently, so a
/// single-node lookup stays O(1) without risking drift from the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Root of the cached tree
    pub root_node: TreeNode,
    /// Entry bookkeeping
    pub metadata: CacheMetadata,
    /// Flattened `id -> node` index over the tree
    pub node_map: HashMap<String, TreeNode>,
}

impl CacheEntry {
    // == Constructor ==
    /// Builds a fresh entry for `root_node` under `key`, stamped with the
    /// given format version and the current time.
    pub fn build(key: &CacheKey, root_node: TreeNode, version: &str) -> Self {
        let node_map = root_node.build_node_map();
        let checksum = checksum(&root_node);

        Self {
            metadata: CacheMetadata {
                version: version.to_string(),
                timestamp: current_timestamp_ms(),
                node_count: node_map.len(),
                checksum,
                root_key: key.to_string(),
            },
            root_node,
            node_map,
        }
    }

    // == Age ==
    /// Milliseconds elapsed since the entry was last written.
    pub fn age_ms(&self) -> u64 {
        current_timestamp_ms().saturating_sub(self.metadata.timestamp)
    }

    // == Is Expired ==
    /// Whether the entry has outlived `ttl_ms`.
    ///
    /// Boundary condition: an entry is expired once its age reaches the TTL,
    /// so a zero TTL expires everything immediately.
    pub fn is_expired(&self, ttl_ms: u64) -> bool {
        self.age_ms() >= ttl_ms
    }

    // == Node Lookup ==
    /// O(1) lookup of a node by id via the flattened index.
    pub fn node(&self, node_id: &str) -> Option<&TreeNode> {
        self.node_map.get(node_id)
    }

    /// Stamps the entry with the current time, leaving the tree, checksum and
    /// index untouched. Used when revalidation finds no structural change.
    pub fn touched(mut self) -> Self {
        self.metadata.timestamp = current_timestamp_ms();
        self
    }
}

// == Utility Functions ==
/// Returns the current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
