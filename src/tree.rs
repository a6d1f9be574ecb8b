//! Tree Model Module
//!
//! Defines the hierarchical tree nodes held by cache entries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// == Node Kind ==
/// Classification of a node within the knowledge hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Root of a hierarchy
    Root,
    /// Universal constraint node
    Constraint,
    /// Grouping category
    Category,
    /// Law node
    Law,
    /// Principle node
    Principle,
    /// Framework node
    Framework,
    /// Leaf artifact (agents, environments, attachments)
    Artifact,
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Artifact
    }
}

// == Tree Node ==
/// A single node in the cached hierarchy.
///
/// Nodes are immutable value objects from the cache's perspective: an update
/// replaces a node (and rebuilds its ancestor chain) rather than mutating it
/// in place, so a served snapshot never aliases a later one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Node identifier, unique within a tree
    pub id: String,
    /// Display label
    pub label: String,
    /// Node classification
    #[serde(rename = "nodeType")]
    pub kind: NodeKind,
    /// Optional grouping category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Whether the node is immutable in the source hierarchy
    #[serde(default)]
    pub immutable: bool,
    /// Opaque caller data, not interpreted by the cache
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Ordered child nodes
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    // == Constructor ==
    /// Creates a leaf node with the given id, label and kind.
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            category: None,
            immutable: false,
            metadata: HashMap::new(),
            children: Vec::new(),
        }
    }

    // == Node Count ==
    /// Returns the number of nodes reachable from this node, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    // == Collect Ids ==
    /// Collects the ids of all reachable nodes in depth-first order.
    pub fn collect_ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(self.node_count());
        self.collect_ids_into(&mut ids);
        ids
    }

    fn collect_ids_into(&self, ids: &mut Vec<String>) {
        ids.push(self.id.clone());
        for child in &self.children {
            child.collect_ids_into(ids);
        }
    }

    // == Flatten ==
    /// Builds the flattened `id -> node` index over all reachable nodes.
    pub fn build_node_map(&self) -> HashMap<String, TreeNode> {
        let mut map = HashMap::with_capacity(self.node_count());
        self.build_node_map_into(&mut map);
        map
    }

    fn build_node_map_into(&self, map: &mut HashMap<String, TreeNode>) {
        map.insert(self.id.clone(), self.clone());
        for child in &self.children {
            child.build_node_map_into(map);
        }
    }

    // == Find ==
    /// Looks up a node by id anywhere in this subtree.
    pub fn find(&self, node_id: &str) -> Option<&TreeNode> {
        if self.id == node_id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(node_id))
    }

    // == Replace Node ==
    /// Produces a new tree with the node identified by `node_id` replaced by
    /// `replacement` (including its subtree).
    ///
    /// Only the ancestor chain of the replaced node is rebuilt; sibling
    /// subtrees are carried over unchanged. Returns `None` when `node_id` is
    /// not reachable from this node.
    pub fn with_node_replaced(&self, node_id: &str, replacement: &TreeNode) -> Option<TreeNode> {
        if self.id == node_id {
            return Some(replacement.clone());
        }

        // Rewrite the first child subtree that contains the target; all
        // other children are moved over untouched.
        let position = self
            .children
            .iter()
            .position(|child| child.find(node_id).is_some())?;

        let mut children = self.children.clone();
        children[position] = self.children[position].with_node_replaced(node_id, replacement)?;

        Some(TreeNode {
            children,
            ..self.clone()
        })
    }
}
