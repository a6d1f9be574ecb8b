//! Shared test fixtures: an in-process tree source serving a swappable tree.

// Each test binary compiles this module independently and uses a subset of it.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use hierarchy_cache::error::{CacheError, Result};
use hierarchy_cache::source::{NodeDescriptor, TreeSource};
use hierarchy_cache::tree::{NodeKind, TreeNode};

/// Builds a root node with flat children.
pub fn tree(root_id: &str, child_ids: &[&str]) -> TreeNode {
    let mut root = TreeNode::new(root_id, root_id.to_uppercase(), NodeKind::Root);
    for id in child_ids {
        root.children
            .push(TreeNode::new(*id, id.to_uppercase(), NodeKind::Category));
    }
    root
}

/// Tree source backed by a swappable in-memory tree, with fetch accounting
/// and a failure switch.
pub struct ScriptedSource {
    tree: Mutex<TreeNode>,
    fetches: AtomicUsize,
    fail: AtomicBool,
}

impl ScriptedSource {
    pub fn serving(tree: TreeNode) -> Self {
        Self {
            tree: Mutex::new(tree),
            fetches: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Replaces the served tree.
    pub fn swap(&self, tree: TreeNode) {
        *self.tree.lock().unwrap() = tree;
    }

    /// Number of full-tree fetches observed (root node lookups).
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Makes every subsequent fetch fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn descriptor(node: &TreeNode) -> NodeDescriptor {
        NodeDescriptor {
            id: node.id.clone(),
            title: node.label.clone(),
            node_type: "CATEGORY".to_string(),
            category: node.category.clone(),
            immutable: node.immutable,
            metadata: node.metadata.clone(),
        }
    }
}

#[async_trait]
impl TreeSource for ScriptedSource {
    async fn get_node(&self, id: &str, _lens: Option<&str>) -> Result<NodeDescriptor> {
        if self.tree.lock().unwrap().id == id {
            self.fetches.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CacheError::Source("scripted failure".to_string()));
        }
        let tree = self.tree.lock().unwrap();
        tree.find(id)
            .map(Self::descriptor)
            .ok_or_else(|| CacheError::Source(format!("unknown node {id}")))
    }

    async fn get_children(&self, id: &str) -> Result<Vec<NodeDescriptor>> {
        let tree = self.tree.lock().unwrap();
        let node = tree
            .find(id)
            .ok_or_else(|| CacheError::Source(format!("unknown node {id}")))?;
        Ok(node.children.iter().map(Self::descriptor).collect())
    }
}
