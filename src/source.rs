//! Tree Source Module
//!
//! Seam to the external collaborator that supplies nodes and children, plus
//! the recursive assembly of full trees from it.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::CacheKey;
use crate::error::{CacheError, Result};
use crate::tree::{NodeKind, TreeNode};

// == Node Descriptor ==
/// A single node as the source collaborator describes it.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeDescriptor {
    /// Node identifier
    pub id: String,
    /// Source-side title, used as the tree label
    pub title: String,
    /// Source-side type tag (upper snake case)
    #[serde(rename = "nodeType")]
    pub node_type: String,
    /// Optional grouping category
    #[serde(default)]
    pub category: Option<String>,
    /// Whether the node is immutable in the source hierarchy
    #[serde(default)]
    pub immutable: bool,
    /// Opaque caller data carried through to the tree
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl NodeDescriptor {
    /// Converts the descriptor into a childless tree node.
    pub fn into_tree_node(self) -> TreeNode {
        TreeNode {
            kind: kind_for(&self.node_type),
            id: self.id,
            label: self.title,
            category: self.category,
            immutable: self.immutable,
            metadata: self.metadata,
            children: Vec::new(),
        }
    }
}

/// Maps source-side type tags onto tree node kinds. Unknown tags become
/// artifacts.
fn kind_for(node_type: &str) -> NodeKind {
    match node_type.to_ascii_uppercase().as_str() {
        "REALITY" | "ROOT" => NodeKind::Root,
        "UNIVERSAL_FOUNDATION" | "CONSTRAINT" => NodeKind::Constraint,
        "CATEGORY" => NodeKind::Category,
        "LAW" => NodeKind::Law,
        "PRINCIPLE" => NodeKind::Principle,
        "FRAMEWORK" => NodeKind::Framework,
        _ => NodeKind::Artifact,
    }
}

// == Tree Source Trait ==
/// The tree-fetching collaborator. The cache never interprets the source's
/// data beyond assembling descriptors into a tree.
#[async_trait]
pub trait TreeSource: Send + Sync {
    /// Fetches a single node, optionally resolved through a lens.
    async fn get_node(&self, id: &str, lens: Option<&str>) -> Result<NodeDescriptor>;

    /// Fetches the ordered children of a node.
    async fn get_children(&self, id: &str) -> Result<Vec<NodeDescriptor>>;
}

// == Tree Assembly ==
/// Fetches the full tree for `key` by recursively loading each node together
/// with its children.
pub async fn fetch_tree(source: &dyn TreeSource, key: &CacheKey) -> Result<TreeNode> {
    load_subtree(source, key.root_id(), key.lens()).await
}

fn load_subtree<'a>(
    source: &'a dyn TreeSource,
    id: &'a str,
    lens: Option<&'a str>,
) -> Pin<Box<dyn Future<Output = Result<TreeNode>> + Send + 'a>> {
    Box::pin(async move {
        let (descriptor, children) =
            tokio::join!(source.get_node(id, lens), source.get_children(id));

        let mut node = descriptor?.into_tree_node();
        for child in children? {
            node.children
                .push(load_subtree(source, &child.id, lens).await?);
        }
        Ok(node)
    })
}

// == Remote Tree Source ==
/// HTTP-backed tree source talking to the hierarchy node API.
#[derive(Debug, Clone)]
pub struct RemoteTreeSource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct NodeResponse {
    node: NodeDescriptor,
}

#[derive(Deserialize)]
struct ChildrenResponse {
    children: Vec<NodeDescriptor>,
}

impl RemoteTreeSource {
    /// Creates a source rooted at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl TreeSource for RemoteTreeSource {
    async fn get_node(&self, id: &str, lens: Option<&str>) -> Result<NodeDescriptor> {
        let mut request = self
            .client
            .get(format!("{}/nodes/{}", self.base_url, id));
        if let Some(lens) = lens {
            request = request.query(&[("lens", lens)]);
        }

        let response: NodeResponse = request
            .send()
            .await?
            .error_for_status()
            .map_err(|err| CacheError::Source(err.to_string()))?
            .json()
            .await?;
        Ok(response.node)
    }

    async fn get_children(&self, id: &str) -> Result<Vec<NodeDescriptor>> {
        let response: ChildrenResponse = self
            .client
            .get(format!("{}/nodes/{}/children", self.base_url, id))
            .send()
            .await?
            .error_for_status()
            .map_err(|err| CacheError::Source(err.to_string()))?
            .json()
            .await?;
        Ok(response.children)
    }
}
