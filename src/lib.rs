//! Hierarchy Cache - a multi-tier cache service for knowledge trees
//!
//! Serves cached hierarchy trees instantly while revalidating them in the
//! background, with structural-checksum change detection and single-node
//! incremental updates.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod refresh;
pub mod source;
pub mod tasks;
pub mod tree;

pub use api::AppState;
pub use cache::{CacheCoordinator, CacheKey, IncrementalUpdater};
pub use config::Config;
pub use refresh::{RefreshOrchestrator, TreeSnapshot, TreeSubscription};
pub use source::{RemoteTreeSource, TreeSource};
pub use tasks::{spawn_cleanup_task, spawn_warmup_task};
pub use tree::{NodeKind, TreeNode};
