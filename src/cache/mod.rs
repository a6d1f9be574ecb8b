//! Cache Module
//!
//! Multi-tier storage for hierarchy trees: a fast in-process tier backed by
//! two durable tiers, with stale-entry expiry and format versioning.

mod bulk;
mod checksum;
mod coordinator;
pub mod entry;
mod memory;
mod persistent;
mod stats;
mod update;


// Re-export public types
pub use bulk::BulkTier;
pub use checksum::checksum;
pub use coordinator::{CacheCoordinator, TierOptions};
pub use entry::{CacheEntry, CacheKey, CacheMetadata};
pub use memory::MemoryTier;
pub use persistent::PersistentTier;
pub use stats::{CacheCounters, CacheStats};
pub use update::IncrementalUpdater;

// == Public Constants ==
/// Compiled-in cache format version; entries written under any other version
/// are purged on read.
pub const CACHE_VERSION: &str = "1.0.0";

/// Namespace prefix for every key in the shared durable stores.
pub const STORAGE_KEY_PREFIX: &str = "hierarchy-tree-cache";
