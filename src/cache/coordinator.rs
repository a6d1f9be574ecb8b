//! Cache Coordinator Module
//!
//! Unifies the three tiers behind get/set/invalidate with tier fallback,
//! promotion, and format-version gating.

use std::path::PathBuf;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{
    BulkTier, CacheCounters, CacheEntry, CacheKey, CacheStats, MemoryTier, PersistentTier,
    CACHE_VERSION,
};
use crate::tree::TreeNode;

// == Tier Options ==
/// Construction parameters for the tier stack.
#[derive(Debug, Clone)]
pub struct TierOptions {
    /// Memory tier TTL in milliseconds
    pub memory_ttl_ms: u64,
    /// Directory backing the persistent tier
    pub persistent_dir: PathBuf,
    /// Persistent tier TTL in milliseconds
    pub persistent_ttl_ms: u64,
    /// Byte quota for the persistent tier namespace
    pub persistent_quota_bytes: u64,
    /// Directory backing the bulk tier
    pub bulk_dir: PathBuf,
    /// Bulk tier TTL in milliseconds
    pub bulk_ttl_ms: u64,
}

/// Which tier satisfied a read; drives promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TierLevel {
    Memory,
    Persistent,
    Bulk,
}

// == Cache Coordinator ==
/// Serves reads through the memory → persistent → bulk fallback chain and
/// writes through every available tier.
///
/// Constructed explicitly and injected into consumers; `open` creates the
/// underlying stores and a tier that cannot open degrades the stack rather
/// than failing it.
#[derive(Debug)]
pub struct CacheCoordinator {
    memory: RwLock<MemoryTier>,
    persistent: Option<PersistentTier>,
    bulk: Option<BulkTier>,
    counters: CacheCounters,
}

impl CacheCoordinator {
    // == Constructor ==
    /// Opens the tier stack described by `options`.
    pub async fn open(options: TierOptions) -> Self {
        let persistent = match PersistentTier::open(
            &options.persistent_dir,
            options.persistent_ttl_ms,
            options.persistent_quota_bytes,
        ) {
            Ok(tier) => Some(tier),
            Err(err) => {
                warn!(error = %err, "persistent tier unavailable, degrading");
                None
            }
        };

        let bulk = match BulkTier::open(&options.bulk_dir, options.bulk_ttl_ms).await {
            Ok(tier) => Some(tier),
            Err(err) => {
                warn!(error = %err, "bulk tier unavailable, degrading");
                None
            }
        };

        info!(
            persistent = persistent.is_some(),
            bulk = bulk.is_some(),
            "cache coordinator opened"
        );

        Self {
            memory: RwLock::new(MemoryTier::new(options.memory_ttl_ms)),
            persistent,
            bulk,
            counters: CacheCounters::new(),
        }
    }

    /// In-memory-only coordinator, for consumers that opt out of durability.
    pub fn memory_only(memory_ttl_ms: u64) -> Self {
        Self {
            memory: RwLock::new(MemoryTier::new(memory_ttl_ms)),
            persistent: None,
            bulk: None,
            counters: CacheCounters::new(),
        }
    }

    // == Get ==
    /// Tries memory, then persistent, then bulk, returning the first live
    /// hit. A hit below the memory tier is promoted into every faster tier
    /// it missed before being returned.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let Some((level, entry)) = self.locate(key).await else {
            self.counters.record_miss();
            return None;
        };

        self.counters.record_hit();
        match level {
            TierLevel::Memory => {}
            TierLevel::Persistent => {
                self.counters.record_promotion();
                self.memory.write().await.write(key, entry.clone());
            }
            TierLevel::Bulk => {
                self.counters.record_promotion();
                self.memory.write().await.write(key, entry.clone());
                if let Some(persistent) = &self.persistent {
                    persistent.write(key, &entry);
                }
            }
        }
        Some(entry)
    }

    /// Walks the fallback chain without touching counters or promoting.
    /// Entries written under a different format version are purged from
    /// their tier and treated as absent.
    async fn locate(&self, key: &CacheKey) -> Option<(TierLevel, CacheEntry)> {
        // Bind the read outside the if-let so the lock guard is released
        // before any re-acquisition below.
        let memory_hit = self.memory.write().await.read(key);
        if let Some(entry) = memory_hit {
            if entry.metadata.version == CACHE_VERSION {
                return Some((TierLevel::Memory, entry));
            }
            self.memory.write().await.delete(key);
        }

        if let Some(persistent) = &self.persistent {
            if let Some(entry) = persistent.read(key) {
                if entry.metadata.version == CACHE_VERSION {
                    return Some((TierLevel::Persistent, entry));
                }
                debug!(key = %key, version = %entry.metadata.version, "purging persistent entry with stale format");
                persistent.delete(key);
            }
        }

        if let Some(bulk) = &self.bulk {
            if let Some(entry) = bulk.read(key).await {
                if entry.metadata.version == CACHE_VERSION {
                    return Some((TierLevel::Bulk, entry));
                }
                debug!(key = %key, version = %entry.metadata.version, "purging bulk entry with stale format");
                bulk.delete(key).await;
            }
        }

        None
    }

    // == Set ==
    /// Builds a fresh entry for `root` (new node map, checksum, version tag,
    /// timestamp) and writes it through every tier. A failing tier write does
    /// not stop the others; partial success is acceptable because reads fall
    /// back.
    pub async fn set(&self, key: &CacheKey, root: TreeNode) -> CacheEntry {
        let entry = CacheEntry::build(key, root, CACHE_VERSION);
        self.store(key, &entry).await;
        entry
    }

    /// Write-through of an already-built entry.
    async fn store(&self, key: &CacheKey, entry: &CacheEntry) {
        self.memory.write().await.write(key, entry.clone());
        if let Some(persistent) = &self.persistent {
            if !persistent.write(key, entry) {
                debug!(key = %key, "entry not persisted, surviving tiers still hold it");
            }
        }
        if let Some(bulk) = &self.bulk {
            bulk.write(key, entry).await;
        }
    }

    // == Touch ==
    /// Re-stamps the cached entry with the current time without rebuilding
    /// it. Used when revalidation finds no structural change. Returns false
    /// when no live entry exists.
    pub async fn touch(&self, key: &CacheKey) -> bool {
        let Some((_, entry)) = self.locate(key).await else {
            return false;
        };
        self.store(key, &entry.touched()).await;
        true
    }

    // == Update Node ==
    /// Replaces the node identified by `node_id` in the cached tree, rebuilds
    /// the ancestor chain, and writes the result as a fresh entry. Returns
    /// false when the entry or the node id is not found; nothing is written
    /// in that case.
    pub async fn update_node(&self, key: &CacheKey, node_id: &str, replacement: &TreeNode) -> bool {
        let Some(entry) = self.get(key).await else {
            return false;
        };

        let Some(rebuilt) = entry.root_node.with_node_replaced(node_id, replacement) else {
            debug!(key = %key, node_id, "update_node target not in cached tree");
            return false;
        };

        self.set(key, rebuilt).await;
        true
    }

    // == Invalidate ==
    /// With a key, removes that entry from every tier; without one, clears
    /// the whole namespace in every tier.
    pub async fn invalidate(&self, key: Option<&CacheKey>) {
        match key {
            Some(key) => {
                self.memory.write().await.delete(key);
                if let Some(persistent) = &self.persistent {
                    persistent.delete(key);
                }
                if let Some(bulk) = &self.bulk {
                    bulk.delete(key).await;
                }
            }
            None => {
                self.memory.write().await.clear();
                if let Some(persistent) = &self.persistent {
                    persistent.clear();
                }
                if let Some(bulk) = &self.bulk {
                    bulk.clear().await;
                }
                info!("cache cleared across all tiers");
            }
        }
    }

    // == Staleness ==
    /// Whether the cached entry is older than `max_age_ms` (or missing).
    /// Used by cache warming to decide what to preload.
    pub async fn is_stale(&self, key: &CacheKey, max_age_ms: u64) -> bool {
        match self.locate(key).await {
            Some((_, entry)) => entry.age_ms() > max_age_ms,
            None => true,
        }
    }

    // == Sweep ==
    /// Removes expired entries from every tier, returning the total dropped.
    pub async fn sweep_expired(&self) -> usize {
        let mut removed = self.memory.write().await.sweep_expired();
        if let Some(persistent) = &self.persistent {
            removed += persistent.sweep_expired();
        }
        if let Some(bulk) = &self.bulk {
            removed += bulk.sweep_expired().await;
        }
        removed
    }

    // == Stats ==
    /// Snapshot of counters and tier occupancy.
    pub async fn stats(&self) -> CacheStats {
        let memory_entries = self.memory.read().await.len();
        let (persistent_entries, persistent_bytes) = match &self.persistent {
            Some(tier) => (tier.len(), tier.size_bytes()),
            None => (0, 0),
        };
        let bulk_entries = match &self.bulk {
            Some(tier) => tier.len().await,
            None => 0,
        };

        CacheStats {
            hits: self.counters.hits(),
            misses: self.counters.misses(),
            promotions: self.counters.promotions(),
            memory_entries,
            persistent_entries,
            persistent_bytes,
            bulk_entries,
            bulk_available: self.bulk.is_some(),
        }
    }

    /// Drops the key from the memory tier only. Test hook for exercising the
    /// fallback chain.
    #[cfg(test)]
    pub(crate) async fn evict_from_memory(&self, key: &CacheKey) {
        self.memory.write().await.delete(key);
    }

    #[cfg(test)]
    pub(crate) async fn memory_holds(&self, key: &CacheKey) -> bool {
        self.memory.write().await.read(key).is_some()
    }
}
