//! Refresh Orchestrator
//!
//! Owns the per-key refresh lifecycle: cached reads with background
//! revalidation, single-flight deduplication, and checksum-gated publishing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{checksum, CacheCoordinator, CacheEntry, CacheKey};
use crate::error::{CacheError, Result};
use crate::refresh::{TreeEvent, TreeSnapshot, TreeSubscription};
use crate::source::{fetch_tree, TreeSource};

/// Broadcast capacity for republished trees. Slow subscribers skip ahead
/// rather than stalling the publisher.
const EVENT_CAPACITY: usize = 32;

#[derive(Default)]
pub(crate) struct ObserverState {
    pub(crate) count: usize,
    pub(crate) poller: Option<JoinHandle<()>>,
}

pub(crate) struct Inner {
    pub(crate) coordinator: Arc<CacheCoordinator>,
    source: Arc<dyn TreeSource>,
    poll_interval: Option<Duration>,
    /// One receiver per revalidation currently in flight; flips to true on
    /// completion. Presence in the map is the single-flight guard.
    inflight: Mutex<HashMap<CacheKey, watch::Receiver<bool>>>,
    pub(crate) observers: Mutex<HashMap<CacheKey, ObserverState>>,
    pub(crate) events: broadcast::Sender<TreeEvent>,
}

// == Refresh Orchestrator ==
/// Stale-while-revalidate front door over the cache coordinator and the tree
/// source.
///
/// Cheap to clone; clones share all state. Constructed once at startup and
/// injected into consumers.
#[derive(Clone)]
pub struct RefreshOrchestrator {
    pub(crate) inner: Arc<Inner>,
}

impl RefreshOrchestrator {
    // == Constructor ==
    /// Creates an orchestrator over `coordinator` and `source`.
    ///
    /// When `poll_interval` is set, keys with at least one subscriber are
    /// revalidated on that interval.
    pub fn new(
        coordinator: Arc<CacheCoordinator>,
        source: Arc<dyn TreeSource>,
        poll_interval: Option<Duration>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                coordinator,
                source,
                poll_interval,
                inflight: Mutex::new(HashMap::new()),
                observers: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    /// The coordinator this orchestrator writes through.
    pub fn coordinator(&self) -> &Arc<CacheCoordinator> {
        &self.inner.coordinator
    }

    // == Load ==
    /// Returns the tree for `key`.
    ///
    /// A live cached entry is returned immediately and revalidated in the
    /// background; on a full miss the tree is fetched in the foreground,
    /// stored, and returned. Only the foreground fetch can surface an error.
    pub async fn load(&self, key: &CacheKey) -> Result<TreeSnapshot> {
        if let Some(entry) = self.inner.coordinator.get(key).await {
            let snapshot = TreeSnapshot::from(&entry);
            self.revalidate(key);
            return Ok(snapshot);
        }

        debug!(key = %key, "cache miss, fetching fresh tree");
        let root = fetch_tree(self.inner.source.as_ref(), key).await?;
        let entry = self.inner.coordinator.set(key, root).await;
        Ok(TreeSnapshot::from(&entry))
    }

    // == Revalidate ==
    /// Triggers a background revalidation for `key`.
    ///
    /// At most one revalidation runs per key; a trigger while one is in
    /// flight is dropped, not queued. Failures are logged and leave the
    /// cached entry untouched.
    pub fn revalidate(&self, key: &CacheKey) {
        let Some(tx) = self.begin(key) else {
            debug!(key = %key, "revalidation already in flight, dropping trigger");
            return;
        };

        let this = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            if let Err(err) = this.revalidate_once(&key).await {
                warn!(key = %key, error = %err, "background revalidation failed, serving prior snapshot");
            }
            this.finish(&key, tx);
        });
    }

    // == Refresh ==
    /// Forces a revalidation and awaits its outcome.
    ///
    /// If a revalidation is already in flight, this awaits that run instead
    /// of starting a second fetch, then returns whatever the cache holds.
    pub async fn refresh(&self, key: &CacheKey) -> Result<TreeSnapshot> {
        loop {
            let pending = self.inner.inflight.lock().unwrap().get(key).cloned();
            if let Some(mut rx) = pending {
                let _ = rx.wait_for(|done| *done).await;
                let entry = self
                    .inner
                    .coordinator
                    .get(key)
                    .await
                    .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
                return Ok(TreeSnapshot::from(&entry));
            }

            if let Some(tx) = self.begin(key) {
                let result = self.revalidate_once(key).await;
                self.finish(key, tx);
                return result.map(|entry| TreeSnapshot::from(&entry));
            }
            // Lost the start race to another caller; loop and join its run.
        }
    }

    /// Claims the single-flight slot for `key`. Returns the completion
    /// sender, or None when a revalidation is already in flight.
    fn begin(&self, key: &CacheKey) -> Option<watch::Sender<bool>> {
        let mut inflight = self.inner.inflight.lock().unwrap();
        if inflight.contains_key(key) {
            return None;
        }
        let (tx, rx) = watch::channel(false);
        inflight.insert(key.clone(), rx);
        Some(tx)
    }

    /// Releases the single-flight slot and wakes joined waiters.
    fn finish(&self, key: &CacheKey, tx: watch::Sender<bool>) {
        self.inner.inflight.lock().unwrap().remove(key);
        let _ = tx.send(true);
    }

    /// One full revalidation pass: fetch fresh, compare checksums, then
    /// either touch the timestamp (unchanged) or republish (changed).
    async fn revalidate_once(&self, key: &CacheKey) -> Result<CacheEntry> {
        let fresh = fetch_tree(self.inner.source.as_ref(), key).await?;
        let fresh_checksum = checksum(&fresh);

        let cached = self.inner.coordinator.get(key).await;
        if let Some(cached) = cached {
            if cached.metadata.checksum == fresh_checksum {
                debug!(key = %key, "no structural change, touching timestamp");
                self.inner.coordinator.touch(key).await;
                return Ok(cached.touched());
            }
        }

        let entry = self.inner.coordinator.set(key, fresh).await;
        info!(key = %key, checksum = %entry.metadata.checksum, "tree changed, republishing");
        let _ = self.inner.events.send(TreeEvent {
            key: key.clone(),
            snapshot: TreeSnapshot::from(&entry),
        });
        Ok(entry)
    }

    // == Subscribe ==
    /// Registers an observer for `key` and returns its subscription handle.
    ///
    /// The first subscriber for a key starts interval polling (when
    /// configured); dropping the last one stops it, so no timer outlives its
    /// observers.
    pub fn subscribe(&self, key: &CacheKey) -> TreeSubscription {
        let receiver = self.inner.events.subscribe();
        let mut observers = self.inner.observers.lock().unwrap();
        let state = observers.entry(key.clone()).or_default();
        state.count += 1;

        if state.count == 1 {
            if let Some(interval) = self.inner.poll_interval {
                let this = self.clone();
                let poll_key = key.clone();
                state.poller = Some(tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(interval);
                    // The first tick fires immediately; the subscriber just
                    // loaded, so skip it.
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        this.revalidate(&poll_key);
                    }
                }));
                debug!(key = %key, ?interval, "started poll timer");
            }
        }

        TreeSubscription::new(self.clone(), key.clone(), receiver)
    }

    // == Invalidate ==
    /// Drops the entry for `key` from every tier, or the whole namespace
    /// when no key is given.
    pub async fn invalidate(&self, key: Option<&CacheKey>) {
        self.inner.coordinator.invalidate(key).await;
    }

    // == Dispose ==
    /// Stops every poll timer. Subscriptions remain valid but no longer
    /// drive background revalidation.
    pub fn dispose(&self) {
        let mut observers = self.inner.observers.lock().unwrap();
        for state in observers.values_mut() {
            if let Some(poller) = state.poller.take() {
                poller.abort();
            }
        }
    }
}
