//! Tree Subscription
//!
//! Reference-counted observer handle. Holding one keeps background polling
//! alive for its key; dropping the last one stops it.

use tokio::sync::broadcast;
use tracing::warn;

use crate::cache::CacheKey;
use crate::refresh::orchestrator::RefreshOrchestrator;
use crate::refresh::TreeSnapshot;

// == Tree Subscription ==
/// Receives republished snapshots for one cache key.
pub struct TreeSubscription {
    orchestrator: RefreshOrchestrator,
    key: CacheKey,
    receiver: broadcast::Receiver<crate::refresh::TreeEvent>,
}

impl TreeSubscription {
    pub(crate) fn new(
        orchestrator: RefreshOrchestrator,
        key: CacheKey,
        receiver: broadcast::Receiver<crate::refresh::TreeEvent>,
    ) -> Self {
        Self {
            orchestrator,
            key,
            receiver,
        }
    }

    /// The key this subscription observes.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    // == Changed ==
    /// Waits for the next republished snapshot of this key.
    ///
    /// Returns None when the orchestrator has gone away. A subscriber that
    /// falls behind skips the missed snapshots and resumes with current ones;
    /// every snapshot is a full tree, so skipped intermediates are moot.
    pub async fn changed(&mut self) -> Option<TreeSnapshot> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.key == self.key => return Some(event.snapshot),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(key = %self.key, skipped, "subscriber lagged, skipping stale snapshots");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    // == Try Changed ==
    /// Non-blocking variant of [`changed`](Self::changed): returns the next
    /// already-delivered snapshot for this key, or None when there is none.
    pub fn try_changed(&mut self) -> Option<TreeSnapshot> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.key == self.key => return Some(event.snapshot),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

impl Drop for TreeSubscription {
    fn drop(&mut self) {
        let mut observers = self.orchestrator.inner.observers.lock().unwrap();
        if let Some(state) = observers.get_mut(&self.key) {
            state.count = state.count.saturating_sub(1);
            if state.count == 0 {
                if let Some(poller) = state.poller.take() {
                    poller.abort();
                }
                observers.remove(&self.key);
            }
        }
    }
}
