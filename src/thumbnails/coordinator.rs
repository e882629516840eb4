//! Per-asset thumbnail loading with request deduplication and cancellation.
//!
//! - At most one fetch per AssetId is in flight at any time
//! - Results land in an in-memory map, failures are never cached
//! - Fetches run on the tokio runtime; completions come back over a flume
//!   channel and are applied by the owner, so the maps need no locking
//! - Each successful load is announced on the `ThumbnailLoaded` stream

use std::collections::HashMap;
use std::sync::Arc;

use flume::{Receiver, Sender};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::store::AssetStore;
use crate::error::MediaError;
use crate::models::{AssetId, Thumbnail, ThumbnailSize};

/// Event sent to renderers when a thumbnail becomes available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailLoaded(pub AssetId);

/// Observable state of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Absent,
    Loading,
    Loaded,
}

/// What applying a completion did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionStatus {
    Loaded,
    Failed(MediaError),
    /// The load was cancelled and the store gave up on it.
    Cancelled,
    /// The load was cancelled, but the store finished before noticing.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCompletion {
    pub id: AssetId,
    pub status: CompletionStatus,
}

struct InFlight {
    ticket: u64,
    cancel: CancellationToken,
}

enum LoadOutcome {
    Loaded(Thumbnail),
    Failed(MediaError),
    Cancelled,
}

struct Completion {
    id: AssetId,
    ticket: u64,
    outcome: LoadOutcome,
}

/// Owns the decoded-thumbnail cache and the in-flight registry for one grid.
///
/// All methods take `&mut self` and never block; call them from the thread that
/// owns the grid. Results are folded in by `drain_completions` (non-blocking) or
/// `next_completion` (async).
pub struct ThumbnailLoadCoordinator {
    store: Arc<dyn AssetStore>,
    runtime: Handle,
    cache: HashMap<AssetId, Thumbnail>,
    in_flight: HashMap<AssetId, InFlight>,
    next_ticket: u64,
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
    subscribers: Vec<async_channel::Sender<ThumbnailLoaded>>,
}

impl ThumbnailLoadCoordinator {
    /// Create a coordinator that spawns fetches on `runtime`.
    pub fn new(store: Arc<dyn AssetStore>, runtime: Handle) -> Self {
        let (completion_tx, completion_rx) = flume::unbounded();
        Self {
            store,
            runtime,
            cache: HashMap::new(),
            in_flight: HashMap::new(),
            next_ticket: 0,
            completion_tx,
            completion_rx,
            subscribers: Vec::new(),
        }
    }

    /// Subscribe to `ThumbnailLoaded` events.
    ///
    /// Each subscriber receives every event sent after it subscribed.
    pub fn subscribe(&mut self) -> async_channel::Receiver<ThumbnailLoaded> {
        let (tx, rx) = async_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Start loading the thumbnail for `id` unless it is cached or already loading.
    ///
    /// The dedup key is the id alone: a request at a different size while a load
    /// is pending or cached is dropped.
    pub fn load_thumbnail(&mut self, id: &AssetId, size: ThumbnailSize) {
        if self.cache.contains_key(id) {
            trace!(%id, "Thumbnail already cached");
            return;
        }
        if self.in_flight.contains_key(id) {
            trace!(%id, "Thumbnail load already pending");
            return;
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let cancel = CancellationToken::new();

        self.in_flight.insert(
            id.clone(),
            InFlight {
                ticket,
                cancel: cancel.clone(),
            },
        );

        let store = Arc::clone(&self.store);
        let tx = self.completion_tx.clone();
        let id = id.clone();
        self.runtime.spawn(async move {
            let result = store.fetch_thumbnail(&id, size, cancel.clone()).await;
            let outcome = match result {
                _ if cancel.is_cancelled() => LoadOutcome::Cancelled,
                Ok(thumbnail) => LoadOutcome::Loaded(thumbnail),
                Err(e) => LoadOutcome::Failed(e),
            };
            // Receiver lives as long as the coordinator; a send error means it is gone.
            let _ = tx.send(Completion {
                id,
                ticket,
                outcome,
            });
        });

        trace!(ticket, "Spawned thumbnail load");
    }

    /// Request cancellation of the pending load for `id`, if any.
    ///
    /// The registry entry is removed immediately; the store stops at its own pace.
    /// A cached thumbnail for `id` is left alone.
    pub fn cancel_thumbnail_loading(&mut self, id: &AssetId) {
        if let Some(entry) = self.in_flight.remove(id) {
            entry.cancel.cancel();
            trace!(%id, "Cancelled thumbnail load");
        }
    }

    /// Cancel every pending load.
    pub fn cancel_all(&mut self) {
        let count = self.in_flight.len();
        for (_, entry) in self.in_flight.drain() {
            entry.cancel.cancel();
        }
        if count > 0 {
            debug!(count, "Cancelled all pending thumbnail loads");
        }
    }

    /// Cached thumbnail for `id`, if loaded.
    pub fn thumbnail(&self, id: &AssetId) -> Option<&Thumbnail> {
        self.cache.get(id)
    }

    pub fn state(&self, id: &AssetId) -> LoadState {
        if self.cache.contains_key(id) {
            LoadState::Loaded
        } else if self.in_flight.contains_key(id) {
            LoadState::Loading
        } else {
            LoadState::Absent
        }
    }

    pub fn is_loading(&self, id: &AssetId) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached thumbnail. Pending loads are unaffected.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        debug!("Cleared thumbnail cache");
    }

    /// Apply every completion that has already arrived (non-blocking).
    pub fn drain_completions(&mut self) -> Vec<AppliedCompletion> {
        let mut applied = Vec::new();
        while let Ok(completion) = self.completion_rx.try_recv() {
            applied.push(self.apply(completion));
        }
        applied
    }

    /// Wait for the next completion and apply it.
    pub async fn next_completion(&mut self) -> Option<AppliedCompletion> {
        let completion = self.completion_rx.recv_async().await.ok()?;
        Some(self.apply(completion))
    }

    fn apply(&mut self, completion: Completion) -> AppliedCompletion {
        let Completion {
            id,
            ticket,
            outcome,
        } = completion;

        let current = self
            .in_flight
            .get(&id)
            .is_some_and(|entry| entry.ticket == ticket);
        if !current {
            trace!(%id, ticket, "Discarding result of cancelled load");
            let status = match outcome {
                LoadOutcome::Cancelled => CompletionStatus::Cancelled,
                _ => CompletionStatus::Stale,
            };
            return AppliedCompletion { id, status };
        }
        self.in_flight.remove(&id);

        let status = match outcome {
            LoadOutcome::Loaded(thumbnail) => {
                self.cache.insert(id.clone(), thumbnail);
                self.notify(&id);
                CompletionStatus::Loaded
            }
            LoadOutcome::Failed(e) => {
                warn!(%id, error = %e, "Failed to load thumbnail");
                CompletionStatus::Failed(e)
            }
            LoadOutcome::Cancelled => CompletionStatus::Cancelled,
        };

        AppliedCompletion { id, status }
    }

    fn notify(&mut self, id: &AssetId) {
        self.subscribers
            .retain(|tx| tx.try_send(ThumbnailLoaded(id.clone())).is_ok());
    }
}

impl Drop for ThumbnailLoadCoordinator {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{asset_id, MockAssetStore};

    fn size() -> ThumbnailSize {
        ThumbnailSize::square(100).unwrap()
    }

    fn coordinator(store: &Arc<MockAssetStore>) -> ThumbnailLoadCoordinator {
        ThumbnailLoadCoordinator::new(store.clone(), Handle::current())
    }

    #[tokio::test]
    async fn test_load_populates_cache_and_notifies() {
        let store = Arc::new(MockAssetStore::new());
        let mut coordinator = coordinator(&store);
        let events = coordinator.subscribe();
        let id = asset_id(1);

        coordinator.load_thumbnail(&id, size());
        assert_eq!(coordinator.state(&id), LoadState::Loading);

        let applied = coordinator.next_completion().await.unwrap();
        assert_eq!(applied.status, CompletionStatus::Loaded);
        assert_eq!(coordinator.state(&id), LoadState::Loaded);
        assert_eq!(coordinator.thumbnail(&id).unwrap().asset_id(), &id);
        assert_eq!(coordinator.pending_count(), 0);
        assert_eq!(events.try_recv().unwrap(), ThumbnailLoaded(id));
    }

    #[tokio::test]
    async fn test_duplicate_requests_fetch_once() {
        let store = Arc::new(MockAssetStore::gated());
        let mut coordinator = coordinator(&store);
        let id = asset_id(7);

        coordinator.load_thumbnail(&id, size());
        coordinator.load_thumbnail(&id, size());
        // different size is deduplicated too
        coordinator.load_thumbnail(&id, ThumbnailSize::square(300).unwrap());
        assert_eq!(coordinator.pending_count(), 1);

        store.release(1);
        let applied = coordinator.next_completion().await.unwrap();
        assert_eq!(applied.status, CompletionStatus::Loaded);
        assert_eq!(store.calls(&id), 1);

        // cached now, no further fetch
        coordinator.load_thumbnail(&id, size());
        assert_eq!(coordinator.pending_count(), 0);
        assert_eq!(store.calls(&id), 1);
    }

    #[tokio::test]
    async fn test_cancel_then_reload_fetches_again() {
        let store = Arc::new(MockAssetStore::gated());
        let mut coordinator = coordinator(&store);
        let events = coordinator.subscribe();
        let id = asset_id(3);

        coordinator.load_thumbnail(&id, size());
        coordinator.cancel_thumbnail_loading(&id);
        assert_eq!(coordinator.state(&id), LoadState::Absent);

        coordinator.load_thumbnail(&id, size());
        assert_eq!(coordinator.state(&id), LoadState::Loading);
        store.release(1);

        let mut statuses = Vec::new();
        for _ in 0..2 {
            statuses.push(coordinator.next_completion().await.unwrap().status);
        }
        assert!(statuses.contains(&CompletionStatus::Cancelled));
        assert!(statuses.contains(&CompletionStatus::Loaded));
        assert_eq!(store.calls(&id), 2);
        assert_eq!(coordinator.state(&id), LoadState::Loaded);
        // only the surviving load notifies
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_load_leaves_entry_absent() {
        let store = Arc::new(MockAssetStore::gated());
        let mut coordinator = coordinator(&store);
        let events = coordinator.subscribe();
        let id = asset_id(4);

        coordinator.load_thumbnail(&id, size());
        coordinator.cancel_thumbnail_loading(&id);

        let applied = coordinator.next_completion().await.unwrap();
        assert_eq!(applied.status, CompletionStatus::Cancelled);
        assert!(coordinator.thumbnail(&id).is_none());
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_result_finished_before_cancel_is_stale() {
        let store = Arc::new(MockAssetStore::new());
        let mut coordinator = coordinator(&store);
        let events = coordinator.subscribe();
        let id = asset_id(6);

        coordinator.load_thumbnail(&id, size());
        // let the fetch finish without applying it
        while coordinator.completion_rx.is_empty() {
            tokio::task::yield_now().await;
        }
        coordinator.cancel_thumbnail_loading(&id);

        let applied = coordinator.drain_completions();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].status, CompletionStatus::Stale);
        assert_eq!(coordinator.state(&id), LoadState::Absent);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_poison() {
        let store = Arc::new(MockAssetStore::new());
        let id = asset_id(9);
        store.fail(&id);
        let mut coordinator = coordinator(&store);
        let events = coordinator.subscribe();

        coordinator.load_thumbnail(&id, size());
        let applied = coordinator.next_completion().await.unwrap();
        assert!(matches!(applied.status, CompletionStatus::Failed(_)));
        assert_eq!(coordinator.state(&id), LoadState::Absent);
        assert!(events.is_empty());

        coordinator.load_thumbnail(&id, size());
        assert!(coordinator.is_loading(&id));
        coordinator.next_completion().await.unwrap();
        assert_eq!(store.calls(&id), 2);
    }

    #[tokio::test]
    async fn test_cancel_keeps_cached_value() {
        let store = Arc::new(MockAssetStore::new());
        let mut coordinator = coordinator(&store);
        let id = asset_id(2);

        coordinator.load_thumbnail(&id, size());
        coordinator.next_completion().await.unwrap();
        coordinator.cancel_thumbnail_loading(&id);
        assert_eq!(coordinator.state(&id), LoadState::Loaded);
    }

    #[tokio::test]
    async fn test_cancel_all_clears_registry() {
        let store = Arc::new(MockAssetStore::gated());
        let mut coordinator = coordinator(&store);
        for n in 0..5 {
            coordinator.load_thumbnail(&asset_id(n), size());
        }
        assert_eq!(coordinator.pending_count(), 5);

        coordinator.cancel_all();
        assert_eq!(coordinator.pending_count(), 0);

        for _ in 0..5 {
            let applied = coordinator.next_completion().await.unwrap();
            assert_eq!(applied.status, CompletionStatus::Cancelled);
        }
        assert_eq!(coordinator.cached_count(), 0);
    }

    #[tokio::test]
    async fn test_drain_and_clear_cache() {
        let store = Arc::new(MockAssetStore::new());
        let mut coordinator = coordinator(&store);
        let id = asset_id(5);

        assert!(coordinator.drain_completions().is_empty());
        coordinator.load_thumbnail(&id, size());
        coordinator.next_completion().await.unwrap();
        assert_eq!(coordinator.cached_count(), 1);

        coordinator.clear_cache();
        assert_eq!(coordinator.state(&id), LoadState::Absent);
    }
}
