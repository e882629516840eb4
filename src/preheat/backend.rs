//! In-memory warm-up cache driven by preheat hints.
//!
//! - `start_caching` spawns background fetches for assets entering the window
//! - `stop_caching` cancels those fetches and evicts their results
//! - Results live in an LRU bounded by total encoded bytes
//!
//! The backend also acts as an `AssetStore` in front of the real store, so
//! thumbnail loads for preheated assets are served from memory. A load that
//! arrives while the warm-up is still running waits for it instead of fetching
//! the same thumbnail twice.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::CachingBackend;
use crate::error::{MediaError, MediaResult};
use crate::models::{AssetId, AssetRef, Thumbnail, ThumbnailSize};
use crate::thumbnails::AssetStore;

/// Key for warm entries. Unlike the load coordinator, the size is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    id: AssetId,
    size: ThumbnailSize,
}

impl CacheKey {
    fn new(id: &AssetId, size: ThumbnailSize) -> Self {
        Self {
            id: id.clone(),
            size,
        }
    }
}

struct PendingWarmup {
    ticket: u64,
    cancel: CancellationToken,
    /// Set once the fetch succeeds; closed without a value on failure or cancel.
    ready: watch::Receiver<Option<Thumbnail>>,
}

struct WarmState {
    entries: LruCache<CacheKey, Thumbnail>,
    pending: HashMap<CacheKey, PendingWarmup>,
    current_memory_bytes: usize,
    next_ticket: u64,
}

impl WarmState {
    fn insert(&mut self, key: CacheKey, thumbnail: Thumbnail, max_memory_bytes: usize) {
        let new_size = thumbnail.memory_bytes();
        self.evict_if_needed(new_size, max_memory_bytes);

        if let Some(old) = self.entries.put(key, thumbnail) {
            self.current_memory_bytes =
                self.current_memory_bytes.saturating_sub(old.memory_bytes());
        }
        self.current_memory_bytes += new_size;
    }

    /// Evict entries until there is room for `needed_bytes`.
    fn evict_if_needed(&mut self, needed_bytes: usize, max_memory_bytes: usize) {
        while self.current_memory_bytes + needed_bytes > max_memory_bytes {
            match self.entries.pop_lru() {
                Some((_, evicted)) => {
                    self.current_memory_bytes =
                        self.current_memory_bytes.saturating_sub(evicted.memory_bytes());
                    trace!(
                        evicted_bytes = evicted.memory_bytes(),
                        current_bytes = self.current_memory_bytes,
                        "Evicted thumbnail from warm cache"
                    );
                }
                None => break,
            }
        }
    }

    fn remove(&mut self, key: &CacheKey) {
        if let Some(entry) = self.pending.remove(key) {
            entry.cancel.cancel();
        }
        if let Some(evicted) = self.entries.pop(key) {
            self.current_memory_bytes =
                self.current_memory_bytes.saturating_sub(evicted.memory_bytes());
        }
    }
}

/// Caching backend that prefetches thumbnails into memory.
pub struct MemoryCachingBackend {
    store: Arc<dyn AssetStore>,
    runtime: Handle,
    max_memory_bytes: usize,
    state: Arc<Mutex<WarmState>>,
}

impl MemoryCachingBackend {
    pub fn new(store: Arc<dyn AssetStore>, runtime: Handle, max_memory_bytes: usize) -> Self {
        debug!(max_memory_bytes, "Initialized warm-up cache");
        Self {
            store,
            runtime,
            max_memory_bytes,
            state: Arc::new(Mutex::new(WarmState {
                entries: LruCache::unbounded(),
                pending: HashMap::new(),
                current_memory_bytes: 0,
                next_ticket: 0,
            })),
        }
    }

    /// Warm thumbnail for `id` at exactly `size`, if present.
    pub fn get(&self, id: &AssetId, size: ThumbnailSize) -> Option<Thumbnail> {
        self.state.lock().entries.get(&CacheKey::new(id, size)).cloned()
    }

    pub fn memory_usage(&self) -> usize {
        self.state.lock().current_memory_bytes
    }

    pub fn entry_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn max_memory(&self) -> usize {
        self.max_memory_bytes
    }

    fn spawn_warmup(
        &self,
        id: AssetId,
        size: ThumbnailSize,
        ticket: u64,
        cancel: CancellationToken,
        ready: watch::Sender<Option<Thumbnail>>,
    ) {
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let max_memory_bytes = self.max_memory_bytes;

        self.runtime.spawn(async move {
            let result = store.fetch_thumbnail(&id, size, cancel.clone()).await;

            let key = CacheKey::new(&id, size);
            let mut state = state.lock();
            let current = state
                .pending
                .get(&key)
                .is_some_and(|pending| pending.ticket == ticket);
            if !current {
                return;
            }
            state.pending.remove(&key);

            match result {
                Ok(thumbnail) if !cancel.is_cancelled() => {
                    state.insert(key, thumbnail.clone(), max_memory_bytes);
                    ready.send_replace(Some(thumbnail));
                }
                Ok(_) => {}
                Err(e) => debug!(%id, error = %e, "Warm-up fetch failed"),
            }
        });
    }
}

impl CachingBackend for MemoryCachingBackend {
    fn start_caching(&self, assets: &[AssetRef], size: ThumbnailSize) {
        let mut spawned = 0usize;
        for asset in assets {
            let key = CacheKey::new(&asset.id, size);
            let cancel = CancellationToken::new();
            let (ready_tx, ready_rx) = watch::channel(None);
            let ticket = {
                let mut state = self.state.lock();
                if state.entries.contains(&key) || state.pending.contains_key(&key) {
                    continue;
                }
                let ticket = state.next_ticket;
                state.next_ticket += 1;
                state.pending.insert(
                    key,
                    PendingWarmup {
                        ticket,
                        cancel: cancel.clone(),
                        ready: ready_rx,
                    },
                );
                ticket
            };

            self.spawn_warmup(asset.id.clone(), size, ticket, cancel, ready_tx);
            spawned += 1;
        }
        trace!(requested = assets.len(), spawned, "Start caching");
    }

    fn stop_caching(&self, assets: &[AssetRef], size: ThumbnailSize) {
        let mut state = self.state.lock();
        for asset in assets {
            state.remove(&CacheKey::new(&asset.id, size));
        }
        trace!(count = assets.len(), "Stop caching");
    }

    fn reset_cache(&self) {
        let mut state = self.state.lock();
        for (_, pending) in state.pending.drain() {
            pending.cancel.cancel();
        }
        state.entries.clear();
        state.current_memory_bytes = 0;
        debug!("Cleared warm-up cache");
    }
}

#[async_trait]
impl AssetStore for MemoryCachingBackend {
    async fn fetch_assets(&self) -> MediaResult<Vec<AssetRef>> {
        self.store.fetch_assets().await
    }

    async fn fetch_thumbnail(
        &self,
        id: &AssetId,
        size: ThumbnailSize,
        cancel: CancellationToken,
    ) -> MediaResult<Thumbnail> {
        let key = CacheKey::new(id, size);
        let pending = {
            let mut state = self.state.lock();
            if let Some(thumbnail) = state.entries.get(&key) {
                trace!(%id, "Warm cache hit");
                return Ok(thumbnail.clone());
            }
            state.pending.get(&key).map(|pending| pending.ready.clone())
        };

        if let Some(mut ready) = pending {
            trace!(%id, "Joining pending warm-up");
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(MediaError::GenerationFailed("cancelled".into()));
                }
                _ = ready.changed() => ready.borrow().clone(),
            };
            if let Some(thumbnail) = joined {
                return Ok(thumbnail);
            }
            // warm-up failed or was stopped
        }

        self.store.fetch_thumbnail(id, size, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{asset, asset_id, assets, MockAssetStore};
    use std::time::Duration;

    fn size() -> ThumbnailSize {
        ThumbnailSize::square(64).unwrap()
    }

    async fn settle(backend: &MemoryCachingBackend) {
        for _ in 0..200 {
            if backend.pending_count() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("warm-up fetches did not finish");
    }

    #[tokio::test]
    async fn test_start_caching_warms_entries() {
        let store = Arc::new(MockAssetStore::new());
        let backend = MemoryCachingBackend::new(store.clone(), Handle::current(), 1024);

        backend.start_caching(&assets(3), size());
        // repeated hints do not refetch
        backend.start_caching(&assets(3), size());
        settle(&backend).await;

        assert_eq!(backend.entry_count(), 3);
        assert_eq!(store.total_calls(), 3);
        assert_eq!(backend.memory_usage(), 9);
        assert!(backend.get(&asset_id(1), size()).is_some());
        assert!(backend
            .get(&asset_id(1), ThumbnailSize::square(32).unwrap())
            .is_none());
    }

    #[tokio::test]
    async fn test_stop_caching_cancels_and_evicts() {
        let store = Arc::new(MockAssetStore::gated());
        let backend = MemoryCachingBackend::new(store.clone(), Handle::current(), 1024);

        backend.start_caching(&assets(2), size());
        assert_eq!(backend.pending_count(), 2);

        backend.stop_caching(&[asset(0)], size());
        assert_eq!(backend.pending_count(), 1);

        store.release(1);
        settle(&backend).await;
        assert!(backend.get(&asset_id(0), size()).is_none());
        assert!(backend.get(&asset_id(1), size()).is_some());

        backend.stop_caching(&[asset(1)], size());
        assert_eq!(backend.entry_count(), 0);
        assert_eq!(backend.memory_usage(), 0);
    }

    #[tokio::test]
    async fn test_memory_budget_evicts_lru() {
        let store = Arc::new(MockAssetStore::new());
        // each mock thumbnail is 3 bytes
        let backend = MemoryCachingBackend::new(store.clone(), Handle::current(), 6);

        for n in 0..4 {
            backend.start_caching(&[asset(n)], size());
            settle(&backend).await;
        }

        assert_eq!(backend.entry_count(), 2);
        assert!(backend.memory_usage() <= backend.max_memory());
        assert!(backend.get(&asset_id(0), size()).is_none());
        assert!(backend.get(&asset_id(3), size()).is_some());
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let store = Arc::new(MockAssetStore::new());
        let backend = MemoryCachingBackend::new(store.clone(), Handle::current(), 1024);

        backend.start_caching(&assets(2), size());
        settle(&backend).await;
        backend.reset_cache();

        assert_eq!(backend.entry_count(), 0);
        assert_eq!(backend.pending_count(), 0);
        assert_eq!(backend.memory_usage(), 0);
    }

    #[tokio::test]
    async fn test_load_joins_pending_warmup() {
        let store = Arc::new(MockAssetStore::gated());
        let backend = Arc::new(MemoryCachingBackend::new(
            store.clone(),
            Handle::current(),
            1024,
        ));
        let id = asset_id(0);

        backend.start_caching(&[asset(0)], size());
        let load = tokio::spawn({
            let backend = backend.clone();
            let id = id.clone();
            async move {
                backend
                    .fetch_thumbnail(&id, size(), CancellationToken::new())
                    .await
            }
        });
        tokio::task::yield_now().await;

        store.release(2);
        let thumb = load.await.unwrap().unwrap();
        assert_eq!(thumb.asset_id(), &id);
        assert_eq!(store.calls(&id), 1);
        assert!(backend.get(&id, size()).is_some());
    }

    #[tokio::test]
    async fn test_load_falls_back_when_warmup_stops() {
        let store = Arc::new(MockAssetStore::gated());
        let backend = Arc::new(MemoryCachingBackend::new(
            store.clone(),
            Handle::current(),
            1024,
        ));
        let id = asset_id(0);

        backend.start_caching(&[asset(0)], size());
        let load = tokio::spawn({
            let backend = backend.clone();
            let id = id.clone();
            async move {
                backend
                    .fetch_thumbnail(&id, size(), CancellationToken::new())
                    .await
            }
        });
        tokio::task::yield_now().await;

        backend.stop_caching(&[asset(0)], size());
        store.release(1);
        assert!(load.await.unwrap().is_ok());
        assert_eq!(store.calls(&id), 2);
    }

    #[tokio::test]
    async fn test_cancelled_load_stops_waiting_for_warmup() {
        let store = Arc::new(MockAssetStore::gated());
        let backend = MemoryCachingBackend::new(store.clone(), Handle::current(), 1024);
        let id = asset_id(0);

        backend.start_caching(&[asset(0)], size());
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(backend.fetch_thumbnail(&id, size(), cancel).await.is_err());
        // the warm-up itself keeps running
        assert_eq!(backend.pending_count(), 1);

        store.release(1);
        settle(&backend).await;
        assert!(backend.get(&id, size()).is_some());
    }

    #[tokio::test]
    async fn test_serves_warm_entries_as_store() {
        let store = Arc::new(MockAssetStore::new());
        let backend = MemoryCachingBackend::new(store.clone(), Handle::current(), 1024);
        let id = asset_id(0);

        backend.start_caching(&[asset(0)], size());
        settle(&backend).await;
        assert_eq!(store.calls(&id), 1);

        let thumb = backend
            .fetch_thumbnail(&id, size(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(thumb.asset_id(), &id);
        assert_eq!(store.calls(&id), 1);

        // cold size goes to the store
        backend
            .fetch_thumbnail(&id, ThumbnailSize::square(8).unwrap(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(store.calls(&id), 2);
    }
}
