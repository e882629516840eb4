//! Test doubles for the grid collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::{MediaError, MediaResult};
use crate::layout::{LayoutQuery, Rect};
use crate::library::{PermissionService, PermissionStatus};
use crate::models::{AssetId, AssetRef, MediaFormat, Thumbnail, ThumbnailSize};
use crate::preheat::CachingBackend;

pub fn asset_id(n: usize) -> AssetId {
    AssetId::new(format!("asset-{n}")).unwrap()
}

pub fn asset(n: usize) -> AssetRef {
    AssetRef::new(
        asset_id(n),
        MediaFormat::Jpeg,
        SystemTime::UNIX_EPOCH,
        format!("/photos/{n}.jpg"),
    )
    .unwrap()
}

pub fn assets(count: usize) -> Vec<AssetRef> {
    (0..count).map(asset).collect()
}

/// Asset store that counts calls and can hold fetches until released.
pub struct MockAssetStore {
    assets: Mutex<MediaResult<Vec<AssetRef>>>,
    calls: Mutex<HashMap<AssetId, usize>>,
    failing: Mutex<HashSet<AssetId>>,
    gate: Option<Semaphore>,
}

impl MockAssetStore {
    /// Store whose fetches resolve immediately.
    pub fn new() -> Self {
        Self {
            assets: Mutex::new(Ok(Vec::new())),
            calls: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            gate: None,
        }
    }

    /// Store whose fetches wait for `release` or cancellation.
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn with_assets(self, assets: Vec<AssetRef>) -> Self {
        *self.assets.lock() = Ok(assets);
        self
    }

    pub fn fail_enumeration(&self, error: MediaError) {
        *self.assets.lock() = Err(error);
    }

    pub fn fail(&self, id: &AssetId) {
        self.failing.lock().insert(id.clone());
    }

    /// Let `n` held fetches complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self, id: &AssetId) -> usize {
        self.calls.lock().get(id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl crate::thumbnails::AssetStore for MockAssetStore {
    async fn fetch_assets(&self) -> MediaResult<Vec<AssetRef>> {
        self.assets.lock().clone()
    }

    async fn fetch_thumbnail(
        &self,
        id: &AssetId,
        size: ThumbnailSize,
        cancel: CancellationToken,
    ) -> MediaResult<Thumbnail> {
        *self.calls.lock().entry(id.clone()).or_insert(0) += 1;

        if let Some(gate) = &self.gate {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(MediaError::GenerationFailed("cancelled".into()));
                }
                permit = gate.acquire() => {
                    if let Ok(permit) = permit {
                        permit.forget();
                    }
                }
            }
        }

        if self.failing.lock().contains(id) {
            return Err(MediaError::NotFound(id.to_string()));
        }
        Thumbnail::new(id.clone(), vec![0xFF, 0xD8, 0xFF], size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Start(Vec<AssetId>, ThumbnailSize),
    Stop(Vec<AssetId>, ThumbnailSize),
    Reset,
}

/// Caching backend that records every hint.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<BackendCall>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl CachingBackend for RecordingBackend {
    fn start_caching(&self, assets: &[AssetRef], size: ThumbnailSize) {
        let ids = assets.iter().map(|a| a.id.clone()).collect();
        self.calls.lock().push(BackendCall::Start(ids, size));
    }

    fn stop_caching(&self, assets: &[AssetRef], size: ThumbnailSize) {
        let ids = assets.iter().map(|a| a.id.clone()).collect();
        self.calls.lock().push(BackendCall::Stop(ids, size));
    }

    fn reset_cache(&self) {
        self.calls.lock().push(BackendCall::Reset);
    }
}

/// Layout with one item per `row_height` points, stacked vertically.
pub struct ListLayout {
    pub row_height: f64,
    pub item_count: usize,
}

impl LayoutQuery for ListLayout {
    fn index_paths_intersecting(&self, rect: Rect) -> Vec<usize> {
        (0..self.item_count)
            .filter(|&i| {
                let frame = Rect::new(0.0, i as f64 * self.row_height, 200.0, self.row_height);
                frame.intersects(&rect)
            })
            .collect()
    }
}

/// Permission service with a fixed current status and request answer.
pub struct FixedPermissions {
    status: PermissionStatus,
    on_request: PermissionStatus,
    requests: AtomicUsize,
}

impl FixedPermissions {
    pub fn new(status: PermissionStatus, on_request: PermissionStatus) -> Self {
        Self {
            status,
            on_request,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Authorized, PermissionStatus::Authorized)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PermissionService for FixedPermissions {
    fn status(&self) -> PermissionStatus {
        self.status
    }

    async fn request(&self) -> PermissionStatus {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.on_request
    }
}
