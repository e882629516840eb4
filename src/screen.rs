//! The grid screen: owns the asset snapshot and both caching components.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::GridConfig;
use crate::error::{MediaError, MediaResult};
use crate::layout::{GridLayout, Rect};
use crate::library::{MediaLibraryService, PermissionService};
use crate::models::{AssetId, AssetRef, Thumbnail, ThumbnailSize};
use crate::preheat::{CacheWindowController, CachingBackend};
use crate::thumbnails::{
    AppliedCompletion, AssetStore, CompletionStatus, ThumbnailLoadCoordinator, ThumbnailLoaded,
};

/// Number of leading cells loaded eagerly when the grid first appears.
const INITIAL_THUMBNAIL_COUNT: usize = 20;

/// Collaborators a grid screen is built from.
#[derive(Clone)]
pub struct GridServices {
    pub store: Arc<dyn AssetStore>,
    pub backend: Arc<dyn CachingBackend>,
    pub permissions: Arc<dyn PermissionService>,
    pub runtime: Handle,
}

/// One scrollable grid of assets.
///
/// Call every method from the thread that owns the screen. Thumbnail results are
/// folded in by `apply_completions` or `next_completion`.
pub struct GridScreen {
    library: MediaLibraryService,
    layout: GridLayout,
    window: CacheWindowController,
    thumbnails: ThumbnailLoadCoordinator,
    assets: Vec<AssetRef>,
    thumbnail_size: ThumbnailSize,
}

impl GridScreen {
    pub fn new(
        services: GridServices,
        config: &GridConfig,
        container_width: f64,
    ) -> MediaResult<Self> {
        let mut layout = GridLayout::from_config(config);
        layout.set_container_width(container_width);
        let thumbnail_size = layout.thumbnail_size(container_width)?;

        debug!(
            container_width,
            thumb_width = thumbnail_size.width(),
            "Created grid screen"
        );

        Ok(Self {
            library: MediaLibraryService::new(Arc::clone(&services.store), services.permissions),
            window: CacheWindowController::new(services.backend, thumbnail_size, config),
            thumbnails: ThumbnailLoadCoordinator::new(services.store, services.runtime),
            layout,
            assets: Vec::new(),
            thumbnail_size,
        })
    }

    /// Reload the asset list.
    ///
    /// Pending loads are cancelled and the cache window starts over. On failure the
    /// grid is left empty and the error is returned for display.
    pub async fn reload(&mut self) -> MediaResult<usize> {
        self.thumbnails.cancel_all();
        self.window.reset();

        match self.library.load_assets().await {
            Ok(assets) => {
                info!(count = assets.len(), "Loaded assets");
                self.layout.set_item_count(assets.len());
                self.assets = assets;
                Ok(self.assets.len())
            }
            Err(e) => {
                warn!(error = %e, "Failed to load assets");
                self.layout.set_item_count(0);
                self.assets.clear();
                Err(e)
            }
        }
    }

    /// Start loading the first cells so the grid is not blank when first shown.
    pub fn load_initial_thumbnails(&mut self) {
        let count = self.assets.len().min(INITIAL_THUMBNAIL_COUNT);
        for asset in &self.assets[..count] {
            self.thumbnails.load_thumbnail(&asset.id, self.thumbnail_size);
        }
        debug!(count, "Loading initial thumbnails");
    }

    /// Resize the grid. Changing cell size also changes the thumbnail size.
    pub fn set_container_width(&mut self, width: f64) -> MediaResult<()> {
        self.layout.set_container_width(width);
        let size = self.layout.thumbnail_size(width)?;
        if size != self.thumbnail_size {
            debug!(width = size.width(), "Thumbnail size changed");
            self.thumbnail_size = size;
            self.window.set_thumbnail_size(size);
        }
        Ok(())
    }

    /// Feed a viewport change to the cache window. Returns true if hints were issued.
    pub fn on_scroll(&mut self, visible: Rect, viewport_height: f64) -> bool {
        self.window
            .on_viewport_changed(visible, viewport_height, &self.layout, &self.assets)
    }

    pub fn asset_at(&self, index: usize) -> Option<&AssetRef> {
        self.assets.get(index)
    }

    /// A cell is about to be shown: returns its thumbnail if already loaded,
    /// otherwise starts loading it.
    pub fn cell_will_appear(&mut self, index: usize) -> Option<&Thumbnail> {
        let id = self.assets.get(index)?.id.clone();
        if self.thumbnails.thumbnail(&id).is_none() {
            self.thumbnails.load_thumbnail(&id, self.thumbnail_size);
        }
        self.thumbnails.thumbnail(&id)
    }

    /// Start loads for cells the view expects to show soon.
    pub fn prefetch_items(&mut self, indices: &[usize]) {
        for &index in indices {
            let Some(asset) = self.assets.get(index) else {
                continue;
            };
            self.thumbnails.load_thumbnail(&asset.id, self.thumbnail_size);
        }
    }

    /// The view no longer expects to show these cells.
    pub fn cancel_prefetching(&mut self, indices: &[usize]) {
        for &index in indices {
            let Some(asset) = self.assets.get(index) else {
                continue;
            };
            self.thumbnails.cancel_thumbnail_loading(&asset.id);
        }
    }

    /// Apply finished loads; returns the ids whose cells should refresh.
    pub fn apply_completions(&mut self) -> Vec<AssetId> {
        self.thumbnails
            .drain_completions()
            .into_iter()
            .filter(|c| c.status == CompletionStatus::Loaded)
            .map(|c| c.id)
            .collect()
    }

    pub async fn next_completion(&mut self) -> Option<AppliedCompletion> {
        self.thumbnails.next_completion().await
    }

    pub fn subscribe(&mut self) -> async_channel::Receiver<ThumbnailLoaded> {
        self.thumbnails.subscribe()
    }

    pub fn thumbnail(&self, id: &AssetId) -> Option<&Thumbnail> {
        self.thumbnails.thumbnail(id)
    }

    pub fn assets(&self) -> &[AssetRef] {
        &self.assets
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn thumbnails(&self) -> &ThumbnailLoadCoordinator {
        &self.thumbnails
    }

    pub fn thumbnail_size(&self) -> ThumbnailSize {
        self.thumbnail_size
    }

    pub fn preheat_rect(&self) -> Rect {
        self.window.previous_preheat_rect()
    }

    /// Stop all work before the screen goes away.
    pub fn teardown(&mut self) {
        self.thumbnails.cancel_all();
        self.window.reset();
        debug!("Tore down grid screen");
    }
}

/// True if `error` should be shown to the user rather than just logged.
pub fn should_surface(error: &MediaError) -> bool {
    error.is_user_facing()
}
