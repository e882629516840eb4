use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use super::CachingBackend;
use crate::config::GridConfig;
use crate::layout::{
    calculate_differences, create_preheat_rect, should_update_cache, LayoutQuery, Rect,
};
use crate::models::{AssetRef, ThumbnailSize};

/// Keeps the caching backend warm for the region around the viewport.
///
/// The preheat rect is the visible rect grown by `expansion_ratio` of its height
/// above and below. It is only recomputed once its center has moved more than a
/// third of the viewport height, so most scroll ticks cost one comparison.
pub struct CacheWindowController {
    backend: Arc<dyn CachingBackend>,
    thumbnail_size: ThumbnailSize,
    config: GridConfig,
    previous_preheat_rect: Rect,
}

impl CacheWindowController {
    pub fn new(
        backend: Arc<dyn CachingBackend>,
        thumbnail_size: ThumbnailSize,
        config: &GridConfig,
    ) -> Self {
        Self {
            backend,
            thumbnail_size,
            config: config.clone(),
            previous_preheat_rect: Rect::ZERO,
        }
    }

    pub fn previous_preheat_rect(&self) -> Rect {
        self.previous_preheat_rect
    }

    pub fn thumbnail_size(&self) -> ThumbnailSize {
        self.thumbnail_size
    }

    /// Change the size hints are issued at.
    ///
    /// Hints already sent were for the old size, so a change resets the window.
    pub fn set_thumbnail_size(&mut self, size: ThumbnailSize) {
        if size != self.thumbnail_size {
            self.thumbnail_size = size;
            self.reset();
        }
    }

    /// Update the preheat window for a new visible rect.
    ///
    /// Returns true if the window moved and hints were issued.
    ///
    /// # Arguments
    /// * `visible` - Currently visible region in content coordinates
    /// * `viewport_height` - Height of the scroll viewport
    /// * `layout` - Maps regions to item indices
    /// * `snapshot` - Current asset list, indexed like the layout
    pub fn on_viewport_changed(
        &mut self,
        visible: Rect,
        viewport_height: f64,
        layout: &dyn LayoutQuery,
        snapshot: &[AssetRef],
    ) -> bool {
        let preheat = create_preheat_rect(visible, self.config.expansion_ratio);
        let threshold = self.config.update_threshold(viewport_height);
        if !should_update_cache(preheat, self.previous_preheat_rect, threshold) {
            return false;
        }

        let diff = calculate_differences(self.previous_preheat_rect, preheat);
        let added = resolve_assets(&diff.added, layout, snapshot);
        let removed = resolve_assets(&diff.removed, layout, snapshot);

        trace!(
            ?preheat,
            added = added.len(),
            removed = removed.len(),
            "Updating preheat window"
        );

        if !added.is_empty() {
            self.backend.start_caching(&added, self.thumbnail_size);
        }
        if !removed.is_empty() {
            self.backend.stop_caching(&removed, self.thumbnail_size);
        }

        self.previous_preheat_rect = preheat;
        true
    }

    /// Drop all backend hints and forget the window.
    pub fn reset(&mut self) {
        self.backend.reset_cache();
        self.previous_preheat_rect = Rect::ZERO;
        debug!("Reset preheat window");
    }
}

/// Assets laid out inside `rects`, in first-seen order.
///
/// Indices past the end of `snapshot` are skipped; layout can briefly lag a reload.
fn resolve_assets(
    rects: &[Rect],
    layout: &dyn LayoutQuery,
    snapshot: &[AssetRef],
) -> Vec<AssetRef> {
    let mut seen = HashSet::new();
    rects
        .iter()
        .flat_map(|rect| layout.index_paths_intersecting(*rect))
        .filter(|index| seen.insert(*index))
        .filter_map(|index| snapshot.get(index).cloned())
        .collect()
}
