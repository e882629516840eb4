//! Geometry for sizing and diffing the cache window.
//!
//! All functions are pure. The window controller calls them on every viewport
//! change and only does work when `should_update_cache` says the window moved
//! far enough.

use super::Rect;

/// Default vertical expansion applied above and below the visible rect.
pub const DEFAULT_EXPANSION_RATIO: f64 = 0.5;

/// Regions entering and leaving the cache window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RectDifference {
    pub added: Vec<Rect>,
    pub removed: Vec<Rect>,
}

impl RectDifference {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Expands `visible` by `expansion_ratio * height` above and below.
pub fn create_preheat_rect(visible: Rect, expansion_ratio: f64) -> Rect {
    visible.inset_by(0.0, -expansion_ratio * visible.height)
}

/// Whether the window center moved strictly more than `threshold`.
pub fn should_update_cache(current: Rect, previous: Rect, threshold: f64) -> bool {
    (current.mid_y() - previous.mid_y()).abs() > threshold
}

/// Computes which vertical slices were gained and lost moving from `old` to `new`.
///
/// Disjoint rects are swapped wholesale. Otherwise the top and bottom edges are
/// compared independently, giving at most two added and two removed slices.
pub fn calculate_differences(old: Rect, new: Rect) -> RectDifference {
    if !old.intersects(&new) {
        return RectDifference {
            added: vec![new],
            removed: vec![old],
        };
    }

    let mut added = Vec::with_capacity(2);
    let mut removed = Vec::with_capacity(2);

    if new.max_y() > old.max_y() {
        added.push(Rect::new(
            new.x,
            old.max_y(),
            new.width,
            new.max_y() - old.max_y(),
        ));
    }
    if old.min_y() > new.min_y() {
        added.push(Rect::new(
            new.x,
            new.min_y(),
            new.width,
            old.min_y() - new.min_y(),
        ));
    }
    if new.max_y() < old.max_y() {
        removed.push(Rect::new(
            old.x,
            new.max_y(),
            old.width,
            old.max_y() - new.max_y(),
        ));
    }
    if old.min_y() < new.min_y() {
        removed.push(Rect::new(
            old.x,
            old.min_y(),
            old.width,
            new.min_y() - old.min_y(),
        ));
    }

    RectDifference { added, removed }
}
