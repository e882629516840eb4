//! Grid geometry: rectangles, cache-window diffing and the uniform grid layout.

pub mod difference;
pub mod grid;
pub mod rect;

pub use difference::{
    calculate_differences, create_preheat_rect, should_update_cache, RectDifference,
    DEFAULT_EXPANSION_RATIO,
};
pub use grid::GridLayout;
pub use rect::Rect;

/// Answers which laid-out items fall inside a region of the grid content.
pub trait LayoutQuery {
    /// Item indices whose frames intersect `rect`, in ascending order.
    fn index_paths_intersecting(&self, rect: Rect) -> Vec<usize>;
}
