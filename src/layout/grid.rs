use crate::config::GridConfig;
use crate::error::MediaResult;
use crate::models::ThumbnailSize;

use super::{LayoutQuery, Rect};

/// Uniform square-cell grid.
///
/// Items flow left-to-right, `columns` per row, separated by `spacing` both
/// horizontally and vertically. Cell width follows the container width.
#[derive(Debug, Clone)]
pub struct GridLayout {
    /// Number of columns (default: 4)
    pub columns: u32,
    /// Gap between cells in points (default: 2)
    pub spacing: f64,
    /// Display scale used to turn points into pixels (default: 1)
    pub scale: f64,
    container_width: f64,
    item_count: usize,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            columns: 4,
            spacing: 2.0,
            scale: 1.0,
            container_width: 0.0,
            item_count: 0,
        }
    }
}

impl GridLayout {
    pub fn new(columns: u32, spacing: f64, scale: f64) -> Self {
        Self {
            columns: columns.max(1),
            spacing: spacing.max(0.0),
            scale: if scale > 0.0 { scale } else { 1.0 },
            ..Default::default()
        }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.columns, config.spacing, config.scale)
    }

    pub fn set_container_width(&mut self, width: f64) {
        self.container_width = width.max(0.0);
    }

    pub fn container_width(&self) -> f64 {
        self.container_width
    }

    pub fn set_item_count(&mut self, count: usize) {
        self.item_count = count;
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Side length of one square cell for the given container width.
    ///
    /// # Arguments
    /// * `container_width` - Width available to the grid in points
    pub fn item_size(&self, container_width: f64) -> f64 {
        let columns = f64::from(self.columns.max(1));
        let total_spacing = self.spacing * (columns - 1.0);
        ((container_width - total_spacing) / columns).max(0.0)
    }

    /// Pixel size to request thumbnails at, cell size times display scale.
    pub fn thumbnail_size(&self, container_width: f64) -> MediaResult<ThumbnailSize> {
        let side = (self.item_size(container_width) * self.scale).round().max(1.0);
        ThumbnailSize::square(side as u32)
    }

    fn row_stride(&self) -> f64 {
        self.item_size(self.container_width) + self.spacing
    }

    fn row_count(&self) -> usize {
        let columns = self.columns.max(1) as usize;
        self.item_count.div_ceil(columns)
    }

    /// Total scrollable height of the laid-out content.
    pub fn content_height(&self) -> f64 {
        let rows = self.row_count();
        if rows == 0 {
            return 0.0;
        }
        rows as f64 * self.row_stride() - self.spacing
    }

    /// Frame of the cell at `index`, regardless of whether the item exists.
    pub fn frame_for_item(&self, index: usize) -> Rect {
        let columns = self.columns.max(1) as usize;
        let side = self.item_size(self.container_width);
        let stride = side + self.spacing;
        let row = index / columns;
        let column = index % columns;
        Rect::new(column as f64 * stride, row as f64 * stride, side, side)
    }
}

impl LayoutQuery for GridLayout {
    fn index_paths_intersecting(&self, rect: Rect) -> Vec<usize> {
        let rows = self.row_count();
        let stride = self.row_stride();
        if rect.is_empty() || rows == 0 || stride <= 0.0 {
            return Vec::new();
        }

        // Candidate rows by vertical span, then exact frame test.
        let first_row = (rect.min_y().max(0.0) / stride).floor() as usize;
        let last_row = ((rect.max_y().max(0.0) / stride).floor() as usize).min(rows - 1);
        if first_row > last_row {
            return Vec::new();
        }

        let columns = self.columns.max(1) as usize;
        let end = ((last_row + 1) * columns).min(self.item_count);
        (first_row * columns..end)
            .filter(|&index| self.frame_for_item(index).intersects(&rect))
            .collect()
    }
}
