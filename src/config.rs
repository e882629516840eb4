//! Tunables for the grid screen and its caches.

use crate::layout::DEFAULT_EXPANSION_RATIO;

/// Default number of grid columns.
const DEFAULT_COLUMNS: u32 = 4;

/// Maximum number of grid columns.
const MAX_COLUMNS: u32 = 12;

/// Default gap between cells in points.
const DEFAULT_SPACING: f64 = 2.0;

/// The preheat window is refreshed once its center moves more than
/// `viewport_height / DEFAULT_THRESHOLD_DIVISOR`.
const DEFAULT_THRESHOLD_DIVISOR: f64 = 3.0;

/// Default memory budget of the warm-up cache in megabytes.
const DEFAULT_BACKEND_MEMORY_MB: usize = 64;

/// Minimum warm-up cache size in megabytes.
const MIN_BACKEND_MEMORY_MB: usize = 16;

/// Maximum warm-up cache size in megabytes.
const MAX_BACKEND_MEMORY_MB: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub columns: u32,
    pub spacing: f64,
    pub scale: f64,
    pub expansion_ratio: f64,
    pub threshold_divisor: f64,
    pub backend_memory_mb: usize,
}

impl GridConfig {
    pub fn builder() -> GridConfigBuilder {
        GridConfigBuilder::new()
    }

    /// Minimum center movement that triggers a cache-window refresh.
    pub fn update_threshold(&self, viewport_height: f64) -> f64 {
        viewport_height / self.threshold_divisor
    }

    pub fn backend_memory_bytes(&self) -> usize {
        self.backend_memory_mb * 1024 * 1024
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfigBuilder::new().build()
    }
}

/// Builder for GridConfig. Out-of-range values are clamped, not rejected.
pub struct GridConfigBuilder {
    columns: u32,
    spacing: f64,
    scale: f64,
    expansion_ratio: f64,
    threshold_divisor: f64,
    backend_memory_mb: usize,
}

impl GridConfigBuilder {
    pub fn new() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            spacing: DEFAULT_SPACING,
            scale: 1.0,
            expansion_ratio: DEFAULT_EXPANSION_RATIO,
            threshold_divisor: DEFAULT_THRESHOLD_DIVISOR,
            backend_memory_mb: DEFAULT_BACKEND_MEMORY_MB,
        }
    }

    pub fn columns(mut self, columns: u32) -> Self {
        self.columns = columns;
        self
    }

    pub fn spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn expansion_ratio(mut self, ratio: f64) -> Self {
        self.expansion_ratio = ratio;
        self
    }

    pub fn threshold_divisor(mut self, divisor: f64) -> Self {
        self.threshold_divisor = divisor;
        self
    }

    pub fn backend_memory_mb(mut self, mb: usize) -> Self {
        self.backend_memory_mb = mb;
        self
    }

    pub fn build(self) -> GridConfig {
        GridConfig {
            columns: self.columns.clamp(1, MAX_COLUMNS),
            spacing: self.spacing.max(0.0),
            scale: if self.scale > 0.0 { self.scale } else { 1.0 },
            expansion_ratio: self.expansion_ratio.max(0.0),
            threshold_divisor: if self.threshold_divisor > 0.0 {
                self.threshold_divisor
            } else {
                DEFAULT_THRESHOLD_DIVISOR
            },
            backend_memory_mb: self
                .backend_memory_mb
                .clamp(MIN_BACKEND_MEMORY_MB, MAX_BACKEND_MEMORY_MB),
        }
    }
}

impl Default for GridConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
