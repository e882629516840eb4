//! Viewport-driven precaching.
//!
//! - `CacheWindowController` - Tracks the preheat window and issues start/stop hints
//! - `CachingBackend` - Receiver of those hints
//! - `MemoryCachingBackend` - Warm-up cache backed by the asset store

pub mod backend;
pub mod window;

pub use backend::MemoryCachingBackend;
pub use window::CacheWindowController;

use crate::models::{AssetRef, ThumbnailSize};

/// Low-level precacher driven by start/stop hints.
///
/// Calls are fire-and-forget: no results, no completion signal. Implementations
/// handle their own failures.
pub trait CachingBackend: Send + Sync {
    fn start_caching(&self, assets: &[AssetRef], size: ThumbnailSize);
    fn stop_caching(&self, assets: &[AssetRef], size: ThumbnailSize);
    fn reset_cache(&self);
}
