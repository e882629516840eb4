//! Scrolling thumbnail grid with viewport-driven preheating.
//!
//! - `layout`: rect geometry, preheat window math and the grid layout
//! - `preheat`: cache window controller and the in-memory warm-up backend
//! - `thumbnails`: deduplicated, cancellable per-asset thumbnail loading
//! - `screen`: the grid screen that wires everything together

pub mod config;
pub mod error;
pub mod layout;
pub mod library;
pub mod models;
pub mod preheat;
pub mod screen;
pub mod thumbnails;

#[cfg(test)]
mod testing;

pub use config::GridConfig;
pub use error::{MediaError, MediaResult};
pub use layout::{GridLayout, LayoutQuery, Rect};
pub use library::{AlwaysAuthorized, MediaLibraryService, PermissionService, PermissionStatus};
pub use models::{AssetId, AssetRef, MediaFormat, Thumbnail, ThumbnailSize};
pub use preheat::{CacheWindowController, CachingBackend, MemoryCachingBackend};
pub use screen::{GridScreen, GridServices};
pub use thumbnails::{AssetStore, DirectoryAssetStore, ThumbnailLoadCoordinator, ThumbnailLoaded};
