//! Thumbnail loading for the grid.
//!
//! This module provides:
//! - `ThumbnailLoadCoordinator` - Deduplicated, cancellable per-asset loads
//! - `AssetStore` - The collaborator that enumerates assets and produces thumbnails
//! - `DirectoryAssetStore` - Store over image files on disk
//! - `ThumbnailGenerator` - Resizing and JPEG encoding for the directory store

pub mod coordinator;
pub mod fs_store;
pub mod generator;
pub mod store;

pub use coordinator::{
    AppliedCompletion, CompletionStatus, LoadState, ThumbnailLoadCoordinator, ThumbnailLoaded,
};
pub use fs_store::{DirectoryAssetStore, ScanConfig};
pub use store::AssetStore;
