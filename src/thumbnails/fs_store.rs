//! Asset store backed by image files in a directory tree.
//!
//! - Recursive directory scanning using walkdir
//! - Asset ids are the xxh3 hash of the file path
//! - Thumbnails are generated on the blocking pool with the image crate

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use xxhash_rust::xxh3::xxh3_64;

use super::generator::ThumbnailGenerator;
use super::store::AssetStore;
use crate::error::{MediaError, MediaResult};
use crate::models::{AssetId, AssetRef, MediaFormat, Thumbnail, ThumbnailSize};

/// Configuration for directory scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to scan directories recursively.
    pub recursive: bool,
    /// Maximum directory depth (0 = unlimited).
    pub max_depth: usize,
    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: 0, // unlimited
            follow_symlinks: false,
        }
    }
}

/// Serves assets found under a root directory, newest first.
pub struct DirectoryAssetStore {
    root: PathBuf,
    config: ScanConfig,
    /// Paths of the assets returned by the last enumeration.
    index: RwLock<HashMap<AssetId, PathBuf>>,
}

impl DirectoryAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, ScanConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: ScanConfig) -> Self {
        Self {
            root: root.into(),
            config,
            index: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable id for a file path.
    pub fn asset_id_for(path: &Path) -> MediaResult<AssetId> {
        let hash = xxh3_64(path.as_os_str().as_encoded_bytes());
        AssetId::new(format!("{:016x}", hash))
    }

    fn discover(root: &Path, config: &ScanConfig) -> MediaResult<Vec<AssetRef>> {
        if let Err(e) = std::fs::read_dir(root) {
            return Err(match e.kind() {
                ErrorKind::PermissionDenied => MediaError::PermissionDenied,
                _ => MediaError::EnumerationFailed(format!("{}: {}", root.display(), e)),
            });
        }

        let mut walker = WalkDir::new(root).follow_links(config.follow_symlinks);
        if !config.recursive {
            walker = walker.max_depth(1);
        } else if config.max_depth > 0 {
            walker = walker.max_depth(config.max_depth);
        }

        let mut assets = Vec::new();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let Some(format) = MediaFormat::from_path(path) else {
                continue;
            };

            let captured_at = match entry.metadata() {
                Ok(m) => m.modified().unwrap_or(UNIX_EPOCH),
                Err(e) => {
                    warn!("Failed to read metadata for {:?}: {}", path, e);
                    continue;
                }
            };

            let id = Self::asset_id_for(path)?;
            assets.push(AssetRef::new(id, format, captured_at, path)?);
        }

        // Newest first, path as tie-breaker for a stable order
        assets.sort_by(|a, b| {
            b.captured_at
                .cmp(&a.captured_at)
                .then_with(|| a.file_path.cmp(&b.file_path))
        });

        Ok(assets)
    }
}

#[async_trait]
impl AssetStore for DirectoryAssetStore {
    async fn fetch_assets(&self) -> MediaResult<Vec<AssetRef>> {
        let root = self.root.clone();
        let config = self.config.clone();

        let assets = task::spawn_blocking(move || Self::discover(&root, &config))
            .await
            .map_err(|e| MediaError::EnumerationFailed(format!("Scan task panicked: {}", e)))??;

        *self.index.write() = assets
            .iter()
            .map(|a| (a.id.clone(), a.file_path.clone()))
            .collect();

        info!(count = assets.len(), root = ?self.root, "Enumerated assets");
        Ok(assets)
    }

    async fn fetch_thumbnail(
        &self,
        id: &AssetId,
        size: ThumbnailSize,
        cancel: CancellationToken,
    ) -> MediaResult<Thumbnail> {
        let path = self
            .index
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| MediaError::NotFound(id.to_string()))?;

        // the image crate has no HEIF decoder
        if MediaFormat::from_path(&path) == Some(MediaFormat::Heic) {
            return Err(MediaError::UnsupportedFormat(path.display().to_string()));
        }

        if cancel.is_cancelled() {
            return Err(MediaError::GenerationFailed("cancelled".into()));
        }

        let generated =
            task::spawn_blocking(move || ThumbnailGenerator::generate_in_memory(&path, size))
                .await
                .map_err(|e| {
                    MediaError::GenerationFailed(format!("Thumbnail task panicked: {}", e))
                })?
                .map_err(|e| MediaError::GenerationFailed(format!("{:#}", e)))?;

        if cancel.is_cancelled() {
            debug!(%id, "Discarding thumbnail generated after cancellation");
            return Err(MediaError::GenerationFailed("cancelled".into()));
        }

        let actual = ThumbnailSize::new(generated.width, generated.height)?;
        Thumbnail::new(id.clone(), generated.bytes, actual)
    }
}
