use std::sync::Arc;

use crate::error::{MediaError, MediaResult};
use crate::models::AssetId;

/// Requested thumbnail dimensions in pixels. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbnailSize {
    width: u32,
    height: u32,
}

impl ThumbnailSize {
    pub fn new(width: u32, height: u32) -> MediaResult<Self> {
        if width == 0 || height == 0 {
            return Err(MediaError::InvalidThumbnailSize { width, height });
        }
        Ok(Self { width, height })
    }

    /// Square size of `side` pixels.
    pub fn square(side: u32) -> MediaResult<Self> {
        Self::new(side, side)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Encoded thumbnail bytes as produced by the asset store.
///
/// Bytes are shared, so cloning a thumbnail out of the cache is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    asset_id: AssetId,
    bytes: Arc<[u8]>,
    size: ThumbnailSize,
}

impl Thumbnail {
    pub fn new(asset_id: AssetId, bytes: Vec<u8>, size: ThumbnailSize) -> MediaResult<Self> {
        if bytes.is_empty() {
            return Err(MediaError::InvalidThumbnailData);
        }
        Ok(Self {
            asset_id,
            bytes: bytes.into(),
            size,
        })
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> ThumbnailSize {
        self.size
    }

    /// Memory held by the encoded bytes.
    pub fn memory_bytes(&self) -> usize {
        self.bytes.len()
    }
}
