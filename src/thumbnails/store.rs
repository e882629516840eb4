use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::MediaResult;
use crate::models::{AssetId, AssetRef, Thumbnail, ThumbnailSize};

/// Source of assets and their thumbnail bytes.
///
/// Implementations own decoding, resizing and any timeouts. They should watch
/// `cancel` and bail out early once it fires; callers only request cancellation.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Ordered list of assets to display.
    ///
    /// Fails with `EnumerationFailed` or `PermissionDenied`.
    async fn fetch_assets(&self) -> MediaResult<Vec<AssetRef>>;

    /// Produces the thumbnail for `id` at roughly `size`.
    ///
    /// Fails with `NotFound` or `GenerationFailed`.
    async fn fetch_thumbnail(
        &self,
        id: &AssetId,
        size: ThumbnailSize,
        cancel: CancellationToken,
    ) -> MediaResult<Thumbnail>;
}
