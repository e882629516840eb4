use thiserror::Error;

/// Domain errors for assets, thumbnails and the library collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("Invalid media ID")]
    InvalidMediaId,
    #[error("Invalid file path")]
    InvalidFilePath,
    #[error("Invalid thumbnail data")]
    InvalidThumbnailData,
    #[error("Invalid thumbnail size: {width}x{height}")]
    InvalidThumbnailSize { width: u32, height: u32 },
    #[error("Photo library access permission denied")]
    PermissionDenied,
    #[error("Asset enumeration failed: {0}")]
    EnumerationFailed(String),
    #[error("Media not found: {0}")]
    NotFound(String),
    #[error("Thumbnail generation failed: {0}")]
    GenerationFailed(String),
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

impl MediaError {
    /// Whether this failure ends the current load and should be shown to the user.
    ///
    /// Per-item thumbnail failures are soft: they get logged and the item stays
    /// retryable on its next appearance.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            MediaError::PermissionDenied | MediaError::EnumerationFailed(_)
        )
    }
}

pub type MediaResult<T> = std::result::Result<T, MediaError>;
