use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{MediaError, MediaResult};

/// Opaque identifier issued by the asset store. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(value: impl Into<String>) -> MediaResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(MediaError::InvalidMediaId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for AssetId {
    type Error = MediaError;

    fn try_from(value: &str) -> MediaResult<Self> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Heic,
    WebP,
    Gif,
}

impl MediaFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "heic" | "heif" => Some(Self::Heic),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// One entry of the ordered asset list the grid displays.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRef {
    pub id: AssetId,
    pub format: MediaFormat,
    pub captured_at: SystemTime,
    pub file_path: PathBuf,
}

impl AssetRef {
    pub fn new(
        id: AssetId,
        format: MediaFormat,
        captured_at: SystemTime,
        file_path: impl Into<PathBuf>,
    ) -> MediaResult<Self> {
        let file_path = file_path.into();
        if file_path.as_os_str().is_empty() {
            return Err(MediaError::InvalidFilePath);
        }
        Ok(Self {
            id,
            format,
            captured_at,
            file_path,
        })
    }
}
