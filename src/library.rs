//! Permission-gated asset enumeration.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::models::AssetRef;
use crate::thumbnails::AssetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// Access to the whole library.
    Authorized,
    /// Access to a user-selected subset.
    Limited,
    Denied,
    /// Blocked by policy; the user cannot grant it.
    Restricted,
    NotDetermined,
}

impl PermissionStatus {
    pub fn grants_access(&self) -> bool {
        matches!(self, PermissionStatus::Authorized | PermissionStatus::Limited)
    }
}

/// Library access permission, as reported by the platform.
#[async_trait]
pub trait PermissionService: Send + Sync {
    fn status(&self) -> PermissionStatus;

    /// Ask the user. Only meaningful while the status is `NotDetermined`.
    async fn request(&self) -> PermissionStatus;
}

/// Permission service for sources without an access prompt, such as local folders.
pub struct AlwaysAuthorized;

#[async_trait]
impl PermissionService for AlwaysAuthorized {
    fn status(&self) -> PermissionStatus {
        PermissionStatus::Authorized
    }

    async fn request(&self) -> PermissionStatus {
        PermissionStatus::Authorized
    }
}

/// Loads the asset list once permission allows it.
pub struct MediaLibraryService {
    store: Arc<dyn AssetStore>,
    permissions: Arc<dyn PermissionService>,
}

impl MediaLibraryService {
    pub fn new(store: Arc<dyn AssetStore>, permissions: Arc<dyn PermissionService>) -> Self {
        Self { store, permissions }
    }

    /// Check (or request) permission, then enumerate assets.
    pub async fn load_assets(&self) -> MediaResult<Vec<AssetRef>> {
        match self.permissions.status() {
            PermissionStatus::NotDetermined => {
                debug!("Requesting library permission");
                let status = self.permissions.request().await;
                if !status.grants_access() {
                    info!(?status, "Library permission not granted");
                    return Err(MediaError::PermissionDenied);
                }
            }
            PermissionStatus::Denied | PermissionStatus::Restricted => {
                return Err(MediaError::PermissionDenied);
            }
            PermissionStatus::Authorized | PermissionStatus::Limited => {}
        }

        self.store.fetch_assets().await
    }
}
