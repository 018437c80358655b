use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use review_core::PermissionGate;
use shared::domain::AuthorizationStatus;
use tracing::debug;

/// Maps accessibility of the gallery root onto the authorization states a
/// platform permission prompt would produce.
pub struct DirAccessGate {
    root: PathBuf,
}

impl DirAccessGate {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl PermissionGate for DirAccessGate {
    async fn request_access(&self) -> AuthorizationStatus {
        match tokio::fs::read_dir(&self.root).await {
            Ok(_) => AuthorizationStatus::Authorized,
            Err(err) => {
                debug!(root = %self.root.display(), "gallery root inaccessible: {err}");
                match err.kind() {
                    io::ErrorKind::PermissionDenied => AuthorizationStatus::Denied,
                    io::ErrorKind::NotFound => AuthorizationStatus::Restricted,
                    _ => AuthorizationStatus::Undetermined,
                }
            }
        }
    }
}
