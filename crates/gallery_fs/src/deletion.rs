use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use review_core::DeletionService;
use shared::domain::PhotoId;
use tracing::debug;

use crate::gallery::FsGallery;

/// Deletion service that moves gallery files to the OS trash rather than
/// unlinking them, so a review mistake stays recoverable.
pub struct TrashDeletionService {
    gallery: Arc<FsGallery>,
}

impl TrashDeletionService {
    pub fn new(gallery: Arc<FsGallery>) -> Self {
        Self { gallery }
    }
}

#[async_trait]
impl DeletionService for TrashDeletionService {
    async fn delete(&self, photo: PhotoId) -> Result<()> {
        let path = self
            .gallery
            .path_of(photo)
            .await
            .ok_or_else(|| anyhow!("unknown photo {photo}"))?;
        debug!(%photo, path = %path.display(), "moving photo to trash");

        let target = path.clone();
        tokio::task::spawn_blocking(move || trash::delete(&target))
            .await
            .context("trash task failed")?
            .with_context(|| format!("failed to trash {}", path.display()))?;

        self.gallery.mark_removed(photo).await;
        Ok(())
    }
}
