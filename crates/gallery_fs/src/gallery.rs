use std::{
    collections::HashMap,
    io::Cursor,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use review_core::{FetchedImage, GalleryProvider};
use shared::domain::{PhotoId, PhotoMetadata};
use tokio::{
    fs,
    io::AsyncReadExt,
    sync::{mpsc, Mutex},
};
use tracing::debug;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &[
    "avif", "bmp", "gif", "ico", "jpeg", "jpg", "png", "tif", "tiff", "webp",
];
const FETCH_CHUNK_BYTES: usize = 64 * 1024;
const IMAGE_CACHE_ENTRIES: usize = 32;

/// Gallery provider over a directory tree of image files. The directory is
/// rescanned on every count request so the asset count is always live;
/// photo ids stay attached to their paths across rescans.
pub struct FsGallery {
    root: PathBuf,
    index: Mutex<GalleryIndex>,
    cache: Mutex<LruCache<PhotoId, FetchedImage>>,
}

#[derive(Default)]
struct GalleryIndex {
    ordered: Vec<PhotoId>,
    // Ids of vanished files are kept so a history fetch fails with a clean
    // error instead of resolving to a different asset.
    paths: HashMap<PhotoId, PathBuf>,
    ids_by_path: HashMap<PathBuf, PhotoId>,
}

impl FsGallery {
    pub fn new(root: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            root: root.into(),
            index: Mutex::new(GalleryIndex::default()),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(IMAGE_CACHE_ENTRIES).expect("cache size must be > 0"),
            )),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn path_of(&self, photo: PhotoId) -> Option<PathBuf> {
        self.index.lock().await.paths.get(&photo).cloned()
    }

    /// Drops a photo from the scan order and byte cache right after a
    /// deletion, without waiting for the next rescan.
    pub async fn mark_removed(&self, photo: PhotoId) {
        self.index
            .lock()
            .await
            .ordered
            .retain(|candidate| *candidate != photo);
        self.cache.lock().await.pop(&photo);
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    async fn rescan(&self) -> Result<usize> {
        let root = self.root.clone();
        let found = tokio::task::spawn_blocking(move || {
            let mut found: Vec<(PathBuf, SystemTime)> = Vec::new();
            for entry in WalkDir::new(&root)
                .follow_links(false)
                .into_iter()
                .filter_map(|entry| entry.ok())
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path().to_path_buf();
                if !Self::is_image(&path) {
                    continue;
                }
                let modified = entry
                    .metadata()
                    .ok()
                    .and_then(|metadata| metadata.modified().ok())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                found.push((path, modified));
            }
            // Oldest first, ties broken by path for a stable order.
            found.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            found
        })
        .await
        .context("gallery scan task failed")?;

        let mut index = self.index.lock().await;
        index.ordered.clear();
        for (path, _) in found {
            let id = match index.ids_by_path.get(&path) {
                Some(id) => *id,
                None => {
                    let id = PhotoId::new();
                    index.ids_by_path.insert(path.clone(), id);
                    index.paths.insert(id, path);
                    id
                }
            };
            index.ordered.push(id);
        }
        debug!(
            root = %self.root.display(),
            assets = index.ordered.len(),
            "gallery rescanned"
        );
        Ok(index.ordered.len())
    }
}

#[async_trait]
impl GalleryProvider for FsGallery {
    async fn asset_count(&self) -> Result<usize> {
        self.rescan().await
    }

    async fn photo_at(&self, index: usize) -> Result<PhotoId> {
        let guard = self.index.lock().await;
        guard.ordered.get(index).copied().ok_or_else(|| {
            anyhow!(
                "photo index {index} out of range ({} assets)",
                guard.ordered.len()
            )
        })
    }

    async fn fetch_image(
        &self,
        photo: PhotoId,
        progress: mpsc::Sender<f64>,
    ) -> Result<FetchedImage> {
        if let Some(cached) = self.cache.lock().await.get(&photo).cloned() {
            debug!(%photo, "image cache hit");
            let _ = progress.send(1.0).await;
            return Ok(cached);
        }

        let path = self
            .path_of(photo)
            .await
            .ok_or_else(|| anyhow!("unknown photo {photo}"))?;

        let mut file = fs::File::open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        let stat = file
            .metadata()
            .await
            .with_context(|| format!("failed to stat {}", path.display()))?;
        let modified_at = stat.modified().ok().map(DateTime::<Utc>::from);
        let total = stat.len();

        let mut bytes = Vec::with_capacity(total as usize);
        let mut chunk = vec![0_u8; FETCH_CHUNK_BYTES];
        loop {
            let read = file
                .read(&mut chunk)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            if read == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..read]);
            if total > 0 {
                // The receiver may already be gone when the display cycle
                // was superseded; keep reading regardless.
                let _ = progress.send(bytes.len() as f64 / total as f64).await;
            }
        }

        let dimensions = image::ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok());

        let metadata = PhotoMetadata {
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes: total,
            pixel_width: dimensions.map(|(width, _)| width),
            pixel_height: dimensions.map(|(_, height)| height),
            modified_at,
        };

        let image = FetchedImage {
            photo,
            bytes,
            metadata,
        };
        self.cache.lock().await.put(photo, image.clone());
        Ok(image)
    }
}
