use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::Rng;
use shared::{
    domain::{AuthorizationStatus, PhotoId, PhotoMetadata},
    error::ReviewError,
    protocol::{DisplayPhase, ReviewSnapshot},
};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

pub mod history;

pub use history::NavHistory;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const PROGRESS_CHANNEL_CAPACITY: usize = 16;

/// Image bytes resolved for one photo, together with what is known about the
/// underlying asset.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedImage {
    pub photo: PhotoId,
    pub bytes: Vec<u8>,
    pub metadata: PhotoMetadata,
}

#[async_trait]
pub trait GalleryProvider: Send + Sync {
    /// Live asset count. Re-queried on every request; never cached by the
    /// controller.
    async fn asset_count(&self) -> Result<usize>;
    async fn photo_at(&self, index: usize) -> Result<PhotoId>;
    /// Resolves image bytes for a photo, reporting progress in `[0.0, 1.0]`
    /// on the supplied channel from whatever worker context the provider
    /// runs on.
    async fn fetch_image(
        &self,
        photo: PhotoId,
        progress: mpsc::Sender<f64>,
    ) -> Result<FetchedImage>;
}

pub struct MissingGalleryProvider;

#[async_trait]
impl GalleryProvider for MissingGalleryProvider {
    async fn asset_count(&self) -> Result<usize> {
        Err(anyhow!("gallery provider is unavailable"))
    }

    async fn photo_at(&self, index: usize) -> Result<PhotoId> {
        Err(anyhow!("gallery provider is unavailable for index {index}"))
    }

    async fn fetch_image(
        &self,
        photo: PhotoId,
        _progress: mpsc::Sender<f64>,
    ) -> Result<FetchedImage> {
        Err(anyhow!("gallery provider is unavailable for photo {photo}"))
    }
}

#[async_trait]
pub trait DeletionService: Send + Sync {
    async fn delete(&self, photo: PhotoId) -> Result<()>;
}

pub struct MissingDeletionService;

#[async_trait]
impl DeletionService for MissingDeletionService {
    async fn delete(&self, photo: PhotoId) -> Result<()> {
        Err(anyhow!("deletion service is unavailable for photo {photo}"))
    }
}

pub trait SampleImageSource: Send + Sync {
    /// One image from the fixed bundled pool, drawn uniformly.
    fn pick_random(&self) -> Result<Vec<u8>>;
}

pub struct MissingSampleImageSource;

impl SampleImageSource for MissingSampleImageSource {
    fn pick_random(&self) -> Result<Vec<u8>> {
        Err(anyhow!("sample image source is unavailable"))
    }
}

#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Queried before any gallery access; may prompt the user on platforms
    /// where that is a thing.
    async fn request_access(&self) -> AuthorizationStatus;
}

/// Gate for environments without a permission model.
pub struct AlwaysAuthorized;

#[async_trait]
impl PermissionGate for AlwaysAuthorized {
    async fn request_access(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }
}

/// Output stream consumed by the presentation layer.
#[derive(Debug, Clone)]
pub enum ReviewEvent {
    ImageReady {
        /// `None` for sample images, which have no gallery identity.
        photo: Option<PhotoId>,
        bytes: Vec<u8>,
        metadata: Option<PhotoMetadata>,
        sample: bool,
    },
    FetchProgress {
        photo: PhotoId,
        progress: f64,
    },
    DisplayCleared,
    PermissionDenied,
    DeleteFailed {
        photo: PhotoId,
        message: String,
    },
}

struct ReviewState {
    history: NavHistory,
    current: Option<PhotoId>,
    phase: DisplayPhase,
    fetch_progress: f64,
    sample_mode: bool,
    /// Stamp of the newest display cycle. Progress and completions from a
    /// superseded cycle are discarded.
    fetch_generation: u64,
}

impl ReviewState {
    fn begin_cycle(&mut self) -> u64 {
        self.phase = DisplayPhase::Fetching;
        self.fetch_progress = 0.0;
        self.fetch_generation += 1;
        self.fetch_generation
    }

    fn snapshot(&self) -> ReviewSnapshot {
        ReviewSnapshot {
            history_len: self.history.len(),
            cursor: self.history.cursor(),
            current: self.current,
            phase: self.phase,
            fetch_progress: self.fetch_progress,
            sample_mode: self.sample_mode,
        }
    }
}

/// Navigation & review controller: owns the visit history and the display
/// state machine, pulls photos from a [`GalleryProvider`], deletes through a
/// [`DeletionService`], and reports everything observable on a broadcast
/// channel. All state mutations happen in short scopes under one mutex; the
/// lock is never held across a provider await.
pub struct ReviewController {
    gallery: Arc<dyn GalleryProvider>,
    deletion: Arc<dyn DeletionService>,
    samples: Arc<dyn SampleImageSource>,
    permissions: Arc<dyn PermissionGate>,
    inner: Mutex<ReviewState>,
    events: broadcast::Sender<ReviewEvent>,
}

impl ReviewController {
    pub fn new(
        gallery: Arc<dyn GalleryProvider>,
        deletion: Arc<dyn DeletionService>,
        samples: Arc<dyn SampleImageSource>,
    ) -> Arc<Self> {
        Self::new_with_dependencies(gallery, deletion, samples, Arc::new(AlwaysAuthorized))
    }

    pub fn new_with_dependencies(
        gallery: Arc<dyn GalleryProvider>,
        deletion: Arc<dyn DeletionService>,
        samples: Arc<dyn SampleImageSource>,
        permissions: Arc<dyn PermissionGate>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            gallery,
            deletion,
            samples,
            permissions,
            inner: Mutex::new(ReviewState {
                history: NavHistory::new(),
                current: None,
                phase: DisplayPhase::Idle,
                fetch_progress: 0.0,
                sample_mode: false,
                fetch_generation: 0,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ReviewEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ReviewSnapshot {
        self.inner.lock().await.snapshot()
    }

    /// Draws a uniformly random photo from the live gallery and displays it.
    /// An empty or unreadable gallery degrades to sample mode instead of
    /// failing; only a permission refusal is reported as an error.
    pub async fn request_random_photo(self: &Arc<Self>) -> Result<(), ReviewError> {
        let status = self.permissions.request_access().await;
        if !status.permits_gallery_access() {
            if status.is_refusal() {
                info!(?status, "gallery access refused");
                let _ = self.events.send(ReviewEvent::PermissionDenied);
                return Err(ReviewError::PermissionDenied);
            }
            debug!(?status, "gallery authorization undetermined; nothing to do");
            return Ok(());
        }

        let count = match self.gallery.asset_count().await {
            Ok(count) => count,
            Err(err) => {
                warn!("asset count unavailable: {err}");
                self.enter_sample_mode().await;
                return Ok(());
            }
        };

        if count == 0 {
            info!("gallery is empty; showing a sample image");
            self.enter_sample_mode().await;
            return Ok(());
        }

        // The index is drawn against the count fetched moments ago and used
        // exactly once; the count is never reused across requests.
        let index = rand::rng().random_range(0..count);
        let photo = match self.gallery.photo_at(index).await {
            Ok(photo) => photo,
            Err(err) => {
                warn!(index, count, "random photo could not be resolved: {err}");
                self.enter_sample_mode().await;
                return Ok(());
            }
        };

        let generation = {
            let mut state = self.inner.lock().await;
            state.history.record(photo);
            state.current = Some(photo);
            state.sample_mode = false;
            state.begin_cycle()
        };
        debug!(%photo, index, count, "random photo selected");

        self.run_fetch_cycle(photo, generation).await;
        Ok(())
    }

    /// Alias used for both the explicit refresh control and tap-to-reload.
    pub async fn refresh(self: &Arc<Self>) -> Result<(), ReviewError> {
        self.request_random_photo().await
    }

    /// Steps back to the previously shown photo. No-op at the start of the
    /// history and in sample mode; the history itself is never mutated here.
    pub async fn go_back(self: &Arc<Self>) -> Result<(), ReviewError> {
        let (photo, generation) = {
            let mut state = self.inner.lock().await;
            if state.sample_mode {
                return Ok(());
            }
            let Some(photo) = state.history.step_back() else {
                return Ok(());
            };
            state.current = Some(photo);
            (photo, state.begin_cycle())
        };
        debug!(%photo, "navigating back");

        self.run_fetch_cycle(photo, generation).await;
        Ok(())
    }

    /// Deletes the currently shown photo through the deletion service. On
    /// success the entry leaves the history and the previous entry is shown
    /// again, or a fresh random photo when the history ran dry. On failure
    /// nothing changes.
    pub async fn delete_current(self: &Arc<Self>) -> Result<(), ReviewError> {
        let photo = {
            let state = self.inner.lock().await;
            if state.sample_mode {
                return Ok(());
            }
            match state.current {
                Some(photo) => photo,
                None => return Ok(()),
            }
        };

        if let Err(err) = self.deletion.delete(photo).await {
            warn!(%photo, "deletion failed: {err}");
            let _ = self.events.send(ReviewEvent::DeleteFailed {
                photo,
                message: err.to_string(),
            });
            return Err(ReviewError::DeleteFailed(err.to_string()));
        }

        let survivor = {
            let mut state = self.inner.lock().await;
            state.history.remove_current();
            state.current = None;
            state.fetch_progress = 0.0;
            state.history.current().copied()
        };
        info!(%photo, "photo deleted");

        match survivor {
            Some(previous) => {
                // Re-display the entry the cursor landed on; the removal
                // already stepped the cursor back once.
                let generation = {
                    let mut state = self.inner.lock().await;
                    state.current = Some(previous);
                    state.begin_cycle()
                };
                self.run_fetch_cycle(previous, generation).await;
                Ok(())
            }
            None => self.request_random_photo().await,
        }
    }

    /// Runs one fetch cycle: streams progress events while the provider
    /// resolves the image, then either publishes the image or clears the
    /// display and falls back to sample mode. Anything belonging to a
    /// superseded generation is dropped on the floor.
    async fn run_fetch_cycle(self: &Arc<Self>, photo: PhotoId, generation: u64) {
        let (progress_tx, mut progress_rx) = mpsc::channel::<f64>(PROGRESS_CHANNEL_CAPACITY);
        let forwarder = tokio::spawn({
            let controller = Arc::clone(self);
            async move {
                let mut reported = 0.0_f64;
                while let Some(progress) = progress_rx.recv().await {
                    let progress = progress.clamp(0.0, 1.0);
                    if progress <= reported {
                        continue;
                    }
                    reported = progress;
                    {
                        let mut state = controller.inner.lock().await;
                        if state.fetch_generation != generation {
                            break;
                        }
                        state.fetch_progress = progress;
                    }
                    let _ = controller
                        .events
                        .send(ReviewEvent::FetchProgress { photo, progress });
                }
            }
        });

        let outcome = self.gallery.fetch_image(photo, progress_tx).await;
        // The provider dropped its sender; drain the remaining ticks so
        // progress never trails the completion event.
        let _ = forwarder.await;

        match outcome {
            Ok(image) => {
                {
                    let mut state = self.inner.lock().await;
                    if state.fetch_generation != generation {
                        debug!(%photo, generation, "discarding stale fetch completion");
                        return;
                    }
                    state.phase = DisplayPhase::Displayed;
                    state.fetch_progress = 1.0;
                }
                let _ = self.events.send(ReviewEvent::ImageReady {
                    photo: Some(photo),
                    bytes: image.bytes,
                    metadata: Some(image.metadata),
                    sample: false,
                });
            }
            Err(err) => {
                warn!(%photo, "image fetch failed: {err}");
                {
                    let mut state = self.inner.lock().await;
                    if state.fetch_generation != generation {
                        debug!(%photo, generation, "discarding stale fetch failure");
                        return;
                    }
                    state.phase = DisplayPhase::FailedFallback;
                    state.current = None;
                    state.fetch_progress = 0.0;
                }
                let _ = self.events.send(ReviewEvent::DisplayCleared);
                self.enter_sample_mode().await;
            }
        }
    }

    /// Switches to the bundled sample pool: history and cursor reset, no
    /// progress tracking, navigation and deletion disabled until the next
    /// refresh against the live gallery.
    async fn enter_sample_mode(self: &Arc<Self>) {
        let bytes = match self.samples.pick_random() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("sample image unavailable: {err}");
                {
                    let mut state = self.inner.lock().await;
                    state.history.clear();
                    state.current = None;
                    state.sample_mode = false;
                    state.phase = DisplayPhase::Idle;
                    state.fetch_progress = 0.0;
                    state.fetch_generation += 1;
                }
                let _ = self.events.send(ReviewEvent::DisplayCleared);
                return;
            }
        };

        {
            let mut state = self.inner.lock().await;
            state.history.clear();
            state.current = None;
            state.sample_mode = true;
            state.phase = DisplayPhase::Displayed;
            state.fetch_progress = 0.0;
            // Invalidate anything still in flight against the gallery.
            state.fetch_generation += 1;
        }
        let _ = self.events.send(ReviewEvent::ImageReady {
            photo: None,
            bytes,
            metadata: None,
            sample: true,
        });
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
