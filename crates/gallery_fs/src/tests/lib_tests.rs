use super::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgb, RgbImage};
use review_core::{DeletionService, GalleryProvider, PermissionGate, SampleImageSource};
use shared::domain::{AuthorizationStatus, PhotoId};
use tempfile::tempdir;
use tokio::sync::mpsc;

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let image = RgbImage::from_pixel(width, height, Rgb([10, 120, 230]));
    image.save(&path).expect("write test image");
    path
}

async fn fetch_with_progress(
    gallery: &FsGallery,
    photo: PhotoId,
) -> (review_core::FetchedImage, Vec<f64>) {
    let (tx, mut rx) = mpsc::channel(64);
    let image = gallery.fetch_image(photo, tx).await.expect("fetch");
    let mut progress = Vec::new();
    while let Ok(tick) = rx.try_recv() {
        progress.push(tick);
    }
    (image, progress)
}

#[tokio::test]
async fn scan_counts_only_image_files() {
    let dir = tempdir().expect("tempdir");
    write_png(dir.path(), "one.png", 8, 8);
    write_png(dir.path(), "two.jpg", 8, 8);
    std::fs::write(dir.path().join("notes.txt"), b"not an image").expect("write");
    std::fs::write(dir.path().join("extensionless"), b"still not").expect("write");

    let gallery = FsGallery::new(dir.path());
    assert_eq!(gallery.asset_count().await.expect("count"), 2);
}

#[tokio::test]
async fn scan_recurses_into_subdirectories() {
    let dir = tempdir().expect("tempdir");
    std::fs::create_dir(dir.path().join("nested")).expect("mkdir");
    write_png(&dir.path().join("nested"), "deep.png", 8, 8);

    let gallery = FsGallery::new(dir.path());
    assert_eq!(gallery.asset_count().await.expect("count"), 1);
}

#[tokio::test]
async fn photo_ids_are_stable_across_rescans() {
    let dir = tempdir().expect("tempdir");
    write_png(dir.path(), "a.png", 8, 8);

    let gallery = FsGallery::new(dir.path());
    gallery.asset_count().await.expect("count");
    let first = gallery.photo_at(0).await.expect("photo");

    gallery.asset_count().await.expect("recount");
    let second = gallery.photo_at(0).await.expect("photo");
    assert_eq!(first, second);
}

#[tokio::test]
async fn scan_orders_oldest_first() {
    let dir = tempdir().expect("tempdir");
    let oldest = write_png(dir.path(), "a.png", 8, 8);
    write_png(dir.path(), "b.png", 8, 8);

    let gallery = FsGallery::new(dir.path());
    gallery.asset_count().await.expect("count");
    let first = gallery.photo_at(0).await.expect("photo");
    assert_eq!(gallery.path_of(first).await, Some(oldest));
}

#[tokio::test]
async fn photo_at_out_of_range_fails() {
    let dir = tempdir().expect("tempdir");
    let gallery = FsGallery::new(dir.path());
    gallery.asset_count().await.expect("count");
    assert!(gallery.photo_at(0).await.is_err());
}

#[tokio::test]
async fn fetch_streams_bytes_with_progress_and_metadata() {
    let dir = tempdir().expect("tempdir");
    let path = write_png(dir.path(), "photo.png", 24, 16);

    let gallery = FsGallery::new(dir.path());
    gallery.asset_count().await.expect("count");
    let photo = gallery.photo_at(0).await.expect("photo");

    let (image, progress) = fetch_with_progress(&gallery, photo).await;

    assert_eq!(image.photo, photo);
    assert_eq!(image.bytes, std::fs::read(&path).expect("read fixture"));
    assert_eq!(image.metadata.filename, "photo.png");
    assert_eq!(image.metadata.size_bytes, image.bytes.len() as u64);
    assert_eq!(image.metadata.pixel_width, Some(24));
    assert_eq!(image.metadata.pixel_height, Some(16));
    assert!(image.metadata.modified_at.is_some());

    assert_eq!(progress.last().copied(), Some(1.0));
    assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn second_fetch_is_served_from_cache() {
    let dir = tempdir().expect("tempdir");
    let path = write_png(dir.path(), "photo.png", 8, 8);

    let gallery = FsGallery::new(dir.path());
    gallery.asset_count().await.expect("count");
    let photo = gallery.photo_at(0).await.expect("photo");

    let (first, _) = fetch_with_progress(&gallery, photo).await;

    // The cache must answer even once the file is gone.
    std::fs::remove_file(&path).expect("remove fixture");
    let (second, progress) = fetch_with_progress(&gallery, photo).await;

    assert_eq!(first, second);
    assert_eq!(progress, vec![1.0]);
}

#[tokio::test]
async fn fetch_of_unknown_photo_fails() {
    let dir = tempdir().expect("tempdir");
    let gallery = FsGallery::new(dir.path());
    let (tx, _rx) = mpsc::channel(1);
    assert!(gallery.fetch_image(PhotoId::new(), tx).await.is_err());
}

#[tokio::test]
async fn vanished_file_disappears_from_count_but_fetch_fails_cleanly() {
    let dir = tempdir().expect("tempdir");
    let path = write_png(dir.path(), "gone.png", 8, 8);

    let gallery = FsGallery::new(dir.path());
    gallery.asset_count().await.expect("count");
    let photo = gallery.photo_at(0).await.expect("photo");

    std::fs::remove_file(&path).expect("remove fixture");
    assert_eq!(gallery.asset_count().await.expect("recount"), 0);

    let (tx, _rx) = mpsc::channel(1);
    assert!(gallery.fetch_image(photo, tx).await.is_err());
}

#[tokio::test]
async fn trash_delete_of_unknown_photo_fails() {
    let dir = tempdir().expect("tempdir");
    let gallery = FsGallery::new(dir.path());
    let service = TrashDeletionService::new(Arc::clone(&gallery));
    assert!(service.delete(PhotoId::new()).await.is_err());
}

#[test]
fn generated_samples_are_decodable_pngs() {
    let samples = GeneratedSamples::new().expect("render pool");
    for _ in 0..8 {
        let bytes = samples.pick_random().expect("pick");
        assert_eq!(
            image::guess_format(&bytes).expect("format"),
            image::ImageFormat::Png
        );
        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert!(decoded.width() > 0 && decoded.height() > 0);
    }
}

#[tokio::test]
async fn dir_access_gate_maps_directory_state() {
    let dir = tempdir().expect("tempdir");
    let gate = DirAccessGate::new(dir.path());
    assert_eq!(gate.request_access().await, AuthorizationStatus::Authorized);

    let missing = DirAccessGate::new(dir.path().join("does-not-exist"));
    assert_eq!(missing.request_access().await, AuthorizationStatus::Restricted);
}
