use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use gallery_fs::{DirAccessGate, FsGallery, GeneratedSamples, TrashDeletionService};
use review_core::{GalleryProvider, ReviewController, ReviewEvent};
use shared::error::ReviewError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{
    wrappers::{BroadcastStream, LinesStream},
    StreamExt,
};
use tracing::warn;

mod config;

#[derive(Parser, Debug)]
struct Args {
    /// Directory reviewed as the photo gallery; overrides config file and env.
    #[arg(long)]
    gallery_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(dir) = args.gallery_dir {
        settings.gallery_dir = dir;
    }

    let gallery = FsGallery::new(&settings.gallery_dir);
    let controller = ReviewController::new_with_dependencies(
        Arc::clone(&gallery) as Arc<dyn GalleryProvider>,
        Arc::new(TrashDeletionService::new(Arc::clone(&gallery))),
        Arc::new(GeneratedSamples::new()?),
        Arc::new(DirAccessGate::new(&settings.gallery_dir)),
    );

    let events = controller.subscribe_events();
    tokio::spawn(async move {
        let mut events = BroadcastStream::new(events);
        while let Some(event) = events.next().await {
            let Ok(event) = event else { continue };
            print_event(event);
        }
    });

    println!("reviewing photos in {}", settings.gallery_dir.display());
    println!("commands: [n]ext  [b]ack  [d]elete  [s]tatus  [q]uit");

    if let Err(err) = controller.request_random_photo().await {
        report(&err);
    }

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    while let Some(line) = lines.next().await {
        let line = line?;
        let outcome = match line.trim() {
            "" => Ok(()),
            "n" | "next" | "r" | "refresh" => controller.refresh().await,
            "b" | "back" => controller.go_back().await,
            "d" | "delete" => controller.delete_current().await,
            "s" | "status" => {
                let snapshot = controller.snapshot().await;
                if let Ok(json) = serde_json::to_string_pretty(&snapshot) {
                    println!("{json}");
                }
                Ok(())
            }
            "q" | "quit" | "exit" => break,
            other => {
                println!("unknown command: {other}");
                Ok(())
            }
        };
        if let Err(err) = outcome {
            report(&err);
        }
    }

    Ok(())
}

fn print_event(event: ReviewEvent) {
    match event {
        ReviewEvent::ImageReady {
            bytes,
            metadata,
            sample,
            ..
        } => {
            if sample {
                println!(
                    "no gallery photo available; showing a bundled sample image ({} bytes)",
                    bytes.len()
                );
            } else if let Some(metadata) = metadata {
                let dims = match (metadata.pixel_width, metadata.pixel_height) {
                    (Some(width), Some(height)) => format!("{width}x{height}"),
                    _ => "unknown size".to_string(),
                };
                println!(
                    "showing {} ({dims}, {} bytes)",
                    metadata.filename, metadata.size_bytes
                );
            } else {
                println!("showing photo ({} bytes)", bytes.len());
            }
        }
        ReviewEvent::FetchProgress { progress, .. } => {
            println!("  fetching... {:3.0}%", progress * 100.0);
        }
        ReviewEvent::DisplayCleared => println!("(display cleared)"),
        ReviewEvent::PermissionDenied => {
            println!("photo access denied; fix permissions on the gallery directory and refresh");
        }
        ReviewEvent::DeleteFailed { message, .. } => println!("delete failed: {message}"),
    }
}

fn report(err: &ReviewError) {
    warn!("operation failed: {err}");
}
