use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::Rng;
use review_core::SampleImageSource;

const SAMPLE_WIDTH: u32 = 640;
const SAMPLE_HEIGHT: u32 = 400;
const SAMPLE_GRADIENTS: [([u8; 3], [u8; 3]); 4] = [
    ([0x1d, 0x2b, 0x53], [0x7e, 0xc8, 0xe3]),
    ([0x38, 0x18, 0x2f], [0xf2, 0xa6, 0x5e]),
    ([0x0b, 0x3d, 0x2e], [0x9c, 0xdb, 0xa8]),
    ([0x2f, 0x2f, 0x2f], [0xe8, 0xe8, 0xe8]),
];

/// Fixed pool of bundled fallback images, rendered once at startup instead
/// of shipping binary assets.
pub struct GeneratedSamples {
    pool: Vec<Vec<u8>>,
}

impl GeneratedSamples {
    pub fn new() -> Result<Self> {
        let mut pool = Vec::with_capacity(SAMPLE_GRADIENTS.len());
        for (start, end) in SAMPLE_GRADIENTS {
            pool.push(render_gradient_png(start, end)?);
        }
        Ok(Self { pool })
    }
}

impl SampleImageSource for GeneratedSamples {
    fn pick_random(&self) -> Result<Vec<u8>> {
        if self.pool.is_empty() {
            return Err(anyhow!("sample pool is empty"));
        }
        let index = rand::rng().random_range(0..self.pool.len());
        Ok(self.pool[index].clone())
    }
}

fn render_gradient_png(start: [u8; 3], end: [u8; 3]) -> Result<Vec<u8>> {
    let image = RgbImage::from_fn(SAMPLE_WIDTH, SAMPLE_HEIGHT, |x, y| {
        let t = (x + y) as f32 / (SAMPLE_WIDTH + SAMPLE_HEIGHT - 2) as f32;
        Rgb([
            lerp(start[0], end[0], t),
            lerp(start[1], end[1], t),
            lerp(start[2], end[2], t),
        ])
    });

    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .context("failed to encode sample image")?;
    Ok(bytes.into_inner())
}

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8
}
