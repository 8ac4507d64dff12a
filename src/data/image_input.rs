//! Image preprocessing for inference on files outside the IDX datasets.
//!
//! Images are decoded (PNG/JPEG/BMP/GIF), resized to the network's 32×32
//! input, converted to grayscale and normalized to `[0, 1]`.

use std::path::Path;

use crate::error::Result;
use crate::network::model::IMAGE_PIXELS;

const SIDE: u32 = 32;

/// Decodes image bytes into a flat `IMAGE_PIXELS`-long input vector.
pub fn image_bytes_to_input(bytes: &[u8]) -> Result<Vec<f64>> {
    let img = image::load_from_memory(bytes)?;
    Ok(to_input(img))
}

/// Reads and converts an image file.
pub fn image_file_to_input(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let img = image::open(path)?;
    Ok(to_input(img))
}

fn to_input(img: image::DynamicImage) -> Vec<f64> {
    let resized = img.resize_exact(SIDE, SIDE, image::imageops::FilterType::Lanczos3);
    let gray = resized.to_luma8();
    let pixels: Vec<f64> = gray.pixels().map(|p| p.0[0] as f64 / 255.0).collect();
    debug_assert_eq!(pixels.len(), IMAGE_PIXELS);
    pixels
}
