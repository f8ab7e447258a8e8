//! PNG writers plus host-side grayscale image sampling.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{GenericImageView, ImageBuffer, ImageEncoder, Luma, Rgba};
use thiserror::Error;

use crate::field::ops::GrayscaleSource;
use crate::field::HeightField;
use crate::splat::WeightMap;

/// Errors that can occur during PNG export.
#[derive(Error, Debug)]
pub enum PngExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidHeightRange(f32, f32),
    #[error("Weight map has {0} layers; the RGBA preview supports at most 4")]
    TooManyLayers(usize),
}

/// Options for height-field PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// Minimum height value for normalization.
    pub min_height: f32,
    /// Maximum height value for normalization.
    pub max_height: f32,
    /// PNG compression type.
    pub compression: CompressionType,
    /// PNG filter type.
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            min_height: 0.0,
            max_height: 1.0,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngExportOptions {
    /// Creates options with the height range auto-detected from the field.
    pub fn auto_range(field: &HeightField) -> Self {
        let (min, max) = field.height_range();
        Self {
            min_height: min,
            max_height: max,
            ..Default::default()
        }
    }
}

/// Exports a height field as a 16-bit grayscale PNG.
///
/// Heights are normalized into the configured range and clamped.
pub fn export_heightfield_png(
    field: &HeightField,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), PngExportError> {
    let min = options.min_height;
    let max = options.max_height;
    if min >= max {
        return Err(PngExportError::InvalidHeightRange(min, max));
    }

    let (w, h) = field.dimensions();
    let range = max - min;
    let mut img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let normalized = ((field.get(x, y) - min) / range).clamp(0.0, 1.0);
            img.put_pixel(x as u32, y as u32, Luma([(normalized * 65535.0) as u16]));
        }
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);

    // Convert the u16 buffer to bytes for the encoder.
    let byte_slice: &[u8] = bytemuck::cast_slice(img.as_raw());
    encoder.write_image(byte_slice, w as u32, h as u32, image::ExtendedColorType::L16)?;

    Ok(())
}

/// Exports a rendered noise map as an 8-bit grayscale PNG.
///
/// `data` must be length `width * height` in row-major order; values are
/// clamped to [0, 1].
pub fn export_noise_map_png(
    width: usize,
    height: usize,
    data: &[f32],
    path: &Path,
) -> Result<(), PngExportError> {
    let expected = width * height;
    if data.len() != expected {
        return Err(PngExportError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("noise map length {} != expected {}", data.len(), expected),
        )));
    }

    let bytes: Vec<u8> = data
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0) as u8)
        .collect();

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder =
        PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(&bytes, width as u32, height as u32, image::ExtendedColorType::L8)?;
    Ok(())
}

/// Exports a weight map as an RGBA8 preview, layer `i` on channel `i`.
///
/// With fewer than four layers the alpha channel stays opaque.
pub fn export_weight_map_png(map: &WeightMap, path: &Path) -> Result<(), PngExportError> {
    let layers = map.layer_count();
    if layers > 4 {
        return Err(PngExportError::TooManyLayers(layers));
    }

    let (w, h) = map.dimensions();
    let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let mut px = [0u8, 0, 0, 255];
            for (c, &weight) in map.weights(x, y).iter().enumerate() {
                px[c] = (weight.clamp(0.0, 1.0) * 255.0) as u8;
            }
            img.put_pixel(x as u32, y as u32, Rgba(px));
        }
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder =
        PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(img.as_raw(), w as u32, h as u32, image::ExtendedColorType::Rgba8)?;
    Ok(())
}

impl GrayscaleSource for image::GrayImage {
    fn dimensions(&self) -> (usize, usize) {
        (self.width() as usize, self.height() as usize)
    }

    fn grayscale(&self, x: usize, y: usize) -> f32 {
        self.get_pixel(x as u32, y as u32).0[0] as f32 / 255.0
    }
}

impl GrayscaleSource for image::DynamicImage {
    fn dimensions(&self) -> (usize, usize) {
        let (w, h) = GenericImageView::dimensions(self);
        (w as usize, h as usize)
    }

    fn grayscale(&self, x: usize, y: usize) -> f32 {
        let p = self.get_pixel(x as u32, y as u32);
        // Rec. 601 luma weights.
        (0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32) / 255.0
    }
}
