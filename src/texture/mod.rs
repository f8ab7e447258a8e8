//! Standalone grayscale noise-map synthesis.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::noise::Perlin;

/// Errors from noise-map parameter validation.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("octaves must be at least 1")]
    InvalidOctaves,
    #[error("noise map dimensions must be at least 1x1 (got {0}x{1})")]
    InvalidDimensions(usize, usize),
}

/// Parameters for rendering a standalone noise map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseMapConfig {
    pub x_scale: f32,
    pub y_scale: f32,
    pub octaves: u32,
    pub persistence: f32,
    pub height_scale: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub brightness: f32,
    pub contrast: f32,
    /// Blend the four wrap-offset samples so opposite edges tile.
    pub seamless: bool,
    /// Rescale the finished map from its observed range to [0, 1].
    pub remap: bool,
}

impl Default for NoiseMapConfig {
    fn default() -> Self {
        Self {
            x_scale: 0.01,
            y_scale: 0.01,
            octaves: 3,
            persistence: 8.0,
            height_scale: 1.0,
            x_offset: 0.0,
            y_offset: 0.0,
            brightness: 0.5,
            contrast: 0.5,
            seamless: false,
            remap: false,
        }
    }
}

/// Renders a `width` x `height` grayscale noise map in row-major order.
///
/// Each pixel is an fBm sample pushed through the brightness/contrast
/// transform `contrast * (v - 0.5) + 0.5 * brightness`. With `seamless` the
/// sample is the bilinear blend of the four wrap-offset samples, so the
/// value at an edge matches the value one full period away and the map
/// tiles. With `remap` the finished map is rescaled from its observed range
/// to [0, 1].
pub fn render_noise_map(
    width: usize,
    height: usize,
    cfg: &NoiseMapConfig,
    perlin: &Perlin,
) -> Result<Vec<f32>, TextureError> {
    if width < 1 || height < 1 {
        return Err(TextureError::InvalidDimensions(width, height));
    }
    if cfg.octaves == 0 {
        return Err(TextureError::InvalidOctaves);
    }

    let sample = |x: f32, y: f32| {
        perlin.fbm(
            (x + cfg.x_offset) * cfg.x_scale,
            (y + cfg.y_offset) * cfg.y_scale,
            cfg.octaves,
            cfg.persistence,
        ) * cfg.height_scale
    };

    let mut map = vec![0.0f32; width * height];
    map.par_iter_mut().enumerate().for_each(|(i, out)| {
        let x = (i % width) as f32;
        let y = (i / width) as f32;
        let value = if cfg.seamless {
            let u = x / width as f32;
            let v = y / height as f32;
            let n00 = sample(x, y);
            let n01 = sample(x, y + height as f32);
            let n10 = sample(x + width as f32, y);
            let n11 = sample(x + width as f32, y + height as f32);
            u * v * n00 + u * (1.0 - v) * n01 + (1.0 - u) * v * n10 + (1.0 - u) * (1.0 - v) * n11
        } else {
            sample(x, y)
        };
        *out = cfg.contrast * (value - 0.5) + 0.5 * cfg.brightness;
    });

    if cfg.remap {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &v in &map {
            min = min.min(v);
            max = max.max(v);
        }
        if max > min {
            for v in &mut map {
                *v = map_range(*v, min, max, 0.0, 1.0);
            }
        }
    }

    Ok(map)
}

/// Linearly remaps `value` from `[in_min, in_max]` to `[out_min, out_max]`.
pub fn map_range(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    (value - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}
