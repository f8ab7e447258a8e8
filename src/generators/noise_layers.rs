//! Layered fractal-noise accumulation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::GenerateError;
use crate::field::HeightField;
use crate::noise::Perlin;

/// One fractal-noise contribution.
///
/// A terrain holds an ordered list of these; contributions sum in insertion
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseLayer {
    pub x_scale: f32,
    pub y_scale: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub octaves: u32,
    pub persistence: f32,
    pub height_scale: f32,
    /// Flags this layer for the next prune pass.
    pub remove: bool,
}

impl Default for NoiseLayer {
    fn default() -> Self {
        Self {
            x_scale: 0.01,
            y_scale: 0.01,
            x_offset: 0.0,
            y_offset: 0.0,
            octaves: 3,
            persistence: 8.0,
            height_scale: 0.09,
            remove: false,
        }
    }
}

/// Adds every layer's fBm sample to each cell.
pub fn add_noise_layers(
    field: &mut HeightField,
    layers: &[NoiseLayer],
    perlin: &Perlin,
    reset: bool,
) -> Result<(), GenerateError> {
    for (i, layer) in layers.iter().enumerate() {
        if layer.octaves == 0 {
            return Err(GenerateError::InvalidOctaves(i));
        }
    }

    let (w, _) = field.dimensions();
    let mut buf = field.working_copy(reset);
    buf.par_iter_mut().enumerate().for_each(|(i, cell)| {
        let x = (i % w) as f32;
        let y = (i / w) as f32;
        for layer in layers {
            *cell += perlin.fbm(
                (x + layer.x_offset) * layer.x_scale,
                (y + layer.y_offset) * layer.y_scale,
                layer.octaves,
                layer.persistence,
            ) * layer.height_scale;
        }
    });
    field.commit(buf);
    Ok(())
}

/// Adds a single raw noise sample per cell, the degenerate one-layer case.
/// Octaves, persistence and height scale are not consulted.
pub fn add_base_noise(field: &mut HeightField, layer: &NoiseLayer, perlin: &Perlin, reset: bool) {
    let (w, _) = field.dimensions();
    let mut buf = field.working_copy(reset);
    buf.par_iter_mut().enumerate().for_each(|(i, cell)| {
        let x = (i % w) as f32;
        let y = (i / w) as f32;
        *cell += perlin.noise(
            (x + layer.x_offset) * layer.x_scale,
            (y + layer.y_offset) * layer.y_scale,
        );
    });
    field.commit(buf);
}
