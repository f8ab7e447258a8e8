//! In-place height field generators.

mod midpoint;
mod noise_layers;
mod voronoi;

pub use midpoint::{midpoint_displacement, MpdParams};
pub use noise_layers::{add_base_noise, add_noise_layers, NoiseLayer};
pub use voronoi::{voronoi, VoronoiBlend, VoronoiParams};

use thiserror::Error;

/// Errors from generator parameter validation.
///
/// Parameters are rejected before any mutation; clamping would mask
/// authoring mistakes.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("layer {0}: octaves must be at least 1")]
    InvalidOctaves(usize),
    #[error("invalid height bounds: min ({0}) > max ({1})")]
    InvalidHeightBounds(f32, f32),
    #[error("round blend requires a nonzero dropoff")]
    ZeroDropoff,
    #[error("midpoint displacement needs a square field with side 2^n + 1, got {width}x{height}")]
    UnsupportedResolution { width: usize, height: usize },
}
