//! The working terrain aggregate shared by pipeline stages.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::field::HeightField;
use crate::splat::WeightMap;
use crate::vegetation::Placement;

/// A height field plus its world extents and the per-stage products derived
/// from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Terrain {
    pub field: HeightField,
    /// World extents: x/z are planar size, y is the height extent.
    pub world_scale: Vec3,
    /// Splat weights (populated after the splat stage).
    #[serde(skip)]
    pub weights: Option<WeightMap>,
    /// Vegetation placements (populated after the vegetation stage).
    #[serde(skip)]
    pub placements: Option<Vec<Placement>>,
}

impl Terrain {
    /// Creates a terrain with a zeroed field of the given dimensions.
    ///
    /// # Panics
    /// Panics if either dimension is zero.
    pub fn new(width: usize, height: usize, world_scale: Vec3) -> Self {
        Self {
            field: HeightField::new(width, height),
            world_scale,
            weights: None,
            placements: None,
        }
    }

    /// Returns the `(min, max)` height values of the field.
    pub fn height_range(&self) -> (f32, f32) {
        self.field.height_range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation() {
        let terrain = Terrain::new(33, 33, Vec3::new(500.0, 100.0, 500.0));
        assert_eq!(terrain.field.dimensions(), (33, 33));
        assert!(terrain.weights.is_none());
        assert!(terrain.placements.is_none());
        assert_eq!(terrain.height_range(), (0.0, 0.0));
    }
}
