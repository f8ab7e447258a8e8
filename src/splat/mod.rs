//! Splat-map classification: per-cell blend weights over layer bands.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::field::{ops, HeightField};
use crate::noise::Perlin;

/// One classification band.
///
/// The list index is the weight-vector index, a contract with the caller's
/// texture binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplatLayer {
    pub min_height: f32,
    pub max_height: f32,
    pub min_slope: f32,
    pub max_slope: f32,
    pub noise_scale_x: f32,
    pub noise_scale_y: f32,
    pub noise_amplitude: f32,
    pub noise_offset: f32,
    /// Flags this layer for the next prune pass.
    pub remove: bool,
}

impl Default for SplatLayer {
    fn default() -> Self {
        Self {
            min_height: 0.1,
            max_height: 0.2,
            min_slope: 0.0,
            max_slope: 1.5,
            noise_scale_x: 0.01,
            noise_scale_y: 0.01,
            noise_amplitude: 0.1,
            noise_offset: 0.1,
            remove: false,
        }
    }
}

/// Per-cell L1-normalized weight vectors over an ordered layer list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightMap {
    width: usize,
    height: usize,
    layers: usize,
    data: Vec<f32>,
}

impl WeightMap {
    fn new(width: usize, height: usize, layers: usize) -> Self {
        Self {
            width,
            height,
            layers,
            data: vec![0.0; width * height * layers],
        }
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn layer_count(&self) -> usize {
        self.layers
    }

    /// The weight vector at a cell; its length is [`layer_count`].
    ///
    /// [`layer_count`]: WeightMap::layer_count
    pub fn weights(&self, x: usize, y: usize) -> &[f32] {
        debug_assert!(x < self.width && y < self.height);
        let base = (y * self.width + x) * self.layers;
        &self.data[base..base + self.layers]
    }
}

/// Assigns every cell a blend-weight vector over the layer bands.
///
/// A band qualifies when the cell height lies inside the band's height range
/// widened by a noise-softened offset and the local steepness lies inside
/// the band's slope range. Qualifying bands weigh 1.0 and the vector is
/// L1-normalized; when no band qualifies the vector stays all-zero instead
/// of dividing by zero.
pub fn classify(field: &HeightField, layers: &[SplatLayer], perlin: &Perlin) -> WeightMap {
    let (w, h) = field.dimensions();
    let mut map = WeightMap::new(w, h, layers.len());
    if layers.is_empty() {
        return map;
    }

    let layer_count = layers.len();
    map.data
        .par_chunks_mut(layer_count)
        .enumerate()
        .for_each(|(i, cell)| {
            let x = i % w;
            let y = i / w;
            let height = field.get(x, y);
            let steep = ops::steepness(field, x, y);

            for (l, band) in layers.iter().enumerate() {
                let noise = perlin.noise(
                    x as f32 * band.noise_scale_x,
                    y as f32 * band.noise_scale_y,
                ) * band.noise_amplitude;
                let offset = band.noise_offset + noise;
                if height >= band.min_height - offset
                    && height <= band.max_height + offset
                    && steep >= band.min_slope
                    && steep <= band.max_slope
                {
                    cell[l] = 1.0;
                }
            }

            let total: f32 = cell.iter().sum();
            if total > 0.0 {
                for weight in cell.iter_mut() {
                    *weight /= total;
                }
            }
        });

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_field(size: usize) -> HeightField {
        let mut field = HeightField::new(size, size);
        for y in 0..size {
            for x in 0..size {
                field.set(x, y, y as f32 / (size - 1) as f32);
            }
        }
        field
    }

    fn band(min_height: f32, max_height: f32) -> SplatLayer {
        SplatLayer {
            min_height,
            max_height,
            max_slope: 10.0,
            noise_amplitude: 0.0,
            noise_offset: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_weights_sum_to_one_or_zero() {
        let field = ramp_field(16);
        let perlin = Perlin::new(42);
        let layers = vec![band(0.0, 0.5), band(0.3, 0.8), band(0.9, 0.95)];
        let map = classify(&field, &layers, &perlin);

        for y in 0..16 {
            for x in 0..16 {
                let sum: f32 = map.weights(x, y).iter().sum();
                assert!(
                    (sum - 1.0).abs() < 1e-5 || sum == 0.0,
                    "cell ({}, {}) weight sum {}",
                    x,
                    y,
                    sum
                );
                for &w in map.weights(x, y) {
                    assert!(w.is_finite() && w >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_no_qualifying_band_yields_zero_vector() {
        let field = HeightField::new(4, 4);
        let perlin = Perlin::new(42);
        let layers = vec![band(0.8, 0.9)];
        let map = classify(&field, &layers, &perlin);

        for y in 0..4 {
            for x in 0..4 {
                assert!(map.weights(x, y).iter().all(|&w| w == 0.0));
            }
        }
    }

    #[test]
    fn test_weight_index_follows_layer_order() {
        let field = ramp_field(8);
        let perlin = Perlin::new(42);
        // Disjoint bands: the bottom rows belong to layer 0, the top rows to
        // layer 1.
        let layers = vec![band(0.0, 0.4), band(0.6, 1.0)];
        let map = classify(&field, &layers, &perlin);

        let bottom = map.weights(3, 0);
        assert_eq!(bottom[0], 1.0);
        assert_eq!(bottom[1], 0.0);

        let top = map.weights(3, 7);
        assert_eq!(top[0], 0.0);
        assert_eq!(top[1], 1.0);
    }

    #[test]
    fn test_overlap_splits_weight() {
        let field = ramp_field(8);
        let perlin = Perlin::new(42);
        let layers = vec![band(0.0, 1.0), band(0.0, 1.0)];
        let map = classify(&field, &layers, &perlin);

        let weights = map.weights(4, 4);
        assert!((weights[0] - 0.5).abs() < 1e-6);
        assert!((weights[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_slope_band_filters() {
        // A steep cliff between two flat shelves: only the cliff rows carry
        // meaningful steepness.
        let mut field = HeightField::new(8, 8);
        for y in 4..8 {
            for x in 0..8 {
                field.set(x, y, 1.0);
            }
        }
        let perlin = Perlin::new(42);
        let layers = vec![SplatLayer {
            min_height: 0.0,
            max_height: 1.0,
            min_slope: 0.5,
            max_slope: 10.0,
            noise_amplitude: 0.0,
            noise_offset: 0.0,
            ..Default::default()
        }];
        let map = classify(&field, &layers, &perlin);

        // Row 3 sees the jump to row 4; row 0 is flat.
        assert_eq!(map.weights(2, 3)[0], 1.0);
        assert_eq!(map.weights(2, 0)[0], 0.0);
    }

    #[test]
    fn test_empty_layer_list() {
        let field = ramp_field(4);
        let perlin = Perlin::new(42);
        let map = classify(&field, &[], &perlin);
        assert_eq!(map.layer_count(), 0);
        assert_eq!(map.dimensions(), (4, 4));
    }
}
