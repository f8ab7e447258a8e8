//! Midpoint-displacement (diamond-square) fractal terrain.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::GenerateError;
use crate::field::HeightField;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpdParams {
    pub min_height: f32,
    pub max_height: f32,
    /// Base of the per-level dampener; see [`height_dampener`].
    ///
    /// [`height_dampener`]: MpdParams::height_dampener
    pub dampener_power: f32,
    pub roughness: f32,
}

impl Default for MpdParams {
    fn default() -> Self {
        Self {
            min_height: -2.0,
            max_height: 2.0,
            dampener_power: 2.0,
            roughness: 2.0,
        }
    }
}

impl MpdParams {
    /// Factor the displacement bounds shrink by at every recursion level,
    /// `dampener_power^(-roughness)`.
    pub fn height_dampener(&self) -> f32 {
        self.dampener_power.powf(-self.roughness)
    }
}

/// Runs diamond-square over the usable square side `width - 1`.
///
/// The usable sides must be equal and a power of two (a `2^n + 1` field);
/// anything else is rejected up front. Each level displaces midpoints by a
/// uniform sample of the current bounds, then shrinks the bounds by the
/// dampener, giving roughness-controlled fractal detail.
pub fn midpoint_displacement<R: Rng + ?Sized>(
    field: &mut HeightField,
    params: &MpdParams,
    reset: bool,
    rng: &mut R,
) -> Result<(), GenerateError> {
    let (w, h) = field.dimensions();
    let side = w - 1;
    if side != h - 1 || side == 0 || !side.is_power_of_two() {
        return Err(GenerateError::UnsupportedResolution {
            width: w,
            height: h,
        });
    }
    if params.min_height > params.max_height {
        return Err(GenerateError::InvalidHeightBounds(
            params.min_height,
            params.max_height,
        ));
    }

    let mut buf = field.working_copy(reset);
    let mut square_size = side;
    let mut height_min = params.min_height;
    let mut height_max = params.max_height;
    let dampener = params.height_dampener();

    let at = |x: usize, y: usize| y * w + x;

    while square_size > 0 {
        // Diamond step: each square's center becomes the corner average plus
        // a random displacement.
        for x in (0..side).step_by(square_size) {
            for y in (0..side).step_by(square_size) {
                let corner_x = x + square_size;
                let corner_y = y + square_size;
                let mid_x = x + square_size / 2;
                let mid_y = y + square_size / 2;

                buf[at(mid_x, mid_y)] = (buf[at(x, y)]
                    + buf[at(corner_x, y)]
                    + buf[at(x, corner_y)]
                    + buf[at(corner_x, corner_y)])
                    / 4.0
                    + rng.random_range(height_min..=height_max);
            }
        }

        // Square step: each edge midpoint averages two adjacent corners, the
        // square's center, and the matching midpoint of the neighboring
        // square. Squares whose outer midpoints fall outside the grid are
        // skipped.
        for x in (0..side).step_by(square_size) {
            for y in (0..side).step_by(square_size) {
                let corner_x = x + square_size;
                let corner_y = y + square_size;
                let mid_x = x + square_size / 2;
                let mid_y = y + square_size / 2;

                let outer_right = (mid_x + square_size) as i64;
                let outer_up = (mid_y + square_size) as i64;
                let outer_left = mid_x as i64 - square_size as i64;
                let outer_down = mid_y as i64 - square_size as i64;

                if outer_left <= 0
                    || outer_down <= 0
                    || outer_right >= side as i64 - 1
                    || outer_up >= side as i64 - 1
                {
                    continue;
                }

                // Bottom edge midpoint.
                buf[at(mid_x, y)] = (buf[at(x, y)]
                    + buf[at(mid_x, mid_y)]
                    + buf[at(corner_x, y)]
                    + buf[at(mid_x, outer_down as usize)])
                    / 4.0
                    + rng.random_range(height_min..=height_max);

                // Top edge midpoint.
                buf[at(mid_x, corner_y)] = (buf[at(x, corner_y)]
                    + buf[at(mid_x, outer_up as usize)]
                    + buf[at(corner_x, corner_y)]
                    + buf[at(mid_x, mid_y)])
                    / 4.0
                    + rng.random_range(height_min..=height_max);

                // Left edge midpoint.
                buf[at(x, mid_y)] = (buf[at(outer_left as usize, mid_y)]
                    + buf[at(x, corner_y)]
                    + buf[at(mid_x, mid_y)]
                    + buf[at(x, y)])
                    / 4.0
                    + rng.random_range(height_min..=height_max);

                // Right edge midpoint.
                buf[at(corner_x, mid_y)] = (buf[at(mid_x, mid_y)]
                    + buf[at(corner_x, corner_y)]
                    + buf[at(outer_right as usize, mid_y)]
                    + buf[at(corner_x, y)])
                    / 4.0
                    + rng.random_range(height_min..=height_max);
            }
        }

        square_size /= 2;
        height_min *= dampener;
        height_max *= dampener;
    }

    field.commit(buf);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_no_randomness_preserves_flat_field() {
        // With a degenerate displacement range every midpoint is the exact
        // average of flat corners, so the field stays at zero.
        let mut field = HeightField::new(5, 5);
        let params = MpdParams {
            min_height: 0.0,
            max_height: 0.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        midpoint_displacement(&mut field, &params, true, &mut rng).unwrap();
        assert!(field.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_produces_variation() {
        let mut field = HeightField::new(17, 17);
        let params = MpdParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        midpoint_displacement(&mut field, &params, true, &mut rng).unwrap();
        let (min, max) = field.height_range();
        assert!(min < max);
    }

    #[test]
    fn test_determinism_per_seed() {
        let params = MpdParams::default();

        let mut a = HeightField::new(9, 9);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        midpoint_displacement(&mut a, &params, true, &mut rng).unwrap();

        let mut b = HeightField::new(9, 9);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        midpoint_displacement(&mut b, &params, true, &mut rng).unwrap();

        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_non_square_rejected() {
        let mut field = HeightField::new(9, 5);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = midpoint_displacement(&mut field, &MpdParams::default(), true, &mut rng);
        assert!(matches!(
            result,
            Err(GenerateError::UnsupportedResolution { .. })
        ));
    }

    #[test]
    fn test_non_power_of_two_side_rejected() {
        let mut field = HeightField::new(6, 6);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = midpoint_displacement(&mut field, &MpdParams::default(), true, &mut rng);
        assert!(matches!(
            result,
            Err(GenerateError::UnsupportedResolution { .. })
        ));
    }

    #[test]
    fn test_invalid_height_bounds_rejected() {
        let mut field = HeightField::new(5, 5);
        let params = MpdParams {
            min_height: 1.0,
            max_height: -1.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = midpoint_displacement(&mut field, &params, true, &mut rng);
        assert!(matches!(
            result,
            Err(GenerateError::InvalidHeightBounds(_, _))
        ));
    }

    #[test]
    fn test_dampener_derivation() {
        let params = MpdParams {
            dampener_power: 2.0,
            roughness: 2.0,
            ..Default::default()
        };
        assert!((params.height_dampener() - 0.25).abs() < 1e-6);
    }
}
