//! Voronoi peak blending.

use glam::Vec2;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::GenerateError;
use crate::field::HeightField;

/// Falloff profile applied around each peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoronoiBlend {
    Linear,
    Power,
    Combined,
    Round,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoronoiParams {
    pub peaks: u32,
    pub min_height: f32,
    pub max_height: f32,
    pub falloff: f32,
    pub dropoff: f32,
    pub blend: VoronoiBlend,
}

impl Default for VoronoiParams {
    fn default() -> Self {
        Self {
            peaks: 5,
            min_height: 0.1,
            max_height: 0.5,
            falloff: 0.2,
            dropoff: 0.6,
            blend: VoronoiBlend::Linear,
        }
    }
}

/// Drops random peaks onto the field and blends their slopes outward.
///
/// A candidate peak lands only where it exceeds the current height. Around a
/// landed peak every other cell is raised to the blended profile height when
/// that exceeds the cell's current value, so later peaks never lower
/// already-shaped terrain.
pub fn voronoi<R: Rng + ?Sized>(
    field: &mut HeightField,
    params: &VoronoiParams,
    reset: bool,
    rng: &mut R,
) -> Result<(), GenerateError> {
    if params.min_height > params.max_height {
        return Err(GenerateError::InvalidHeightBounds(
            params.min_height,
            params.max_height,
        ));
    }
    if params.blend == VoronoiBlend::Round && params.dropoff == 0.0 {
        return Err(GenerateError::ZeroDropoff);
    }

    let (w, h) = field.dimensions();
    let max_distance = Vec2::ZERO.distance(Vec2::new(w as f32, h as f32));
    let mut buf = field.working_copy(reset);

    for _ in 0..params.peaks {
        let px = rng.random_range(0..w);
        let py = rng.random_range(0..h);
        let peak_height = rng.random_range(params.min_height..=params.max_height);

        // Terrain already at or above the candidate rejects the peak.
        if buf[py * w + px] >= peak_height {
            continue;
        }
        buf[py * w + px] = peak_height;

        let peak = Vec2::new(px as f32, py as f32);
        let falloff = params.falloff;
        let dropoff = params.dropoff;
        let blend = params.blend;

        buf.par_iter_mut().enumerate().for_each(|(i, cell)| {
            let x = i % w;
            let y = i / w;
            if x == px && y == py {
                return;
            }
            let d = peak.distance(Vec2::new(x as f32, y as f32)) / max_distance;
            let candidate = match blend {
                VoronoiBlend::Linear => peak_height - d * falloff,
                VoronoiBlend::Power => peak_height - d.powf(dropoff) * falloff,
                VoronoiBlend::Combined => peak_height - d * falloff - d.powf(dropoff),
                VoronoiBlend::Round => {
                    peak_height
                        - (d * 3.0).powf(falloff)
                        - (d * std::f32::consts::TAU).sin() / dropoff
                }
            };
            if *cell < candidate {
                *cell = candidate;
            }
        });
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
    fn test_zero_peaks_leaves_field_unchanged() {
        let mut field = HeightField::new(8, 8);
        field.set(3, 3, 0.25);
        let before = field.as_slice().to_vec();

        let params = VoronoiParams {
            peaks: 0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        voronoi(&mut field, &params, false, &mut rng).unwrap();
        assert_eq!(field.as_slice(), &before[..]);
    }

    #[test]
    fn test_determinism_per_seed() {
        let params = VoronoiParams::default();

        let mut a = HeightField::new(16, 16);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        voronoi(&mut a, &params, true, &mut rng).unwrap();

        let mut b = HeightField::new(16, 16);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        voronoi(&mut b, &params, true, &mut rng).unwrap();

        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_only_raises_existing_terrain() {
        let mut field = HeightField::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                field.set(x, y, 0.05);
            }
        }
        let before = field.as_slice().to_vec();

        let params = VoronoiParams {
            peaks: 8,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        voronoi(&mut field, &params, false, &mut rng).unwrap();

        for (after, before) in field.as_slice().iter().zip(&before) {
            assert!(after >= before);
        }
    }

    #[test]
    fn test_saturated_field_rejects_all_peaks() {
        let mut field = HeightField::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                field.set(x, y, 1.0);
            }
        }

        let params = VoronoiParams {
            peaks: 10,
            min_height: 0.1,
            max_height: 0.5,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        voronoi(&mut field, &params, false, &mut rng).unwrap();
        assert!(field.as_slice().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_round_blend_rejects_zero_dropoff() {
        let mut field = HeightField::new(8, 8);
        let params = VoronoiParams {
            blend: VoronoiBlend::Round,
            dropoff: 0.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = voronoi(&mut field, &params, true, &mut rng);
        assert!(matches!(result, Err(GenerateError::ZeroDropoff)));
    }

    #[test]
    fn test_invalid_height_bounds_rejected() {
        let mut field = HeightField::new(8, 8);
        let params = VoronoiParams {
            min_height: 0.9,
            max_height: 0.1,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = voronoi(&mut field, &params, true, &mut rng);
        assert!(matches!(
            result,
            Err(GenerateError::InvalidHeightBounds(_, _))
        ));
    }
}
