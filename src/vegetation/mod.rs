//! Vegetation placement on a jittered spacing grid.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::{ops, HeightField};

/// Per-species placement constraints.
///
/// The list index is the species id consumed downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VegetationRule {
    pub min_height: f32,
    pub max_height: f32,
    pub min_slope: f32,
    pub max_slope: f32,
    /// Flags this rule for the next prune pass.
    pub remove: bool,
}

impl Default for VegetationRule {
    fn default() -> Self {
        Self {
            min_height: 0.1,
            max_height: 0.2,
            min_slope: 0.0,
            max_slope: 1.5,
            remove: false,
        }
    }
}

/// Scan parameters for the placement grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterParams {
    /// World-unit distance between placement grid points.
    pub spacing: f32,
    /// Hard cap on emitted instances, first-reached-first-served in scan
    /// order.
    pub max_instances: usize,
}

impl Default for ScatterParams {
    fn default() -> Self {
        Self {
            spacing: 5.0,
            max_instances: 5000,
        }
    }
}

/// A single placed instance.
///
/// Position axes are each normalized to [0, 1] of the terrain's world
/// extents. Produced once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Vec3,
    pub rotation_degrees: f32,
    pub species: usize,
}

/// Surface-height lookup injected by the host, standing in for a physics
/// raycast. Returns the world-space height at a planar position, or `None`
/// when there is no hit.
pub trait GroundProbe: Send + Sync {
    fn probe(&self, world_x: f32, world_z: f32) -> Option<f32>;
}

impl<F> GroundProbe for F
where
    F: Fn(f32, f32) -> Option<f32> + Send + Sync,
{
    fn probe(&self, world_x: f32, world_z: f32) -> Option<f32> {
        self(world_x, world_z)
    }
}

/// Errors from scatter parameter validation.
#[derive(Error, Debug)]
pub enum ScatterError {
    #[error("spacing must be positive, got {0}")]
    InvalidSpacing(f32),
    #[error("world scale components must be positive, got ({0}, {1}, {2})")]
    InvalidWorldScale(f32, f32, f32),
}

/// Walks a jittered spacing grid over the world extents and emits a
/// placement for every species whose height and slope constraints pass.
///
/// Scan order is z-major, x-minor, species-minor; the instance cap cuts the
/// scan off wherever it is reached. The probe, when present and reporting a
/// hit, overrides the field height.
pub fn scatter<R: Rng + ?Sized>(
    field: &HeightField,
    world_scale: Vec3,
    rules: &[VegetationRule],
    params: &ScatterParams,
    probe: Option<&dyn GroundProbe>,
    rng: &mut R,
) -> Result<Vec<Placement>, ScatterError> {
    if !(params.spacing > 0.0) {
        return Err(ScatterError::InvalidSpacing(params.spacing));
    }
    if world_scale.x <= 0.0 || world_scale.y <= 0.0 || world_scale.z <= 0.0 {
        return Err(ScatterError::InvalidWorldScale(
            world_scale.x,
            world_scale.y,
            world_scale.z,
        ));
    }

    let (w, h) = field.dimensions();
    let half = params.spacing / 2.0;
    let mut placements = Vec::new();

    let mut z = 0.0f32;
    while z < world_scale.z {
        let mut x = 0.0f32;
        while x < world_scale.x {
            for (species, rule) in rules.iter().enumerate() {
                if placements.len() >= params.max_instances {
                    return Ok(placements);
                }

                let world_x = x + rng.random_range(-half..=half);
                let world_z = z + rng.random_range(-half..=half);
                let nx = (world_x / world_scale.x).clamp(0.0, 1.0);
                let nz = (world_z / world_scale.z).clamp(0.0, 1.0);
                let gx = ((nx * (w - 1) as f32) as usize).min(w - 1);
                let gz = ((nz * (h - 1) as f32) as usize).min(h - 1);

                let height = field.get(gx, gz);
                if height < rule.min_height || height > rule.max_height {
                    continue;
                }
                let steep = ops::steepness(field, gx, gz);
                if steep < rule.min_slope || steep > rule.max_slope {
                    continue;
                }

                let ny = match probe.and_then(|p| p.probe(world_x, world_z)) {
                    Some(world_y) => world_y / world_scale.y,
                    None => height,
                };

                placements.push(Placement {
                    position: Vec3::new(nx, ny, nz),
                    rotation_degrees: rng.random_range(0.0..360.0),
                    species,
                });
            }
            x += params.spacing;
        }
        z += params.spacing;
    }

    Ok(placements)
}
