//! Terrain stage trait and pipeline orchestration.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::field::ops;
use crate::generators::{self, MpdParams, NoiseLayer, VoronoiParams};
use crate::noise::Perlin;
use crate::splat::{self, SplatLayer};
use crate::terrain::Terrain;
use crate::vegetation::{self, GroundProbe, ScatterParams, VegetationRule};

/// Unique identifier for terrain stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    Random,
    NoiseLayers,
    Voronoi,
    Midpoint,
    Smooth,
    Splat,
    Vegetation,
}

impl StageId {
    /// Returns the name of the stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Random => "random",
            StageId::NoiseLayers => "noise",
            StageId::Voronoi => "voronoi",
            StageId::Midpoint => "midpoint",
            StageId::Smooth => "smooth",
            StageId::Splat => "splat",
            StageId::Vegetation => "vegetation",
        }
    }
}

/// Configuration shared by every stage in a run.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Master seed; each stage derives its own stream from it.
    pub seed: u64,
    /// Start the first height-producing stage from a zeroed field instead of
    /// accumulating onto the committed contents.
    pub reset: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            reset: true,
        }
    }
}

/// Errors that can occur during pipeline execution.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Stage '{0}' failed: {1}")]
    StageFailed(String, String),
    #[error("Stage '{0}' requires a height-producing stage earlier in the pipeline")]
    MissingDependency(String),
}

fn stage_failed(name: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::StageFailed(name.to_string(), err.to_string())
}

/// Trait for implementing terrain stages.
///
/// Each stage transforms the terrain in place, building upon earlier
/// stages. The trait-based design allows modular composition and easy
/// extension with new generation passes.
pub trait TerrainStage: Send + Sync {
    /// Returns the unique identifier for this stage.
    fn id(&self) -> StageId;

    /// Returns a human-readable name for the stage.
    fn name(&self) -> &str;

    /// Whether this stage writes heights that later stages can classify.
    fn produces_height(&self) -> bool {
        false
    }

    /// Whether this stage needs heights generated earlier in the run.
    fn requires_height(&self) -> bool {
        false
    }

    /// Executes the stage, modifying the terrain in place.
    fn execute(
        &self,
        terrain: &mut Terrain,
        config: &StageConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<(), PipelineError>;
}

/// Orchestrates terrain stages into a complete run.
pub struct Pipeline {
    stages: Vec<Box<dyn TerrainStage>>,
    config: StageConfig,
}

impl Pipeline {
    /// Creates a new empty pipeline with the given configuration.
    pub fn new(config: StageConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Adds a stage to the pipeline.
    pub fn add_stage<S: TerrainStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Executes all stages in order on the given terrain.
    pub fn run(&self, terrain: &mut Terrain) -> Result<(), PipelineError> {
        self.run_with_callbacks(terrain, |_, _, _| {}, |_, _, _| {})
    }

    /// Executes all stages with start/complete callbacks `(name, index, total)`.
    ///
    /// Stage random streams derive from the master seed and the stage's
    /// position, so a run is reproducible and stages do not perturb each
    /// other's draws. The reset flag applies to the first height-producing
    /// stage only; later stages accumulate onto its output.
    pub fn run_with_callbacks<F1, F2>(
        &self,
        terrain: &mut Terrain,
        mut on_stage_start: F1,
        mut on_stage_complete: F2,
    ) -> Result<(), PipelineError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        let total = self.stages.len();
        let mut height_ready = false;

        for (i, stage) in self.stages.iter().enumerate() {
            on_stage_start(stage.name(), i, total);

            if stage.requires_height() && !height_ready {
                return Err(PipelineError::MissingDependency(stage.name().to_string()));
            }

            let stage_config = StageConfig {
                seed: self.config.seed,
                reset: self.config.reset && !height_ready,
            };
            let mut rng = ChaCha8Rng::seed_from_u64(
                self.config.seed.wrapping_add((i as u64 + 1).wrapping_mul(31)),
            );
            stage.execute(terrain, &stage_config, &mut rng)?;

            if stage.produces_height() {
                height_ready = true;
            }
            on_stage_complete(stage.name(), i, total);
        }

        Ok(())
    }
}

/// Uniform random perturbation stage.
pub struct RandomStage {
    pub lo: f32,
    pub hi: f32,
}

impl TerrainStage for RandomStage {
    fn id(&self) -> StageId {
        StageId::Random
    }

    fn name(&self) -> &str {
        "Random Perturbation"
    }

    fn produces_height(&self) -> bool {
        true
    }

    fn execute(
        &self,
        terrain: &mut Terrain,
        config: &StageConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<(), PipelineError> {
        ops::random_perturb(&mut terrain.field, self.lo, self.hi, config.reset, rng)
            .map_err(|e| stage_failed(self.name(), e))
    }
}

/// Layered fractal-noise stage.
pub struct NoiseLayersStage {
    pub layers: Vec<NoiseLayer>,
}

impl TerrainStage for NoiseLayersStage {
    fn id(&self) -> StageId {
        StageId::NoiseLayers
    }

    fn name(&self) -> &str {
        "Noise Layers"
    }

    fn produces_height(&self) -> bool {
        true
    }

    fn execute(
        &self,
        terrain: &mut Terrain,
        config: &StageConfig,
        _rng: &mut ChaCha8Rng,
    ) -> Result<(), PipelineError> {
        let perlin = Perlin::new(config.seed);
        generators::add_noise_layers(&mut terrain.field, &self.layers, &perlin, config.reset)
            .map_err(|e| stage_failed(self.name(), e))
    }
}

/// Voronoi peak blending stage.
pub struct VoronoiStage {
    pub params: VoronoiParams,
}

impl TerrainStage for VoronoiStage {
    fn id(&self) -> StageId {
        StageId::Voronoi
    }

    fn name(&self) -> &str {
        "Voronoi Peaks"
    }

    fn produces_height(&self) -> bool {
        true
    }

    fn execute(
        &self,
        terrain: &mut Terrain,
        config: &StageConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<(), PipelineError> {
        generators::voronoi(&mut terrain.field, &self.params, config.reset, rng)
            .map_err(|e| stage_failed(self.name(), e))
    }
}

/// Midpoint-displacement stage.
pub struct MidpointStage {
    pub params: MpdParams,
}

impl TerrainStage for MidpointStage {
    fn id(&self) -> StageId {
        StageId::Midpoint
    }

    fn name(&self) -> &str {
        "Midpoint Displacement"
    }

    fn produces_height(&self) -> bool {
        true
    }

    fn execute(
        &self,
        terrain: &mut Terrain,
        config: &StageConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<(), PipelineError> {
        generators::midpoint_displacement(&mut terrain.field, &self.params, config.reset, rng)
            .map_err(|e| stage_failed(self.name(), e))
    }
}

/// Neighbor-average smoothing stage.
pub struct SmoothStage {
    pub passes: u32,
}

impl TerrainStage for SmoothStage {
    fn id(&self) -> StageId {
        StageId::Smooth
    }

    fn name(&self) -> &str {
        "Smoothing"
    }

    fn execute(
        &self,
        terrain: &mut Terrain,
        _config: &StageConfig,
        _rng: &mut ChaCha8Rng,
    ) -> Result<(), PipelineError> {
        ops::smooth_clamped(&mut terrain.field, self.passes);
        Ok(())
    }
}

/// Splat-map classification stage.
pub struct SplatStage {
    pub layers: Vec<SplatLayer>,
}

impl TerrainStage for SplatStage {
    fn id(&self) -> StageId {
        StageId::Splat
    }

    fn name(&self) -> &str {
        "Splat Classification"
    }

    fn requires_height(&self) -> bool {
        true
    }

    fn execute(
        &self,
        terrain: &mut Terrain,
        config: &StageConfig,
        _rng: &mut ChaCha8Rng,
    ) -> Result<(), PipelineError> {
        let perlin = Perlin::new(config.seed);
        terrain.weights = Some(splat::classify(&terrain.field, &self.layers, &perlin));
        Ok(())
    }
}

/// Vegetation scatter stage.
pub struct VegetationStage {
    pub rules: Vec<VegetationRule>,
    pub params: ScatterParams,
    /// Optional surface probe forwarded to the scatter pass.
    pub probe: Option<Box<dyn GroundProbe>>,
}

impl TerrainStage for VegetationStage {
    fn id(&self) -> StageId {
        StageId::Vegetation
    }

    fn name(&self) -> &str {
        "Vegetation Scatter"
    }

    fn requires_height(&self) -> bool {
        true
    }

    fn execute(
        &self,
        terrain: &mut Terrain,
        _config: &StageConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<(), PipelineError> {
        let placements = vegetation::scatter(
            &terrain.field,
            terrain.world_scale,
            &self.rules,
            &self.params,
            self.probe.as_deref(),
            rng,
        )
        .map_err(|e| stage_failed(self.name(), e))?;
        terrain.placements = Some(placements);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn test_terrain() -> Terrain {
        Terrain::new(17, 17, Vec3::new(100.0, 20.0, 100.0))
    }

    fn permissive_splat() -> Vec<SplatLayer> {
        vec![SplatLayer {
            min_height: -100.0,
            max_height: 100.0,
            max_slope: 100.0,
            ..Default::default()
        }]
    }

    fn permissive_vegetation() -> VegetationStage {
        VegetationStage {
            rules: vec![VegetationRule {
                min_height: -100.0,
                max_height: 100.0,
                min_slope: 0.0,
                max_slope: 100.0,
                remove: false,
            }],
            params: ScatterParams {
                spacing: 10.0,
                max_instances: 100,
            },
            probe: None,
        }
    }

    #[test]
    fn test_pipeline_execution() {
        let mut pipeline = Pipeline::new(StageConfig::default());
        pipeline.add_stage(RandomStage { lo: 0.0, hi: 0.5 });

        let mut terrain = test_terrain();
        pipeline.run(&mut terrain).unwrap();

        let (min, max) = terrain.height_range();
        assert!(min < max, "random stage should produce variation");
    }

    #[test]
    fn test_classification_requires_height_stage() {
        let mut pipeline = Pipeline::new(StageConfig::default());
        pipeline.add_stage(SplatStage {
            layers: permissive_splat(),
        });

        let mut terrain = test_terrain();
        let result = pipeline.run(&mut terrain);
        assert!(matches!(result, Err(PipelineError::MissingDependency(_))));
        assert!(terrain.weights.is_none());
    }

    #[test]
    fn test_full_run_populates_outputs() {
        let mut pipeline = Pipeline::new(StageConfig::default());
        pipeline.add_stage(NoiseLayersStage {
            layers: vec![NoiseLayer::default()],
        });
        pipeline.add_stage(VoronoiStage {
            params: VoronoiParams::default(),
        });
        pipeline.add_stage(SmoothStage { passes: 2 });
        pipeline.add_stage(SplatStage {
            layers: permissive_splat(),
        });
        pipeline.add_stage(permissive_vegetation());

        let mut terrain = test_terrain();
        pipeline.run(&mut terrain).unwrap();

        let weights = terrain.weights.as_ref().unwrap();
        assert_eq!(weights.dimensions(), (17, 17));
        assert_eq!(weights.layer_count(), 1);
        assert!(!terrain.placements.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_reset_applies_to_first_height_stage_only() {
        let mut pipeline = Pipeline::new(StageConfig::default());
        pipeline.add_stage(RandomStage { lo: 5.0, hi: 5.0 });
        pipeline.add_stage(NoiseLayersStage {
            layers: vec![NoiseLayer::default()],
        });

        let mut terrain = test_terrain();
        pipeline.run(&mut terrain).unwrap();

        // The noise stage accumulates onto the random stage's output; if it
        // reset the field every cell would sit well below 1.0.
        assert!(terrain.field.as_slice().iter().all(|&v| v >= 4.9));
    }

    #[test]
    fn test_run_with_callbacks() {
        let mut pipeline = Pipeline::new(StageConfig::default());
        pipeline.add_stage(RandomStage { lo: 0.0, hi: 0.1 });
        pipeline.add_stage(SmoothStage { passes: 1 });

        let mut started = Vec::new();
        let mut completed = Vec::new();

        let mut terrain = test_terrain();
        pipeline
            .run_with_callbacks(
                &mut terrain,
                |name, i, total| started.push((name.to_string(), i, total)),
                |name, i, total| completed.push((name.to_string(), i, total)),
            )
            .unwrap();

        assert_eq!(started.len(), 2);
        assert_eq!(completed.len(), 2);
        assert_eq!(started[0], ("Random Perturbation".to_string(), 0, 2));
        assert_eq!(completed[1], ("Smoothing".to_string(), 1, 2));
    }

    #[test]
    fn test_run_is_deterministic_per_seed() {
        let build = || {
            let mut pipeline = Pipeline::new(StageConfig {
                seed: 1234,
                reset: true,
            });
            pipeline.add_stage(RandomStage { lo: 0.0, hi: 0.2 });
            pipeline.add_stage(VoronoiStage {
                params: VoronoiParams::default(),
            });
            pipeline.add_stage(permissive_vegetation());
            pipeline
        };

        let mut a = test_terrain();
        build().run(&mut a).unwrap();
        let mut b = test_terrain();
        build().run(&mut b).unwrap();

        assert_eq!(a.field.as_slice(), b.field.as_slice());
        assert_eq!(a.placements, b.placements);
    }

    #[test]
    fn test_stage_failure_is_reported() {
        let mut pipeline = Pipeline::new(StageConfig::default());
        // A 17x17 field is valid for MPD, but inverted bounds are not.
        pipeline.add_stage(MidpointStage {
            params: MpdParams {
                min_height: 1.0,
                max_height: -1.0,
                ..Default::default()
            },
        });

        let mut terrain = test_terrain();
        let result = pipeline.run(&mut terrain);
        assert!(matches!(result, Err(PipelineError::StageFailed(_, _))));
    }

    #[test]
    fn test_stage_id_name() {
        assert_eq!(StageId::Random.name(), "random");
        assert_eq!(StageId::Vegetation.name(), "vegetation");
    }
}
