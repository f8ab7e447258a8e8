//! Stage orchestration over a shared terrain.

mod stage;

pub use stage::{
    MidpointStage, NoiseLayersStage, Pipeline, PipelineError, RandomStage, SmoothStage, SplatStage,
    StageConfig, StageId, TerrainStage, VegetationStage, VoronoiStage,
};
