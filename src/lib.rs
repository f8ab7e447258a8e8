//! Procedural heightmap terrain toolkit.
//!
//! Generates terrain height fields with layered fractal noise, Voronoi peak
//! blending and midpoint displacement, classifies cells into splat-map blend
//! weights, and scatters vegetation placements under height and slope
//! constraints. All operations work on a plain 2D [`HeightField`] and plain
//! parameter structs, independent of any rendering or editor host.

pub mod export;
pub mod field;
pub mod generators;
pub mod layers;
pub mod noise;
pub mod pipeline;
pub mod splat;
pub mod terrain;
pub mod texture;
pub mod vegetation;

pub use field::HeightField;
pub use generators::{MpdParams, NoiseLayer, VoronoiBlend, VoronoiParams};
pub use noise::Perlin;
pub use pipeline::{Pipeline, StageConfig, TerrainStage};
pub use splat::{SplatLayer, WeightMap};
pub use terrain::Terrain;
pub use texture::NoiseMapConfig;
pub use vegetation::{GroundProbe, Placement, ScatterParams, VegetationRule};
