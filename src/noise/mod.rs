//! Deterministic gradient-noise evaluation.

mod perlin;

pub use perlin::Perlin;
