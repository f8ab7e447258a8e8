//! PNG export of height fields, weight maps and noise maps.

mod png;

pub use png::{
    export_heightfield_png, export_noise_map_png, export_weight_map_png, PngExportError,
    PngExportOptions,
};
