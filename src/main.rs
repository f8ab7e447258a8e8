//! Terrasculpt CLI - procedural heightmap terrain generator.
//!
//! Composes noise, Voronoi and midpoint-displacement stages into a terrain
//! pipeline, classifies splat weights, scatters vegetation, and exports the
//! results as PNG maps.

use clap::{Args, Parser, Subcommand, ValueEnum};
use glam::Vec3;
use std::path::PathBuf;
use std::time::Instant;

use terrasculpt::export::{
    export_heightfield_png, export_noise_map_png, export_weight_map_png, PngExportOptions,
};
use terrasculpt::noise::Perlin;
use terrasculpt::pipeline::{
    MidpointStage, NoiseLayersStage, Pipeline, RandomStage, SmoothStage, SplatStage, StageConfig,
    VegetationStage, VoronoiStage,
};
use terrasculpt::texture::{render_noise_map, NoiseMapConfig};
use terrasculpt::{
    MpdParams, NoiseLayer, ScatterParams, SplatLayer, Terrain, VegetationRule, VoronoiBlend,
    VoronoiParams,
};

/// Procedural heightmap terrain generator.
#[derive(Parser)]
#[command(name = "terrasculpt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a terrain and export its maps.
    Generate(GenerateArgs),

    /// Render a standalone noise map to a grayscale PNG.
    Texture(TextureArgs),

    /// Display information about a terrain configuration.
    Info {
        /// Heightmap resolution in cells per side.
        #[arg(short, long, default_value = "257")]
        resolution: usize,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Heightmap resolution in cells per side (2^n + 1 enables midpoint
    /// displacement, e.g. 129, 257, 513).
    #[arg(short, long, default_value = "257")]
    resolution: usize,

    /// Random seed for reproducible generation.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output directory for generated files.
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Base name for output files.
    #[arg(short, long, default_value = "terrain")]
    name: String,

    /// World extent along x.
    #[arg(long, default_value = "500.0")]
    world_x: f32,

    /// World height extent.
    #[arg(long, default_value = "100.0")]
    world_y: f32,

    /// World extent along z.
    #[arg(long, default_value = "500.0")]
    world_z: f32,

    /// Accumulate onto the existing field instead of starting from zero.
    #[arg(long)]
    no_reset: bool,

    /// Add a uniform random perturbation stage.
    #[arg(long)]
    random: bool,

    /// Lower bound of the random perturbation.
    #[arg(long, default_value = "0.0")]
    random_min: f32,

    /// Upper bound of the random perturbation.
    #[arg(long, default_value = "0.1")]
    random_max: f32,

    /// Add a fractal-noise stage (default when no generator is selected).
    #[arg(long)]
    noise: bool,

    /// Noise frequency along x.
    #[arg(long, default_value = "0.01")]
    x_scale: f32,

    /// Noise frequency along y.
    #[arg(long, default_value = "0.01")]
    y_scale: f32,

    /// Noise sample offset along x.
    #[arg(long, default_value = "0.0")]
    x_offset: f32,

    /// Noise sample offset along y.
    #[arg(long, default_value = "0.0")]
    y_offset: f32,

    /// Number of noise octaves (1-16).
    #[arg(long, default_value = "3")]
    octaves: u32,

    /// Amplitude decay per octave.
    #[arg(long, default_value = "8.0")]
    persistence: f32,

    /// Height contribution of the noise stage.
    #[arg(long, default_value = "0.3")]
    height_scale: f32,

    /// Add a Voronoi peak stage.
    #[arg(long)]
    voronoi: bool,

    /// Number of Voronoi peaks.
    #[arg(long, default_value = "5")]
    peaks: u32,

    /// Minimum peak height.
    #[arg(long, default_value = "0.1")]
    voronoi_min: f32,

    /// Maximum peak height.
    #[arg(long, default_value = "0.5")]
    voronoi_max: f32,

    /// Slope falloff around each peak.
    #[arg(long, default_value = "0.2")]
    falloff: f32,

    /// Slope dropoff exponent around each peak.
    #[arg(long, default_value = "0.6")]
    dropoff: f32,

    /// Blend profile around each peak.
    #[arg(long, default_value = "linear")]
    blend: BlendArg,

    /// Add a midpoint-displacement stage (requires a 2^n + 1 resolution).
    #[arg(long)]
    midpoint: bool,

    /// Lowest midpoint displacement.
    #[arg(long, default_value = "-2.0")]
    mpd_min: f32,

    /// Highest midpoint displacement.
    #[arg(long, default_value = "2.0")]
    mpd_max: f32,

    /// Base of the per-level displacement dampener.
    #[arg(long, default_value = "2.0")]
    dampener: f32,

    /// Roughness exponent of the displacement dampener.
    #[arg(long, default_value = "2.0")]
    roughness: f32,

    /// Number of smoothing passes (0 disables smoothing).
    #[arg(long, default_value = "0")]
    smooth: u32,

    /// Classify splat weights over three height bands and export a preview.
    #[arg(long)]
    splat: bool,

    /// Scatter vegetation over two species presets.
    #[arg(long)]
    vegetation: bool,

    /// World-unit spacing of the vegetation placement grid.
    #[arg(long, default_value = "5.0")]
    spacing: f32,

    /// Hard cap on vegetation instances.
    #[arg(long, default_value = "5000")]
    max_instances: usize,
}

#[derive(Args)]
struct TextureArgs {
    /// Noise map width in pixels.
    #[arg(long, default_value = "513")]
    width: usize,

    /// Noise map height in pixels.
    #[arg(long, default_value = "513")]
    height: usize,

    /// Random seed for reproducible rendering.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output directory.
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Base name for the output file.
    #[arg(short, long, default_value = "noise")]
    name: String,

    /// Noise frequency along x.
    #[arg(long, default_value = "0.01")]
    x_scale: f32,

    /// Noise frequency along y.
    #[arg(long, default_value = "0.01")]
    y_scale: f32,

    /// Noise sample offset along x.
    #[arg(long, default_value = "0.0")]
    x_offset: f32,

    /// Noise sample offset along y.
    #[arg(long, default_value = "0.0")]
    y_offset: f32,

    /// Number of noise octaves (1-16).
    #[arg(long, default_value = "3")]
    octaves: u32,

    /// Amplitude decay per octave.
    #[arg(long, default_value = "8.0")]
    persistence: f32,

    /// Overall sample amplitude.
    #[arg(long, default_value = "1.0")]
    height_scale: f32,

    /// Output brightness.
    #[arg(long, default_value = "0.5")]
    brightness: f32,

    /// Output contrast.
    #[arg(long, default_value = "0.5")]
    contrast: f32,

    /// Blend wrap-offset samples so the map tiles.
    #[arg(long)]
    seamless: bool,

    /// Rescale the finished map to the full [0, 1] range.
    #[arg(long)]
    remap: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum BlendArg {
    /// Straight-line falloff.
    Linear,
    /// Exponential falloff.
    Power,
    /// Linear plus exponential falloff.
    Combined,
    /// Rippled falloff.
    Round,
}

impl From<BlendArg> for VoronoiBlend {
    fn from(arg: BlendArg) -> Self {
        match arg {
            BlendArg::Linear => VoronoiBlend::Linear,
            BlendArg::Power => VoronoiBlend::Power,
            BlendArg::Combined => VoronoiBlend::Combined,
            BlendArg::Round => VoronoiBlend::Round,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => run_generate(args),
        Commands::Texture(args) => run_texture(args),
        Commands::Info { resolution } => run_info(resolution),
    }
}

fn seed_or_now(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64
    })
}

fn run_generate(args: GenerateArgs) {
    // Validate parameters
    if args.resolution < 2 || args.resolution > 8193 {
        eprintln!("Error: Resolution must be between 2 and 8193");
        std::process::exit(1);
    }

    if args.octaves < 1 || args.octaves > 16 {
        eprintln!("Error: Octaves must be between 1 and 16");
        std::process::exit(1);
    }

    if args.midpoint && !(args.resolution - 1).is_power_of_two() {
        eprintln!(
            "Error: Midpoint displacement needs a 2^n + 1 resolution (e.g. 129, 257, 513), got {}",
            args.resolution
        );
        std::process::exit(1);
    }

    if args.vegetation && args.spacing <= 0.0 {
        eprintln!("Error: Vegetation spacing must be positive");
        std::process::exit(1);
    }

    if args.world_x <= 0.0 || args.world_y <= 0.0 || args.world_z <= 0.0 {
        eprintln!("Error: World extents must be positive");
        std::process::exit(1);
    }

    let seed = seed_or_now(args.seed);

    println!("Terrasculpt - Procedural Terrain Generator");
    println!("==========================================");
    println!("Resolution: {}x{}", args.resolution, args.resolution);
    println!("Seed: {}", seed);
    println!("Output: {}", args.output.display());

    let start = Instant::now();

    let mut terrain = Terrain::new(
        args.resolution,
        args.resolution,
        Vec3::new(args.world_x, args.world_y, args.world_z),
    );

    let stage_config = StageConfig {
        seed,
        reset: !args.no_reset,
    };
    let mut pipeline = Pipeline::new(stage_config);

    if args.random {
        pipeline.add_stage(RandomStage {
            lo: args.random_min,
            hi: args.random_max,
        });
        println!(
            "Random perturbation enabled: [{}, {}]",
            args.random_min, args.random_max
        );
    }

    // Fall back to a noise stage when no generator was selected.
    if args.noise || !(args.random || args.voronoi || args.midpoint) {
        pipeline.add_stage(NoiseLayersStage {
            layers: vec![NoiseLayer {
                x_scale: args.x_scale,
                y_scale: args.y_scale,
                x_offset: args.x_offset,
                y_offset: args.y_offset,
                octaves: args.octaves,
                persistence: args.persistence,
                height_scale: args.height_scale,
                remove: false,
            }],
        });
        println!(
            "Noise layer enabled: octaves={}, persistence={}",
            args.octaves, args.persistence
        );
    }

    if args.voronoi {
        pipeline.add_stage(VoronoiStage {
            params: VoronoiParams {
                peaks: args.peaks,
                min_height: args.voronoi_min,
                max_height: args.voronoi_max,
                falloff: args.falloff,
                dropoff: args.dropoff,
                blend: args.blend.into(),
            },
        });
        println!("Voronoi peaks enabled: {} peaks", args.peaks);
    }

    if args.midpoint {
        pipeline.add_stage(MidpointStage {
            params: MpdParams {
                min_height: args.mpd_min,
                max_height: args.mpd_max,
                dampener_power: args.dampener,
                roughness: args.roughness,
            },
        });
        println!("Midpoint displacement enabled");
    }

    if args.smooth > 0 {
        pipeline.add_stage(SmoothStage { passes: args.smooth });
        println!("Smoothing enabled: {} passes", args.smooth);
    }

    if args.splat {
        pipeline.add_stage(SplatStage {
            layers: splat_bands(),
        });
        println!("Splat classification enabled: 3 height bands");
    }

    if args.vegetation {
        pipeline.add_stage(VegetationStage {
            rules: vegetation_rules(),
            params: ScatterParams {
                spacing: args.spacing,
                max_instances: args.max_instances,
            },
            probe: None,
        });
        println!(
            "Vegetation scatter enabled: spacing={}, cap={}",
            args.spacing, args.max_instances
        );
    }

    println!("\nRunning generation pipeline...");
    pipeline
        .run_with_callbacks(
            &mut terrain,
            |name, i, total| {
                println!("  [{}/{}] Starting: {}", i + 1, total, name);
            },
            |name, i, total| {
                println!("  [{}/{}] Completed: {}", i + 1, total, name);
            },
        )
        .unwrap_or_else(|e| {
            eprintln!("Error during generation: {}", e);
            std::process::exit(1);
        });

    let gen_time = start.elapsed();
    println!("Generation completed in {:.2?}", gen_time);

    let (min_h, max_h) = terrain.height_range();
    println!("Height range: [{:.4}, {:.4}]", min_h, max_h);

    println!("\nExporting maps...");
    let export_start = Instant::now();

    std::fs::create_dir_all(&args.output).unwrap_or_else(|e| {
        eprintln!("Error creating output directory: {}", e);
        std::process::exit(1);
    });

    // A flat field still exports; widen the degenerate range slightly.
    let options = PngExportOptions {
        min_height: min_h,
        max_height: if max_h > min_h { max_h } else { min_h + 1e-6 },
        ..Default::default()
    };
    let height_path = args.output.join(format!("{}_height.png", args.name));
    export_heightfield_png(&terrain.field, &height_path, &options).unwrap_or_else(|e| {
        eprintln!("Error exporting heightmap: {}", e);
        std::process::exit(1);
    });
    println!("  Exported heightmap: {}", height_path.display());

    if let Some(weights) = &terrain.weights {
        let splat_path = args.output.join(format!("{}_splat.png", args.name));
        export_weight_map_png(weights, &splat_path).unwrap_or_else(|e| {
            eprintln!("Error exporting splat preview: {}", e);
            std::process::exit(1);
        });
        println!("  Exported splat preview: {}", splat_path.display());
    }

    if let Some(placements) = &terrain.placements {
        println!("  Vegetation instances placed: {}", placements.len());
    }

    let export_time = export_start.elapsed();
    println!("Export completed in {:.2?}", export_time);
    println!("\nTotal time: {:.2?}", start.elapsed());
    println!("Done!");
}

/// Low/mid/high height bands for the CLI splat preset.
fn splat_bands() -> Vec<SplatLayer> {
    vec![
        SplatLayer {
            min_height: 0.0,
            max_height: 0.4,
            max_slope: 1.5,
            ..Default::default()
        },
        SplatLayer {
            min_height: 0.3,
            max_height: 0.7,
            max_slope: 2.0,
            ..Default::default()
        },
        SplatLayer {
            min_height: 0.6,
            max_height: 1.0,
            max_slope: 3.0,
            ..Default::default()
        },
    ]
}

/// Lowland and highland species for the CLI vegetation preset.
fn vegetation_rules() -> Vec<VegetationRule> {
    vec![
        VegetationRule {
            min_height: 0.0,
            max_height: 0.5,
            min_slope: 0.0,
            max_slope: 0.5,
            remove: false,
        },
        VegetationRule {
            min_height: 0.3,
            max_height: 0.9,
            min_slope: 0.0,
            max_slope: 1.0,
            remove: false,
        },
    ]
}

fn run_texture(args: TextureArgs) {
    if args.width < 1 || args.height < 1 {
        eprintln!("Error: Noise map dimensions must be at least 1x1");
        std::process::exit(1);
    }

    if args.octaves < 1 || args.octaves > 16 {
        eprintln!("Error: Octaves must be between 1 and 16");
        std::process::exit(1);
    }

    let seed = seed_or_now(args.seed);

    println!("Terrasculpt - Noise Map Renderer");
    println!("================================");
    println!("Size: {}x{}", args.width, args.height);
    println!("Seed: {}", seed);

    let start = Instant::now();

    let cfg = NoiseMapConfig {
        x_scale: args.x_scale,
        y_scale: args.y_scale,
        octaves: args.octaves,
        persistence: args.persistence,
        height_scale: args.height_scale,
        x_offset: args.x_offset,
        y_offset: args.y_offset,
        brightness: args.brightness,
        contrast: args.contrast,
        seamless: args.seamless,
        remap: args.remap,
    };

    let perlin = Perlin::new(seed);
    let map = render_noise_map(args.width, args.height, &cfg, &perlin).unwrap_or_else(|e| {
        eprintln!("Error rendering noise map: {}", e);
        std::process::exit(1);
    });

    std::fs::create_dir_all(&args.output).unwrap_or_else(|e| {
        eprintln!("Error creating output directory: {}", e);
        std::process::exit(1);
    });

    let path = args.output.join(format!("{}.png", args.name));
    export_noise_map_png(args.width, args.height, &map, &path).unwrap_or_else(|e| {
        eprintln!("Error exporting noise map: {}", e);
        std::process::exit(1);
    });

    println!("Exported noise map: {}", path.display());
    println!("Total time: {:.2?}", start.elapsed());
    println!("Done!");
}

fn run_info(resolution: usize) {
    let cells = (resolution as u64) * (resolution as u64);

    let bytes_heights = cells * 4; // f32
    let bytes_weights_4 = cells * 4 * 4; // 4-layer weight map
    let bytes_png = cells * 2; // 16-bit heightmap

    println!("Terrasculpt - Terrain Configuration Info");
    println!("=========================================");
    println!();
    println!("Resolution: {}x{}", resolution, resolution);
    println!();
    println!("Cell counts:");
    println!("  Total: {:>12} cells", cells);
    println!();
    println!("Memory usage (in-memory):");
    println!(
        "  Height field:       {:>12} bytes ({:.2} MB)",
        bytes_heights,
        bytes_heights as f64 / 1024.0 / 1024.0
    );
    println!(
        "  Weight map (4 lyr): {:>12} bytes ({:.2} MB)",
        bytes_weights_4,
        bytes_weights_4 as f64 / 1024.0 / 1024.0
    );
    println!();
    println!("Export file sizes:");
    println!(
        "  Heightmap PNG (16-bit): {:>12} bytes ({:.2} MB) before compression",
        bytes_png,
        bytes_png as f64 / 1024.0 / 1024.0
    );
    println!();

    println!("Generator compatibility:");
    if resolution >= 2 && (resolution - 1).is_power_of_two() {
        println!("  Midpoint displacement: OK (2^n + 1)");
    } else {
        let suggestion = suggest_mpd_resolution(resolution);
        println!(
            "  Midpoint displacement: requires 2^n + 1 (try {})",
            suggestion
        );
    }
    println!("  Noise / Voronoi / Smoothing: OK (any resolution)");
}

fn suggest_mpd_resolution(resolution: usize) -> usize {
    let mut side = 1usize;
    while side + 1 < resolution {
        side *= 2;
    }
    side + 1
}
