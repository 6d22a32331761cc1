//! slice-layers - run raw slice loops through the layer geometry pipeline
//!
//! Usage:
//!   slice-layers process <layers.json> -o <out.json> [--config region.json] [--svg-dir DIR]
//!   slice-layers info <layers.json>
//!   slice-layers config [-o region.json]
//!
//! The input is a JSON array of layers:
//! `[{"bottom_z": 0.0, "top_z": 0.3, "regions": [{"loops": [[[x, y], ...], ...]}]}, ...]`
//! with coordinates in millimetres; counter-clockwise loops are contours and
//! clockwise loops are holes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};
use slicer::{
    ExtrusionRole, Layer, LayerInput, Pipeline, RegionConfig, SurfaceType, SvgInspector,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Layer region geometry: perimeters, gap fill, surface types and bridges
#[derive(Parser, Debug)]
#[command(name = "slice-layers")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a layer file and write the resulting layers as JSON
    Process {
        /// Input layer file (JSON)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (defaults to <INPUT>.layers.json)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Region configuration file (JSON); missing keys take defaults
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Number of perimeters (overrides the config file)
        #[arg(long)]
        perimeters: Option<usize>,

        /// Infill density 0-100 (overrides the config file)
        #[arg(long)]
        infill_density: Option<u32>,

        /// Also generate infill paths for the fill surfaces
        #[arg(long)]
        infill: bool,

        /// Write an SVG per layer region and stage into this directory
        #[arg(long, value_name = "DIR")]
        svg_dir: Option<PathBuf>,

        /// Number of threads to use (0 = auto)
        #[arg(short = 'j', long, default_value = "0")]
        threads: usize,
    },

    /// Show what a layer file contains
    Info {
        /// Input layer file (JSON)
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Print the default region configuration
    Config {
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Process {
            input,
            output,
            config,
            perimeters,
            infill_density,
            infill,
            svg_dir,
            threads,
        } => cmd_process(
            input,
            output,
            config,
            perimeters,
            infill_density,
            infill,
            svg_dir,
            threads,
        ),
        Commands::Info { input } => cmd_info(&input),
        Commands::Config { output } => cmd_config(output),
    }
}

fn load_layers(path: &Path) -> Result<Vec<LayerInput>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read layer file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse layer file: {}", path.display()))
}

#[allow(clippy::too_many_arguments)]
fn cmd_process(
    input: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    perimeters: Option<usize>,
    infill_density: Option<u32>,
    infill: bool,
    svg_dir: Option<PathBuf>,
    threads: usize,
) -> Result<()> {
    let output_path = output.unwrap_or_else(|| input.with_extension("layers.json"));

    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to initialize thread pool")?;
    }

    let mut region_config = match config {
        Some(path) => RegionConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load region config: {}", path.display()))?,
        None => RegionConfig::default(),
    };
    if let Some(n) = perimeters {
        region_config.perimeters = n;
    }
    if let Some(density) = infill_density {
        region_config.fill_density = density as f64 / 100.0;
    }

    info!("Loading layers: {}", input.display());
    let inputs = load_layers(&input)?;

    let mut pipeline = Pipeline::new(&region_config).with_infill(infill);
    if let Some(dir) = svg_dir {
        let inspector = SvgInspector::new(&dir)
            .with_context(|| format!("Failed to create SVG directory: {}", dir.display()))?;
        pipeline = pipeline.with_inspector(Arc::new(inspector));
    }

    let progress = ProgressBar::new(100);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    progress.set_message("Processing layers...");

    let layers = pipeline
        .run_with_callback(&inputs, |stage, fraction| {
            progress.set_position((fraction * 100.0) as u64);
            progress.set_message(format!("{} done", stage));
        })
        .context("Failed to process layers")?;

    progress.set_message("Writing output...");
    let json = serde_json::to_string_pretty(&layers).context("Failed to serialize layers")?;
    fs::write(&output_path, json)
        .with_context(|| format!("Failed to write output: {}", output_path.display()))?;
    progress.finish_with_message("Done!");

    print_summary(&layers);
    println!("  Output: {}", output_path.display());
    Ok(())
}

fn print_summary(layers: &[Layer]) {
    let regions = || layers.iter().flat_map(|l| l.regions());
    let loops: usize = regions()
        .flat_map(|r| r.perimeters.flatten())
        .filter(|e| e.as_loop().is_some())
        .count();
    let gap_fill: usize = regions()
        .flat_map(|r| r.thin_fills.flatten())
        .filter(|e| e.role() == Some(ExtrusionRole::GapFill))
        .count();
    let bridges = regions()
        .flat_map(|r| r.fill_surfaces.iter())
        .filter(|s| s.bridge_angle.is_some())
        .count();

    println!();
    println!("Processing complete!");
    println!("  Layers: {}", layers.len());
    println!("  Perimeter loops: {}", loops);
    println!("  Gap fill paths: {}", gap_fill);
    for kind in [
        SurfaceType::Top,
        SurfaceType::Bottom,
        SurfaceType::Internal,
        SurfaceType::InternalSolid,
    ] {
        let area: f64 = regions()
            .flat_map(|r| r.fill_surfaces_of(kind))
            .map(|s| s.area())
            .sum();
        println!("  {} area: {:.2} mm²", kind, area / slicer::scaled_area(1.0));
    }
    println!("  Bridges: {}", bridges);
}

fn cmd_info(input: &Path) -> Result<()> {
    let inputs = load_layers(input)?;

    println!("Layer file: {}", input.display());
    println!("  Layers: {}", inputs.len());
    if let (Some(first), Some(last)) = (inputs.first(), inputs.last()) {
        println!("  Z range: {:.3} - {:.3} mm", first.bottom_z, last.top_z);
    }
    let regions: usize = inputs.iter().map(|l| l.regions.len()).sum();
    let loops: usize = inputs
        .iter()
        .flat_map(|l| &l.regions)
        .map(|r| r.loops.len())
        .sum();
    println!("  Regions: {}", regions);
    println!("  Loops: {}", loops);
    Ok(())
}

fn cmd_config(output: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(&RegionConfig::default())
        .context("Failed to serialize config")?;
    match output {
        Some(path) => fs::write(&path, json)
            .with_context(|| format!("Failed to write config: {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}
