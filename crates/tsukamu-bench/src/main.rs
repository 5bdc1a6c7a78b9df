//! tsukamu-bench: CLI tool for estimator parameter experimentation and
//! diagnostics.
//!
//! Runs the grasp-pose estimation pipeline on a given image file with
//! configurable parameters, printing the pose and detailed per-stage
//! diagnostics. Useful for:
//!
//! - Comparing the capture presets (`direct-color` vs `edge-image`)
//! - Tuning the binarization cutoff, area ceiling, and back check
//! - Measuring per-stage durations to identify bottlenecks
//! - Understanding how parameter changes affect contour counts
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin tsukamu-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tsukamu_pipeline::diagnostics::{Clock, EstimateDiagnostics};
use tsukamu_pipeline::{ChannelSource, EstimatorConfig, MorphParams};

/// Estimator parameter experimentation and diagnostics for tsukamu.
///
/// Runs the grasp-pose estimation pipeline on a given image with
/// configurable parameters and prints the resulting pose plus
/// per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "tsukamu-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Capture preset supplying the base parameters.
    #[arg(long, value_enum, default_value_t = Preset::DirectColor)]
    preset: Preset,

    /// Override the plane fed into binarization.
    #[arg(long, value_enum)]
    channel: Option<Channel>,

    /// Override the binarization cutoff.
    #[arg(long)]
    threshold: Option<u8>,

    /// Override the region area ceiling.
    #[arg(long)]
    area_ceiling: Option<f64>,

    /// Override the back-facing area threshold.
    #[arg(long, conflicts_with = "no_back_check")]
    back_area_threshold: Option<f64>,

    /// Disable the back-facing check entirely.
    #[arg(long)]
    no_back_check: bool,

    /// Override the correspondence tolerance window half-width.
    #[arg(long, value_parser = clap::builder::RangedI64ValueParser::<i32>::new().range(1..))]
    tolerance: Option<i32>,

    /// Morphology as `radius,erode,dilate` (e.g. `2,1,6`).
    #[arg(long, value_parser = parse_morph)]
    morphology: Option<MorphParams>,

    /// Retry morphology as `radius,erode,dilate` (e.g. `5,1,6`).
    #[arg(long, value_parser = parse_morph)]
    retry_morphology: Option<MorphParams>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full estimator config as a JSON string.
    ///
    /// When provided, the preset and all individual parameter flags
    /// are ignored. The JSON must be a valid `EstimatorConfig`
    /// serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Capture preset selection.
#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// Direct color capture: red plane, high area ceiling, no back
    /// check.
    DirectColor,
    /// Preprocessed edge-image capture: luminance plane, low area
    /// ceiling, back check enabled.
    EdgeImage,
}

/// Plane selection.
#[derive(Clone, Copy, ValueEnum)]
enum Channel {
    /// Red plane.
    Red,
    /// Green plane.
    Green,
    /// Blue plane.
    Blue,
    /// Integer BT.601 luminance.
    Luminance,
}

/// Parse a `radius,erode,dilate` triple into [`MorphParams`].
fn parse_morph(s: &str) -> Result<MorphParams, String> {
    let parts: Vec<&str> = s.split(',').collect();
    let [radius, erode, dilate] = parts.as_slice() else {
        return Err(format!("expected `radius,erode,dilate`, got `{s}`"));
    };
    let parse = |part: &str, name: &str| {
        part.trim()
            .parse::<u8>()
            .map_err(|e| format!("bad {name} `{part}`: {e}"))
    };
    Ok(MorphParams::new(
        parse(radius, "radius")?,
        parse(erode, "erode count")?,
        parse(dilate, "dilate count")?,
    ))
}

/// Build an [`EstimatorConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and
/// the preset plus all individual parameter flags are ignored.
/// Otherwise the preset supplies the base and individual flags
/// override single fields.
fn config_from_cli(cli: &Cli) -> Result<EstimatorConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let mut config = match cli.preset {
        Preset::DirectColor => EstimatorConfig::direct_color(),
        Preset::EdgeImage => EstimatorConfig::edge_image(),
    };

    if let Some(channel) = cli.channel {
        config.channel = match channel {
            Channel::Red => ChannelSource::Red,
            Channel::Green => ChannelSource::Green,
            Channel::Blue => ChannelSource::Blue,
            Channel::Luminance => ChannelSource::Luminance,
        };
    }
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if let Some(ceiling) = cli.area_ceiling {
        config.area_ceiling = ceiling;
    }
    if cli.no_back_check {
        config.back_area_threshold = None;
    } else if let Some(threshold) = cli.back_area_threshold {
        config.back_area_threshold = Some(threshold);
    }
    if let Some(tolerance) = cli.tolerance {
        config.correspondence_tolerance = tolerance;
    }
    if let Some(morphology) = cli.morphology {
        config.morphology = morphology;
    }
    if let Some(retry) = cli.retry_morphology {
        config.retry_morphology = retry;
    }

    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match tsukamu_pipeline::diagnostics::estimate_with_diagnostics(
            &image_bytes,
            &config,
            &StdClock,
        ) {
            Ok((pose, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    if pose.is_undetermined() {
                        println!("Pose: undetermined (unrecognizable frame)");
                    } else {
                        println!(
                            "Pose: point=({}, {})  angle={:.3}  orientation={}",
                            pose.point.x, pose.point.y, pose.angle_degrees, pose.orientation,
                        );
                    }
                    println!();
                    println!("{}", diagnostics.report());
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Estimation error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from
/// diagnostics.
type StageExtractor = fn(&EstimateDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[EstimateDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means.
    println!();
    println!("{:<18} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(34));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Decode", |d| Some(d.decode.duration)),
        ("Binarize", |d| Some(d.binarize.duration)),
        ("Morphology", |d| Some(d.morphology.duration)),
        ("Contours", |d| Some(d.contours.duration)),
        ("Selection", |d| d.selection.as_ref().map(|s| s.duration)),
        ("Orientation", |d| d.orientation.as_ref().map(|s| s.duration)),
        ("Rotated Search", |d| {
            d.rotated_search.as_ref().map(|s| s.duration)
        }),
        ("Correspondence", |d| {
            d.correspondence.as_ref().map(|s| s.duration)
        }),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<18} {stage_mean:>10.3}ms");
    }
}
