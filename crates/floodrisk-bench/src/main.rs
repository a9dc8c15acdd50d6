//! floodrisk: CLI for flood-risk analysis and threshold tuning.
//!
//! Analyzes one image, or every image in a directory in name order,
//! printing per-stage diagnostics and optionally writing annotated
//! frames. Useful for:
//!
//! - Checking what each detector contributes on a given scene
//! - Seeing how many regions suppression drops and why
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin floodrisk -- [OPTIONS] <INPUT>
//! ```
//!
//! Set `RUST_LOG=floodrisk_pipeline=debug` for per-stage log output.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::Parser;
use floodrisk_pipeline::diagnostics::{AnalysisDiagnostics, Clock};
use floodrisk_pipeline::{AnalysisSummary, AnnotateConfig, Frame};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// File extensions picked up when the input is a directory.
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// Flood-risk analysis and diagnostics for floodrisk.
///
/// Runs the analysis pipeline on an image (or a directory of frames) and
/// prints detailed per-stage timing and pixel-count diagnostics.
#[derive(Parser)]
#[command(name = "floodrisk", version)]
struct Cli {
    /// Input image (PNG, JPEG, BMP, WebP) or a directory of frames.
    input: PathBuf,

    /// Directory for annotated frames, written as `<stem>_analyzed.png`.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Overlay weight when blending the zone heatmap (0.0-1.0).
    #[arg(long, default_value_t = AnnotateConfig::DEFAULT_BLEND)]
    blend: f32,

    /// Maximum number of core regions that get a text label.
    #[arg(long, default_value_t = AnnotateConfig::DEFAULT_MAX_LABELS)]
    max_labels: usize,

    /// Omit the legend box and timestamp.
    #[arg(long)]
    no_legend: bool,

    /// Number of analysis runs per frame for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output summaries and diagnostics as JSON instead of a report.
    #[arg(long)]
    json: bool,

    /// Full annotation config as a JSON string.
    ///
    /// When provided, the individual annotation flags are ignored.
    /// The JSON must be a valid `AnnotateConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// One frame's record in `--json` output.
#[derive(Serialize)]
struct FrameReport<'a> {
    input: String,
    #[serde(flatten)]
    summary: AnalysisSummary,
    output_image: Option<String>,
    diagnostics: &'a AnalysisDiagnostics,
}

/// Build an [`AnnotateConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<AnnotateConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(AnnotateConfig {
        blend: cli.blend,
        max_labels: cli.max_labels,
        legend: !cli.no_legend,
    })
}

/// The input file itself, or every image in the input directory sorted
/// by path.
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>, String> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let entries = std::fs::read_dir(input)
        .map_err(|e| format!("Error reading directory {}: {e}", input.display()))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(format!("No images found in {}", input.display()));
    }
    Ok(paths)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            tracing::error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let inputs = match collect_inputs(&cli.input) {
        Ok(paths) => paths,
        Err(msg) => {
            tracing::error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref dir) = cli.output
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        tracing::error!(path = %dir.display(), error = %e, "cannot create output directory");
        return ExitCode::FAILURE;
    }

    eprintln!("Frames: {}", inputs.len());
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(inputs.len() * cli.runs);

    for path in &inputs {
        let frame: Frame = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "cannot decode image");
                return ExitCode::FAILURE;
            }
        };

        eprintln!("Image: {} ({})", path.display(), floodrisk_pipeline::Dimensions::of(&frame));

        let mut latest = None;
        for run in 0..cli.runs {
            if cli.runs > 1 {
                eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
            }
            let (result, diagnostics) =
                floodrisk_pipeline::analyze_with_diagnostics(&frame, &StdClock);
            if !cli.json {
                println!("{}", diagnostics.report());
            }
            latest = Some(result);
            all_diagnostics.push(diagnostics);
        }
        let Some(result) = latest else {
            continue;
        };

        let output_image = cli.output.as_ref().and_then(|dir| {
            let annotated =
                floodrisk_pipeline::annotate_with(&frame, &result, &config, Utc::now());
            let out_path = dir.join(output_name(path));
            match annotated.save(&out_path) {
                Ok(()) => {
                    eprintln!("Annotated frame written to {}", out_path.display());
                    out_path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                }
                Err(e) => {
                    tracing::error!(path = %out_path.display(), error = %e, "cannot write annotated frame");
                    None
                }
            }
        });

        if cli.json {
            let Some(diagnostics) = all_diagnostics.last() else {
                continue;
            };
            let report = FrameReport {
                input: path.display().to_string(),
                summary: result.summary(),
                output_image,
                diagnostics,
            };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    tracing::error!(error = %e, "cannot serialize report");
                    return ExitCode::FAILURE;
                }
            }
        }

        eprintln!();
    }

    // Print summary when more than one analysis ran.
    if all_diagnostics.len() > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// `<stem>_analyzed.png` for an input path.
fn output_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map_or_else(|| "frame".into(), |s| s.to_string_lossy());
    format!("{stem}_analyzed.png")
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

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&AnalysisDiagnostics) -> Duration;

/// Print aggregated statistics across all runs and frames.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[AnalysisDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} analyses)\n{}",
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
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Color Conversion", |d| d.color_conversion.duration),
        ("Segmentation", |d| d.segmentation.duration),
        ("Suppression", |d| d.suppression.duration),
        ("Zones", |d| d.zones.duration),
        ("Scoring", |d| d.scoring.duration),
    ];

    for (name, extractor) in stage_extractors {
        let total: f64 = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum();
        let stage_mean = total / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }

    let fallbacks = all_diagnostics
        .iter()
        .flat_map(AnalysisDiagnostics::stages)
        .filter(|(_, stage)| stage.fell_back)
        .count();
    if fallbacks > 0 {
        println!();
        println!("Stage fallbacks: {fallbacks}");
    }
}
