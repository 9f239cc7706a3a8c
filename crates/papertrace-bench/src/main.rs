//! papertrace-bench: CLI tool for detector parameter experimentation and
//! diagnostics.
//!
//! Runs sheet corner detection, line detection, or both on one frame and
//! prints the results with per-stage timings. The frame is either an
//! encoded image file or, with `--raw-size WxH`, a raw RGBA8 dump as a
//! camera would hand it over.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin papertrace-bench -- [OPTIONS] <FRAME_PATH>
//! ```
//!
//! Set `RUST_LOG=debug` to see per-stage log lines from the library.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use papertrace_vision::diagnostics::{Clock, StageDiagnostics};
use papertrace_vision::{CornerConfig, DetectorConfig, Frame, HoughConfig, LineConfig, MergeConfig};

/// Paper corner and line detection diagnostics.
///
/// Runs the detectors on a frame with configurable parameters and prints
/// the detected geometry plus per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "papertrace-bench", version)]
struct Cli {
    /// Path to the frame: an encoded image (PNG, JPEG, BMP, WebP), or raw
    /// RGBA8 bytes when `--raw-size` is given.
    frame_path: PathBuf,

    /// Treat the input as raw RGBA8 with these dimensions, e.g. `1280x720`.
    #[arg(long, value_parser = parse_size)]
    raw_size: Option<(u32, u32)>,

    /// Which detector(s) to run.
    #[arg(long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,

    /// Maximum number of merged segments to export.
    #[arg(long, default_value_t = 64)]
    max_lines: usize,

    /// Merge angle tolerance in degrees.
    #[arg(long, default_value_t = MergeConfig::DEFAULT_ANGLE_TOLERANCE_DEG)]
    angle_tolerance: f64,

    /// Merge perpendicular distance tolerance in pixels.
    #[arg(long, default_value_t = MergeConfig::DEFAULT_DISTANCE_TOLERANCE_PX)]
    distance_tolerance: f64,

    /// Hough accumulator vote threshold.
    #[arg(long, default_value_t = HoughConfig::DEFAULT_VOTE_THRESHOLD)]
    hough_threshold: u32,

    /// Minimum Hough segment extent in pixels.
    #[arg(long, default_value_t = HoughConfig::DEFAULT_MIN_LINE_LENGTH)]
    min_line_length: u32,

    /// Largest gap bridged within one Hough segment, in pixels.
    #[arg(long, default_value_t = HoughConfig::DEFAULT_MAX_LINE_GAP)]
    max_line_gap: u32,

    /// Accept sheet outlines of any area.
    #[arg(long)]
    no_area_filter: bool,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable reports.
    #[arg(long)]
    json: bool,

    /// Full detector config as a JSON string.
    ///
    /// When provided, all other tuning flags are ignored. Missing fields
    /// take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Detector selection.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Sheet corners only.
    Corners,
    /// Merged lines only.
    Lines,
    /// Both detectors.
    Both,
}

impl Mode {
    const fn corners(self) -> bool {
        matches!(self, Self::Corners | Self::Both)
    }

    const fn lines(self) -> bool {
        matches!(self, Self::Lines | Self::Both)
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let height = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    Ok((width, height))
}

/// Build a [`DetectorConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual tuning flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<DetectorConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        DetectorConfig {
            corners: CornerConfig {
                min_area: if cli.no_area_filter {
                    None
                } else {
                    Some(CornerConfig::DEFAULT_MIN_AREA)
                },
                ..CornerConfig::default()
            },
            lines: LineConfig {
                hough: HoughConfig {
                    vote_threshold: cli.hough_threshold,
                    min_line_length: cli.min_line_length,
                    max_line_gap: cli.max_line_gap,
                    ..HoughConfig::default()
                },
                merge: MergeConfig {
                    angle_tolerance_deg: cli.angle_tolerance,
                    distance_tolerance_px: cli.distance_tolerance,
                },
                ..LineConfig::default()
            },
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Load the frame as `(width, height, rgba_bytes)`.
fn load_frame(cli: &Cli) -> Result<(u32, u32, Vec<u8>), String> {
    let bytes = std::fs::read(&cli.frame_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.frame_path.display()))?;
    match cli.raw_size {
        Some((width, height)) => Ok((width, height, bytes)),
        None => {
            let image = papertrace_vision::decode_rgba(&bytes).map_err(|e| e.to_string())?;
            Ok((image.width(), image.height(), image.into_raw()))
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let (width, height, data) = match load_frame(&cli) {
        Ok(loaded) => loaded,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let frame = match Frame::new(&data, width, height) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("Invalid frame: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Frame: {} ({width}x{height})", cli.frame_path.display());
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();
    log::info!("running {} pass(es)", cli.runs);

    let mut corner_runs = Vec::with_capacity(cli.runs);
    let mut line_runs = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        if cli.mode.corners() {
            match papertrace_vision::detect_corners_with_diagnostics(
                &frame,
                &config.corners,
                &StdClock,
            ) {
                Ok((quad, diagnostics)) => {
                    if run == 0 {
                        match quad {
                            Some(quad) => println!("Corners: {:?}", quad.to_f32_array()),
                            None => println!("Corners: not found"),
                        }
                    }
                    if let Err(msg) = emit(
                        cli.json,
                        || serde_json::to_string_pretty(&diagnostics),
                        || diagnostics.report(),
                    ) {
                        eprintln!("{msg}");
                        return ExitCode::FAILURE;
                    }
                    corner_runs.push(diagnostics);
                }
                Err(e) => {
                    eprintln!("Corner detection error: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }

        if cli.mode.lines() {
            match papertrace_vision::detect_lines_with_diagnostics(
                &frame,
                &config.lines,
                &StdClock,
            ) {
                Ok((detection, diagnostics)) => {
                    if run == 0 {
                        print_lines(&detection.merged, cli.max_lines);
                    }
                    if let Err(msg) = emit(
                        cli.json,
                        || serde_json::to_string_pretty(&diagnostics),
                        || diagnostics.report(),
                    ) {
                        eprintln!("{msg}");
                        return ExitCode::FAILURE;
                    }
                    line_runs.push(diagnostics);
                }
                Err(e) => {
                    eprintln!("Line detection error: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        if !corner_runs.is_empty() {
            print_multi_run_summary(
                "Corners",
                &corner_runs
                    .iter()
                    .map(|d| (d.total_duration, d.stages().to_vec()))
                    .collect::<Vec<_>>(),
            );
        }
        if !line_runs.is_empty() {
            print_multi_run_summary(
                "Lines",
                &line_runs
                    .iter()
                    .map(|d| (d.total_duration, d.stages().to_vec()))
                    .collect::<Vec<_>>(),
            );
        }
    }

    ExitCode::SUCCESS
}

/// Print diagnostics as pretty JSON or as the text report.
fn emit(
    json: bool,
    to_json: impl FnOnce() -> serde_json::Result<String>,
    report: impl FnOnce() -> String,
) -> Result<(), String> {
    if json {
        let text = to_json().map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{text}");
    } else {
        println!("{}", report());
    }
    Ok(())
}

/// Export the merged segments through the flat-buffer path and print them.
fn print_lines(merged: &[papertrace_vision::Segment], max_lines: usize) {
    let mut out = vec![0.0f32; max_lines * papertrace_vision::export::FLOATS_PER_SEGMENT];
    match papertrace_vision::export::write_segments(merged, &mut out, max_lines) {
        Ok(export) => {
            println!("Lines: {} written, {} found", export.written, export.found);
            for (i, s) in out
                .chunks_exact(papertrace_vision::export::FLOATS_PER_SEGMENT)
                .take(export.written)
                .enumerate()
            {
                println!(
                    "  #{i:<3} ({:.1}, {:.1}) -> ({:.1}, {:.1})",
                    s[0], s[1], s[2], s[3]
                );
            }
        }
        Err(e) => eprintln!("Export error: {e}"),
    }
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

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(title: &str, runs: &[(Duration, Vec<(&str, &StageDiagnostics)>)]) {
    println!();
    println!("{title} summary ({} runs)\n{}", runs.len(), "=".repeat(60));

    let durations: Vec<f64> = runs
        .iter()
        .map(|(total, _)| total.as_secs_f64() * 1000.0)
        .collect();
    if durations.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let Some((_, first)) = runs.first() else {
        return;
    };
    for (index, (name, _)) in first.iter().enumerate() {
        let stage_ms: Vec<f64> = runs
            .iter()
            .filter_map(|(_, stages)| stages.get(index))
            .map(|(_, stage)| stage.duration.as_secs_f64() * 1000.0)
            .collect();
        let stage_mean = stage_ms.iter().sum::<f64>() / stage_ms.len().max(1) as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("papertrace-bench").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn size_parsing() {
        assert_eq!(parse_size("640x480").unwrap(), (640, 480));
        assert_eq!(parse_size("12X7").unwrap(), (12, 7));
        assert!(parse_size("640").is_err());
        assert!(parse_size("ax3").is_err());
    }

    #[test]
    fn flags_build_config() {
        let cli = parse(&[
            "frame.png",
            "--angle-tolerance",
            "3",
            "--distance-tolerance",
            "9",
            "--hough-threshold",
            "40",
            "--no-area-filter",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.lines.merge.angle_tolerance_deg - 3.0).abs() < f64::EPSILON);
        assert!((config.lines.merge.distance_tolerance_px - 9.0).abs() < f64::EPSILON);
        assert_eq!(config.lines.hough.vote_threshold, 40);
        assert_eq!(config.corners.min_area, None);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "frame.png",
            "--angle-tolerance",
            "3",
            "--config-json",
            r#"{"lines": {"merge": {"angle_tolerance_deg": 12.0, "distance_tolerance_px": 4.0}}}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.lines.merge.angle_tolerance_deg - 12.0).abs() < f64::EPSILON);
        assert_eq!(config.corners, CornerConfig::default());
    }

    #[test]
    fn invalid_tolerance_rejected() {
        let cli = parse(&["frame.png", "--distance-tolerance=-1"]);
        assert!(config_from_cli(&cli).is_err());
    }

    #[test]
    fn mode_selection() {
        assert!(Mode::Both.corners() && Mode::Both.lines());
        assert!(Mode::Corners.corners() && !Mode::Corners.lines());
        assert!(!Mode::Lines.corners() && Mode::Lines.lines());
    }
}
