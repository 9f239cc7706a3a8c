//! Per-stage timing and counts for both detectors.
//!
//! Every detector run collects diagnostics. The plain entry points
//! ([`detect_lines`](crate::detect_lines), [`detect_corners`](crate::detect_corners))
//! discard them and time nothing; the `*_with_diagnostics` variants take a
//! [`Clock`] so callers that can read a clock get real durations while the
//! library itself stays free of platform time sources.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, Point};

/// Time source for stage measurements.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A clock that never advances; every duration is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClock;

impl Clock for NullClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Run `f` and record its duration with `clock`.
pub(crate) fn timed<C: Clock, T>(clock: &C, f: impl FnOnce() -> T) -> (T, Duration) {
    let start = clock.now();
    let value = f();
    (value, clock.elapsed(&start))
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// RGBA to luminance conversion.
    Grayscale {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// Gaussian blur.
    Blur {
        /// Odd kernel size as configured.
        kernel: u32,
        /// Sigma derived from the kernel size.
        sigma: f32,
    },
    /// Adaptive threshold.
    Threshold {
        /// Window size.
        block_size: u32,
        /// Darkness offset below the local mean.
        offset: i16,
        /// Pixels marked as strokes.
        foreground_pixel_count: u64,
        /// Total pixel count.
        total_pixel_count: u64,
    },
    /// Canny edge detection.
    EdgeDetection {
        /// Low hysteresis threshold.
        low_threshold: f32,
        /// High hysteresis threshold.
        high_threshold: f32,
        /// Pixels marked as edges.
        edge_pixel_count: u64,
        /// Total pixel count.
        total_pixel_count: u64,
    },
    /// Morphological closing.
    Closing {
        /// Structuring element repetitions.
        iterations: u8,
        /// Foreground pixels after closing.
        foreground_pixel_count: u64,
    },
    /// Probabilistic Hough transform.
    Hough {
        /// Accumulator vote threshold.
        vote_threshold: u32,
        /// Minimum reported extent.
        min_line_length: u32,
        /// Largest bridged gap.
        max_line_gap: u32,
        /// Segments reported.
        segment_count: usize,
    },
    /// Segment clustering.
    Merge {
        /// Orientation tolerance in degrees.
        angle_tolerance_deg: f64,
        /// Perpendicular distance tolerance in pixels.
        distance_tolerance_px: f64,
        /// Segments in.
        input_count: usize,
        /// Clusters formed.
        cluster_count: usize,
        /// Clusters dropped for a zero-length reference.
        dropped_degenerate: usize,
        /// Segments out.
        output_count: usize,
    },
    /// External contour tracing.
    Contours {
        /// Number of contours found.
        contour_count: usize,
        /// Total number of points across all contours.
        total_point_count: usize,
        /// Points in the largest contour.
        max_contour_points: usize,
    },
    /// Quadrilateral selection.
    Quad {
        /// Whether a sheet outline was accepted.
        found: bool,
        /// Area of the accepted outline in square pixels.
        area: Option<f64>,
    },
}

/// Diagnostics from one [`detect_lines_with_diagnostics`](crate::detect_lines_with_diagnostics) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineDiagnostics {
    /// Frame size.
    pub dimensions: Dimensions,
    /// Grayscale conversion.
    pub grayscale: StageDiagnostics,
    /// Gaussian blur.
    pub blur: StageDiagnostics,
    /// Adaptive threshold.
    pub threshold: StageDiagnostics,
    /// Canny edge detection.
    pub edge_detection: StageDiagnostics,
    /// Morphological closing.
    pub closing: StageDiagnostics,
    /// Probabilistic Hough transform.
    pub hough: StageDiagnostics,
    /// Segment merging.
    pub merge: StageDiagnostics,
    /// Total duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl LineDiagnostics {
    /// The stages in execution order with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 7] {
        [
            ("Grayscale", &self.grayscale),
            ("Blur", &self.blur),
            ("Threshold", &self.threshold),
            ("Edge Detection", &self.edge_detection),
            ("Closing", &self.closing),
            ("Hough", &self.hough),
            ("Merge", &self.merge),
        ]
    }

    /// Format as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        format_report(
            "Line Detection Report",
            self.dimensions,
            self.total_duration,
            &self.stages(),
        )
    }
}

/// Diagnostics from one [`detect_corners_with_diagnostics`](crate::detect_corners_with_diagnostics) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CornerDiagnostics {
    /// Frame size.
    pub dimensions: Dimensions,
    /// Grayscale conversion.
    pub grayscale: StageDiagnostics,
    /// Gaussian blur.
    pub blur: StageDiagnostics,
    /// Canny edge detection.
    pub edge_detection: StageDiagnostics,
    /// External contour tracing.
    pub contours: StageDiagnostics,
    /// Quadrilateral selection.
    pub quad: StageDiagnostics,
    /// Total duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl CornerDiagnostics {
    /// The stages in execution order with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("Grayscale", &self.grayscale),
            ("Blur", &self.blur),
            ("Edge Detection", &self.edge_detection),
            ("Contours", &self.contours),
            ("Quad", &self.quad),
        ]
    }

    /// Format as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        format_report(
            "Corner Detection Report",
            self.dimensions,
            self.total_duration,
            &self.stages(),
        )
    }
}

fn format_report(
    title: &str,
    dimensions: Dimensions,
    total: Duration,
    stages: &[(&str, &StageDiagnostics)],
) -> String {
    let mut lines = Vec::new();

    lines.push(format!("{title}\n{}", "=".repeat(60)));
    lines.push(format!(
        "Image: {}x{} ({} pixels)",
        dimensions.width,
        dimensions.height,
        dimensions.pixel_count(),
    ));
    lines.push(format!("Total duration: {:.3}ms", duration_ms(total)));
    lines.push(String::new());

    lines.push(format!(
        "{:<24} {:>10} {:>10}  {}",
        "Stage", "Duration", "% Total", "Details"
    ));
    lines.push("-".repeat(80));

    let total_ms = duration_ms(total);
    for (name, diag) in stages {
        let ms = duration_ms(diag.duration);
        let pct = if total_ms > 0.0 {
            ms / total_ms * 100.0
        } else {
            0.0
        };
        let details = format_metrics(&diag.metrics);
        lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
    }

    lines.join("\n")
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Grayscale { width, height } => format!("{width}x{height}"),
        StageMetrics::Blur { kernel, sigma } => format!("kernel={kernel} sigma={sigma:.2}"),
        StageMetrics::Threshold {
            block_size,
            offset,
            foreground_pixel_count,
            total_pixel_count,
        } => format!(
            "block={block_size} C={offset} strokes={foreground_pixel_count} ({:.1}%)",
            percent(*foreground_pixel_count, *total_pixel_count),
        ),
        StageMetrics::EdgeDetection {
            low_threshold,
            high_threshold,
            edge_pixel_count,
            total_pixel_count,
        } => format!(
            "low={low_threshold:.1} high={high_threshold:.1} edges={edge_pixel_count} ({:.1}%)",
            percent(*edge_pixel_count, *total_pixel_count),
        ),
        StageMetrics::Closing {
            iterations,
            foreground_pixel_count,
        } => format!("iterations={iterations} foreground={foreground_pixel_count}"),
        StageMetrics::Hough {
            vote_threshold,
            min_line_length,
            max_line_gap,
            segment_count,
        } => format!(
            "votes>={vote_threshold} len>={min_line_length} gap<={max_line_gap} -> {segment_count} segments",
        ),
        StageMetrics::Merge {
            angle_tolerance_deg,
            distance_tolerance_px,
            input_count,
            cluster_count,
            dropped_degenerate,
            output_count,
        } => format!(
            "angle<={angle_tolerance_deg:.1}deg dist<{distance_tolerance_px:.1}px {input_count}->{output_count} ({cluster_count} clusters, {dropped_degenerate} degenerate)",
        ),
        StageMetrics::Contours {
            contour_count,
            total_point_count,
            max_contour_points,
        } => format!("{contour_count} contours, {total_point_count} pts (max={max_contour_points})"),
        StageMetrics::Quad { found, area } => match area {
            Some(area) if *found => format!("found, area={area:.0}px2"),
            _ => "not found".to_string(),
        },
    }
}

/// Count non-zero pixels in a mask.
pub(crate) fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(u8::from(p.0[0] != 0))).sum()
}

/// Total and largest point counts across contours.
pub(crate) fn contour_point_counts(contours: &[Vec<Point>]) -> (usize, usize) {
    let total = contours.iter().map(Vec::len).sum();
    let max = contours.iter().map(Vec::len).max().unwrap_or(0);
    (total, max)
}
