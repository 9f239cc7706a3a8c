//! Straight-line detection: pencil strokes to merged segments.
//!
//! Stages, in order: grayscale, Gaussian blur, inverted adaptive
//! threshold, Canny, morphological closing, probabilistic Hough, and
//! fragment merging.

use serde::{Deserialize, Serialize};

use crate::config::LineConfig;
use crate::diagnostics::{
    Clock, LineDiagnostics, NullClock, StageDiagnostics, StageMetrics, count_foreground, timed,
};
use crate::frame::Frame;
use crate::types::{DetectError, Segment};

/// Result of [`detect_lines`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDetection {
    /// Segments as reported by the Hough transform, before merging.
    pub raw_segments: Vec<Segment>,
    /// One segment per line, in cluster order.
    pub merged: Vec<Segment>,
}

/// Detect straight lines in a frame.
///
/// # Errors
///
/// Returns [`DetectError::InvalidConfig`] if `config` fails validation.
/// Finding no lines is not an error.
pub fn detect_lines(frame: &Frame<'_>, config: &LineConfig) -> Result<LineDetection, DetectError> {
    detect_lines_with_diagnostics(frame, config, &NullClock).map(|(detection, _)| detection)
}

/// [`detect_lines`], timing each stage with `clock`.
///
/// # Errors
///
/// Returns [`DetectError::InvalidConfig`] if `config` fails validation.
pub fn detect_lines_with_diagnostics<C: Clock>(
    frame: &Frame<'_>,
    config: &LineConfig,
    clock: &C,
) -> Result<(LineDetection, LineDiagnostics), DetectError> {
    config.validate()?;
    let run_start = clock.now();
    let dimensions = frame.dimensions();
    let total_pixel_count = dimensions.pixel_count();

    let (gray, duration) = timed(clock, || frame.to_grayscale());
    let grayscale = StageDiagnostics {
        duration,
        metrics: StageMetrics::Grayscale {
            width: dimensions.width,
            height: dimensions.height,
        },
    };

    let (blurred, duration) = timed(clock, || crate::blur::gaussian_blur(&gray, config.blur_kernel));
    let blur = StageDiagnostics {
        duration,
        metrics: StageMetrics::Blur {
            kernel: config.blur_kernel,
            sigma: crate::blur::sigma_for_kernel(config.blur_kernel),
        },
    };

    let (strokes, duration) = timed(clock, || {
        crate::threshold::adaptive_threshold_inv(&blurred, &config.threshold)
    });
    let threshold = StageDiagnostics {
        duration,
        metrics: StageMetrics::Threshold {
            block_size: config.threshold.block_size,
            offset: config.threshold.offset,
            foreground_pixel_count: count_foreground(&strokes),
            total_pixel_count,
        },
    };

    let (edges, duration) = timed(clock, || {
        crate::edge::canny(&strokes, config.canny_low, config.canny_high)
    });
    let edge_detection = StageDiagnostics {
        duration,
        metrics: StageMetrics::EdgeDetection {
            low_threshold: config.canny_low,
            high_threshold: config.canny_high,
            edge_pixel_count: count_foreground(&edges),
            total_pixel_count,
        },
    };

    let (closed, duration) = timed(clock, || {
        crate::morphology::close(&edges, config.close_iterations)
    });
    let closing = StageDiagnostics {
        duration,
        metrics: StageMetrics::Closing {
            iterations: config.close_iterations,
            foreground_pixel_count: count_foreground(&closed),
        },
    };

    let (raw_segments, duration) = timed(clock, || {
        crate::hough::probabilistic_hough(&closed, &config.hough)
    });
    let hough = StageDiagnostics {
        duration,
        metrics: StageMetrics::Hough {
            vote_threshold: config.hough.vote_threshold,
            min_line_length: config.hough.min_line_length,
            max_line_gap: config.hough.max_line_gap,
            segment_count: raw_segments.len(),
        },
    };

    let ((merged, stats), duration) = timed(clock, || {
        crate::merge::merge_segments_with_stats(&raw_segments, &config.merge)
    });
    let merge = StageDiagnostics {
        duration,
        metrics: StageMetrics::Merge {
            angle_tolerance_deg: config.merge.angle_tolerance_deg,
            distance_tolerance_px: config.merge.distance_tolerance_px,
            input_count: stats.input_count,
            cluster_count: stats.cluster_count,
            dropped_degenerate: stats.dropped_degenerate,
            output_count: stats.output_count,
        },
    };

    log::debug!(
        "lines: {}x{} frame, {} raw -> {} merged",
        dimensions.width,
        dimensions.height,
        raw_segments.len(),
        merged.len(),
    );

    let diagnostics = LineDiagnostics {
        dimensions,
        grayscale,
        blur,
        threshold,
        edge_detection,
        closing,
        hough,
        merge,
        total_duration: clock.elapsed(&run_start),
    };

    Ok((
        LineDetection {
            raw_segments,
            merged,
        },
        diagnostics,
    ))
}
