//! Sheet corner detection: the paper outline as a convex quadrilateral.
//!
//! Stages, in order: grayscale, Gaussian blur, Canny, external contour
//! tracing, and quad selection.

use crate::config::CornerConfig;
use crate::diagnostics::{
    Clock, CornerDiagnostics, NullClock, StageDiagnostics, StageMetrics, contour_point_counts,
    count_foreground, timed,
};
use crate::frame::Frame;
use crate::types::{DetectError, Quad};

/// Find the four corners of the largest convex quadrilateral outline.
///
/// Returns `Ok(None)` when no contour qualifies.
///
/// # Errors
///
/// Returns [`DetectError::InvalidConfig`] if `config` fails validation.
pub fn detect_corners(frame: &Frame<'_>, config: &CornerConfig) -> Result<Option<Quad>, DetectError> {
    detect_corners_with_diagnostics(frame, config, &NullClock).map(|(quad, _)| quad)
}

/// [`detect_corners`], timing each stage with `clock`.
///
/// # Errors
///
/// Returns [`DetectError::InvalidConfig`] if `config` fails validation.
pub fn detect_corners_with_diagnostics<C: Clock>(
    frame: &Frame<'_>,
    config: &CornerConfig,
    clock: &C,
) -> Result<(Option<Quad>, CornerDiagnostics), DetectError> {
    config.validate()?;
    let run_start = clock.now();
    let dimensions = frame.dimensions();

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

    let (edges, duration) = timed(clock, || {
        crate::edge::canny(&blurred, config.canny_low, config.canny_high)
    });
    let edge_detection = StageDiagnostics {
        duration,
        metrics: StageMetrics::EdgeDetection {
            low_threshold: config.canny_low,
            high_threshold: config.canny_high,
            edge_pixel_count: count_foreground(&edges),
            total_pixel_count: dimensions.pixel_count(),
        },
    };

    let (outlines, duration) = timed(clock, || crate::contour::external_contours(&edges));
    let (total_point_count, max_contour_points) = contour_point_counts(&outlines);
    let contours = StageDiagnostics {
        duration,
        metrics: StageMetrics::Contours {
            contour_count: outlines.len(),
            total_point_count,
            max_contour_points,
        },
    };

    let (found, duration) = timed(clock, || crate::quad::find_quad(&outlines, config));
    let quad = StageDiagnostics {
        duration,
        metrics: StageMetrics::Quad {
            found: found.is_some(),
            area: found.as_ref().map(Quad::area),
        },
    };

    log::debug!(
        "corners: {}x{} frame, {} contours, quad {}",
        dimensions.width,
        dimensions.height,
        outlines.len(),
        if found.is_some() { "found" } else { "not found" },
    );

    let diagnostics = CornerDiagnostics {
        dimensions,
        grayscale,
        blur,
        edge_detection,
        contours,
        quad,
        total_duration: clock.elapsed(&run_start),
    };

    Ok((found, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{Rgba, RgbaImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    use super::*;

    fn sheet_on_table(rect: Rect) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(240, 200, Rgba([20, 20, 20, 255]));
        draw_filled_rect_mut(&mut img, rect, Rgba([240, 240, 240, 255]));
        img
    }

    #[test]
    fn uniform_frame_has_no_sheet() {
        let img = RgbaImage::from_pixel(100, 100, Rgba([128, 128, 128, 255]));
        let frame = Frame::from_image(&img).unwrap();
        assert_eq!(detect_corners(&frame, &CornerConfig::default()).unwrap(), None);
    }

    #[test]
    fn bright_rectangle_found() {
        let img = sheet_on_table(Rect::at(40, 30).of_size(150, 120));
        let frame = Frame::from_image(&img).unwrap();
        let quad = detect_corners(&frame, &CornerConfig::default())
            .unwrap()
            .unwrap();
        let area = quad.area();
        assert!(
            (area - 18_000.0).abs() / 18_000.0 < 0.05,
            "area {area} far from 18000"
        );
    }

    #[test]
    fn small_rectangle_rejected_by_area_floor() {
        let img = sheet_on_table(Rect::at(40, 30).of_size(60, 60));
        let frame = Frame::from_image(&img).unwrap();
        assert_eq!(detect_corners(&frame, &CornerConfig::default()).unwrap(), None);

        let no_floor = CornerConfig {
            min_area: None,
            ..CornerConfig::default()
        };
        assert!(detect_corners(&frame, &no_floor).unwrap().is_some());
    }

    #[test]
    fn diagnostics_report_quad_area() {
        let img = sheet_on_table(Rect::at(40, 30).of_size(150, 120));
        let frame = Frame::from_image(&img).unwrap();
        let (quad, diag) =
            detect_corners_with_diagnostics(&frame, &CornerConfig::default(), &NullClock).unwrap();
        assert!(quad.is_some());
        assert!(matches!(
            diag.quad.metrics,
            StageMetrics::Quad {
                found: true,
                area: Some(_)
            }
        ));
        assert!(matches!(
            diag.contours.metrics,
            StageMetrics::Contours { contour_count, .. } if contour_count >= 1
        ));
    }
}
