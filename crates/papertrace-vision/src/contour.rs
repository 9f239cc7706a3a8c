//! Outer contour extraction from an edge mask.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour};

use crate::types::Point;

/// Trace the outermost borders in a binary mask (non-zero = foreground).
///
/// Only outer borders without a parent are returned: holes, and anything
/// nested inside another shape, are skipped. Each contour is the ordered
/// ring of border pixels, not closed explicitly (the last point does not
/// repeat the first).
#[must_use]
pub fn external_contours(mask: &GrayImage) -> Vec<Vec<Point>> {
    let contours: Vec<Contour<i32>> = imageproc::contours::find_contours(mask);
    let external: Vec<Vec<Point>> = contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect()
        })
        .collect();
    log::debug!("contours: {} external", external.len());
    external
}

/// Total length of a closed ring, including the edge from the last point
/// back to the first.
#[must_use]
pub fn closed_arc_length(points: &[Point]) -> f64 {
    match points {
        [] | [_] => 0.0,
        [first, .., last] => {
            let open: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
            open + last.distance(*first)
        }
    }
}
