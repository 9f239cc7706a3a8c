//! Paper-sheet quadrilateral selection from contours.
//!
//! Contours are ranked by enclosed area, each is reduced to a polygon with
//! Ramer-Douglas-Peucker at a tolerance proportional to its perimeter, and
//! the first convex four-vertex polygon that is large enough wins.

use geo::{Area, LineString, Polygon};

use crate::config::CornerConfig;
use crate::contour::closed_arc_length;
use crate::types::{Point, Quad};

/// Area enclosed by a ring of points (shoelace), regardless of winding.
#[must_use]
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let ring: LineString<f64> = points.iter().map(|p| (p.x, p.y)).collect();
    Polygon::new(ring, vec![]).unsigned_area()
}

/// Simplify a closed ring of points.
///
/// The ring is split at two far-apart points (the point farthest from the
/// first point, and the point farthest from that one). Each half is
/// simplified independently, so both split points are always kept and
/// the output follows the input's traversal direction.
#[must_use = "returns the simplified polygon"]
pub fn approximate_closed_polygon(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = farthest_from(points, points[0]);
    let second = farthest_from(points, points[first]);
    let (a, b) = (first.min(second), first.max(second));
    if a == b {
        // Every point coincides.
        return vec![points[a]];
    }

    let forward = &points[a..=b];
    let wrapped: Vec<Point> = points[b..].iter().chain(&points[..=a]).copied().collect();

    let mut polygon = simplify_open(forward, epsilon);
    let mut back = simplify_open(&wrapped, epsilon);
    // Drop the shared split points so each appears once.
    polygon.pop();
    back.pop();
    polygon.append(&mut back);
    polygon
}

/// True when the ring turns the same way at every vertex and no vertex is
/// collinear with its neighbours.
#[must_use]
pub fn is_convex(points: &[Point]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f64;
    for i in 0..n {
        let (p, q, r) = (points[i], points[(i + 1) % n], points[(i + 2) % n]);
        let cross = (q.x - p.x).mul_add(r.y - q.y, -((q.y - p.y) * (r.x - q.x)));
        if cross == 0.0 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Pick the sheet outline from a set of contours.
///
/// Contours are tried largest first. The first one whose approximation
/// has exactly four vertices, is convex, and (if `min_area` is set)
/// encloses more than `min_area` square pixels is returned, with corners
/// in approximation order.
#[must_use]
pub fn find_quad(contours: &[Vec<Point>], config: &CornerConfig) -> Option<Quad> {
    let mut ranked: Vec<(f64, &[Point])> = contours
        .iter()
        .map(|c| (polygon_area(c), c.as_slice()))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (rank, (_, contour)) in ranked.into_iter().enumerate() {
        let epsilon = config.approx_epsilon_factor * closed_arc_length(contour);
        let approx = approximate_closed_polygon(contour, epsilon);
        let Ok(corners) = <[Point; 4]>::try_from(approx.as_slice()) else {
            continue;
        };
        if !is_convex(&corners) {
            continue;
        }
        let area = polygon_area(&corners);
        if config.min_area.is_some_and(|min| area <= min) {
            continue;
        }
        log::debug!("quad: contour #{rank} accepted, area {area:.1}");
        return Some(Quad(corners));
    }

    log::debug!("quad: none of {} contours qualified", contours.len());
    None
}

fn farthest_from(points: &[Point], origin: Point) -> usize {
    points
        .iter()
        .enumerate()
        .fold((0, 0.0), |(best, best_d), (i, p)| {
            let d = p.distance_squared(origin);
            if d > best_d { (i, d) } else { (best, best_d) }
        })
        .0
}

/// Ramer-Douglas-Peucker over an open chain; both endpoints are kept.
fn simplify_open(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;
    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);
    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;
    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Distance from `p` to the line through `a` and `b`, or to `a` when the
/// two coincide.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);
    if length_sq == 0.0 {
        return p.distance(a);
    }
    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
