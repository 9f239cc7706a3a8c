//! Progressive probabilistic Hough transform.
//!
//! Edge pixels are visited in a pseudo-random but reproducible order
//! (SipHash of the pixel coordinates under a fixed seed). Each visited
//! pixel votes in a `(theta, rho)` accumulator with 1 degree and 1 pixel
//! resolution. When a vote reaches the threshold, the line through that
//! pixel is traced across the mask in both directions, bridging gaps of up
//! to `max_line_gap` pixels. Traced pixels are removed from the mask, and
//! if the segment is long enough their votes are withdrawn and the
//! segment is reported.

use std::hash::Hasher;

use image::GrayImage;
use siphasher::sip::SipHasher13;

use crate::config::HoughConfig;
use crate::types::{Point, Segment};

const NUM_ANGLES: usize = 180;
/// Fixed-point fraction bits used while stepping along a line.
const SHIFT: u32 = 16;

/// Detect line segments in a binary mask (non-zero = foreground).
///
/// Endpoints are integer pixel coordinates. A segment is kept when its
/// horizontal or vertical extent reaches `min_line_length`.
#[must_use]
pub fn probabilistic_hough(mask: &GrayImage, config: &HoughConfig) -> Vec<Segment> {
    let (width, height) = mask.dimensions();
    let mut tracer = Tracer::new(mask);
    let mut accumulator = Accumulator::new(width, height);
    let threshold = i64::from(config.vote_threshold);
    let mut segments = Vec::new();

    for (x, y) in visiting_order(mask, config.seed) {
        // Already consumed by an earlier line.
        if !tracer.is_set(x, y) {
            continue;
        }

        let Some(best_angle) = accumulator.vote(x, y, threshold) else {
            continue;
        };

        let step = Step::for_angle(&accumulator.trig[best_angle]);
        let ends = [
            tracer.walk(x, y, step, config.max_line_gap),
            tracer.walk(x, y, step.reversed(), config.max_line_gap),
        ];

        let min_len = i64::from(config.min_line_length);
        let dx = (i64::from(ends[1].0) - i64::from(ends[0].0)).abs();
        let dy = (i64::from(ends[1].1) - i64::from(ends[0].1)).abs();
        let good_line = dx >= min_len || dy >= min_len;

        for (direction, &end) in [step, step.reversed()].into_iter().zip(&ends) {
            for (px, py) in tracer.consume(x, y, direction, end) {
                if good_line {
                    accumulator.unvote(px, py);
                }
            }
        }

        if good_line {
            segments.push(Segment::new(
                Point::new(f64::from(ends[0].0), f64::from(ends[0].1)),
                Point::new(f64::from(ends[1].0), f64::from(ends[1].1)),
            ));
        }
    }

    log::debug!(
        "hough: {}x{} mask, {} segments (threshold {}, min length {}, gap {})",
        width,
        height,
        segments.len(),
        config.vote_threshold,
        config.min_line_length,
        config.max_line_gap,
    );
    segments
}

/// Foreground pixels sorted by a keyed hash of their coordinates.
fn visiting_order(mask: &GrayImage, seed: u64) -> Vec<(u32, u32)> {
    let mut points: Vec<(u32, u32)> = mask
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] != 0)
        .map(|(x, y, _)| (x, y))
        .collect();
    points.sort_by_cached_key(|&(x, y)| {
        let mut hasher = SipHasher13::new_with_keys(seed, 0);
        hasher.write_u32(x);
        hasher.write_u32(y);
        (hasher.finish(), y, x)
    });
    points
}

/// Vote counts indexed by `(angle, rho)`.
struct Accumulator {
    /// `(cos, sin)` for each angle step.
    trig: Vec<(f64, f64)>,
    num_rho: usize,
    rho_offset: i64,
    votes: Vec<i64>,
}

impl Accumulator {
    fn new(width: u32, height: u32) -> Self {
        let num_rho = (width as usize + height as usize) * 2 + 1;
        #[allow(clippy::cast_precision_loss)]
        let trig = (0..NUM_ANGLES)
            .map(|n| {
                let theta = (n as f64).to_radians();
                (theta.cos(), theta.sin())
            })
            .collect();
        Self {
            trig,
            num_rho,
            rho_offset: i64::try_from((num_rho - 1) / 2).unwrap_or(i64::MAX),
            votes: vec![0; NUM_ANGLES * num_rho],
        }
    }

    fn cell(&self, angle: usize, x: u32, y: u32) -> usize {
        let (cos, sin) = self.trig[angle];
        #[allow(clippy::cast_possible_truncation)]
        let rho = f64::from(x).mul_add(cos, f64::from(y) * sin).round() as i64 + self.rho_offset;
        // |rho| never exceeds width + height, so the offset keeps it in range.
        let rho = usize::try_from(rho).unwrap_or(0).min(self.num_rho - 1);
        angle * self.num_rho + rho
    }

    /// Add the pixel's votes; return the first angle whose count is the
    /// largest and at least `threshold`.
    fn vote(&mut self, x: u32, y: u32, threshold: i64) -> Option<usize> {
        let mut best = None;
        let mut best_votes = threshold - 1;
        for angle in 0..NUM_ANGLES {
            let cell = self.cell(angle, x, y);
            self.votes[cell] += 1;
            if self.votes[cell] > best_votes {
                best_votes = self.votes[cell];
                best = Some(angle);
            }
        }
        best
    }

    fn unvote(&mut self, x: u32, y: u32) {
        for angle in 0..NUM_ANGLES {
            let cell = self.cell(angle, x, y);
            self.votes[cell] -= 1;
        }
    }
}

/// Per-pixel advance along a line in fixed point.
///
/// The major axis moves one whole pixel per step; the minor axis moves a
/// fraction scaled by `1 << SHIFT`.
#[derive(Debug, Clone, Copy)]
struct Step {
    x_major: bool,
    dx: i64,
    dy: i64,
}

impl Step {
    /// Step along the line whose normal is at `(cos, sin)`.
    #[allow(clippy::cast_possible_truncation)]
    fn for_angle(&(cos, sin): &(f64, f64)) -> Self {
        let (a, b) = (-sin, cos);
        let unit = f64::from(1u32 << SHIFT);
        if a.abs() > b.abs() {
            Self {
                x_major: true,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * unit / a.abs()).round() as i64,
            }
        } else {
            Self {
                x_major: false,
                dx: (a * unit / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
            }
        }
    }

    const fn reversed(self) -> Self {
        Self {
            x_major: self.x_major,
            dx: -self.dx,
            dy: -self.dy,
        }
    }

    /// Fixed-point start position for pixel `(x, y)`.
    fn origin(self, x: u32, y: u32) -> (i64, i64) {
        let half = 1i64 << (SHIFT - 1);
        if self.x_major {
            (i64::from(x), (i64::from(y) << SHIFT) + half)
        } else {
            ((i64::from(x) << SHIFT) + half, i64::from(y))
        }
    }

    fn pixel(self, (fx, fy): (i64, i64)) -> (i64, i64) {
        if self.x_major {
            (fx, fy >> SHIFT)
        } else {
            (fx >> SHIFT, fy)
        }
    }
}

/// The remaining foreground pixels.
struct Tracer {
    width: u32,
    height: u32,
    set: Vec<bool>,
}

impl Tracer {
    fn new(mask: &GrayImage) -> Self {
        Self {
            width: mask.width(),
            height: mask.height(),
            set: mask.pixels().map(|p| p.0[0] != 0).collect(),
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn is_set(&self, x: u32, y: u32) -> bool {
        self.set[self.index(x, y)]
    }

    fn in_bounds(&self, (px, py): (i64, i64)) -> Option<(u32, u32)> {
        let x = u32::try_from(px).ok()?;
        let y = u32::try_from(py).ok()?;
        (x < self.width && y < self.height).then_some((x, y))
    }

    /// Follow the line from `(x, y)` until the image edge or a run of more
    /// than `max_gap` unset pixels; return the last set pixel.
    fn walk(&self, x: u32, y: u32, step: Step, max_gap: u32) -> (u32, u32) {
        let mut end = (x, y);
        let mut gap = 0u32;
        let mut pos = step.origin(x, y);
        while let Some((px, py)) = self.in_bounds(step.pixel(pos)) {
            if self.is_set(px, py) {
                gap = 0;
                end = (px, py);
            } else {
                gap += 1;
                if gap > max_gap {
                    break;
                }
            }
            pos = (pos.0 + step.dx, pos.1 + step.dy);
        }
        end
    }

    /// Clear set pixels from `(x, y)` up to and including `end`, returning
    /// the cleared pixels.
    fn consume(&mut self, x: u32, y: u32, step: Step, end: (u32, u32)) -> Vec<(u32, u32)> {
        let mut cleared = Vec::new();
        let mut pos = step.origin(x, y);
        while let Some((px, py)) = self.in_bounds(step.pixel(pos)) {
            let idx = self.index(px, py);
            if self.set[idx] {
                self.set[idx] = false;
                cleared.push((px, py));
            }
            if (px, py) == end {
                break;
            }
            pos = (pos.0 + step.dx, pos.1 + step.dy);
        }
        cleared
    }
}
