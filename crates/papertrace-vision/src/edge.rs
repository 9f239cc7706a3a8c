//! Canny edge detection on an already-smoothed grayscale image.
//!
//! Unlike [`imageproc::edges::canny`], no blur is applied here: both
//! pipelines blur with their own kernel first. Gradient magnitude is the
//! L1 norm `|gx| + |gy|` of the 3x3 Sobel responses, and thresholds are
//! compared against that magnitude.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// `tan(22.5 deg)`, the boundary between horizontal and diagonal sectors.
const TAN_22_5: f32 = 0.414_213_56;
/// `tan(67.5 deg)`, the boundary between diagonal and vertical sectors.
const TAN_67_5: f32 = 2.414_213_6;

/// Detect edges, returning a binary mask (255 on edges, 0 elsewhere).
///
/// A pixel survives non-maximum suppression when its magnitude exceeds
/// `low`; it is an edge if it exceeds `high` or connects (8-neighbour) to
/// such a pixel through surviving pixels.
#[must_use = "returns the edge mask"]
pub fn canny(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);

    let magnitude = Magnitude {
        width,
        height,
        values: gx
            .pixels()
            .zip(gy.pixels())
            .map(|(h, v)| i32::from(h.0[0]).abs() + i32::from(v.0[0]).abs())
            .collect(),
    };

    let mut candidates = vec![false; magnitude.values.len()];
    let mut stack = Vec::new();
    let mut out = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            #[allow(clippy::cast_precision_loss)]
            let m = magnitude.at(i64::from(x), i64::from(y)) as f32;
            if m <= low {
                continue;
            }
            let (dx, dy) = (gx.get_pixel(x, y).0[0], gy.get_pixel(x, y).0[0]);
            if !magnitude.is_local_maximum(x, y, dx, dy) {
                continue;
            }
            let idx = magnitude.index(x, y);
            candidates[idx] = true;
            if m > high {
                out.put_pixel(x, y, Luma([255]));
                stack.push((x, y));
            }
        }
    }

    // Hysteresis: grow strong edges through connected candidates.
    while let Some((x, y)) = stack.pop() {
        for (nx, ny) in neighbours(x, y, width, height) {
            let idx = magnitude.index(nx, ny);
            if candidates[idx] && out.get_pixel(nx, ny).0[0] == 0 {
                out.put_pixel(nx, ny, Luma([255]));
                stack.push((nx, ny));
            }
        }
    }

    out
}

/// Row-major gradient magnitudes; reads outside the image are zero.
struct Magnitude {
    width: u32,
    height: u32,
    values: Vec<i32>,
}

impl Magnitude {
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn at(&self, x: i64, y: i64) -> i32 {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return 0;
        };
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.values[self.index(x, y)]
    }

    /// Compare against the two neighbours across the gradient direction,
    /// quantized to one of four sectors. Ties resolve toward the earlier
    /// pixel in scan order so a two-pixel-wide ridge thins to one.
    fn is_local_maximum(&self, x: u32, y: u32, gx: i16, gy: i16) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        let m = self.at(x, y);
        let ax = f32::from(gx.unsigned_abs());
        let ay = f32::from(gy.unsigned_abs());

        if ay < ax * TAN_22_5 {
            m > self.at(x - 1, y) && m >= self.at(x + 1, y)
        } else if ay > ax * TAN_67_5 {
            m > self.at(x, y - 1) && m >= self.at(x, y + 1)
        } else {
            let s = if (gx < 0) == (gy < 0) { 1 } else { -1 };
            m > self.at(x - s, y - 1) && m > self.at(x + s, y + 1)
        }
    }
}

fn neighbours(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    (-1i64..=1)
        .flat_map(|dy| (-1i64..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| {
            let nx = u32::try_from(i64::from(x) + dx).ok()?;
            let ny = u32::try_from(i64::from(y) + dy).ok()?;
            (nx < width && ny < height).then_some((nx, ny))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_step(width: u32, height: u32, at: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            if x < at { Luma([0]) } else { Luma([255]) }
        })
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let img = GrayImage::from_pixel(16, 16, Luma([90]));
        let edges = canny(&img, 50.0, 150.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn step_edge_thins_to_single_column() {
        let edges = canny(&vertical_step(20, 20, 10), 50.0, 150.0);
        for y in 0..20 {
            for x in 0..20 {
                let expected = if x == 9 { 255 } else { 0 };
                assert_eq!(
                    edges.get_pixel(x, y).0[0],
                    expected,
                    "unexpected value at ({x},{y})"
                );
            }
        }
    }

    #[test]
    fn horizontal_step_edge_detected() {
        let img = GrayImage::from_fn(20, 20, |_, y| if y < 8 { Luma([0]) } else { Luma([255]) });
        let edges = canny(&img, 50.0, 150.0);
        assert!((0..20).all(|x| edges.get_pixel(x, 7).0[0] == 255));
        assert_eq!(edges.pixels().filter(|p| p.0[0] == 255).count(), 20);
    }

    #[test]
    fn weak_edge_below_high_threshold_dropped() {
        // Step of 20 levels: Sobel magnitude 80, under a high threshold of 150.
        let img = GrayImage::from_fn(16, 16, |x, _| if x < 8 { Luma([100]) } else { Luma([120]) });
        let edges = canny(&img, 50.0, 150.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn weak_pixels_connected_to_strong_are_kept() {
        // Left half of the boundary is strong, right half weak.
        let img = GrayImage::from_fn(20, 20, |x, y| match (y < 10, x < 10) {
            (true, _) => Luma([100]),
            (false, true) => Luma([255]),
            (false, false) => Luma([120]),
        });
        let edges = canny(&img, 30.0, 300.0);
        // The weak run along y = 9 survives because it touches the strong run.
        assert_eq!(edges.get_pixel(15, 9).0[0], 255);
        assert_eq!(edges.get_pixel(2, 9).0[0], 255);
    }

    #[test]
    fn tiny_images_do_not_panic() {
        for (w, h) in [(1, 1), (1, 5), (2, 2), (3, 1)] {
            let img = GrayImage::from_fn(w, h, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
            let edges = canny(&img, 50.0, 150.0);
            assert_eq!(edges.dimensions(), (w, h));
        }
    }

    #[test]
    fn neighbours_clipped_at_corner() {
        let n: Vec<_> = neighbours(0, 0, 5, 5).collect();
        assert_eq!(n.len(), 3);
        assert!(n.contains(&(1, 1)));
    }
}
