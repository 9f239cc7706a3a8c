//! Local-mean adaptive thresholding.
//!
//! Pencil strokes on paper are darker than their neighborhood, but the
//! absolute brightness of "dark" varies across a hand-held camera frame.
//! Comparing each pixel against the mean of its own block keeps strokes
//! and discards shading gradients.

use image::{GrayImage, Luma};

use crate::config::ThresholdConfig;

/// Inverted mean-C threshold: a pixel becomes 255 when it is at least
/// `offset` darker than the mean of the `block_size x block_size` window
/// centred on it, and 0 otherwise.
///
/// Window borders replicate edge pixels. The output is a binary mask with
/// the input's dimensions, where dark strokes are foreground.
#[must_use = "returns the binary mask"]
pub fn adaptive_threshold_inv(image: &GrayImage, config: &ThresholdConfig) -> GrayImage {
    let radius = config.block_size / 2;
    let mean = imageproc::filter::box_filter(image, radius, radius);
    let offset = i32::from(config.offset);

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let src = i32::from(image.get_pixel(x, y).0[0]);
        let local = i32::from(mean.get_pixel(x, y).0[0]);
        if src <= local - offset {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
