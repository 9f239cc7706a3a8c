//! Morphological closing to bridge small breaks in edge masks.

use image::GrayImage;
use imageproc::distance_transform::Norm;

/// Close `mask` with a 3x3 square structuring element applied
/// `iterations` times: dilate `iterations` times, then erode as many.
///
/// Repeated 3x3 dilation equals one dilation by a square of radius
/// `iterations`, so this is a single chessboard-norm closing. Zero
/// iterations returns the mask unchanged.
#[must_use = "returns the closed mask"]
pub fn close(mask: &GrayImage, iterations: u8) -> GrayImage {
    if iterations == 0 {
        return mask.clone();
    }
    imageproc::morphology::close(mask, Norm::LInf, iterations)
}
