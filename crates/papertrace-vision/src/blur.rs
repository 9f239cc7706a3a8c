//! Gaussian smoothing ahead of thresholding and edge detection.
//!
//! Callers configure blur by odd kernel size (the way camera-side tuning
//! is usually expressed). [`sigma_for_kernel`] maps that size to the
//! standard deviation `imageproc` expects.

use image::GrayImage;

/// Standard deviation of the Gaussian implied by an odd kernel size `k`:
/// `0.3 * ((k - 1) / 2 - 1) + 0.8`.
///
/// Returns `0.0` for `k <= 1`, meaning "no blur".
#[must_use]
pub fn sigma_for_kernel(kernel: u32) -> f32 {
    if kernel <= 1 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let k = kernel as f32;
    0.3f32.mul_add((k - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Blur a grayscale image with the Gaussian for an odd `kernel` size.
///
/// Kernel sizes of 0 or 1 return the image unchanged.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, kernel: u32) -> GrayImage {
    let sigma = sigma_for_kernel(kernel);
    // imageproc panics on sigma <= 0.
    if sigma <= 0.0 {
        return image.clone();
    }
    imageproc::filter::gaussian_blur_f32(image, sigma)
}
