//! Frame ingestion: validated RGBA pixel buffers and grayscale conversion.
//!
//! Camera frames arrive as tightly packed RGBA8 bytes with explicit
//! dimensions. [`Frame`] checks that shape once, up front, so the
//! detectors never see a malformed buffer.

use image::{DynamicImage, GrayImage, ImageBuffer, Rgba, RgbaImage};

use crate::types::{DetectError, Dimensions};

/// Bytes per RGBA8 pixel.
pub const CHANNELS: usize = 4;

/// A borrowed RGBA8 frame: row-major, no row padding.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    data: &'a [u8],
    dimensions: Dimensions,
}

impl<'a> Frame<'a> {
    /// Wrap a pixel buffer after checking its shape.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::EmptyFrame`] if `data` is empty,
    /// [`DetectError::InvalidDimensions`] if either dimension is zero, and
    /// [`DetectError::BufferSizeMismatch`] if `data.len()` is not
    /// `width * height * 4`.
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, DetectError> {
        if data.is_empty() {
            return Err(DetectError::EmptyFrame);
        }
        if width == 0 || height == 0 {
            return Err(DetectError::InvalidDimensions { width, height });
        }
        let expected = usize::try_from(width)
            .ok()
            .zip(usize::try_from(height).ok())
            .and_then(|(w, h)| w.checked_mul(h))
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or(DetectError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(DetectError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            dimensions: Dimensions { width, height },
        })
    }

    /// Borrow an owned RGBA image as a frame.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidDimensions`] for a zero-sized image.
    pub fn from_image(image: &'a RgbaImage) -> Result<Self, DetectError> {
        Self::new(image.as_raw(), image.width(), image.height())
    }

    /// Frame dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// The raw RGBA bytes.
    #[must_use]
    pub const fn data(&self) -> &[u8] {
        self.data
    }

    /// Convert to single-channel luminance.
    ///
    /// Uses the `image` crate's Rec. 709 luma weights; alpha is ignored.
    #[must_use = "returns the grayscale image"]
    pub fn to_grayscale(&self) -> GrayImage {
        let Dimensions { width, height } = self.dimensions;
        ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(width, height, self.data).map_or_else(
            // Unreachable for a validated frame; fall back to an empty mask.
            || GrayImage::new(width, height),
            |view| image::imageops::grayscale(&view),
        )
    }
}

/// Decode an encoded image (PNG, JPEG, BMP, WebP) into an owned RGBA
/// buffer suitable for [`Frame::from_image`].
///
/// # Errors
///
/// Returns [`DetectError::EmptyFrame`] if `bytes` is empty and
/// [`DetectError::ImageDecode`] if the format is unrecognized or the
/// data is corrupt.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, DetectError> {
    if bytes.is_empty() {
        return Err(DetectError::EmptyFrame);
    }
    let image: DynamicImage = image::load_from_memory(bytes)?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_buffer_rejected() {
        assert!(matches!(Frame::new(&[], 2, 2), Err(DetectError::EmptyFrame)));
    }

    #[test]
    fn zero_dimension_rejected() {
        let data = [0u8; 16];
        assert!(matches!(
            Frame::new(&data, 0, 4),
            Err(DetectError::InvalidDimensions {
                width: 0,
                height: 4
            })
        ));
        assert!(matches!(
            Frame::new(&data, 4, 0),
            Err(DetectError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn length_mismatch_rejected() {
        let data = [0u8; 15];
        assert!(matches!(
            Frame::new(&data, 2, 2),
            Err(DetectError::BufferSizeMismatch {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn valid_frame_reports_dimensions() {
        let data = [0u8; 3 * 5 * 4];
        let frame = Frame::new(&data, 3, 5).unwrap();
        assert_eq!(
            frame.dimensions(),
            Dimensions {
                width: 3,
                height: 5
            }
        );
        assert_eq!(frame.data().len(), 60);
    }

    #[test]
    fn grayscale_preserves_dimensions_and_white() {
        let img = RgbaImage::from_pixel(7, 3, Rgba([255, 255, 255, 255]));
        let gray = Frame::from_image(&img).unwrap().to_grayscale();
        assert_eq!(gray.dimensions(), (7, 3));
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn grayscale_weights_green_highest() {
        let img = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([255, 0, 0, 255]),
            1 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        let gray = Frame::from_image(&img).unwrap().to_grayscale();
        let (r, g, b) = (
            gray.get_pixel(0, 0).0[0],
            gray.get_pixel(1, 0).0[0],
            gray.get_pixel(2, 0).0[0],
        );
        assert!(g > r && r > b, "expected green > red > blue, got {r} {g} {b}");
    }

    #[test]
    fn decode_empty_rejected() {
        assert!(matches!(decode_rgba(&[]), Err(DetectError::EmptyFrame)));
    }

    #[test]
    fn decode_corrupt_rejected() {
        assert!(matches!(
            decode_rgba(&[0xFF, 0x00, 0x12]),
            Err(DetectError::ImageDecode(_))
        ));
    }

    #[test]
    fn decode_png_round_trips_pixels() {
        let img = RgbaImage::from_fn(4, 2, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 40 + y * 7) as u8;
            Rgba([v, v, v, 255])
        });
        let decoded = decode_rgba(&encode_png(&img)).unwrap();
        assert_eq!(decoded, img);
    }
}
