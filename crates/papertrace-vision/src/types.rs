//! Shared geometry and error types for paper and line detection.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate masks without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so callers can hold decoded frames without
/// depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// The point reached by moving `t` units along `direction`.
    #[must_use]
    pub fn offset(self, direction: (f64, f64), t: f64) -> Self {
        Self::new(t.mul_add(direction.0, self.x), t.mul_add(direction.1, self.y))
    }
}

/// A straight line fragment between two endpoints.
///
/// Endpoint order is kept as given but carries no meaning for
/// comparisons: a segment and its reverse describe the same line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint.
    pub start: Point,
    /// Second endpoint.
    pub end: Point,
}

impl Segment {
    /// Create a segment from two endpoints.
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Create a segment from `(x1, y1, x2, y2)` coordinates.
    #[must_use]
    pub const fn from_coords(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(Point::new(x1, y1), Point::new(x2, y2))
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Whether both endpoints coincide.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// The same segment with its endpoints swapped.
    #[must_use]
    pub const fn reversed(&self) -> Self {
        Self::new(self.end, self.start)
    }

    /// Orientation of the vector `start -> end` in degrees, in `(-180, 180]`.
    #[must_use]
    pub fn angle_degrees(&self) -> f64 {
        let degrees = (self.end.y - self.start.y)
            .atan2(self.end.x - self.start.x)
            .to_degrees();
        if degrees <= -180.0 {
            degrees + 360.0
        } else {
            degrees
        }
    }

    /// Perpendicular distance from `p` to the infinite line through this
    /// segment.
    ///
    /// A degenerate segment defines no line, so every point is infinitely
    /// far from it.
    #[must_use]
    pub fn line_distance(&self, p: Point) -> f64 {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        let length = dx.hypot(dy);
        if length == 0.0 {
            return f64::INFINITY;
        }
        let cross = dx.mul_add(p.y - self.start.y, -(dy * (p.x - self.start.x)));
        cross.abs() / length
    }

    /// Unit vector along `start -> end`, or `None` for a degenerate segment.
    #[must_use]
    pub fn unit_direction(&self) -> Option<(f64, f64)> {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        let length = dx.hypot(dy);
        (length > 0.0).then(|| (dx / length, dy / length))
    }

    /// The segment as `[x1, y1, x2, y2]` in single precision.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            self.start.x as f32,
            self.start.y as f32,
            self.end.x as f32,
            self.end.y as f32,
        ]
    }
}

/// The four corners of a detected sheet.
///
/// Corners are in the order the polygon approximation produced them.
/// Neither winding direction nor starting corner is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    /// The corner points.
    #[must_use]
    pub const fn corners(&self) -> &[Point; 4] {
        &self.0
    }

    /// Enclosed area (shoelace formula), independent of winding.
    #[must_use]
    pub fn area(&self) -> f64 {
        crate::quad::polygon_area(&self.0)
    }

    /// The corners as `[x0, y0, x1, y1, x2, y2, x3, y3]` in single precision.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_f32_array(&self) -> [f32; 8] {
        let mut out = [0.0; 8];
        for (chunk, corner) in out.chunks_exact_mut(2).zip(&self.0) {
            chunk[0] = corner.x as f32;
            chunk[1] = corner.y as f32;
        }
        out
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count.
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Errors raised before or during detection.
///
/// Finding nothing is not an error: detection reports that through
/// `Ok(None)`, `Ok(false)`, or a zero count. These variants cover inputs
/// the detectors refuse to process.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// The pixel buffer was empty.
    #[error("frame pixel buffer is empty")]
    EmptyFrame,

    /// Width or height was zero.
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions {
        /// Supplied width.
        width: u32,
        /// Supplied height.
        height: u32,
    },

    /// The pixel buffer length does not match `width * height * 4`.
    #[error("frame buffer holds {actual} bytes, expected {expected} for RGBA")]
    BufferSizeMismatch {
        /// Byte count implied by the dimensions.
        expected: usize,
        /// Byte count supplied.
        actual: usize,
    },

    /// A caller-provided output buffer cannot hold the requested results.
    #[error("output buffer holds {actual} floats, at least {required} required")]
    OutputBufferTooSmall {
        /// Minimum float count.
        required: usize,
        /// Float count supplied.
        actual: usize,
    },

    /// Failed to decode an encoded image file.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Detector configuration is invalid.
    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),
}

/// Serde-compatible proxy for `DetectError`.
///
/// The `ImageDecode` variant stores its `Display` string since the typed
/// `image::ImageError` cannot be reconstructed.
#[derive(Serialize, Deserialize)]
enum DetectErrorProxy {
    EmptyFrame,
    InvalidDimensions { width: u32, height: u32 },
    BufferSizeMismatch { expected: usize, actual: usize },
    OutputBufferTooSmall { required: usize, actual: usize },
    ImageDecode(String),
    InvalidConfig(String),
}

impl Serialize for DetectError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::EmptyFrame => DetectErrorProxy::EmptyFrame,
            Self::InvalidDimensions { width, height } => DetectErrorProxy::InvalidDimensions {
                width: *width,
                height: *height,
            },
            Self::BufferSizeMismatch { expected, actual } => DetectErrorProxy::BufferSizeMismatch {
                expected: *expected,
                actual: *actual,
            },
            Self::OutputBufferTooSmall { required, actual } => {
                DetectErrorProxy::OutputBufferTooSmall {
                    required: *required,
                    actual: *actual,
                }
            }
            Self::ImageDecode(e) => DetectErrorProxy::ImageDecode(e.to_string()),
            Self::InvalidConfig(s) => DetectErrorProxy::InvalidConfig(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DetectError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = DetectErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            DetectErrorProxy::EmptyFrame => Self::EmptyFrame,
            DetectErrorProxy::InvalidDimensions { width, height } => {
                Self::InvalidDimensions { width, height }
            }
            DetectErrorProxy::BufferSizeMismatch { expected, actual } => {
                Self::BufferSizeMismatch { expected, actual }
            }
            DetectErrorProxy::OutputBufferTooSmall { required, actual } => {
                Self::OutputBufferTooSmall { required, actual }
            }
            // The typed decode error is gone; keep its message.
            DetectErrorProxy::ImageDecode(msg) => {
                Self::InvalidConfig(format!("image decode error: {msg}"))
            }
            DetectErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point tests ---

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_offset_moves_along_direction() {
        let p = Point::new(1.0, 1.0).offset((0.6, 0.8), 5.0);
        assert!((p.x - 4.0).abs() < 1e-12);
        assert!((p.y - 5.0).abs() < 1e-12);
    }

    // --- Segment tests ---

    #[test]
    fn angle_of_axis_aligned_segments() {
        assert!(Segment::from_coords(0.0, 0.0, 10.0, 0.0).angle_degrees().abs() < 1e-12);
        assert!((Segment::from_coords(0.0, 0.0, 0.0, 10.0).angle_degrees() - 90.0).abs() < 1e-12);
        assert!(
            (Segment::from_coords(0.0, 0.0, 0.0, -10.0).angle_degrees() + 90.0).abs() < 1e-12
        );
    }

    #[test]
    fn angle_range_excludes_minus_180() {
        // atan2(-0.0, -10.0) is -pi; the reported range is (-180, 180].
        let seg = Segment::from_coords(0.0, 0.0, -10.0, -0.0);
        assert!((seg.angle_degrees() - 180.0).abs() < 1e-12);
        let seg = Segment::from_coords(10.0, 0.0, 0.0, 0.0);
        assert!((seg.angle_degrees() - 180.0).abs() < 1e-12);
    }

    #[test]
    fn line_distance_uses_infinite_line() {
        let seg = Segment::from_coords(0.0, 0.0, 10.0, 0.0);
        // Far beyond the segment's own extent, still measured to the line.
        assert!((seg.line_distance(Point::new(500.0, 3.0)) - 3.0).abs() < 1e-12);
        assert!((seg.line_distance(Point::new(-50.0, -4.0)) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn line_distance_diagonal() {
        let seg = Segment::from_coords(0.0, 0.0, 4.0, 2.0);
        let d = seg.line_distance(Point::new(2.0, -1.0));
        let expected = 8.0 / 20.0_f64.sqrt();
        assert!((d - expected).abs() < 1e-10, "got {d}, expected {expected}");
    }

    #[test]
    fn degenerate_segment_is_infinitely_far() {
        let seg = Segment::from_coords(5.0, 5.0, 5.0, 5.0);
        assert!(seg.is_degenerate());
        assert!(seg.line_distance(Point::new(5.0, 5.0)).is_infinite());
        assert!(seg.unit_direction().is_none());
    }

    #[test]
    fn reversed_swaps_endpoints() {
        let seg = Segment::from_coords(1.0, 2.0, 3.0, 4.0);
        let rev = seg.reversed();
        assert_eq!(rev.start, seg.end);
        assert_eq!(rev.end, seg.start);
        assert!((seg.length() - rev.length()).abs() < f64::EPSILON);
    }

    #[test]
    fn segment_f32_layout() {
        let seg = Segment::from_coords(1.0, 2.0, 3.0, 4.0);
        assert_eq!(seg.to_f32_array(), [1.0, 2.0, 3.0, 4.0]);
    }

    // --- Quad tests ---

    #[test]
    fn quad_area_and_layout() {
        let quad = Quad([
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(0.0, 5.0),
        ]);
        assert!((quad.area() - 50.0).abs() < 1e-9);
        assert_eq!(
            quad.to_f32_array(),
            [0.0, 0.0, 10.0, 0.0, 10.0, 5.0, 0.0, 5.0]
        );
    }

    // --- DetectError tests ---

    #[test]
    fn error_display() {
        assert_eq!(
            DetectError::InvalidDimensions {
                width: 0,
                height: 4
            }
            .to_string(),
            "invalid frame dimensions 0x4",
        );
        assert_eq!(
            DetectError::BufferSizeMismatch {
                expected: 16,
                actual: 12
            }
            .to_string(),
            "frame buffer holds 12 bytes, expected 16 for RGBA",
        );
    }

    #[test]
    fn error_serde_round_trip() {
        let err = DetectError::OutputBufferTooSmall {
            required: 8,
            actual: 4,
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: DetectError = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            back,
            DetectError::OutputBufferTooSmall {
                required: 8,
                actual: 4
            }
        ));
    }
}
