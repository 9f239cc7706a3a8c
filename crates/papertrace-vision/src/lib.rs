//! papertrace-vision: sheet corners and straight lines in camera frames
//! (sans-IO).
//!
//! Two detectors drive an AR tracing overlay:
//!
//! - **corners**: grayscale -> blur -> Canny -> external contours ->
//!   largest convex quadrilateral;
//! - **lines**: grayscale -> blur -> adaptive threshold -> Canny ->
//!   closing -> probabilistic Hough -> fragment merging.
//!
//! Frames are raw RGBA8 buffers with explicit dimensions. The crate does
//! no I/O and installs no logger; stage progress goes to the `log` facade
//! at debug level.
//!
//! The typed entry points are [`detect_corners`] and [`detect_lines`].
//! [`find_paper_corners`] and [`find_lines`] wrap them for callers that
//! pass flat buffers in and want flat `f32` buffers back.

pub mod blur;
pub mod config;
pub mod contour;
pub mod corners;
pub mod diagnostics;
pub mod edge;
pub mod export;
pub mod frame;
pub mod hough;
pub mod lines;
pub mod merge;
pub mod morphology;
pub mod quad;
pub mod threshold;
pub mod types;

pub use config::{
    CornerConfig, DetectorConfig, HoughConfig, LineConfig, MergeConfig, ThresholdConfig,
};
pub use corners::{detect_corners, detect_corners_with_diagnostics};
pub use export::LineExport;
pub use frame::{Frame, decode_rgba};
pub use lines::{LineDetection, detect_lines, detect_lines_with_diagnostics};
pub use merge::{MergeStats, merge_segments, merge_segments_with_stats};
pub use types::{DetectError, Dimensions, Point, Quad, Segment};

/// Locate the paper sheet in an RGBA frame using the default
/// [`CornerConfig`].
///
/// On success writes the four corners as `x0, y0, ..., x3, y3` into
/// `out[..8]` and returns `true`. Returns `false`, leaving `out`
/// untouched, when no sheet is found.
///
/// # Errors
///
/// Frame shape errors ([`DetectError::EmptyFrame`],
/// [`DetectError::InvalidDimensions`], [`DetectError::BufferSizeMismatch`])
/// and [`DetectError::OutputBufferTooSmall`] when `out.len() < 8`. All
/// are reported before any processing starts.
pub fn find_paper_corners(
    data: &[u8],
    width: u32,
    height: u32,
    out: &mut [f32],
) -> Result<bool, DetectError> {
    find_paper_corners_with_config(data, width, height, out, &CornerConfig::default())
}

/// [`find_paper_corners`] with explicit tuning.
///
/// # Errors
///
/// As [`find_paper_corners`], plus [`DetectError::InvalidConfig`].
pub fn find_paper_corners_with_config(
    data: &[u8],
    width: u32,
    height: u32,
    out: &mut [f32],
    config: &CornerConfig,
) -> Result<bool, DetectError> {
    let frame = Frame::new(data, width, height)?;
    export::check_quad_capacity(out.len())?;

    match detect_corners(&frame, config)? {
        Some(quad) => {
            export::write_quad(&quad, out)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Detect merged straight lines in an RGBA frame using the default
/// [`LineConfig`].
///
/// Writes up to `max_lines` segments as `x1, y1, x2, y2` groups into
/// `out`, in cluster order, and silently drops the rest. The returned
/// [`LineExport`] carries both the written and the detected count.
///
/// # Errors
///
/// Frame shape errors and [`DetectError::OutputBufferTooSmall`] when
/// `out.len() < max_lines * 4`, all reported before processing.
pub fn find_lines(
    data: &[u8],
    width: u32,
    height: u32,
    out: &mut [f32],
    max_lines: usize,
) -> Result<LineExport, DetectError> {
    find_lines_with_config(data, width, height, out, max_lines, &LineConfig::default())
}

/// [`find_lines`] with explicit tuning.
///
/// # Errors
///
/// As [`find_lines`], plus [`DetectError::InvalidConfig`].
pub fn find_lines_with_config(
    data: &[u8],
    width: u32,
    height: u32,
    out: &mut [f32],
    max_lines: usize,
    config: &LineConfig,
) -> Result<LineExport, DetectError> {
    let frame = Frame::new(data, width, height)?;
    export::check_segment_capacity(out.len(), max_lines)?;

    let detection = detect_lines(&frame, config)?;
    export::write_segments(&detection.merged, out, max_lines)
}
