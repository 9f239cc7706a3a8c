//! Flattening detection results into caller-owned `f32` buffers.
//!
//! The buffer-level entry points hand results across a foreign-function
//! style boundary: the caller allocates, the detector fills. Capacity is
//! checked before anything is written.

use serde::{Deserialize, Serialize};

use crate::types::{DetectError, Quad, Segment};

/// Floats per exported segment: `x1, y1, x2, y2`.
pub const FLOATS_PER_SEGMENT: usize = 4;

/// Floats per exported quad: four `x, y` pairs.
pub const FLOATS_PER_QUAD: usize = 8;

/// Outcome of [`write_segments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineExport {
    /// Segments written to the buffer (at most `max_lines`).
    pub written: usize,
    /// Segments detected, including any that did not fit.
    pub found: usize,
}

impl LineExport {
    /// True when some detected segments were not written.
    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.found > self.written
    }
}

/// Check that `out` can hold `max_lines` segments.
///
/// # Errors
///
/// Returns [`DetectError::OutputBufferTooSmall`] if
/// `out_len < max_lines * 4`.
pub fn check_segment_capacity(out_len: usize, max_lines: usize) -> Result<(), DetectError> {
    let required = max_lines.saturating_mul(FLOATS_PER_SEGMENT);
    if out_len < required {
        return Err(DetectError::OutputBufferTooSmall {
            required,
            actual: out_len,
        });
    }
    Ok(())
}

/// Check that `out` can hold one quad.
///
/// # Errors
///
/// Returns [`DetectError::OutputBufferTooSmall`] if `out_len < 8`.
pub fn check_quad_capacity(out_len: usize) -> Result<(), DetectError> {
    if out_len < FLOATS_PER_QUAD {
        return Err(DetectError::OutputBufferTooSmall {
            required: FLOATS_PER_QUAD,
            actual: out_len,
        });
    }
    Ok(())
}

/// Write up to `max_lines` segments as consecutive `x1, y1, x2, y2`
/// groups, in input order. Segments beyond `max_lines` are dropped
/// without error. Floats past the written groups are left untouched.
///
/// # Errors
///
/// Returns [`DetectError::OutputBufferTooSmall`] if `out` cannot hold
/// `max_lines` segments; nothing is written in that case.
pub fn write_segments(
    segments: &[Segment],
    out: &mut [f32],
    max_lines: usize,
) -> Result<LineExport, DetectError> {
    check_segment_capacity(out.len(), max_lines)?;
    let written = segments.len().min(max_lines);
    for (chunk, segment) in out
        .chunks_exact_mut(FLOATS_PER_SEGMENT)
        .zip(&segments[..written])
    {
        chunk.copy_from_slice(&segment.to_f32_array());
    }
    Ok(LineExport {
        written,
        found: segments.len(),
    })
}

/// Write a quad's corners as `x0, y0, x1, y1, x2, y2, x3, y3`.
///
/// # Errors
///
/// Returns [`DetectError::OutputBufferTooSmall`] if `out.len() < 8`.
pub fn write_quad(quad: &Quad, out: &mut [f32]) -> Result<(), DetectError> {
    check_quad_capacity(out.len())?;
    out[..FLOATS_PER_QUAD].copy_from_slice(&quad.to_f32_array());
    Ok(())
}
