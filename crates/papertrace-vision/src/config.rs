//! Detector configuration.
//!
//! Every numeric tunable of both detection paths lives here as a plain
//! serde struct with a [`Default`] matching the values the tracing app
//! ships with. Call `validate()` (the public entry points do) before
//! running a detector with caller-supplied values.

use serde::{Deserialize, Serialize};

use crate::types::DetectError;

/// Tolerances for clustering near-duplicate line fragments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Largest orientation difference (degrees, modulo 180) for two
    /// fragments to count as parallel. Inclusive.
    pub angle_tolerance_deg: f64,

    /// Both endpoints of a fragment must lie strictly closer than this
    /// (pixels) to a cluster's reference line to join it.
    pub distance_tolerance_px: f64,
}

impl MergeConfig {
    /// Default angular tolerance in degrees.
    pub const DEFAULT_ANGLE_TOLERANCE_DEG: f64 = 7.0;
    /// Default distance tolerance in pixels.
    pub const DEFAULT_DISTANCE_TOLERANCE_PX: f64 = 15.0;

    /// Check that both tolerances are finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), DetectError> {
        non_negative("merge.angle_tolerance_deg", self.angle_tolerance_deg)?;
        non_negative("merge.distance_tolerance_px", self.distance_tolerance_px)
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            angle_tolerance_deg: Self::DEFAULT_ANGLE_TOLERANCE_DEG,
            distance_tolerance_px: Self::DEFAULT_DISTANCE_TOLERANCE_PX,
        }
    }
}

/// Parameters for the probabilistic Hough transform.
///
/// Rho resolution is fixed at 1 pixel and theta resolution at 1 degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughConfig {
    /// Accumulator votes a line needs before it is traced.
    pub vote_threshold: u32,

    /// Minimum extent (pixels, along the dominant axis) of a reported
    /// segment.
    pub min_line_length: u32,

    /// Largest run of missing pixels bridged while tracing one line.
    pub max_line_gap: u32,

    /// Seed for the deterministic pixel visiting order.
    pub seed: u64,
}

impl HoughConfig {
    /// Default vote threshold.
    pub const DEFAULT_VOTE_THRESHOLD: u32 = 90;
    /// Default minimum line length in pixels.
    pub const DEFAULT_MIN_LINE_LENGTH: u32 = 250;
    /// Default maximum gap in pixels.
    pub const DEFAULT_MAX_LINE_GAP: u32 = 50;

    /// Check that the vote threshold is positive.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidConfig`] for a zero vote threshold.
    pub fn validate(&self) -> Result<(), DetectError> {
        if self.vote_threshold == 0 {
            return Err(DetectError::InvalidConfig(
                "hough.vote_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            vote_threshold: Self::DEFAULT_VOTE_THRESHOLD,
            min_line_length: Self::DEFAULT_MIN_LINE_LENGTH,
            max_line_gap: Self::DEFAULT_MAX_LINE_GAP,
            seed: 0,
        }
    }
}

/// Mean-C adaptive threshold parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Side of the square neighbourhood used for the local mean. Odd, >= 3.
    pub block_size: u32,

    /// Constant subtracted from the local mean. Pixels at or below
    /// `mean - offset` are marked.
    pub offset: i16,
}

impl ThresholdConfig {
    /// Default neighbourhood size.
    pub const DEFAULT_BLOCK_SIZE: u32 = 21;
    /// Default mean offset.
    pub const DEFAULT_OFFSET: i16 = 10;

    /// Check the block size.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidConfig`] when `block_size` is even or
    /// smaller than 3.
    pub fn validate(&self) -> Result<(), DetectError> {
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(DetectError::InvalidConfig(format!(
                "threshold.block_size must be odd and >= 3, got {}",
                self.block_size
            )));
        }
        Ok(())
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            block_size: Self::DEFAULT_BLOCK_SIZE,
            offset: Self::DEFAULT_OFFSET,
        }
    }
}

/// Configuration for merged line detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Gaussian kernel size (odd). 0 or 1 disables blurring.
    pub blur_kernel: u32,

    /// Adaptive threshold applied to the blurred frame.
    pub threshold: ThresholdConfig,

    /// Canny hysteresis low threshold.
    pub canny_low: f32,

    /// Canny hysteresis high threshold.
    pub canny_high: f32,

    /// Morphological closing iterations on the edge mask.
    pub close_iterations: u8,

    /// Probabilistic Hough transform parameters.
    pub hough: HoughConfig,

    /// Fragment clustering tolerances.
    pub merge: MergeConfig,
}

impl LineConfig {
    /// Default Gaussian kernel size.
    pub const DEFAULT_BLUR_KERNEL: u32 = 9;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 200.0;
    /// Default closing iterations.
    pub const DEFAULT_CLOSE_ITERATIONS: u8 = 2;

    /// Validate every nested parameter.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidConfig`] for the first invalid field.
    pub fn validate(&self) -> Result<(), DetectError> {
        validate_kernel("lines.blur_kernel", self.blur_kernel)?;
        self.threshold.validate()?;
        validate_canny(self.canny_low, self.canny_high)?;
        self.hough.validate()?;
        self.merge.validate()
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            blur_kernel: Self::DEFAULT_BLUR_KERNEL,
            threshold: ThresholdConfig::default(),
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            close_iterations: Self::DEFAULT_CLOSE_ITERATIONS,
            hough: HoughConfig::default(),
            merge: MergeConfig::default(),
        }
    }
}

/// Configuration for sheet corner detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerConfig {
    /// Gaussian kernel size (odd). 0 or 1 disables blurring.
    pub blur_kernel: u32,

    /// Canny hysteresis low threshold.
    pub canny_low: f32,

    /// Canny hysteresis high threshold.
    pub canny_high: f32,

    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub approx_epsilon_factor: f64,

    /// Minimum accepted quad area in square pixels (`None` accepts any).
    pub min_area: Option<f64>,
}

impl CornerConfig {
    /// Default Gaussian kernel size.
    pub const DEFAULT_BLUR_KERNEL: u32 = 5;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
    /// Default approximation tolerance factor.
    pub const DEFAULT_APPROX_EPSILON_FACTOR: f64 = 0.02;
    /// Default area floor in square pixels.
    pub const DEFAULT_MIN_AREA: f64 = 10_000.0;

    /// Validate every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidConfig`] for the first invalid field.
    pub fn validate(&self) -> Result<(), DetectError> {
        validate_kernel("corners.blur_kernel", self.blur_kernel)?;
        validate_canny(self.canny_low, self.canny_high)?;
        if !(self.approx_epsilon_factor.is_finite() && self.approx_epsilon_factor > 0.0) {
            return Err(DetectError::InvalidConfig(format!(
                "corners.approx_epsilon_factor must be positive, got {}",
                self.approx_epsilon_factor
            )));
        }
        if let Some(area) = self.min_area {
            non_negative("corners.min_area", area)?;
        }
        Ok(())
    }
}

impl Default for CornerConfig {
    fn default() -> Self {
        Self {
            blur_kernel: Self::DEFAULT_BLUR_KERNEL,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            approx_epsilon_factor: Self::DEFAULT_APPROX_EPSILON_FACTOR,
            min_area: Some(Self::DEFAULT_MIN_AREA),
        }
    }
}

/// Both detector configurations, as loaded from a single JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sheet corner detection.
    pub corners: CornerConfig,
    /// Merged line detection.
    pub lines: LineConfig,
}

impl DetectorConfig {
    /// Validate both configurations.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidConfig`] for the first invalid field.
    pub fn validate(&self) -> Result<(), DetectError> {
        self.corners.validate()?;
        self.lines.validate()
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), DetectError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DetectError::InvalidConfig(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

fn validate_kernel(name: &str, kernel: u32) -> Result<(), DetectError> {
    if kernel > 1 && kernel % 2 == 0 {
        return Err(DetectError::InvalidConfig(format!(
            "{name} must be odd, got {kernel}"
        )));
    }
    Ok(())
}

fn validate_canny(low: f32, high: f32) -> Result<(), DetectError> {
    if !(low.is_finite() && high.is_finite()) || low < 0.0 || low > high {
        return Err(DetectError::InvalidConfig(format!(
            "canny thresholds must satisfy 0 <= low <= high, got low={low} high={high}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_values() {
        let lines = LineConfig::default();
        assert_eq!(lines.blur_kernel, 9);
        assert_eq!(lines.threshold.block_size, 21);
        assert_eq!(lines.threshold.offset, 10);
        assert!((lines.canny_low - 50.0).abs() < f32::EPSILON);
        assert!((lines.canny_high - 200.0).abs() < f32::EPSILON);
        assert_eq!(lines.close_iterations, 2);
        assert_eq!(lines.hough.vote_threshold, 90);
        assert_eq!(lines.hough.min_line_length, 250);
        assert_eq!(lines.hough.max_line_gap, 50);
        assert!((lines.merge.angle_tolerance_deg - 7.0).abs() < f64::EPSILON);
        assert!((lines.merge.distance_tolerance_px - 15.0).abs() < f64::EPSILON);

        let corners = CornerConfig::default();
        assert_eq!(corners.blur_kernel, 5);
        assert!((corners.canny_high - 150.0).abs() < f32::EPSILON);
        assert!((corners.approx_epsilon_factor - 0.02).abs() < f64::EPSILON);
        assert_eq!(corners.min_area, Some(10_000.0));
    }

    #[test]
    fn defaults_are_valid() {
        assert!(DetectorConfig::default().validate().is_ok());
    }

    #[test]
    fn nan_tolerance_rejected() {
        let config = MergeConfig {
            angle_tolerance_deg: f64::NAN,
            ..MergeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DetectError::InvalidConfig(msg)) if msg.contains("angle_tolerance_deg")
        ));
    }

    #[test]
    fn negative_distance_rejected() {
        let config = MergeConfig {
            distance_tolerance_px: -1.0,
            ..MergeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn even_block_size_rejected() {
        let config = LineConfig {
            threshold: ThresholdConfig {
                block_size: 20,
                offset: 10,
            },
            ..LineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn even_blur_kernel_rejected() {
        let config = CornerConfig {
            blur_kernel: 4,
            ..CornerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_canny_rejected() {
        let config = LineConfig {
            canny_low: 300.0,
            ..LineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_epsilon_factor_rejected() {
        let config = CornerConfig {
            approx_epsilon_factor: 0.0,
            ..CornerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: DetectorConfig = serde_json::from_str(
            r#"{"corners": {"blur_kernel": 7, "min_area": null}, "lines": {"hough": {"seed": 3}}}"#,
        )
        .unwrap();
        assert_eq!(config.corners.blur_kernel, 7);
        assert_eq!(config.corners.min_area, None);
        assert!((config.corners.canny_high - CornerConfig::DEFAULT_CANNY_HIGH).abs() < f32::EPSILON);
        assert_eq!(config.lines.hough.seed, 3);
        assert_eq!(
            config.lines.hough.vote_threshold,
            HoughConfig::DEFAULT_VOTE_THRESHOLD
        );
        assert_eq!(config.lines.merge, MergeConfig::default());
    }

    #[test]
    fn detector_config_serde_round_trip() {
        let config = DetectorConfig {
            lines: LineConfig {
                merge: MergeConfig {
                    angle_tolerance_deg: 3.5,
                    distance_tolerance_px: 8.0,
                },
                ..LineConfig::default()
            },
            ..DetectorConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: DetectorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
