//! Clustering and merging of near-duplicate line fragments.
//!
//! A line transform reports one physical edge as many overlapping or
//! broken fragments. This module groups fragments that lie on the same
//! line and reduces each group to one segment spanning all of them.
//!
//! # Algorithm
//!
//! Single pass, greedy, order sensitive. Each fragment, in input order,
//! joins the **first** existing cluster whose reference segment it is
//! compatible with; otherwise it founds a new cluster and becomes that
//! cluster's reference. Compatibility requires both:
//!
//! - **orientation**: the angle between the fragment and the reference,
//!   taken modulo 180°, is at most `angle_tolerance_deg`;
//! - **proximity**: both fragment endpoints lie strictly closer than
//!   `distance_tolerance_px` to the reference's *infinite* line.
//!
//! Placement is never revisited. Once every fragment is placed, each
//! cluster's endpoint pool is projected onto its reference direction and
//! the extreme projections become the merged segment. Clusters whose
//! reference has zero length produce nothing.

use crate::config::MergeConfig;
use crate::types::{Point, Segment};

/// Counts gathered while merging, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeStats {
    /// Fragments supplied.
    pub input_count: usize,
    /// Clusters formed.
    pub cluster_count: usize,
    /// Clusters dropped because their reference has zero length.
    pub dropped_degenerate: usize,
    /// Merged segments produced.
    pub output_count: usize,
}

/// A group of fragments believed to lie on one line.
struct Cluster {
    /// The founding fragment. Never replaced.
    reference: Segment,
    /// Orientation of `reference`, cached at creation.
    reference_angle: f64,
    /// Every endpoint contributed so far, founding fragment first.
    pool: Vec<Point>,
}

impl Cluster {
    fn seed(segment: Segment, angle: f64) -> Self {
        Self {
            reference: segment,
            reference_angle: angle,
            pool: vec![segment.start, segment.end],
        }
    }

    fn accepts(&self, segment: &Segment, angle: f64, config: &MergeConfig) -> bool {
        orientation_difference(angle, self.reference_angle) <= config.angle_tolerance_deg
            && self.reference.line_distance(segment.start) < config.distance_tolerance_px
            && self.reference.line_distance(segment.end) < config.distance_tolerance_px
    }

    fn absorb(&mut self, segment: &Segment) {
        self.pool.push(segment.start);
        self.pool.push(segment.end);
    }

    /// Span of the pool along the reference direction.
    fn finish(&self) -> Option<Segment> {
        let direction = self.reference.unit_direction()?;
        let origin = self.reference.start;
        let (t_min, t_max) = self
            .pool
            .iter()
            .map(|p| (p.x - origin.x).mul_add(direction.0, (p.y - origin.y) * direction.1))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
                (lo.min(t), hi.max(t))
            });
        Some(Segment::new(
            origin.offset(direction, t_min),
            origin.offset(direction, t_max),
        ))
    }
}

/// Smallest angle (degrees, in `[0, 90]`) between two orientations,
/// treating a direction and its reverse as the same line.
///
/// Reducing modulo 180 covers raw differences near 0, ±180 and ±360
/// alike, so 179° and -179° are 2° apart.
#[must_use]
pub fn orientation_difference(a_deg: f64, b_deg: f64) -> f64 {
    let r = (a_deg - b_deg).rem_euclid(180.0);
    r.min(180.0 - r)
}

/// Merge near-duplicate fragments into one segment per physical line.
///
/// Output is in cluster creation order, one segment per cluster with a
/// non-degenerate reference, so its length never exceeds
/// `segments.len()`.
///
/// Tolerances are expected to be finite and non-negative; see
/// [`MergeConfig::validate`].
///
/// # Examples
///
/// ```
/// use papertrace_vision::{merge_segments, MergeConfig, Segment};
///
/// let fragments = [
///     Segment::from_coords(0.0, 0.0, 10.0, 0.0),
///     Segment::from_coords(8.0, 0.0, 20.0, 0.0),
///     Segment::from_coords(18.0, 0.0, 30.0, 0.0),
/// ];
/// let merged = merge_segments(&fragments, &MergeConfig::default());
/// assert_eq!(merged, vec![Segment::from_coords(0.0, 0.0, 30.0, 0.0)]);
/// ```
#[must_use = "returns the merged segments"]
pub fn merge_segments(segments: &[Segment], config: &MergeConfig) -> Vec<Segment> {
    merge_segments_with_stats(segments, config).0
}

/// [`merge_segments`], also reporting cluster counts.
#[must_use = "returns the merged segments"]
pub fn merge_segments_with_stats(
    segments: &[Segment],
    config: &MergeConfig,
) -> (Vec<Segment>, MergeStats) {
    debug_assert!(
        config.validate().is_ok(),
        "merge tolerances must be finite and non-negative: {config:?}"
    );

    let clusters = assign(segments, config);
    let merged: Vec<Segment> = clusters.iter().filter_map(Cluster::finish).collect();

    let stats = MergeStats {
        input_count: segments.len(),
        cluster_count: clusters.len(),
        dropped_degenerate: clusters.len() - merged.len(),
        output_count: merged.len(),
    };
    log::debug!(
        "merge: {} fragments -> {} clusters -> {} segments ({} degenerate)",
        stats.input_count,
        stats.cluster_count,
        stats.output_count,
        stats.dropped_degenerate,
    );
    (merged, stats)
}

/// First-fit assignment of every fragment to a cluster.
fn assign(segments: &[Segment], config: &MergeConfig) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    for segment in segments {
        let angle = segment.angle_degrees();
        match clusters
            .iter_mut()
            .find(|c| c.accepts(segment, angle, config))
        {
            Some(cluster) => cluster.absorb(segment),
            None => clusters.push(Cluster::seed(*segment, angle)),
        }
    }
    clusters
}
