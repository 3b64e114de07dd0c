//! Move gesture bookkeeping and snap target selection.
//!
//! ```text
//! Idle --begin_move--> Moving --continue_move--> Moving
//!                        |--end_move----> Idle (snap to target)
//!                        \--cancel_move-> Idle (restore start geometry)
//! ```
//!
//! The state lives on [`LayerStack`](crate::LayerStack); this module holds the
//! caller-visible [`MoveContext`] and the pure snap selection rules.

use serde::{Deserialize, Serialize};

use crate::config::LayerStackConfig;
use crate::item::LayerId;
use crate::resolver::{LayerConstraints, reachable_range};

/// How [`LayerStack::end_move`](crate::LayerStack::end_move) picks the rest
/// position of the dragged layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveEndMethod {
    /// Candidate closest to the tentative position.
    #[default]
    Nearest,
    /// Leftmost candidate.
    Compact,
    /// Rightmost candidate.
    Expand,
}

impl MoveEndMethod {
    /// Map a release velocity (points per second, positive = rightward).
    ///
    /// A flick faster than `threshold` snaps by direction; anything slower
    /// snaps to the nearest candidate.
    #[must_use]
    pub fn from_velocity(velocity: f64, threshold: f64) -> Self {
        let threshold = threshold.abs();
        if velocity > threshold {
            Self::Expand
        } else if velocity < -threshold {
            Self::Compact
        } else {
            Self::Nearest
        }
    }
}

/// Where a snap candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SnapSource {
    /// Explicit snapping point `index` of the dragged layer.
    Point { index: usize },
    /// Leftmost feasible position.
    Compressed,
    /// Right edge flush with the total width.
    RightMargin,
    /// Rightmost feasible position within the total width.
    Expanded,
}

/// One legal rest position for the dragged layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapCandidate {
    pub offset: f64,
    pub priority: i32,
    pub source: SnapSource,
}

/// Pick a candidate index for `method`.
///
/// Ties go to the lowest priority value, then the smallest index. Returns
/// `None` only for an empty candidate list.
#[must_use]
pub fn select_snap(
    candidates: &[SnapCandidate],
    tentative: f64,
    method: MoveEndMethod,
) -> Option<usize> {
    let score = |candidate: &SnapCandidate| match method {
        MoveEndMethod::Nearest => (candidate.offset - tentative).abs(),
        MoveEndMethod::Compact => candidate.offset,
        MoveEndMethod::Expand => -candidate.offset,
    };
    candidates
        .iter()
        .enumerate()
        .min_by(|(ia, a), (ib, b)| {
            score(a)
                .total_cmp(&score(b))
                .then(a.priority.cmp(&b.priority))
                .then(ia.cmp(ib))
        })
        .map(|(index, _)| index)
}

/// Rest positions the layer at `index` may snap to.
///
/// Explicit points are kept when they fall inside the layer's structural
/// interval and within the total width. Without any, the built-in compressed,
/// right-margin and expanded positions are offered.
pub(crate) fn snap_candidates(
    layers: &[LayerConstraints],
    total_width: f64,
    index: usize,
    config: &LayerStackConfig,
) -> Vec<SnapCandidate> {
    let eps = config.epsilon;
    let Some((lo, hi)) = reachable_range(layers, total_width, index, eps) else {
        return Vec::new();
    };
    let layer = &layers[index];

    let explicit: Vec<SnapCandidate> = layer
        .snapping_points
        .iter()
        .enumerate()
        .filter(|(_, point)| {
            let offset = point.offset();
            offset.is_finite()
                && offset >= lo - eps
                && offset <= hi + eps
                && offset <= total_width + eps
        })
        .map(|(index, point)| SnapCandidate {
            offset: point.offset().max(lo).min(hi),
            priority: point.priority_or(config.default_snapping_priority),
            source: SnapSource::Point { index },
        })
        .collect();
    if !explicit.is_empty() {
        return explicit;
    }

    let flush = (total_width - layer.margin_width()).max(lo).min(hi);
    let expanded = hi.min(total_width).max(lo);
    vec![
        SnapCandidate {
            offset: lo,
            priority: config.default_snapping_priority,
            source: SnapSource::Compressed,
        },
        SnapCandidate {
            offset: flush,
            priority: layer.right_margin_priority,
            source: SnapSource::RightMargin,
        },
        SnapCandidate {
            offset: expanded,
            priority: config.default_snapping_priority,
            source: SnapSource::Expanded,
        },
    ]
}

/// Caller-held handle for one move gesture.
///
/// Returned by `begin_move` and refreshed by every `continue_move`. A context
/// from an earlier gesture is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveContext {
    pub(crate) gesture: u64,
    pub(crate) layer: LayerId,
    pub(crate) dragged_index: usize,
    pub(crate) touch_x: f64,
    pub(crate) start_position: f64,
    pub(crate) tentative_position: f64,
    pub(crate) candidates: Vec<SnapCandidate>,
    pub(crate) chosen_snap_index: Option<usize>,
}

impl MoveContext {
    /// Gesture sequence number, unique per stack.
    #[must_use]
    pub const fn gesture(&self) -> u64 {
        self.gesture
    }

    #[must_use]
    pub const fn layer(&self) -> LayerId {
        self.layer
    }

    #[must_use]
    pub const fn dragged_index(&self) -> usize {
        self.dragged_index
    }

    /// Touch x supplied to `begin_move`.
    #[must_use]
    pub const fn touch_x(&self) -> f64 {
        self.touch_x
    }

    /// Layer position when the gesture began.
    #[must_use]
    pub const fn start_position(&self) -> f64 {
        self.start_position
    }

    /// Start position plus every delta so far, before clamping.
    #[must_use]
    pub const fn tentative_position(&self) -> f64 {
        self.tentative_position
    }

    #[must_use]
    pub fn candidates(&self) -> &[SnapCandidate] {
        &self.candidates
    }

    /// Index into [`candidates`](Self::candidates) of the current nearest
    /// target.
    #[must_use]
    pub const fn chosen_snap_index(&self) -> Option<usize> {
        self.chosen_snap_index
    }

    #[must_use]
    pub fn chosen_snap(&self) -> Option<&SnapCandidate> {
        self.chosen_snap_index
            .and_then(|index| self.candidates.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(offset: f64, priority: i32, index: usize) -> SnapCandidate {
        SnapCandidate {
            offset,
            priority,
            source: SnapSource::Point { index },
        }
    }

    fn three_points() -> Vec<SnapCandidate> {
        vec![
            candidate(0.0, 0, 0),
            candidate(100.0, 0, 1),
            candidate(250.0, 0, 2),
        ]
    }

    #[test]
    fn nearest_compact_and_expand_pick_expected_points() {
        let candidates = three_points();
        assert_eq!(
            select_snap(&candidates, 120.0, MoveEndMethod::Nearest),
            Some(1)
        );
        assert_eq!(
            select_snap(&candidates, 120.0, MoveEndMethod::Compact),
            Some(0)
        );
        assert_eq!(
            select_snap(&candidates, 120.0, MoveEndMethod::Expand),
            Some(2)
        );
    }

    #[test]
    fn ties_prefer_lower_priority_then_lower_index() {
        let candidates = vec![
            candidate(100.0, 5, 0),
            candidate(140.0, 1, 1),
            candidate(140.0, 1, 2),
        ];
        assert_eq!(
            select_snap(&candidates, 120.0, MoveEndMethod::Nearest),
            Some(1)
        );

        let same = vec![candidate(50.0, 0, 0), candidate(50.0, 0, 1)];
        assert_eq!(select_snap(&same, 0.0, MoveEndMethod::Compact), Some(0));
    }

    #[test]
    fn empty_candidates_select_nothing() {
        assert_eq!(select_snap(&[], 10.0, MoveEndMethod::Nearest), None);
    }

    #[test]
    fn velocity_maps_to_method() {
        assert_eq!(
            MoveEndMethod::from_velocity(150.0, 100.0),
            MoveEndMethod::Expand
        );
        assert_eq!(
            MoveEndMethod::from_velocity(-150.0, 100.0),
            MoveEndMethod::Compact
        );
        assert_eq!(
            MoveEndMethod::from_velocity(100.0, 100.0),
            MoveEndMethod::Nearest
        );
        assert_eq!(
            MoveEndMethod::from_velocity(-20.0, -100.0),
            MoveEndMethod::Nearest
        );
    }

    #[test]
    fn explicit_points_inside_range_become_candidates() {
        let layers = [
            LayerConstraints::new(400.0, 0.0),
            LayerConstraints::new(300.0, 64.0)
                .with_point(0.0, 0)
                .with_point(100.0, 0)
                .with_point(250.0, 0)
                .with_point(900.0, 0),
        ];
        let config = LayerStackConfig::default();
        let candidates = snap_candidates(&layers, 1024.0, 1, &config);
        let offsets: Vec<f64> = candidates.iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0.0, 100.0, 250.0]);
        assert_eq!(candidates[2].source, SnapSource::Point { index: 2 });
    }

    #[test]
    fn built_ins_are_offered_without_explicit_points() {
        let layers = [
            LayerConstraints::new(400.0, 64.0),
            LayerConstraints::new(300.0, 64.0),
        ];
        let config = LayerStackConfig::default();
        let candidates = snap_candidates(&layers, 1024.0, 1, &config);
        assert_eq!(
            candidates,
            vec![
                SnapCandidate {
                    offset: 64.0,
                    priority: 0,
                    source: SnapSource::Compressed,
                },
                SnapCandidate {
                    offset: 400.0,
                    priority: 150,
                    source: SnapSource::RightMargin,
                },
                SnapCandidate {
                    offset: 400.0,
                    priority: 0,
                    source: SnapSource::Expanded,
                },
            ]
        );
        assert!(snap_candidates(&layers, 1024.0, 5, &config).is_empty());
    }

    #[test]
    fn method_serializes_snake_case() {
        let json = serde_json::to_string(&MoveEndMethod::Compact).expect("serialize");
        assert_eq!(json, "\"compact\"");
    }
}
