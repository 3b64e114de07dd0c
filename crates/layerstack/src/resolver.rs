//! Priority-ordered constraint resolution for a layer stack.
//!
//! The resolver is a pure function over an immutable list of
//! [`LayerConstraints`]: it never touches a [`LayerStack`](crate::LayerStack)
//! and never fails. Each layer owns a feasible interval for its left edge.
//! Structural relations between neighbours are propagated as interval
//! sweeps until a fixed point, and constraints are then applied one at a time
//! in [`resolution_order`]. Once a constraint fixes a layer, later constraints
//! can only narrow the remaining free layers around it.
//!
//! # Structural relations
//!
//! For adjacent layers `i` and `i + 1` with gap `g`:
//!
//! ```text
//! pos[i] + g  <=  pos[i + 1]  <=  max(pos[i] + width[i], pos[i] + g)
//! ```
//!
//! The lower bound keeps positions monotonic; the upper bound keeps the
//! background covered. The root rests at `0`.
//!
//! # Width modes
//!
//! | mode                     | width at position `p`              |
//! |--------------------------|------------------------------------|
//! | nominal (before resize)  | `width`                            |
//! | fitted                   | `clamp(total - p, 0, width)`       |
//! | fitted, expandable       | `max(width, total - p)`            |
//! | frozen (drag, no resize) | the width captured at move start   |

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::LayerStackConfig;
use crate::item::{DEFAULT_SNAPPING_PRIORITY, LayerItem, SnappingPoint, sanitize_length};

/// Resolution inputs for one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConstraints {
    /// Nominal width; the minimum width when `expandable`.
    pub width: f64,
    pub expandable: bool,
    pub resize_priority: i32,
    pub right_margin_priority: i32,
    /// Resolved distance to the next layer's left edge.
    pub gap: f64,
    pub snapping_points: Vec<SnappingPoint>,
    /// Width held constant while a drag is active.
    pub frozen_width: Option<f64>,
}

impl LayerConstraints {
    /// Constraints with default priorities and no snapping points.
    #[must_use]
    pub fn new(width: f64, gap: f64) -> Self {
        Self {
            width: sanitize_length(width),
            expandable: false,
            resize_priority: crate::item::DEFAULT_RESIZE_PRIORITY,
            right_margin_priority: crate::item::DEFAULT_RIGHT_MARGIN_PRIORITY,
            gap: sanitize_length(gap),
            snapping_points: Vec::new(),
            frozen_width: None,
        }
    }

    /// Derive constraints from a stack item, filling unset priorities from
    /// `config`.
    #[must_use]
    pub fn from_item(item: &LayerItem, config: &LayerStackConfig) -> Self {
        Self {
            width: item.width(),
            expandable: item.is_expandable(),
            resize_priority: item
                .resize_priority()
                .unwrap_or(config.default_resize_priority),
            right_margin_priority: item
                .right_margin_priority()
                .unwrap_or(config.default_right_margin_priority),
            gap: sanitize_length(config.gap_for(item.next_item_distance())),
            snapping_points: item
                .snapping_points()
                .iter()
                .map(|point| {
                    SnappingPoint::new(
                        point.offset(),
                        point.priority_or(config.default_snapping_priority),
                    )
                })
                .collect(),
            frozen_width: None,
        }
    }

    /// Mark the layer as expandable.
    #[must_use]
    pub fn expandable(mut self) -> Self {
        self.expandable = true;
        self
    }

    /// Add an explicit snapping point.
    #[must_use]
    pub fn with_point(mut self, offset: f64, priority: i32) -> Self {
        self.snapping_points.push(SnappingPoint::new(offset, priority));
        self
    }

    /// Override the resize priority.
    #[must_use]
    pub fn with_resize_priority(mut self, priority: i32) -> Self {
        self.resize_priority = priority;
        self
    }

    /// Override the right-margin priority.
    #[must_use]
    pub fn with_right_margin_priority(mut self, priority: i32) -> Self {
        self.right_margin_priority = priority;
        self
    }

    /// Hold the width constant.
    #[must_use]
    pub fn frozen(mut self, width: f64) -> Self {
        self.frozen_width = Some(sanitize_length(width));
        self
    }

    pub(crate) fn margin_width(&self) -> f64 {
        self.frozen_width.unwrap_or(self.width)
    }
}

/// A layer held at a caller-chosen position during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerPin {
    pub index: usize,
    pub position: f64,
}

/// One resolution request.
#[derive(Debug, Clone, Copy)]
pub struct LayoutRequest<'a> {
    pub layers: &'a [LayerConstraints],
    pub total_width: f64,
    pub pin: Option<LayerPin>,
    pub epsilon: f64,
}

impl<'a> LayoutRequest<'a> {
    #[must_use]
    pub fn new(layers: &'a [LayerConstraints], total_width: f64) -> Self {
        Self {
            layers,
            total_width,
            pin: None,
            epsilon: crate::config::GEOMETRY_EPSILON,
        }
    }

    #[must_use]
    pub fn with_pin(mut self, pin: Option<LayerPin>) -> Self {
        self.pin = pin;
        self
    }

    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Resolved left edge and width of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerGeometry {
    pub position: f64,
    pub width: f64,
}

impl LayerGeometry {
    #[must_use]
    pub const fn new(position: f64, width: f64) -> Self {
        Self { position, width }
    }

    /// Right edge (`position + width`).
    #[must_use]
    pub fn right(&self) -> f64 {
        self.position + self.width
    }

    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self.position - other.position).abs() <= epsilon
            && (self.width - other.width).abs() <= epsilon
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    /// Geometry per layer, bottom to top.
    pub geometry: Vec<LayerGeometry>,
    /// Propagation passes run, summed over every constraint application.
    pub passes: usize,
}

impl LayoutSnapshot {
    /// Geometry equality within `epsilon`, ignoring pass counts.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.geometry.len() == other.geometry.len()
            && self
                .geometry
                .iter()
                .zip(&other.geometry)
                .all(|(a, b)| a.approx_eq(b, epsilon))
    }
}

/// What a [`ResolveStep`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveStepKind {
    /// Switch the layer's width from nominal to fitted.
    Resize,
    /// Fix the layer at an explicit snapping point when it is reachable.
    Snap { point: usize, offset: f64 },
    /// Keep the layer's right edge inside the total width.
    RightMargin { offset: f64 },
}

impl ResolveStepKind {
    const fn rank(&self) -> u8 {
        match self {
            Self::Resize => 0,
            Self::Snap { .. } | Self::RightMargin { .. } => 1,
        }
    }

    const fn offset(&self) -> f64 {
        match self {
            Self::Resize => 0.0,
            Self::Snap { offset, .. } | Self::RightMargin { offset } => *offset,
        }
    }
}

/// One constraint application, in the order [`resolution_order`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolveStep {
    pub layer: usize,
    pub priority: i32,
    pub kind: ResolveStepKind,
}

/// Constraint applications sorted by precedence.
///
/// Lower priority values come first. Ties are broken by kind (resize before
/// positional), then layer index ascending, then offset descending. The root
/// only contributes a resize step since its position is fixed.
#[must_use]
pub fn resolution_order(layers: &[LayerConstraints], total_width: f64) -> Vec<ResolveStep> {
    let total = sanitize_length(total_width);
    let mut steps = Vec::with_capacity(layers.len() * 3);
    for (layer, constraints) in layers.iter().enumerate() {
        steps.push(ResolveStep {
            layer,
            priority: constraints.resize_priority,
            kind: ResolveStepKind::Resize,
        });
        if layer == 0 {
            continue;
        }
        for (point, snap) in constraints.snapping_points.iter().enumerate() {
            if !snap.offset().is_finite() {
                continue;
            }
            steps.push(ResolveStep {
                layer,
                priority: snap.priority_or(DEFAULT_SNAPPING_PRIORITY),
                kind: ResolveStepKind::Snap {
                    point,
                    offset: snap.offset(),
                },
            });
        }
        steps.push(ResolveStep {
            layer,
            priority: constraints.right_margin_priority,
            kind: ResolveStepKind::RightMargin {
                offset: total - constraints.margin_width(),
            },
        });
    }
    steps.sort_by(compare_steps);
    steps
}

fn compare_steps(a: &ResolveStep, b: &ResolveStep) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then(a.kind.rank().cmp(&b.kind.rank()))
        .then(a.layer.cmp(&b.layer))
        .then(b.kind.offset().total_cmp(&a.kind.offset()))
}

/// Resolve geometry for every layer.
#[must_use]
pub fn resolve(request: &LayoutRequest<'_>) -> LayoutSnapshot {
    run(request, true)
}

/// Maximally compressed positions: the resolver with no slack and no
/// explicit snapping points, i.e. the cumulative gaps.
#[must_use]
pub fn initial_positions(layers: &[LayerConstraints], epsilon: f64) -> Vec<f64> {
    let request = LayoutRequest::new(layers, 0.0).with_epsilon(epsilon);
    run(&request, false)
        .geometry
        .into_iter()
        .map(|g| g.position)
        .collect()
}

/// Feasible interval of layer `index` when every width is fitted and no layer
/// other than the root is fixed.
#[must_use]
pub fn reachable_range(
    layers: &[LayerConstraints],
    total_width: f64,
    index: usize,
    epsilon: f64,
) -> Option<(f64, f64)> {
    if index >= layers.len() {
        return None;
    }
    let mut solver = Solver::new(layers, total_width, epsilon);
    solver.fitted.fill(true);
    solver.rebuild();
    Some((solver.lo[index], solver.hi[index]))
}

fn run(request: &LayoutRequest<'_>, with_points: bool) -> LayoutSnapshot {
    let n = request.layers.len();
    if n == 0 {
        return LayoutSnapshot {
            geometry: Vec::new(),
            passes: 0,
        };
    }

    let mut solver = Solver::new(request.layers, request.total_width, request.epsilon);
    solver.rebuild();

    if let Some(pin) = request.pin
        && pin.index > 0
        && pin.index < n
        && pin.position.is_finite()
    {
        let position = clamp(pin.position, solver.lo[pin.index], solver.hi[pin.index]);
        solver.fix(pin.index, position);
    }

    for step in resolution_order(request.layers, solver.total) {
        let i = step.layer;
        match step.kind {
            ResolveStepKind::Resize => {
                solver.fitted[i] = true;
                solver.rebuild();
            }
            ResolveStepKind::Snap { offset, .. } => {
                if !with_points || solver.fixed[i].is_some() {
                    continue;
                }
                let eps = solver.epsilon;
                if solver.lo[i] - eps <= offset && offset <= solver.hi[i] + eps {
                    let position = clamp(offset, solver.lo[i], solver.hi[i]);
                    solver.fix(i, position);
                }
            }
            ResolveStepKind::RightMargin { offset } => {
                if solver.fixed[i].is_none() {
                    solver.cap[i] = offset;
                    solver.rebuild();
                }
            }
        }
    }

    // Free layers, top down: the top takes its ceiling, the rest their floor.
    for i in (1..n).rev() {
        if solver.fixed[i].is_some() {
            continue;
        }
        let position = if i == n - 1 {
            solver.hi[i]
        } else {
            solver.lo[i]
        };
        solver.fix(i, position);
    }

    let mut geometry = Vec::with_capacity(n);
    let mut previous = f64::NEG_INFINITY;
    for i in 0..n {
        let position = solver.fixed[i].unwrap_or(solver.lo[i]).max(previous);
        previous = position;
        geometry.push(LayerGeometry::new(
            position,
            solver.width_at(i, position).max(0.0),
        ));
    }

    tracing::trace!(
        target: "layerstack.resolver",
        layers = n,
        total_width = solver.total,
        pin = ?request.pin,
        passes = solver.passes,
        "resolved layer stack"
    );

    LayoutSnapshot {
        geometry,
        passes: solver.passes,
    }
}

/// `value` bounded to `[lo, hi]`; never panics on an inverted interval.
fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

fn differs(a: f64, b: f64, epsilon: f64) -> bool {
    if a == b {
        return false;
    }
    if a.is_infinite() || b.is_infinite() {
        return true;
    }
    (a - b).abs() > epsilon
}

struct Solver<'a> {
    layers: &'a [LayerConstraints],
    total: f64,
    epsilon: f64,
    fixed: Vec<Option<f64>>,
    fitted: Vec<bool>,
    cap: Vec<f64>,
    lo: Vec<f64>,
    hi: Vec<f64>,
    passes: usize,
}

impl<'a> Solver<'a> {
    fn new(layers: &'a [LayerConstraints], total_width: f64, epsilon: f64) -> Self {
        let n = layers.len();
        let mut fixed = vec![None; n];
        if let Some(root) = fixed.first_mut() {
            *root = Some(0.0);
        }
        let epsilon = if epsilon.is_finite() && epsilon > 0.0 {
            epsilon
        } else {
            crate::config::GEOMETRY_EPSILON
        };
        Self {
            layers,
            total: sanitize_length(total_width),
            epsilon,
            fixed,
            fitted: vec![false; n],
            cap: vec![f64::INFINITY; n],
            lo: vec![0.0; n],
            hi: vec![0.0; n],
            passes: 0,
        }
    }

    fn width_at(&self, i: usize, position: f64) -> f64 {
        let layer = &self.layers[i];
        if let Some(frozen) = layer.frozen_width {
            return frozen.max(0.0);
        }
        if !self.fitted[i] {
            return layer.width;
        }
        let room = self.total - position;
        if layer.expandable {
            layer.width.max(room)
        } else {
            room.max(0.0).min(layer.width)
        }
    }

    /// Rightmost left edge the layer above may take when this layer sits at
    /// `position`.
    fn edge(&self, i: usize, position: f64) -> f64 {
        (position + self.width_at(i, position)).max(position + self.layers[i].gap)
    }

    /// Smallest position of layer `i` whose edge reaches `x`.
    fn reach(&self, i: usize, x: f64) -> f64 {
        let layer = &self.layers[i];
        let gap = layer.gap;
        if let Some(frozen) = layer.frozen_width {
            return x - frozen.max(gap);
        }
        if !self.fitted[i] {
            return x - layer.width.max(gap);
        }
        if layer.expandable {
            if x <= self.total {
                f64::NEG_INFINITY
            } else {
                x - layer.width.max(gap)
            }
        } else if x <= self.total {
            x - layer.width.max(gap)
        } else {
            x - gap
        }
    }

    fn tighten(&mut self, i: usize, lo: f64, hi: f64) -> bool {
        let new_lo = self.lo[i].max(lo);
        let mut new_hi = self.hi[i].min(hi);
        // The compression floor wins over coverage.
        if new_hi < new_lo {
            new_hi = new_lo;
        }
        let changed =
            differs(new_lo, self.lo[i], self.epsilon) || differs(new_hi, self.hi[i], self.epsilon);
        self.lo[i] = new_lo;
        self.hi[i] = new_hi;
        changed
    }

    fn rebuild(&mut self) {
        let n = self.layers.len();
        for i in 0..n {
            if let Some(position) = self.fixed[i] {
                self.lo[i] = position;
                self.hi[i] = position;
            } else {
                self.lo[i] = f64::NEG_INFINITY;
                self.hi[i] = self.cap[i];
            }
        }

        for _ in 0..(4 * n + 4) {
            self.passes += 1;
            let mut changed = false;
            for i in 1..n {
                if self.fixed[i].is_some() {
                    continue;
                }
                let lo = self.lo[i - 1] + self.layers[i - 1].gap;
                let hi = self.edge(i - 1, self.hi[i - 1]);
                changed |= self.tighten(i, lo, hi);
            }
            for i in (0..n.saturating_sub(1)).rev() {
                if self.fixed[i].is_some() {
                    continue;
                }
                let lo = self.reach(i, self.lo[i + 1]);
                let hi = self.hi[i + 1] - self.layers[i].gap;
                changed |= self.tighten(i, lo, hi);
            }
            if !changed {
                break;
            }
        }
    }

    fn fix(&mut self, i: usize, position: f64) {
        self.fixed[i] = Some(position);
        self.rebuild();
    }
}
