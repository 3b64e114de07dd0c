//! The owning layer stack: structural edits, width changes and the move
//! protocol.
//!
//! Every mutation re-runs [`resolve`](crate::resolver::resolve) over the whole
//! stack and reports the per-layer [`LayerOperation`]s the host should
//! animate.
//!
//! # Rest anchor
//!
//! When a move ends, the dragged layer's snapped position is remembered
//! together with the stack depth at that moment. Whenever the stack is back at
//! that depth the anchor is pinned during resolution, so `set_width` and a
//! push followed by a pop preserve the user's choice. The anchor is dropped
//! when its layer is removed.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::LayerStackConfig;
use crate::drag::{MoveContext, MoveEndMethod, SnapCandidate, select_snap, snap_candidates};
use crate::error::{LayerRef, LayerStackError};
use crate::item::{LayerId, LayerItem, sanitize_length};
use crate::operation::{GeometryChange, LayerOperation, diff};
use crate::resolver::{
    LayerConstraints, LayerGeometry, LayerPin, LayoutRequest, initial_positions, resolve,
};

/// Current schema version for [`LayerStackSnapshot`].
pub const LAYER_STACK_SNAPSHOT_SCHEMA_VERSION: u16 = 1;

/// Snapped rest position kept after a move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestAnchor {
    pub layer: LayerId,
    pub position: f64,
    /// Stack depth at which the anchor applies.
    pub depth: usize,
}

/// Move protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum MovePhase {
    Idle,
    Moving { layer: LayerId, gesture: u64 },
}

/// Serializable view of a stack for replay and debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStackSnapshot {
    pub schema_version: u16,
    pub total_width: f64,
    pub layers: Vec<LayerItem>,
    pub rest_anchor: Option<RestAnchor>,
}

/// Result of a push.
#[derive(Debug, Clone, PartialEq)]
pub struct PushOutcome {
    /// Id assigned to the pushed item.
    pub layer: LayerId,
    /// Layers removed first (only [`LayerStack::push_in_front_of`]).
    pub removed: Vec<LayerItem>,
    pub operations: Vec<LayerOperation>,
}

/// Result of a pop.
#[derive(Debug, Clone, PartialEq)]
pub struct PopOutcome {
    /// Removed layers, bottom to top.
    pub removed: Vec<LayerItem>,
    /// Operations for the remaining layers only.
    pub operations: Vec<LayerOperation>,
}

/// Result of [`LayerStack::continue_move`].
#[derive(Debug, Clone, PartialEq)]
pub struct MoveUpdate {
    pub context: MoveContext,
    pub operations: Vec<LayerOperation>,
}

/// Result of [`LayerStack::end_move`].
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    /// Candidate the layer snapped to.
    pub target: Option<SnapCandidate>,
    /// Final position of the dragged layer.
    pub position: f64,
    pub operations: Vec<LayerOperation>,
}

#[derive(Debug, Clone)]
struct ActiveMove {
    gesture: u64,
    layer: LayerId,
    index: usize,
    touch_x: f64,
    start_position: f64,
    tentative: f64,
    /// Widths held for layers that do not resize on move.
    frozen: Vec<Option<f64>>,
    before: Vec<LayerGeometry>,
    total_width: f64,
    previous_anchor: Option<RestAnchor>,
}

/// Ordered stack of layers, root first.
#[derive(Debug, Clone)]
pub struct LayerStack {
    config: LayerStackConfig,
    layers: Vec<LayerItem>,
    index: FxHashMap<LayerId, usize>,
    total_width: f64,
    next_id: LayerId,
    rest_anchor: Option<RestAnchor>,
    active: Option<ActiveMove>,
    gesture_counter: u64,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new(LayerStackConfig::default(), 0.0)
    }
}

impl LayerStack {
    /// Empty stack with the given tuning and viewport width.
    #[must_use]
    pub fn new(config: LayerStackConfig, total_width: f64) -> Self {
        Self {
            config,
            layers: Vec::new(),
            index: FxHashMap::default(),
            total_width: sanitize_length(total_width),
            next_id: LayerId::MIN,
            rest_anchor: None,
            active: None,
            gesture_counter: 0,
        }
    }

    // ---------------------------------------------------------------------
    // Read access
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &LayerStackConfig {
        &self.config
    }

    #[must_use]
    pub const fn total_width(&self) -> f64 {
        self.total_width
    }

    /// Layers, root first.
    #[must_use]
    pub fn layers(&self) -> &[LayerItem] {
        &self.layers
    }

    #[must_use]
    pub fn root(&self) -> Option<&LayerItem> {
        self.layers.first()
    }

    #[must_use]
    pub fn top(&self) -> Option<&LayerItem> {
        self.layers.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<&LayerItem> {
        self.index_of(id).map(|index| &self.layers[index])
    }

    #[must_use]
    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Current geometry per layer, root first.
    #[must_use]
    pub fn geometry(&self) -> Vec<LayerGeometry> {
        self.layers
            .iter()
            .map(|item| LayerGeometry::new(item.current_position(), item.current_width()))
            .collect()
    }

    #[must_use]
    pub const fn rest_anchor(&self) -> Option<RestAnchor> {
        self.rest_anchor
    }

    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn phase(&self) -> MovePhase {
        match &self.active {
            None => MovePhase::Idle,
            Some(active) => MovePhase::Moving {
                layer: active.layer,
                gesture: active.gesture,
            },
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> LayerStackSnapshot {
        LayerStackSnapshot {
            schema_version: LAYER_STACK_SNAPSHOT_SCHEMA_VERSION,
            total_width: self.total_width,
            layers: self.layers.clone(),
            rest_anchor: self.rest_anchor,
        }
    }

    /// Whether every layer sits at its initial position with its nominal
    /// width and the rightmost `initial_position + width` meets the total
    /// width exactly, leaving no slack.
    #[must_use]
    pub fn are_maximally_compressed(&self) -> bool {
        let eps = self.config.epsilon;
        let at_rest = self.layers.iter().all(|item| {
            (item.current_position() - item.initial_position()).abs() <= eps
                && (item.current_width() - item.width()).abs() <= eps
        });
        let extent = self
            .layers
            .iter()
            .map(|item| item.initial_position() + item.width())
            .fold(0.0, f64::max);
        at_rest && (extent - self.total_width).abs() <= eps
    }

    // ---------------------------------------------------------------------
    // Structural operations
    // ---------------------------------------------------------------------

    /// Append `item` as the new top layer.
    pub fn push(&mut self, item: LayerItem) -> Result<PushOutcome, LayerStackError> {
        self.ensure_idle("push")?;
        let before = self.geometry_by_id();
        let layer = self.insert_top(item);
        self.relayout();
        let operations = self.operations_since(&before);
        tracing::debug!(
            target: "layerstack.stack",
            layer_id = %layer,
            depth = self.layers.len(),
            operations = operations.len(),
            "pushed layer"
        );
        Ok(PushOutcome {
            layer,
            removed: Vec::new(),
            operations,
        })
    }

    /// Remove every layer above `anchor`, then push `item` on top.
    pub fn push_in_front_of(
        &mut self,
        anchor: LayerId,
        item: LayerItem,
    ) -> Result<PushOutcome, LayerStackError> {
        self.ensure_idle("push_in_front_of")?;
        let index = self.require(anchor)?;
        let before = self.geometry_by_id();
        let removed = self.remove_above(index + 1);
        let layer = self.insert_top(item);
        self.relayout();
        let operations = self.operations_since(&before);
        tracing::debug!(
            target: "layerstack.stack",
            layer_id = %layer,
            anchor = %anchor,
            removed = removed.len(),
            depth = self.layers.len(),
            operations = operations.len(),
            "pushed layer in front of anchor"
        );
        Ok(PushOutcome {
            layer,
            removed,
            operations,
        })
    }

    /// Remove the top layer. The root is never popped.
    pub fn pop(&mut self) -> Result<PopOutcome, LayerStackError> {
        self.ensure_idle("pop")?;
        let depth = self.layers.len();
        if depth <= 1 {
            return Err(LayerStackError::EmptyStack { depth });
        }
        self.pop_above(depth - 1)
    }

    /// Remove every layer above `id`. Popping to the top removes nothing.
    pub fn pop_to(&mut self, id: LayerId) -> Result<PopOutcome, LayerStackError> {
        self.ensure_idle("pop_to")?;
        let index = self.require(id)?;
        self.pop_above(index + 1)
    }

    /// Remove every layer above the root.
    pub fn pop_to_root(&mut self) -> Result<PopOutcome, LayerStackError> {
        self.ensure_idle("pop_to_root")?;
        let depth = self.layers.len();
        if depth <= 1 {
            return Err(LayerStackError::EmptyStack { depth });
        }
        self.pop_above(1)
    }

    /// Change the viewport width. Allowed during a move; the dragged layer
    /// stays pinned.
    pub fn set_width(&mut self, total_width: f64) -> Vec<LayerOperation> {
        let total_width = sanitize_length(total_width);
        let before = self.geometry_by_id();
        self.total_width = total_width;
        self.relayout();
        let operations = self.operations_since(&before);
        tracing::debug!(
            target: "layerstack.stack",
            total_width,
            operations = operations.len(),
            "set total width"
        );
        operations
    }

    // ---------------------------------------------------------------------
    // Move protocol
    // ---------------------------------------------------------------------

    /// Start dragging the layer at `index`.
    pub fn begin_move(
        &mut self,
        index: usize,
        touch_x: f64,
    ) -> Result<MoveContext, LayerStackError> {
        if let Some(active) = &self.active {
            return Err(LayerStackError::invalid_state(
                "begin_move",
                format!("move of {} is already active", active.layer),
            ));
        }
        let len = self.layers.len();
        let Some(item) = self.layers.get(index) else {
            return Err(LayerStackError::InvalidReference(LayerRef::Index { index, len }));
        };
        let Some(layer) = item.id() else {
            return Err(LayerStackError::InvalidReference(LayerRef::Index { index, len }));
        };

        self.gesture_counter = self.gesture_counter.saturating_add(1);
        let start_position = item.current_position();
        let frozen = self
            .layers
            .iter()
            .map(|item| (!item.resize_on_move()).then_some(item.current_width()))
            .collect();
        self.active = Some(ActiveMove {
            gesture: self.gesture_counter,
            layer,
            index,
            touch_x,
            start_position,
            tentative: start_position,
            frozen,
            before: self.geometry(),
            total_width: self.total_width,
            previous_anchor: self.rest_anchor,
        });

        tracing::debug!(
            target: "layerstack.stack",
            layer_id = %layer,
            index,
            gesture = self.gesture_counter,
            start_position,
            "move began"
        );
        self.context("begin_move", MoveEndMethod::Nearest)
    }

    /// Shift the dragged layer by `delta_x` and re-resolve with it pinned.
    /// Non-finite deltas are ignored.
    pub fn continue_move(
        &mut self,
        ctx: &MoveContext,
        delta_x: f64,
    ) -> Result<MoveUpdate, LayerStackError> {
        let active = self.active_for("continue_move", ctx)?;
        if delta_x.is_finite() {
            active.tentative += delta_x;
        }
        let tentative = active.tentative;

        let before = self.geometry_by_id();
        self.relayout();
        let operations = self.operations_since(&before);
        let context = self.context("continue_move", MoveEndMethod::Nearest)?;
        tracing::trace!(
            target: "layerstack.stack",
            gesture = ctx.gesture,
            delta_x,
            tentative,
            chosen_snap = ?context.chosen_snap_index,
            "move continued"
        );
        Ok(MoveUpdate {
            context,
            operations,
        })
    }

    /// Snap the dragged layer to the candidate `method` selects and finish
    /// the gesture.
    pub fn end_move(
        &mut self,
        ctx: &MoveContext,
        method: MoveEndMethod,
    ) -> Result<MoveOutcome, LayerStackError> {
        self.active_for("end_move", ctx)?;
        let context = self.context("end_move", method)?;
        let target = context.chosen_snap().copied();
        let before = self.geometry_by_id();

        let Some(active) = self.active.take() else {
            return Err(LayerStackError::invalid_state("end_move", "no move is active"));
        };
        let position = target.map_or(active.tentative, |candidate| candidate.offset);
        self.rest_anchor = if active.index > 0 {
            Some(RestAnchor {
                layer: active.layer,
                position,
                depth: self.layers.len(),
            })
        } else {
            active.previous_anchor
        };
        self.relayout();
        let operations = self.operations_since(&before);
        let position = self.layers[active.index].current_position();

        tracing::debug!(
            target: "layerstack.stack",
            layer_id = %active.layer,
            gesture = active.gesture,
            method = ?method,
            position,
            operations = operations.len(),
            "move ended"
        );
        Ok(MoveOutcome {
            target,
            position,
            operations,
        })
    }

    /// [`end_move`](Self::end_move) with the method chosen from the release
    /// velocity and the configured threshold.
    pub fn end_move_with_velocity(
        &mut self,
        ctx: &MoveContext,
        velocity: f64,
    ) -> Result<MoveOutcome, LayerStackError> {
        let method =
            MoveEndMethod::from_velocity(velocity, self.config.snapping_velocity_threshold);
        self.end_move(ctx, method)
    }

    /// Abandon the gesture and restore the geometry from `begin_move`.
    pub fn cancel_move(
        &mut self,
        ctx: &MoveContext,
    ) -> Result<Vec<LayerOperation>, LayerStackError> {
        self.active_for("cancel_move", ctx)?;
        self.force_cancel_move()
            .ok_or_else(|| LayerStackError::invalid_state("cancel_move", "no move is active"))
    }

    /// Cancel whatever move is active without a context. Returns `None` when
    /// idle.
    pub fn force_cancel_move(&mut self) -> Option<Vec<LayerOperation>> {
        let active = self.active.take()?;
        let before = self.geometry_by_id();
        self.rest_anchor = active.previous_anchor;
        if active.total_width == self.total_width && active.before.len() == self.layers.len() {
            for (item, geometry) in self.layers.iter_mut().zip(&active.before) {
                let initial = item.initial_position();
                item.set_geometry(initial, geometry.position, geometry.width);
            }
        } else {
            self.relayout();
        }
        let operations = self.operations_since(&before);
        tracing::debug!(
            target: "layerstack.stack",
            layer_id = %active.layer,
            gesture = active.gesture,
            operations = operations.len(),
            "move canceled"
        );
        Some(operations)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn ensure_idle(&self, operation: &'static str) -> Result<(), LayerStackError> {
        match &self.active {
            None => Ok(()),
            Some(active) => Err(LayerStackError::invalid_state(
                operation,
                format!("move of {} is in progress", active.layer),
            )),
        }
    }

    fn active_for(
        &mut self,
        operation: &'static str,
        ctx: &MoveContext,
    ) -> Result<&mut ActiveMove, LayerStackError> {
        match self.active.as_mut() {
            None => Err(LayerStackError::invalid_state(operation, "no move is active")),
            Some(active) if active.gesture != ctx.gesture => {
                Err(LayerStackError::invalid_state(
                    operation,
                    format!(
                        "context belongs to gesture {} but gesture {} is active",
                        ctx.gesture, active.gesture
                    ),
                ))
            }
            Some(active) => Ok(active),
        }
    }

    fn require(&self, id: LayerId) -> Result<usize, LayerStackError> {
        self.index_of(id)
            .ok_or(LayerStackError::InvalidReference(LayerRef::Id(id)))
    }

    fn insert_top(&mut self, mut item: LayerItem) -> LayerId {
        let id = self.next_id;
        self.next_id = id.next();
        item.assign_id(id);
        self.index.insert(id, self.layers.len());
        self.layers.push(item);
        id
    }

    fn remove_above(&mut self, keep: usize) -> Vec<LayerItem> {
        if keep >= self.layers.len() {
            return Vec::new();
        }
        let removed: Vec<LayerItem> = self.layers.drain(keep..).collect();
        for item in &removed {
            if let Some(id) = item.id() {
                self.index.remove(&id);
            }
        }
        if let Some(anchor) = self.rest_anchor
            && !self.index.contains_key(&anchor.layer)
        {
            self.rest_anchor = None;
        }
        removed
    }

    fn pop_above(&mut self, keep: usize) -> Result<PopOutcome, LayerStackError> {
        let before = self.geometry_by_id();
        let removed = self.remove_above(keep);
        if !removed.is_empty() {
            self.relayout();
        }
        let operations = self.operations_since(&before);
        tracing::debug!(
            target: "layerstack.stack",
            removed = removed.len(),
            depth = self.layers.len(),
            operations = operations.len(),
            "popped layers"
        );
        Ok(PopOutcome {
            removed,
            operations,
        })
    }

    fn constraints(&self) -> Vec<LayerConstraints> {
        self.layers
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mut constraints = LayerConstraints::from_item(item, &self.config);
                if let Some(active) = &self.active {
                    constraints.frozen_width = active.frozen.get(i).copied().flatten();
                }
                constraints
            })
            .collect()
    }

    fn effective_pin(&self) -> Option<LayerPin> {
        if let Some(active) = &self.active {
            return Some(LayerPin {
                index: active.index,
                position: active.tentative,
            });
        }
        let anchor = self.rest_anchor?;
        if anchor.depth != self.layers.len() {
            return None;
        }
        Some(LayerPin {
            index: self.index_of(anchor.layer)?,
            position: anchor.position,
        })
    }

    fn relayout(&mut self) {
        let constraints = self.constraints();
        let epsilon = self.config.epsilon;
        let initial = initial_positions(&constraints, epsilon);
        let request = LayoutRequest::new(&constraints, self.total_width)
            .with_pin(self.effective_pin())
            .with_epsilon(epsilon);
        let snapshot = resolve(&request);
        for ((item, initial), geometry) in self
            .layers
            .iter_mut()
            .zip(initial)
            .zip(snapshot.geometry)
        {
            item.set_geometry(initial, geometry.position, geometry.width);
        }
    }

    fn geometry_by_id(&self) -> FxHashMap<LayerId, LayerGeometry> {
        self.layers
            .iter()
            .filter_map(|item| {
                let id = item.id()?;
                Some((
                    id,
                    LayerGeometry::new(item.current_position(), item.current_width()),
                ))
            })
            .collect()
    }

    fn operations_since(
        &self,
        before: &FxHashMap<LayerId, LayerGeometry>,
    ) -> Vec<LayerOperation> {
        let changes = self.layers.iter().filter_map(|item| {
            let layer = item.id()?;
            let after = LayerGeometry::new(item.current_position(), item.current_width());
            Some(match before.get(&layer) {
                Some(&previous) => GeometryChange {
                    layer,
                    before: previous,
                    after,
                    forced: false,
                },
                None => GeometryChange {
                    layer,
                    before: LayerGeometry::new(item.initial_position(), item.width()),
                    after,
                    forced: true,
                },
            })
        });
        diff(changes, self.config.epsilon)
    }

    /// Context for the active gesture with candidates recomputed and the
    /// choice made by `method`.
    fn context(
        &self,
        operation: &'static str,
        method: MoveEndMethod,
    ) -> Result<MoveContext, LayerStackError> {
        let Some(active) = &self.active else {
            return Err(LayerStackError::invalid_state(operation, "no move is active"));
        };
        let constraints = self.constraints();
        let candidates =
            snap_candidates(&constraints, self.total_width, active.index, &self.config);
        let chosen_snap_index = select_snap(&candidates, active.tentative, method);
        Ok(MoveContext {
            gesture: active.gesture,
            layer: active.layer,
            dragged_index: active.index,
            touch_x: active.touch_x,
            start_position: active.start_position,
            tentative_position: active.tentative,
            candidates,
            chosen_snap_index,
        })
    }
}
