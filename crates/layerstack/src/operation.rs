//! Animation deltas between two resolved geometries.

use serde::{Deserialize, Serialize};

use crate::item::LayerId;
use crate::resolver::LayerGeometry;

/// Translation and width change the host animates for one layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerOperation {
    pub layer: LayerId,
    pub x_translation: f64,
    pub width_change: f64,
}

impl LayerOperation {
    /// Delta taking `from` to `to`.
    #[must_use]
    pub fn between(layer: LayerId, from: LayerGeometry, to: LayerGeometry) -> Self {
        Self {
            layer,
            x_translation: to.position - from.position,
            width_change: to.width - from.width,
        }
    }

    /// Whether both components are within `epsilon` of zero.
    #[must_use]
    pub fn is_noop(&self, epsilon: f64) -> bool {
        self.x_translation.abs() <= epsilon && self.width_change.abs() <= epsilon
    }
}

/// One layer's geometry before and after a change.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GeometryChange {
    pub layer: LayerId,
    pub before: LayerGeometry,
    pub after: LayerGeometry,
    /// Emit even when nothing moved (freshly pushed layers).
    pub forced: bool,
}

/// Bottom-to-top operations for every change beyond `epsilon`.
pub(crate) fn diff(
    changes: impl IntoIterator<Item = GeometryChange>,
    epsilon: f64,
) -> Vec<LayerOperation> {
    changes
        .into_iter()
        .filter_map(|change| {
            let op = LayerOperation::between(change.layer, change.before, change.after);
            (change.forced || !op.is_noop(epsilon)).then_some(op)
        })
        .collect()
}
