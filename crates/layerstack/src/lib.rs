#![forbid(unsafe_code)]

//! Horizontal layer-stack layout engine.
//!
//! A [`LayerStack`] keeps an ordered list of overlapping panels. The root sits
//! at x = 0 and every layer pushed on top slides in from the right. Each
//! mutation (push, pop, viewport resize, drag step) re-resolves the whole
//! stack under priority-ordered snapping constraints and returns the
//! [`LayerOperation`]s the host animates. The engine owns no rendering, timing
//! or threads.
//!
//! # Example
//!
//! ```
//! use layerstack::{LayerItem, LayerStack, LayerStackConfig, MoveEndMethod};
//!
//! let mut stack = LayerStack::new(LayerStackConfig::default(), 768.0);
//! for width in [400.0, 300.0, 300.0, 300.0] {
//!     stack.push(LayerItem::new(width)).expect("idle stack accepts pushes");
//! }
//! let positions: Vec<f64> = stack.layers().iter().map(|l| l.current_position()).collect();
//! assert_eq!(positions, vec![0.0, 64.0, 168.0, 468.0]);
//!
//! let ctx = stack.begin_move(3, 500.0).expect("layer 3 exists");
//! let update = stack.continue_move(&ctx, -100.0).expect("move is active");
//! let outcome = stack
//!     .end_move(&update.context, MoveEndMethod::Compact)
//!     .expect("move is active");
//! assert_eq!(outcome.position, 192.0);
//!
//! // Shrinking the viewport to the compressed extent leaves no slack.
//! stack.set_width(492.0);
//! assert!(stack.are_maximally_compressed());
//! ```

pub mod config;
pub mod drag;
pub mod error;
pub mod item;
pub mod operation;
pub mod resolver;
pub mod stack;

// --- Items -----------------------------------------------------------------

pub use item::{
    DEFAULT_RESIZE_PRIORITY, DEFAULT_RIGHT_MARGIN_PRIORITY, DEFAULT_SNAPPING_PRIORITY, LayerId,
    LayerItem, NO_DISTANCE, NextItemDistance, SnappingPoint,
};

// --- Configuration ---------------------------------------------------------

pub use config::{ConfigError, LayerStackConfig};

// --- Resolution ------------------------------------------------------------

pub use operation::LayerOperation;
pub use resolver::{
    LayerConstraints, LayerGeometry, LayerPin, LayoutRequest, LayoutSnapshot, ResolveStep,
    ResolveStepKind, initial_positions, reachable_range, resolution_order, resolve,
};

// --- Stack and move protocol -----------------------------------------------

pub use drag::{MoveContext, MoveEndMethod, SnapCandidate, SnapSource, select_snap};
pub use error::{LayerRef, LayerStackError};
pub use stack::{
    LAYER_STACK_SNAPSHOT_SCHEMA_VERSION, LayerStack, LayerStackSnapshot, MoveOutcome, MovePhase,
    MoveUpdate, PopOutcome, PushOutcome, RestAnchor,
};
