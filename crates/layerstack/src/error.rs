//! Errors reported by [`LayerStack`](crate::LayerStack).

use std::fmt;

use crate::item::LayerId;

/// How a caller referred to a layer that could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRef {
    Index { index: usize, len: usize },
    Id(LayerId),
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index { index, len } => write!(f, "index {index} (stack depth {len})"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Stack operation failures.
///
/// Geometry never fails: unsatisfiable constraints saturate instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerStackError {
    /// Pop on a stack holding at most the root.
    EmptyStack { depth: usize },
    /// Operation called out of sequence for the move protocol.
    InvalidState {
        operation: &'static str,
        detail: String,
    },
    /// Unknown layer id or out-of-range index.
    InvalidReference(LayerRef),
}

impl LayerStackError {
    pub(crate) fn invalid_state(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidState {
            operation,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for LayerStackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyStack { depth } => {
                write!(f, "cannot pop: stack holds {depth} layer(s) and the root stays")
            }
            Self::InvalidState { operation, detail } => {
                write!(f, "{operation} not allowed: {detail}")
            }
            Self::InvalidReference(target) => write!(f, "no layer at {target}"),
        }
    }
}

impl std::error::Error for LayerStackError {}
