//! Layer configuration records and snapping points.
//!
//! A [`LayerItem`] carries two kinds of data:
//!
//! - Caller-owned configuration (width, priorities, snapping points, chrome
//!   flags), set through the builder methods before the item is pushed.
//! - Live geometry (`initial_position`, `current_position`, `current_width`)
//!   that only the owning [`LayerStack`](crate::LayerStack) writes.
//!
//! Priorities left unset take the owning stack's configured defaults when it
//! resolves; the constants below are what [`LayerStackConfig::default`]
//! carries.
//!
//! [`LayerStackConfig::default`]: crate::LayerStackConfig

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default priority for explicit snapping points.
pub const DEFAULT_SNAPPING_PRIORITY: i32 = 0;

/// Default priority of the built-in resize constraint.
pub const DEFAULT_RESIZE_PRIORITY: i32 = 100;

/// Default priority of the built-in right-margin snapping constraint.
pub const DEFAULT_RIGHT_MARGIN_PRIORITY: i32 = 150;

/// Raw sentinel meaning "no explicit next-item distance".
pub const NO_DISTANCE: f64 = -1.0;

/// Stable identifier for a pushed layer.
///
/// `0` is reserved so IDs are always non-zero. IDs are never reused within a
/// stack, which makes them safe lookup keys for caller-side controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(u64);

impl LayerId {
    /// Lowest valid layer ID.
    pub const MIN: Self = Self(1);

    /// Create a layer ID, rejecting 0.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// A preferred rest x-offset for a layer.
///
/// Lower `priority` values are resolved first. Points are immutable once
/// created; a layer may carry duplicates and each one is resolved on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnappingPoint {
    offset: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<i32>,
}

impl SnappingPoint {
    #[must_use]
    pub const fn new(offset: f64, priority: i32) -> Self {
        Self {
            offset,
            priority: Some(priority),
        }
    }

    /// A point at `offset` that takes the owning stack's default snapping
    /// priority.
    #[must_use]
    pub const fn at(offset: f64) -> Self {
        Self {
            offset,
            priority: None,
        }
    }

    #[must_use]
    pub const fn offset(self) -> f64 {
        self.offset
    }

    /// Explicit priority, `None` when the stack default applies.
    #[must_use]
    pub const fn priority(self) -> Option<i32> {
        self.priority
    }

    #[must_use]
    pub const fn priority_or(self, default: i32) -> i32 {
        match self.priority {
            Some(priority) => priority,
            None => default,
        }
    }
}

/// Minimum distance between a layer's left edge and the next layer's left
/// edge when the stack is maximally compressed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "points", rename_all = "snake_case")]
pub enum NextItemDistance {
    /// Fall back to the stack's configured standard distance.
    #[default]
    Standard,
    /// Explicit distance in points.
    Points(f64),
}

impl NextItemDistance {
    /// Interpret a raw distance, mapping [`NO_DISTANCE`] (or any negative or
    /// non-finite value) to [`NextItemDistance::Standard`].
    #[must_use]
    pub fn from_raw(raw: f64) -> Self {
        if raw.is_finite() && raw >= 0.0 {
            Self::Points(raw)
        } else {
            Self::Standard
        }
    }

    /// Raw form, with [`NO_DISTANCE`] for `Standard`.
    #[must_use]
    pub const fn to_raw(self) -> f64 {
        match self {
            Self::Standard => NO_DISTANCE,
            Self::Points(points) => points,
        }
    }

    /// Effective distance given the stack's standard distance.
    #[must_use]
    pub fn resolve(self, standard_distance: f64) -> f64 {
        match self {
            Self::Standard => sanitize_length(standard_distance),
            Self::Points(points) => sanitize_length(points),
        }
    }
}

/// Clamp a length to a finite, non-negative value.
pub(crate) fn sanitize_length(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Configuration and live geometry of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerItem {
    id: Option<LayerId>,
    name: Option<String>,
    title: Option<String>,
    width: f64,
    expandable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resize_priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right_margin_priority: Option<i32>,
    next_item_distance: NextItemDistance,
    resize_on_move: bool,
    has_chrome: bool,
    display_shadow: bool,
    snapping_points: Vec<SnappingPoint>,
    initial_position: f64,
    current_position: f64,
    current_width: f64,
}

impl LayerItem {
    /// Create a layer with the given nominal width. Priorities not set
    /// explicitly take the owning stack's configured defaults.
    ///
    /// Negative or non-finite widths saturate to 0.
    #[must_use]
    pub fn new(width: f64) -> Self {
        let width = sanitize_length(width);
        Self {
            id: None,
            name: None,
            title: None,
            width,
            expandable: false,
            resize_priority: None,
            right_margin_priority: None,
            next_item_distance: NextItemDistance::Standard,
            resize_on_move: true,
            has_chrome: true,
            display_shadow: true,
            snapping_points: Vec::new(),
            initial_position: 0.0,
            current_position: 0.0,
            current_width: width,
        }
    }

    /// Set a debugging name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the title shown in the layer's chrome.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Treat `width` as a minimum and let the layer grow to the right margin.
    #[must_use]
    pub fn with_expandable(mut self, expandable: bool) -> Self {
        self.expandable = expandable;
        self
    }

    #[must_use]
    pub fn with_resize_priority(mut self, priority: i32) -> Self {
        self.resize_priority = Some(priority);
        self
    }

    #[must_use]
    pub fn with_right_margin_priority(mut self, priority: i32) -> Self {
        self.right_margin_priority = Some(priority);
        self
    }

    /// Set the distance to the next layer from a raw value ([`NO_DISTANCE`]
    /// selects the standard distance).
    #[must_use]
    pub fn with_next_item_distance(mut self, raw: f64) -> Self {
        self.next_item_distance = NextItemDistance::from_raw(raw);
        self
    }

    #[must_use]
    pub fn with_distance(mut self, distance: NextItemDistance) -> Self {
        self.next_item_distance = distance;
        self
    }

    /// Whether the width may follow the resize rule while the layer is dragged.
    #[must_use]
    pub fn with_resize_on_move(mut self, resize_on_move: bool) -> Self {
        self.resize_on_move = resize_on_move;
        self
    }

    #[must_use]
    pub fn with_chrome(mut self, has_chrome: bool) -> Self {
        self.has_chrome = has_chrome;
        self
    }

    #[must_use]
    pub fn with_shadow(mut self, display_shadow: bool) -> Self {
        self.display_shadow = display_shadow;
        self
    }

    /// Add a snapping point (builder form).
    #[must_use]
    pub fn with_snapping_point(mut self, offset: f64, priority: i32) -> Self {
        self.add_snapping_point(offset, priority);
        self
    }

    /// Add a snapping point at the stack's default snapping priority.
    #[must_use]
    pub fn with_snapping_point_at(mut self, offset: f64) -> Self {
        self.snapping_points.push(SnappingPoint::at(offset));
        self
    }

    /// Add a snapping point.
    pub fn add_snapping_point(&mut self, offset: f64, priority: i32) {
        self.snapping_points.push(SnappingPoint::new(offset, priority));
    }

    /// ID assigned when the item was pushed, `None` before that.
    #[must_use]
    pub const fn id(&self) -> Option<LayerId> {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Nominal width (the minimum width for expandable layers).
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub const fn is_expandable(&self) -> bool {
        self.expandable
    }

    /// Explicit resize priority, `None` when the stack default applies.
    #[must_use]
    pub const fn resize_priority(&self) -> Option<i32> {
        self.resize_priority
    }

    #[must_use]
    pub const fn right_margin_priority(&self) -> Option<i32> {
        self.right_margin_priority
    }

    #[must_use]
    pub const fn next_item_distance(&self) -> NextItemDistance {
        self.next_item_distance
    }

    #[must_use]
    pub const fn resize_on_move(&self) -> bool {
        self.resize_on_move
    }

    #[must_use]
    pub const fn has_chrome(&self) -> bool {
        self.has_chrome
    }

    #[must_use]
    pub const fn display_shadow(&self) -> bool {
        self.display_shadow
    }

    #[must_use]
    pub fn snapping_points(&self) -> &[SnappingPoint] {
        &self.snapping_points
    }

    /// Position when the whole stack is maximally compressed.
    #[must_use]
    pub const fn initial_position(&self) -> f64 {
        self.initial_position
    }

    #[must_use]
    pub const fn current_position(&self) -> f64 {
        self.current_position
    }

    #[must_use]
    pub const fn current_width(&self) -> f64 {
        self.current_width
    }

    pub(crate) fn assign_id(&mut self, id: LayerId) {
        self.id = Some(id);
    }

    pub(crate) fn set_geometry(&mut self, initial_position: f64, position: f64, width: f64) {
        self.initial_position = initial_position;
        self.current_position = position;
        self.current_width = width;
    }
}
