//! Input model: tools, modifier keys, resize sides, and the drag state machine.
//!
//! This module defines the types consumed by the selection engine. `Tool` and
//! `Modifiers` capture the user's intent at the time of a pointer event.
//! `DragState` is the active gesture tracked between pointer-down and
//! pointer-up, carrying everything needed to recompute previews from the
//! gesture's start and to emit the final write on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::ops::BitOr;

use serde::Serialize;

use crate::coords::{CssPoint, CssRect};
use crate::doc::{AnnotationKind, EntityId};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Select, move and resize (default).
    #[default]
    Select,
    /// Draw a new annotation of the given kind.
    Draw(AnnotationKind),
    /// Pin a new comment where the pointer is released.
    Comment,
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Whether a click or area selection should add to the selection instead of replacing it.
    #[must_use]
    pub fn extends_selection(self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key, named as the host platform reports it (e.g. `"ArrowLeft"`, `"Delete"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// What the pointer went down on, as classified by the host.
///
/// Area selection only starts on `Canvas`; buttons, the timeline and other
/// controls layered over the video must be reported as `Interactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerTarget {
    #[default]
    Canvas,
    Interactive,
}

// =============================================================================
// SIDE
// =============================================================================

/// Bitmask naming the edges a resize handle drags. Corners are unions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Side(u8);

impl Side {
    pub const NONE: Self = Self(0);
    pub const TOP: Self = Self(1);
    pub const BOTTOM: Self = Self(2);
    pub const LEFT: Self = Self(4);
    pub const RIGHT: Self = Self(8);
    pub const TOP_LEFT: Self = Self(1 | 4);
    pub const TOP_RIGHT: Self = Self(1 | 8);
    pub const BOTTOM_LEFT: Self = Self(2 | 4);
    pub const BOTTOM_RIGHT: Self = Self(2 | 8);

    /// The eight handle positions, corners first.
    pub const HANDLES: [Self; 8] = [
        Self::TOP_LEFT,
        Self::TOP_RIGHT,
        Self::BOTTOM_LEFT,
        Self::BOTTOM_RIGHT,
        Self::TOP,
        Self::BOTTOM,
        Self::LEFT,
        Self::RIGHT,
    ];

    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// True when every edge in `other` is also in `self`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn is_corner(self) -> bool {
        self.moves_x() && self.moves_y()
    }

    #[must_use]
    pub fn moves_x(self) -> bool {
        self.0 & (Self::LEFT.0 | Self::RIGHT.0) != 0
    }

    #[must_use]
    pub fn moves_y(self) -> bool {
        self.0 & (Self::TOP.0 | Self::BOTTOM.0) != 0
    }

    /// Where this side's handle sits on `rect`.
    #[must_use]
    pub fn anchor_on(self, rect: CssRect) -> CssPoint {
        let x = if self.contains(Self::LEFT) {
            rect.x
        } else if self.contains(Self::RIGHT) {
            rect.right()
        } else {
            rect.x + rect.width / 2.0
        };
        let y = if self.contains(Self::TOP) {
            rect.y
        } else if self.contains(Self::BOTTOM) {
            rect.bottom()
        } else {
            rect.y + rect.height / 2.0
        };
        CssPoint::new(x, y)
    }
}

impl BitOr for Side {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Recompute `initial` with the edges named by `side` dragged by `(dx, dy)`.
///
/// The opposite edges stay anchored. With `keep_aspect`, the result keeps the
/// initial aspect ratio: corners scale by the larger axis, edge handles grow
/// the other axis symmetrically about the center. Dragging past the anchor
/// flips the rectangle onto the other side. Returns `None` when either
/// dimension ends up below `min_size`.
#[must_use]
pub fn resize_bounds(
    initial: CssRect,
    side: Side,
    dx: f64,
    dy: f64,
    keep_aspect: bool,
    min_size: f64,
) -> Option<CssRect> {
    // Signed extents measured from the anchored edge toward the dragged one.
    let mut w = initial.width;
    let mut h = initial.height;
    if side.contains(Side::LEFT) {
        w -= dx;
    } else if side.contains(Side::RIGHT) {
        w += dx;
    }
    if side.contains(Side::TOP) {
        h -= dy;
    } else if side.contains(Side::BOTTOM) {
        h += dy;
    }

    if keep_aspect && !initial.is_degenerate() {
        let aspect = initial.width / initial.height;
        if side.is_corner() {
            let scale = (w.abs() / initial.width).max(h.abs() / initial.height);
            w = initial.width * scale * w.signum();
            h = initial.height * scale * h.signum();
        } else if side.moves_x() {
            h = w.abs() / aspect;
        } else if side.moves_y() {
            w = h.abs() * aspect;
        }
    }

    let (x0, x1) = if side.contains(Side::LEFT) {
        (initial.right(), initial.right() - w)
    } else if side.contains(Side::RIGHT) {
        (initial.x, initial.x + w)
    } else {
        let cx = initial.x + initial.width / 2.0;
        (cx - w / 2.0, cx + w / 2.0)
    };
    let (y0, y1) = if side.contains(Side::TOP) {
        (initial.bottom(), initial.bottom() - h)
    } else if side.contains(Side::BOTTOM) {
        (initial.y, initial.y + h)
    } else {
        let cy = initial.y + initial.height / 2.0;
        (cy - h / 2.0, cy + h / 2.0)
    };

    let out = CssRect::from_corners(CssPoint::new(x0, y0), CssPoint::new(x1, y1));
    if out.width < min_size || out.height < min_size {
        return None;
    }
    Some(out)
}

// =============================================================================
// DRAG STATE
// =============================================================================

/// One element taking part in a move gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragMember {
    pub id: EntityId,
    /// Optimistic move delta already in place when the gesture started.
    pub base_dx: f64,
    pub base_dy: f64,
}

/// The active pointer gesture. `None` is both the initial and terminal state.
#[derive(Debug, Clone, Default)]
pub enum DragState {
    #[default]
    None,
    /// Moving the selection; every member shares the same cumulative delta.
    Translating {
        members: Vec<DragMember>,
        /// CSS position of the pointer at pointer-down.
        start: CssPoint,
        /// Latest CSS position of the pointer.
        current: CssPoint,
        /// Bounds of the grabbed element at pointer-down, used for snapping.
        grabbed: CssRect,
        /// Snapped normalized delta written to the preview by the last move.
        delta: (f64, f64),
    },
    /// Resizing a single annotation from one handle.
    Resizing {
        id: EntityId,
        initial_bounds: CssRect,
        side: Side,
        start: CssPoint,
        /// Last accepted bounds; kept when a move would go below the minimum size.
        preview: CssRect,
    },
    /// Resizing a multi-selection by the handles of its union box.
    GroupResizing {
        initial_bounds: CssRect,
        side: Side,
        start: CssPoint,
        /// Each annotation's bounds at pointer-down.
        members: Vec<(EntityId, CssRect)>,
        preview: CssRect,
    },
    /// Rubber-band selection over empty canvas.
    AreaSelecting {
        origin: CssPoint,
        current: CssPoint,
        additive: bool,
    },
    /// Dragging out a new annotation.
    Drawing {
        kind: AnnotationKind,
        start: CssPoint,
        points: Vec<CssPoint>,
    },
}

impl DragState {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Ids whose previews this gesture is currently writing.
    #[must_use]
    pub fn active_ids(&self) -> Vec<EntityId> {
        match self {
            Self::Translating { members, .. } => members.iter().map(|m| m.id).collect(),
            Self::Resizing { id, .. } => vec![*id],
            Self::GroupResizing { members, .. } => members.iter().map(|(id, _)| *id).collect(),
            Self::None | Self::AreaSelecting { .. } | Self::Drawing { .. } => Vec::new(),
        }
    }
}
