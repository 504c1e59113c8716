//! Hit-testing over resolved element bounds.
//!
//! Handles of the current selection box are tested first so a handle drawn
//! over another element still wins. Bodies are tested topmost first: the
//! element list is in draw order (annotations, then comment bubbles), so it
//! is walked in reverse. Comment bubbles are circles; everything else is its
//! bounding rectangle.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::consts::HANDLE_RADIUS_PX;
use crate::coords::{CssPoint, CssRect};
use crate::doc::EntityId;
use crate::geometry::{ElementBounds, EntityKind};
use crate::input::Side;
use crate::render::HandleRect;

/// What the pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hit {
    /// A resize handle of the selection box.
    Handle(Side),
    /// The body of an element.
    Element(ElementBounds),
}

/// Handle squares for a selection box, corners first.
#[must_use]
pub fn handles(selection: CssRect) -> Vec<HandleRect> {
    let size = HANDLE_RADIUS_PX * 2.0;
    Side::HANDLES
        .iter()
        .map(|&side| HandleRect { side, rect: CssRect::centered(side.anchor_on(selection), size, size) })
        .collect()
}

/// The handle of `selection` within reach of `p`, if any.
#[must_use]
pub fn hit_handle(p: CssPoint, selection: CssRect) -> Option<Side> {
    Side::HANDLES.iter().copied().find(|side| side.anchor_on(selection).distance(p) <= HANDLE_RADIUS_PX)
}

fn hits_body(p: CssPoint, element: &ElementBounds) -> bool {
    match element.kind {
        EntityKind::Comment => element.bounds.center().distance(p) <= element.bounds.width / 2.0,
        EntityKind::Annotation => element.bounds.contains(p),
    }
}

/// The topmost element whose body contains `p`.
#[must_use]
pub fn hit_element(p: CssPoint, elements: &[ElementBounds]) -> Option<ElementBounds> {
    elements.iter().rev().find(|e| hits_body(p, e)).copied()
}

/// Full hit test: selection handles first, then element bodies.
#[must_use]
pub fn hit_test(p: CssPoint, elements: &[ElementBounds], selection: Option<CssRect>) -> Option<Hit> {
    if let Some(side) = selection.and_then(|s| hit_handle(p, s)) {
        return Some(Hit::Handle(side));
    }
    hit_element(p, elements).map(Hit::Element)
}

/// Ids of every element whose bounds intersect `area`, in draw order.
#[must_use]
pub fn intersecting(area: CssRect, elements: &[ElementBounds]) -> Vec<EntityId> {
    elements.iter().filter(|e| e.bounds.intersects(area)).map(|e| e.id).collect()
}
