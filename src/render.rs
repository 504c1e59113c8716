//! Draw operations, the host drawing surface, and the overlay scene.
//!
//! Rendering is expressed as data first: the frame clock and the comparison
//! compositor build a list of [`DrawOp`]s, and [`paint`] replays them onto a
//! host [`Surface`]. The annotation layer is described by an [`Overlay`] that
//! the UI layer draws on every state change; nothing mutates a previously
//! rendered shape in place.

use serde::Serialize;

use crate::coords::CssRect;
use crate::doc::EntityId;
use crate::geometry::EntityKind;
use crate::input::Side;
use crate::media::MediaElement;
use crate::snap::SnapGuide;

/// Which media element a draw operation samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Primary,
    Comparison,
}

/// Draw the current frame of `track` into `dest`, optionally clipped, at `alpha`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawOp {
    pub track: Track,
    pub dest: CssRect,
    pub clip: Option<CssRect>,
    pub alpha: f64,
}

/// A compositing target the host can draw media frames into.
pub trait Surface: Send {
    /// Erase the whole surface.
    fn clear(&mut self);

    /// Draw the current frame of `source` as described by `op`.
    fn draw(&mut self, source: &dyn MediaElement, op: &DrawOp);
}

/// Clear `surface` and replay `ops`, resolving each op's track to an element.
///
/// Ops for a comparison track are skipped when no comparison element is given.
pub fn paint(
    surface: &mut dyn Surface,
    ops: &[DrawOp],
    primary: &dyn MediaElement,
    comparison: Option<&dyn MediaElement>,
) {
    surface.clear();
    for op in ops {
        let source = match op.track {
            Track::Primary => primary,
            Track::Comparison => match comparison {
                Some(media) => media,
                None => continue,
            },
        };
        surface.draw(source, op);
    }
}

/// One annotation or comment as the overlay should draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayElement {
    pub id: EntityId,
    pub kind: EntityKind,
    pub bounds: CssRect,
    pub selected: bool,
    /// True while an optimistic override is shaping these bounds.
    pub pending: bool,
}

/// A resize handle drawn on the selection box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HandleRect {
    pub side: Side,
    pub rect: CssRect,
}

/// Everything the UI layer needs to draw the annotation layer for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overlay {
    pub elements: Vec<OverlayElement>,
    pub selection_box: Option<CssRect>,
    pub handles: Vec<HandleRect>,
    pub area: Option<CssRect>,
    pub drawing: Option<CssRect>,
    pub guides: Vec<SnapGuide>,
}
