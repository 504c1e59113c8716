//! Alignment guides between a moving element and its neighbours.
//!
//! Candidates are the other elements' bounds. Only candidates whose center
//! lies within `search_radius_px` of the moving element's center are
//! considered, and at most `max_candidates` of those (nearest first). Each
//! candidate offers three guide values per axis (its two edges and its
//! center). Per axis, the single closest pairing of a guide value with one of
//! the moving element's own edges or center wins if it is within
//! `threshold_px`, and the element is offset so that edge lands exactly on
//! the guide. Ties keep the earlier candidate.

#[cfg(test)]
#[path = "snap_test.rs"]
mod snap_test;

use serde::Serialize;

use crate::coords::CssRect;
use crate::doc::EntityId;
use crate::geometry::ElementBounds;

/// Snap tuning, in CSS pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapConfig {
    pub enabled: bool,
    /// Maximum edge-to-guide distance that still snaps.
    pub threshold_px: f64,
    /// Candidates whose centers are farther than this are ignored.
    pub search_radius_px: f64,
    /// Cap on candidates kept after the radius filter.
    pub max_candidates: usize,
    /// Distance at which a guide's opacity reaches zero.
    pub fade_distance_px: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self { enabled: true, threshold_px: 5.0, search_radius_px: 300.0, max_candidates: 8, fade_distance_px: 10.0 }
    }
}

/// Orientation of a guide line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// A vertical line at an x value.
    Vertical,
    /// A horizontal line at a y value.
    Horizontal,
}

/// Which edge of the source element a guide runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Edge {
    Left,
    Right,
    CenterX,
    Top,
    Bottom,
    CenterY,
}

/// An active alignment line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapGuide {
    /// x for vertical guides, y for horizontal guides.
    pub value: f64,
    pub axis: Axis,
    pub source: EntityId,
    pub edge: Edge,
    /// 1.0 at exact alignment, fading linearly to 0.0 at the fade distance.
    pub opacity: f64,
}

/// Offset to apply to the moving element and the guides that caused it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapResult {
    pub dx: f64,
    pub dy: f64,
    /// At most one guide per axis.
    pub guides: Vec<SnapGuide>,
}

impl SnapResult {
    /// `bounds` shifted by the snap offset.
    #[must_use]
    pub fn apply(&self, bounds: CssRect) -> CssRect {
        bounds.translate(self.dx, self.dy)
    }
}

fn vertical_lines(r: CssRect) -> [(Edge, f64); 3] {
    [(Edge::Left, r.x), (Edge::CenterX, r.center().x), (Edge::Right, r.right())]
}

fn horizontal_lines(r: CssRect) -> [(Edge, f64); 3] {
    [(Edge::Top, r.y), (Edge::CenterY, r.center().y), (Edge::Bottom, r.bottom())]
}

/// Best guide on one axis: `(guide, offset)`.
fn best_on_axis(
    axis: Axis,
    moving: [(Edge, f64); 3],
    candidates: &[&ElementBounds],
    lines: fn(CssRect) -> [(Edge, f64); 3],
    config: &SnapConfig,
) -> Option<(SnapGuide, f64)> {
    let mut best: Option<(SnapGuide, f64, f64)> = None;
    for candidate in candidates {
        for (edge, value) in lines(candidate.bounds) {
            for (_, own) in moving {
                let distance = (value - own).abs();
                if distance > config.threshold_px {
                    continue;
                }
                if best.as_ref().is_some_and(|(_, _, d)| *d <= distance) {
                    continue;
                }
                let opacity = (1.0 - distance / config.fade_distance_px).clamp(0.0, 1.0);
                let guide = SnapGuide { value, axis, source: candidate.id, edge, opacity };
                best = Some((guide, value - own, distance));
            }
        }
    }
    best.map(|(guide, offset, _)| (guide, offset))
}

/// Snap `moving` against `others`, skipping `moving_ids` (the elements being dragged).
#[must_use]
pub fn compute_snap(
    moving: CssRect,
    moving_ids: &[EntityId],
    others: &[ElementBounds],
    config: &SnapConfig,
) -> SnapResult {
    if !config.enabled {
        return SnapResult::default();
    }

    let center = moving.center();
    let mut near: Vec<(&ElementBounds, f64)> = others
        .iter()
        .filter(|e| !moving_ids.contains(&e.id))
        .map(|e| (e, e.bounds.center().distance(center)))
        .filter(|(_, d)| *d <= config.search_radius_px)
        .collect();
    near.sort_by(|a, b| a.1.total_cmp(&b.1));
    near.truncate(config.max_candidates);
    let candidates: Vec<&ElementBounds> = near.into_iter().map(|(e, _)| e).collect();

    let mut result = SnapResult::default();
    if let Some((guide, offset)) =
        best_on_axis(Axis::Vertical, vertical_lines(moving), &candidates, vertical_lines, config)
    {
        result.dx = offset;
        result.guides.push(guide);
    }
    if let Some((guide, offset)) =
        best_on_axis(Axis::Horizontal, horizontal_lines(moving), &candidates, horizontal_lines, config)
    {
        result.dy = offset;
        result.guides.push(guide);
    }
    result
}
