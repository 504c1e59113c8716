#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;

fn rect() -> CssRect {
    CssRect::new(100.0, 100.0, 200.0, 100.0)
}

// =============================================================
// Tool / Modifiers
// =============================================================

#[test]
fn tool_default_is_select() {
    assert_eq!(Tool::default(), Tool::Select);
}

#[test]
fn tool_draw_carries_kind() {
    assert_eq!(Tool::Draw(AnnotationKind::Circle), Tool::Draw(AnnotationKind::Circle));
    assert_ne!(Tool::Draw(AnnotationKind::Circle), Tool::Draw(AnnotationKind::Arrow));
}

#[test]
fn modifiers_default_does_not_extend() {
    assert!(!Modifiers::default().extends_selection());
}

#[test]
fn shift_ctrl_meta_extend_but_alt_does_not() {
    assert!(Modifiers { shift: true, ..Default::default() }.extends_selection());
    assert!(Modifiers { ctrl: true, ..Default::default() }.extends_selection());
    assert!(Modifiers { meta: true, ..Default::default() }.extends_selection());
    assert!(!Modifiers { alt: true, ..Default::default() }.extends_selection());
}

// =============================================================
// Side
// =============================================================

#[test]
fn corners_are_unions_of_edges() {
    assert_eq!(Side::TOP | Side::LEFT, Side::TOP_LEFT);
    assert_eq!(Side::BOTTOM | Side::RIGHT, Side::BOTTOM_RIGHT);
    assert_eq!(Side::TOP_RIGHT.bits(), 9);
}

#[test]
fn side_contains_and_axes() {
    assert!(Side::TOP_LEFT.contains(Side::TOP));
    assert!(Side::TOP_LEFT.contains(Side::LEFT));
    assert!(!Side::TOP_LEFT.contains(Side::RIGHT));
    assert!(Side::TOP_LEFT.is_corner());
    assert!(!Side::LEFT.is_corner());
    assert!(Side::LEFT.moves_x());
    assert!(!Side::LEFT.moves_y());
}

#[test]
fn handles_are_distinct() {
    for (i, a) in Side::HANDLES.iter().enumerate() {
        for (j, b) in Side::HANDLES.iter().enumerate() {
            assert_eq!(i == j, a == b);
        }
    }
}

#[test]
fn anchor_on_places_handles() {
    let r = rect();
    assert_eq!(Side::TOP_LEFT.anchor_on(r), CssPoint::new(100.0, 100.0));
    assert_eq!(Side::BOTTOM_RIGHT.anchor_on(r), CssPoint::new(300.0, 200.0));
    assert_eq!(Side::TOP.anchor_on(r), CssPoint::new(200.0, 100.0));
    assert_eq!(Side::RIGHT.anchor_on(r), CssPoint::new(300.0, 150.0));
}

// =============================================================
// resize_bounds
// =============================================================

#[test]
fn bottom_right_grows_from_top_left() {
    let out = resize_bounds(rect(), Side::BOTTOM_RIGHT, 20.0, 10.0, false, 10.0);
    assert_eq!(out, Some(CssRect::new(100.0, 100.0, 220.0, 110.0)));
}

#[test]
fn top_left_keeps_bottom_right_anchored() {
    let out = resize_bounds(rect(), Side::TOP_LEFT, 20.0, 10.0, false, 10.0);
    assert_eq!(out, Some(CssRect::new(120.0, 110.0, 180.0, 90.0)));
}

#[test]
fn edge_handle_only_changes_one_axis() {
    let out = resize_bounds(rect(), Side::RIGHT, -50.0, 999.0, false, 10.0);
    assert_eq!(out, Some(CssRect::new(100.0, 100.0, 150.0, 100.0)));
}

#[test]
fn dragging_past_anchor_flips() {
    let out = resize_bounds(rect(), Side::RIGHT, -250.0, 0.0, false, 10.0);
    assert_eq!(out, Some(CssRect::new(50.0, 100.0, 50.0, 100.0)));
}

#[test]
fn below_minimum_is_rejected() {
    assert_eq!(resize_bounds(rect(), Side::RIGHT, -195.0, 0.0, false, 10.0), None);
    assert_eq!(resize_bounds(rect(), Side::BOTTOM, 0.0, -91.0, false, 10.0), None);
}

#[test]
fn exactly_minimum_is_accepted() {
    let out = resize_bounds(rect(), Side::RIGHT, -190.0, 0.0, false, 10.0);
    assert_eq!(out, Some(CssRect::new(100.0, 100.0, 10.0, 100.0)));
}

#[test]
fn shift_corner_keeps_aspect() {
    let out = resize_bounds(rect(), Side::BOTTOM_RIGHT, 200.0, 10.0, true, 10.0);
    let out = out.unwrap_or_default();
    assert_eq!(out.x, 100.0);
    assert_eq!(out.y, 100.0);
    assert_eq!(out.width, 400.0);
    assert_eq!(out.height, 200.0);
}

#[test]
fn shift_corner_flips_with_aspect() {
    let out = resize_bounds(rect(), Side::BOTTOM_RIGHT, -400.0, -200.0, true, 10.0).unwrap_or_default();
    assert_eq!(out.width / out.height, 2.0);
    assert_eq!(out.right(), 100.0);
    assert_eq!(out.bottom(), 100.0);
}

#[test]
fn shift_edge_grows_other_axis_about_center() {
    let out = resize_bounds(rect(), Side::RIGHT, 200.0, 0.0, true, 10.0).unwrap_or_default();
    assert_eq!(out.width, 400.0);
    assert_eq!(out.height, 200.0);
    assert_eq!(out.y + out.height / 2.0, 150.0);
}

// =============================================================
// DragState
// =============================================================

#[test]
fn drag_state_default_is_none() {
    assert!(DragState::default().is_none());
    assert!(DragState::default().active_ids().is_empty());
}

#[test]
fn active_ids_of_translating_lists_members() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let state = DragState::Translating {
        members: vec![
            DragMember { id: a, base_dx: 0.0, base_dy: 0.0 },
            DragMember { id: b, base_dx: 0.0, base_dy: 0.0 },
        ],
        start: CssPoint::new(0.0, 0.0),
        current: CssPoint::new(0.0, 0.0),
        grabbed: rect(),
        delta: (0.0, 0.0),
    };
    assert_eq!(state.active_ids(), vec![a, b]);
    assert!(!state.is_none());
}

#[test]
fn area_select_has_no_active_ids() {
    let state = DragState::AreaSelecting {
        origin: CssPoint::new(0.0, 0.0),
        current: CssPoint::new(5.0, 5.0),
        additive: false,
    };
    assert!(state.active_ids().is_empty());
}
