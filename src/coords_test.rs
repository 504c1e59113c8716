#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-6;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

// --- to_rendered / to_normalized ---

#[test]
fn to_rendered_maps_into_rect() {
    let rect = CssRect::new(10.0, 20.0, 200.0, 100.0);
    let p = to_rendered(NormalizedPoint::new(0.5, 0.25), rect);
    assert!(approx_eq(p.x, 110.0));
    assert!(approx_eq(p.y, 45.0));
}

#[test]
fn to_normalized_inverts_offset_and_scale() {
    let rect = CssRect::new(10.0, 20.0, 200.0, 100.0);
    let p = to_normalized(CssPoint::new(110.0, 45.0), rect);
    assert!(approx_eq(p.x, 0.5));
    assert!(approx_eq(p.y, 0.25));
}

#[test]
fn round_trip_holds_for_many_points_and_rects() {
    let rects = [
        CssRect::new(0.0, 0.0, 1000.0, 500.0),
        CssRect::new(-35.5, 12.25, 3.0, 7.0),
        CssRect::new(1e4, 1e4, 1920.0, 1080.0),
    ];
    for rect in rects {
        for i in 0..=10 {
            for j in 0..=10 {
                let p = NormalizedPoint::new(f64::from(i) / 10.0, f64::from(j) / 10.0);
                let back = to_normalized(to_rendered(p, rect), rect);
                assert!(approx_eq(back.x, p.x), "x {p:?} in {rect:?}");
                assert!(approx_eq(back.y, p.y), "y {p:?} in {rect:?}");
            }
        }
    }
}

#[test]
fn to_normalized_degenerate_rect_maps_to_zero() {
    let p = to_normalized(CssPoint::new(50.0, 50.0), CssRect::new(0.0, 0.0, 0.0, 0.0));
    assert_eq!(p, NormalizedPoint::new(0.0, 0.0));
}

#[test]
fn css_delta_scenario_b() {
    let (dx, dy) = css_delta_to_normalized(50.0, 20.0, CssRect::new(0.0, 0.0, 1000.0, 500.0));
    assert!(approx_eq(dx, 0.05));
    assert!(approx_eq(dy, 0.04));
}

// --- native <-> css ---

#[test]
fn native_to_css_scales_by_render_ratio() {
    let css = to_css_from_native(
        NativePoint::new(960.0, 540.0),
        Size::new(1920.0, 1080.0),
        CssRect::new(100.0, 0.0, 480.0, 270.0),
    );
    assert!(approx_eq(css.x, 340.0));
    assert!(approx_eq(css.y, 135.0));
}

#[test]
fn css_to_native_inverts_native_to_css() {
    let size = Size::new(1280.0, 720.0);
    let rendered = CssRect::new(13.0, 7.0, 640.0, 360.0);
    let native = NativePoint::new(321.0, 654.0);
    let back = to_native_from_css(to_css_from_native(native, size, rendered), size, rendered);
    assert!(approx_eq(back.x, native.x));
    assert!(approx_eq(back.y, native.y));
}

#[test]
fn native_to_css_degenerate_size_returns_origin() {
    let css = to_css_from_native(NativePoint::new(5.0, 5.0), Size::default(), CssRect::new(3.0, 4.0, 10.0, 10.0));
    assert_eq!(css, CssPoint::new(3.0, 4.0));
}

// --- letterbox ---

#[test]
fn letterbox_wide_container_pillarboxes() {
    let lb = letterbox(CssRect::new(0.0, 0.0, 1000.0, 500.0), Size::new(1920.0, 1080.0));
    assert!(approx_eq(lb.rendered_height, 500.0));
    assert!(approx_eq(lb.rendered_width, 8000.0 / 9.0));
    assert!(approx_eq(lb.offset_x, (1000.0 - 8000.0 / 9.0) / 2.0));
    assert!(approx_eq(lb.offset_y, 0.0));
}

#[test]
fn letterbox_tall_container_letterboxes() {
    let lb = letterbox(CssRect::new(0.0, 0.0, 400.0, 400.0), Size::new(1600.0, 900.0));
    assert!(approx_eq(lb.rendered_width, 400.0));
    assert!(approx_eq(lb.rendered_height, 225.0));
    assert!(approx_eq(lb.offset_x, 0.0));
    assert!(approx_eq(lb.offset_y, 87.5));
}

#[test]
fn letterbox_matching_aspect_has_no_offsets() {
    let lb = letterbox(CssRect::new(0.0, 0.0, 1000.0, 500.0), Size::new(2000.0, 1000.0));
    assert!(approx_eq(lb.offset_x, 0.0));
    assert!(approx_eq(lb.offset_y, 0.0));
    assert!(approx_eq(lb.rendered_width, 1000.0));
}

#[test]
fn letterbox_degenerate_native_uses_container() {
    let lb = letterbox(CssRect::new(0.0, 0.0, 300.0, 200.0), Size::new(0.0, 0.0));
    assert_eq!(lb.rendered_width, 300.0);
    assert_eq!(lb.rendered_height, 200.0);
    assert_eq!(lb.offset_x, 0.0);
}

#[test]
fn content_rect_adds_container_origin() {
    let container = CssRect::new(50.0, 60.0, 400.0, 400.0);
    let content = letterbox(container, Size::new(1600.0, 900.0)).content_rect(container);
    assert!(approx_eq(content.x, 50.0));
    assert!(approx_eq(content.y, 147.5));
}

#[test]
fn scenario_a_bounds_in_letterboxed_content() {
    let container = CssRect::new(0.0, 0.0, 1000.0, 500.0);
    let content = letterbox(container, Size::new(1920.0, 1080.0)).content_rect(container);
    let css = NormalizedRect::new(0.1, 0.1, 0.2, 0.2).to_css(content);
    let rendered_width = 8000.0 / 9.0;
    let offset_x = (1000.0 - rendered_width) / 2.0;
    assert!(approx_eq(css.x, offset_x + 0.1 * rendered_width));
    assert!(approx_eq(css.y, 50.0));
    assert!(approx_eq(css.width, 0.2 * rendered_width));
    assert!(approx_eq(css.height, 100.0));
}

#[test]
fn scenario_a_without_letterbox_origin_is_100() {
    let content = CssRect::new(0.0, 0.0, 1000.0, 500.0);
    let css = NormalizedRect::new(0.1, 0.1, 0.2, 0.2).to_css(content);
    assert!(approx_eq(css.x, 100.0));
    assert!(approx_eq(css.y, 50.0));
}

// --- rect helpers ---

#[test]
fn envelope_of_points() {
    let env = NormalizedRect::envelope(&[
        NormalizedPoint::new(0.3, 0.1),
        NormalizedPoint::new(0.1, 0.4),
        NormalizedPoint::new(0.2, 0.2),
    ]);
    let env = env.unwrap();
    assert!(approx_eq(env.x, 0.1));
    assert!(approx_eq(env.y, 0.1));
    assert!(approx_eq(env.width, 0.2));
    assert!(approx_eq(env.height, 0.3));
}

#[test]
fn envelope_of_nothing_is_none() {
    assert!(NormalizedRect::envelope(&[]).is_none());
}

#[test]
fn map_point_scales_between_rects() {
    let from = NormalizedRect::new(0.0, 0.0, 0.5, 0.5);
    let to = NormalizedRect::new(0.5, 0.5, 0.25, 0.25);
    let p = from.map_point(to, NormalizedPoint::new(0.5, 0.25));
    assert!(approx_eq(p.x, 0.75));
    assert!(approx_eq(p.y, 0.625));
}

#[test]
fn css_rect_normalized_round_trip() {
    let content = CssRect::new(20.0, 10.0, 800.0, 450.0);
    let n = NormalizedRect::new(0.25, 0.5, 0.1, 0.2);
    let back = n.to_css(content).to_normalized(content);
    assert!(approx_eq(back.x, n.x));
    assert!(approx_eq(back.y, n.y));
    assert!(approx_eq(back.width, n.width));
    assert!(approx_eq(back.height, n.height));
}

#[test]
fn from_corners_normalizes_direction() {
    let r = CssRect::from_corners(CssPoint::new(50.0, 40.0), CssPoint::new(10.0, 80.0));
    assert_eq!(r, CssRect::new(10.0, 40.0, 40.0, 40.0));
}

#[test]
fn intersects_and_contains() {
    let a = CssRect::new(0.0, 0.0, 10.0, 10.0);
    assert!(a.intersects(CssRect::new(5.0, 5.0, 10.0, 10.0)));
    assert!(!a.intersects(CssRect::new(11.0, 0.0, 5.0, 5.0)));
    assert!(a.contains(CssPoint::new(10.0, 0.0)));
    assert!(!a.contains(CssPoint::new(10.1, 0.0)));
}

#[test]
fn union_spans_both() {
    let u = CssRect::new(0.0, 0.0, 10.0, 10.0).union(CssRect::new(20.0, -5.0, 5.0, 5.0));
    assert_eq!(u, CssRect::new(0.0, -5.0, 25.0, 15.0));
}
