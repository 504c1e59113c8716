use tokio::time::Instant;
use uuid::Uuid;

use super::*;
use crate::coords::{Size, letterbox};
use crate::doc::{AnnotationKind, CommentStatus, DrawingData};

const CONTENT: CssRect = CssRect { x: 0.0, y: 0.0, width: 1000.0, height: 500.0 };

fn annotation(kind: AnnotationKind, data: DrawingData) -> Annotation {
    Annotation {
        id: Uuid::new_v4(),
        frame_number: 0,
        kind,
        position: NormalizedPoint::new(0.5, 0.5),
        drawing_data: data,
        deleted: false,
    }
}

fn comment_at(x: f64, y: f64) -> Comment {
    Comment {
        id: Uuid::new_v4(),
        frame_number: 0,
        frame_timestamp: 0.0,
        position: NormalizedPoint::new(x, y),
        content: "here".to_owned(),
        thread_id: None,
        status: CommentStatus::Open,
        created_at: 0,
        created_by_name: "Dana".to_owned(),
        deleted: false,
    }
}

fn update(change: Change) -> OptimisticUpdate {
    OptimisticUpdate { change, timestamp: Instant::now() }
}

fn assert_rect(actual: CssRect, expected: (f64, f64, f64, f64)) {
    let ok = (actual.x - expected.0).abs() < 1e-9
        && (actual.y - expected.1).abs() < 1e-9
        && (actual.width - expected.2).abs() < 1e-9
        && (actual.height - expected.3).abs() < 1e-9;
    assert!(ok, "{actual:?} != {expected:?}");
}

// =============================================================
// annotation_bounds
// =============================================================

#[test]
fn bounds_sit_inside_letterboxed_content() {
    let container = CssRect::new(0.0, 0.0, 1000.0, 500.0);
    let fit = letterbox(container, Size::new(1920.0, 1080.0));
    let content = fit.content_rect(container);
    let a = annotation(AnnotationKind::Rectangle, DrawingData::with_bounds(NormalizedRect::new(0.1, 0.1, 0.2, 0.2)));

    let bounds = annotation_bounds(&a, None, content);
    assert!((fit.rendered_height - 500.0).abs() < 1e-9);
    assert_rect(
        bounds,
        (fit.offset_x + 0.1 * fit.rendered_width, 50.0, 0.2 * fit.rendered_width, 100.0),
    );
}

#[test]
fn resize_override_replaces_bounds() {
    let a = annotation(AnnotationKind::Circle, DrawingData::with_bounds(NormalizedRect::new(0.1, 0.1, 0.2, 0.2)));
    let u = update(Change::Resize { bounds: NormalizedRect::new(0.5, 0.5, 0.1, 0.1) });
    assert_rect(annotation_bounds(&a, Some(&u), CONTENT), (500.0, 250.0, 100.0, 50.0));
}

#[test]
fn move_override_shifts_base_bounds() {
    let a = annotation(AnnotationKind::Rectangle, DrawingData::with_bounds(NormalizedRect::new(0.1, 0.1, 0.2, 0.2)));
    let u = update(Change::Move { dx: 0.05, dy: -0.02 });
    assert_rect(annotation_bounds(&a, Some(&u), CONTENT), (150.0, 40.0, 200.0, 100.0));
}

#[test]
fn freehand_points_use_envelope() {
    let points = vec![NormalizedPoint::new(0.2, 0.4), NormalizedPoint::new(0.1, 0.5), NormalizedPoint::new(0.3, 0.3)];
    let a = annotation(AnnotationKind::Freehand, DrawingData::with_points(points));
    assert_rect(annotation_bounds(&a, None, CONTENT), (100.0, 150.0, 200.0, 100.0));
}

#[test]
fn freehand_path_envelope_includes_control_points() {
    let a = annotation(AnnotationKind::Freehand, DrawingData::with_path("M 0.1 0.1 Q 0.5 0.9 0.3 0.1"));
    assert_rect(annotation_bounds(&a, None, CONTENT), (100.0, 50.0, 400.0, 400.0));
}

#[test]
fn position_only_gets_default_box() {
    let a = annotation(AnnotationKind::Text, DrawingData::default());
    let half = DEFAULT_ELEMENT_SIZE_PX / 2.0;
    assert_rect(
        annotation_bounds(&a, None, CONTENT),
        (500.0 - half, 250.0 - half, DEFAULT_ELEMENT_SIZE_PX, DEFAULT_ELEMENT_SIZE_PX),
    );
}

// =============================================================
// comment_bounds
// =============================================================

#[test]
fn comment_is_fixed_bubble() {
    let c = comment_at(0.5, 0.5);
    let r = COMMENT_DIAMETER_PX / 2.0;
    assert_rect(comment_bounds(&c, None, CONTENT), (500.0 - r, 250.0 - r, COMMENT_DIAMETER_PX, COMMENT_DIAMETER_PX));
}

#[test]
fn comment_moves_but_never_resizes() {
    let c = comment_at(0.5, 0.5);
    let r = COMMENT_DIAMETER_PX / 2.0;
    let moved = update(Change::Move { dx: 0.1, dy: 0.1 });
    assert_rect(comment_bounds(&c, Some(&moved), CONTENT), (600.0 - r, 300.0 - r, COMMENT_DIAMETER_PX, COMMENT_DIAMETER_PX));

    let resized = update(Change::Resize { bounds: NormalizedRect::new(0.0, 0.0, 1.0, 1.0) });
    assert_eq!(comment_bounds(&c, Some(&resized), CONTENT), comment_bounds(&c, None, CONTENT));
}

// =============================================================
// paths
// =============================================================

#[test]
fn parses_relative_and_implicit_commands() {
    let segments = parse_path("m0.1,0.1 0.1,0 l0,0.1 z").unwrap();
    assert_eq!(
        segments,
        vec![
            PathSegment::Move(NormalizedPoint::new(0.1, 0.1)),
            PathSegment::Line(NormalizedPoint::new(0.2, 0.1)),
            PathSegment::Line(NormalizedPoint::new(0.2, 0.2)),
            PathSegment::Close,
        ]
    );
}

#[test]
fn parses_packed_signs_and_exponents() {
    let segments = parse_path("M1e-1-2e-1L0.5 0.5").unwrap();
    assert_eq!(segments[0], PathSegment::Move(NormalizedPoint::new(0.1, -0.2)));
    assert_eq!(segments[1], PathSegment::Line(NormalizedPoint::new(0.5, 0.5)));
}

#[test]
fn rejects_unsupported_commands() {
    assert_eq!(parse_path("M0 0 C 1 1 2 2 3 3"), None);
    assert_eq!(parse_path("M0 0 L 1"), None);
    assert_eq!(parse_path("0 0"), None);
}

#[test]
fn map_path_rewrites_as_absolute() {
    let moved = map_path("M0.25 0.25 l0.25 0.125", |p| p.translate(0.5, 0.0));
    assert_eq!(moved, "M 0.75 0.25 L 1 0.375");
}

#[test]
fn map_path_leaves_garbage_alone() {
    assert_eq!(map_path("not a path", |p| p), "not a path");
}
