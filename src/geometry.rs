//! Renderable bounds for annotations and comments.
//!
//! Bounds are resolved in this order:
//!
//! 1. an optimistic `Resize` replaces the bounds outright;
//! 2. an optimistic `Move` shifts the base bounds by its delta;
//! 3. otherwise the persisted drawing data is used.
//!
//! The base of an annotation is its authoritative geometry field (`bounds`,
//! the envelope of `points`, or the envelope of a parsed `path`). Entities
//! with no extent get a fixed default box centered on `position`; comments
//! are always a fixed-diameter bubble. Results are CSS pixels inside the
//! caller's content rectangle, so callers must pass the current one.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::Serialize;

use crate::consts::{COMMENT_DIAMETER_PX, DEFAULT_ELEMENT_SIZE_PX};
use crate::coords::{CssRect, NormalizedPoint, NormalizedRect, to_rendered};
use crate::doc::{Annotation, Comment, EntityId};
use crate::optimistic::{Change, OptimisticUpdate};

/// Whether an entity is an annotation or a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Annotation,
    Comment,
}

/// Resolved CSS bounds of one entity, the unit hit-testing and snapping work on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementBounds {
    pub id: EntityId,
    pub kind: EntityKind,
    pub bounds: CssRect,
}

/// Bounds of an annotation after applying any optimistic override.
#[must_use]
pub fn annotation_bounds(annotation: &Annotation, update: Option<&OptimisticUpdate>, content: CssRect) -> CssRect {
    match update.map(|u| u.change) {
        Some(Change::Resize { bounds }) => bounds.to_css(content),
        Some(Change::Move { dx, dy }) => {
            base_annotation_bounds(annotation, content).translate(dx * content.width, dy * content.height)
        }
        None => base_annotation_bounds(annotation, content),
    }
}

fn base_annotation_bounds(annotation: &Annotation, content: CssRect) -> CssRect {
    match annotation.drawing_data.extent() {
        Some(extent) => extent.to_css(content),
        None => CssRect::centered(
            to_rendered(annotation.position, content),
            DEFAULT_ELEMENT_SIZE_PX,
            DEFAULT_ELEMENT_SIZE_PX,
        ),
    }
}

/// Bubble bounds of a comment. Only `Move` overrides apply; comments are fixed-size.
#[must_use]
pub fn comment_bounds(comment: &Comment, update: Option<&OptimisticUpdate>, content: CssRect) -> CssRect {
    let position = match update.map(|u| u.change) {
        Some(Change::Move { dx, dy }) => comment.position.translate(dx, dy),
        _ => comment.position,
    };
    CssRect::centered(to_rendered(position, content), COMMENT_DIAMETER_PX, COMMENT_DIAMETER_PX)
}

// =============================================================================
// PATHS
// =============================================================================

/// One absolute segment of a drawing path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    Move(NormalizedPoint),
    Line(NormalizedPoint),
    Quad { control: NormalizedPoint, to: NormalizedPoint },
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(char),
    Number(f64),
}

fn tokenize(path: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut number = String::new();
    let flush = |number: &mut String, tokens: &mut Vec<Token>| -> Option<()> {
        if !number.is_empty() {
            match number.parse::<f64>() {
                Ok(n) => tokens.push(Token::Number(n)),
                Err(_) => return None,
            }
            number.clear();
        }
        Some(())
    };

    for ch in path.chars() {
        match ch {
            'M' | 'm' | 'L' | 'l' | 'Q' | 'q' | 'Z' | 'z' => {
                flush(&mut number, &mut tokens)?;
                tokens.push(Token::Command(ch));
            }
            '-' | '+' if !number.is_empty() && !number.ends_with(['e', 'E']) => {
                flush(&mut number, &mut tokens)?;
                number.push(ch);
            }
            '0'..='9' | '.' | '-' | '+' | 'e' | 'E' => number.push(ch),
            c if c.is_whitespace() || c == ',' => flush(&mut number, &mut tokens)?,
            _ => return None,
        }
    }
    flush(&mut number, &mut tokens)?;
    Some(tokens)
}

/// Parse a path made of move, line and quadratic commands (absolute or relative).
///
/// Coordinate pairs following a command repeat it, except after a move where
/// they become lines. Returns `None` for unsupported commands or malformed numbers.
#[must_use]
pub fn parse_path(path: &str) -> Option<Vec<PathSegment>> {
    let tokens = tokenize(path)?;
    let mut segments = Vec::new();
    let mut current = NormalizedPoint::default();
    let mut subpath_start = current;
    let mut command: Option<char> = None;
    let mut i = 0;

    let take = |i: &mut usize| -> Option<f64> {
        match tokens.get(*i) {
            Some(Token::Number(n)) => {
                *i += 1;
                Some(*n)
            }
            _ => None,
        }
    };

    while i < tokens.len() {
        if let Token::Command(c) = tokens[i] {
            command = Some(c);
            i += 1;
            if matches!(c, 'Z' | 'z') {
                segments.push(PathSegment::Close);
                current = subpath_start;
                continue;
            }
        }
        let cmd = command?;
        let relative = cmd.is_ascii_lowercase();
        let resolve = |x: f64, y: f64, from: NormalizedPoint| {
            if relative { from.translate(x, y) } else { NormalizedPoint::new(x, y) }
        };

        match cmd.to_ascii_uppercase() {
            'M' => {
                let p = resolve(take(&mut i)?, take(&mut i)?, current);
                segments.push(PathSegment::Move(p));
                current = p;
                subpath_start = p;
                command = Some(if relative { 'l' } else { 'L' });
            }
            'L' => {
                let p = resolve(take(&mut i)?, take(&mut i)?, current);
                segments.push(PathSegment::Line(p));
                current = p;
            }
            'Q' => {
                let control = resolve(take(&mut i)?, take(&mut i)?, current);
                let to = resolve(take(&mut i)?, take(&mut i)?, current);
                segments.push(PathSegment::Quad { control, to });
                current = to;
            }
            _ => return None,
        }
    }
    Some(segments)
}

/// Serialize segments as an absolute path string.
#[must_use]
pub fn serialize_path(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(|s| match s {
            PathSegment::Move(p) => format!("M {} {}", p.x, p.y),
            PathSegment::Line(p) => format!("L {} {}", p.x, p.y),
            PathSegment::Quad { control, to } => format!("Q {} {} {} {}", control.x, control.y, to.x, to.y),
            PathSegment::Close => "Z".to_owned(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Envelope of every point a path touches, control points included.
#[must_use]
pub fn path_envelope(path: &str) -> Option<NormalizedRect> {
    let points: Vec<NormalizedPoint> = parse_path(path)?
        .into_iter()
        .flat_map(|s| match s {
            PathSegment::Move(p) | PathSegment::Line(p) => vec![p],
            PathSegment::Quad { control, to } => vec![control, to],
            PathSegment::Close => Vec::new(),
        })
        .collect();
    NormalizedRect::envelope(&points)
}

/// Rewrite every point of `path` through `f`, returning an absolute path.
///
/// Unparsable paths are returned unchanged.
#[must_use]
pub fn map_path(path: &str, f: impl Fn(NormalizedPoint) -> NormalizedPoint) -> String {
    let Some(segments) = parse_path(path) else {
        return path.to_owned();
    };
    let mapped: Vec<PathSegment> = segments
        .into_iter()
        .map(|s| match s {
            PathSegment::Move(p) => PathSegment::Move(f(p)),
            PathSegment::Line(p) => PathSegment::Line(f(p)),
            PathSegment::Quad { control, to } => PathSegment::Quad { control: f(control), to: f(to) },
            PathSegment::Close => PathSegment::Close,
        })
        .collect();
    serialize_path(&mapped)
}
