//! Document model: annotations, comments, and the in-memory store.
//!
//! This module defines what is drawn on a frame (`Annotation`, `Comment`),
//! the geometry payload annotations carry (`DrawingData`), and the runtime
//! store that mirrors the persisted state for one review session
//! (`DocStore`).
//!
//! Data flows into this layer from the persistence service (snapshot load and
//! resolved writes). Mutations here mirror what the service does for the same
//! call, so a resolved write can be applied locally without waiting for a
//! re-read. Entities are never removed mid-session: deletion sets a tombstone
//! so an in-flight write for the same id can still resolve against it.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::NORMALIZED_EPSILON;
use crate::coords::{NormalizedPoint, NormalizedRect};
use crate::geometry::{map_path, path_envelope};

/// Unique identifier for an annotation or comment.
pub type EntityId = Uuid;

/// Shape drawn by an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Ellipse inscribed in `bounds`.
    Circle,
    /// Axis-aligned rectangle at `bounds`.
    Rectangle,
    /// Arrow from `points[0]` to `points[1]`.
    Arrow,
    /// Free stroke through `points`, or a serialized `path`.
    Freehand,
    /// Text anchored at `position`.
    Text,
}

/// Visual style of an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingStyle {
    /// Stroke color as a CSS color string.
    pub color: String,
    /// Stroke width in CSS pixels.
    pub stroke_width: f64,
    /// Label for text annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Default for DrawingStyle {
    fn default() -> Self {
        Self { color: "#FF3B30".to_owned(), stroke_width: 3.0, text: None }
    }
}

/// Geometry payload of an annotation. Exactly one of `bounds`, `points` or
/// `path` is authoritative for a given kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<NormalizedRect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<NormalizedPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub style: DrawingStyle,
}

impl DrawingData {
    #[must_use]
    pub fn with_bounds(bounds: NormalizedRect) -> Self {
        Self { bounds: Some(bounds), ..Self::default() }
    }

    #[must_use]
    pub fn with_points(points: Vec<NormalizedPoint>) -> Self {
        Self { points: Some(points), ..Self::default() }
    }

    #[must_use]
    pub fn with_path(path: impl Into<String>) -> Self {
        Self { path: Some(path.into()), ..Self::default() }
    }

    /// The rectangle spanned by the authoritative geometry field, if any.
    #[must_use]
    pub fn extent(&self) -> Option<NormalizedRect> {
        if let Some(bounds) = self.bounds {
            return Some(bounds);
        }
        if let Some(points) = &self.points {
            return NormalizedRect::envelope(points);
        }
        self.path.as_deref().and_then(path_envelope)
    }
}

/// A drawing attached to one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: EntityId,
    pub frame_number: u32,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub position: NormalizedPoint,
    pub drawing_data: DrawingData,
    /// Tombstone; deleted annotations stay in the store but are not drawn.
    #[serde(default)]
    pub deleted: bool,
}

/// Review state of a comment thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Open,
    Acknowledged,
    Resolved,
}

impl CommentStatus {
    /// Resolution toggle: anything unresolved resolves, resolved reopens.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Open | Self::Acknowledged => Self::Resolved,
            Self::Resolved => Self::Open,
        }
    }
}

/// A point comment pinned to one frame. Replies share the root's id as `thread_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: EntityId,
    pub frame_number: u32,
    /// Media time of `frame_number` in seconds.
    pub frame_timestamp: f64,
    pub position: NormalizedPoint,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<EntityId>,
    pub status: CommentStatus,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub created_by_name: String,
    #[serde(default)]
    pub deleted: bool,
}

impl Comment {
    /// Root comments start a thread and are drawn as bubbles; replies are not.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.thread_id.is_none()
    }
}

/// In-memory store of annotations and comments for one review.
#[derive(Debug, Default)]
pub struct DocStore {
    annotations: HashMap<EntityId, Annotation>,
    comments: HashMap<EntityId, Comment>,
    /// Insertion sequence, used as draw order.
    order: HashMap<EntityId, u64>,
    next_seq: u64,
}

impl DocStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all entities with a full snapshot.
    pub fn load_snapshot(&mut self, annotations: Vec<Annotation>, comments: Vec<Comment>) {
        self.annotations.clear();
        self.comments.clear();
        self.order.clear();
        self.next_seq = 0;
        for a in annotations {
            self.insert_annotation(a);
        }
        for c in comments {
            self.insert_comment(c);
        }
    }

    /// Insert or replace an annotation. Replacing keeps its draw order.
    pub fn insert_annotation(&mut self, annotation: Annotation) {
        self.touch_order(annotation.id);
        self.annotations.insert(annotation.id, annotation);
    }

    /// Insert or replace a comment. Replacing keeps its draw order.
    pub fn insert_comment(&mut self, comment: Comment) {
        self.touch_order(comment.id);
        self.comments.insert(comment.id, comment);
    }

    fn touch_order(&mut self, id: EntityId) {
        if !self.order.contains_key(&id) {
            self.order.insert(id, self.next_seq);
            self.next_seq += 1;
        }
    }

    #[must_use]
    pub fn annotation(&self, id: &EntityId) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    #[must_use]
    pub fn comment(&self, id: &EntityId) -> Option<&Comment> {
        self.comments.get(id)
    }

    /// True when `id` names a live (not tombstoned) annotation or comment.
    #[must_use]
    pub fn is_live(&self, id: &EntityId) -> bool {
        self.annotations.get(id).is_some_and(|a| !a.deleted) || self.comments.get(id).is_some_and(|c| !c.deleted)
    }

    /// Shift every listed entity by a normalized delta. Returns how many moved.
    ///
    /// Unknown ids are skipped. A zero delta leaves geometry untouched.
    pub fn apply_move(&mut self, ids: &[EntityId], dx: f64, dy: f64) -> usize {
        if dx.abs() < NORMALIZED_EPSILON && dy.abs() < NORMALIZED_EPSILON {
            return ids.iter().filter(|id| self.annotations.contains_key(id) || self.comments.contains_key(id)).count();
        }
        let mut moved = 0;
        for id in ids {
            if let Some(a) = self.annotations.get_mut(id) {
                a.position = a.position.translate(dx, dy);
                let data = &mut a.drawing_data;
                if let Some(bounds) = data.bounds.as_mut() {
                    *bounds = bounds.translate(dx, dy);
                }
                if let Some(points) = data.points.as_mut() {
                    for p in points.iter_mut() {
                        *p = p.translate(dx, dy);
                    }
                }
                if let Some(path) = data.path.as_mut() {
                    *path = map_path(path, |p| p.translate(dx, dy));
                }
                moved += 1;
            } else if let Some(c) = self.comments.get_mut(id) {
                c.position = c.position.translate(dx, dy);
                moved += 1;
            }
        }
        moved
    }

    /// Rewrite an annotation's authoritative geometry to span `bounds`.
    ///
    /// Points, path and position are mapped through the same transform as the
    /// old extent. Position-only annotations gain explicit bounds and are
    /// re-anchored at their center. Returns false for unknown ids.
    pub fn apply_resize(&mut self, id: &EntityId, bounds: NormalizedRect) -> bool {
        let Some(a) = self.annotations.get_mut(id) else {
            return false;
        };
        let Some(old) = a.drawing_data.extent() else {
            a.drawing_data.bounds = Some(bounds);
            a.position = bounds.center();
            return true;
        };

        let data = &mut a.drawing_data;
        if data.bounds.is_some() {
            data.bounds = Some(bounds);
        } else if let Some(points) = data.points.as_mut() {
            for p in points.iter_mut() {
                *p = old.map_point(bounds, *p);
            }
        } else if let Some(path) = data.path.as_mut() {
            *path = map_path(path, |p| old.map_point(bounds, p));
        }
        a.position = old.map_point(bounds, a.position);
        true
    }

    /// Set the tombstone on an annotation or comment. Returns false for unknown ids.
    pub fn tombstone(&mut self, id: &EntityId) -> bool {
        if let Some(a) = self.annotations.get_mut(id) {
            a.deleted = true;
            return true;
        }
        if let Some(c) = self.comments.get_mut(id) {
            c.deleted = true;
            return true;
        }
        false
    }

    /// Update a comment's review status. Returns false for unknown ids.
    pub fn set_comment_status(&mut self, id: &EntityId, status: CommentStatus) -> bool {
        let Some(c) = self.comments.get_mut(id) else {
            return false;
        };
        c.status = status;
        true
    }

    /// Every annotation, tombstoned ones included, in draw order.
    #[must_use]
    pub fn annotations(&self) -> Vec<&Annotation> {
        let mut out: Vec<&Annotation> = self.annotations.values().collect();
        out.sort_by_key(|a| self.seq(&a.id));
        out
    }

    /// Every comment, tombstoned ones included, in draw order.
    #[must_use]
    pub fn comments(&self) -> Vec<&Comment> {
        let mut out: Vec<&Comment> = self.comments.values().collect();
        out.sort_by_key(|c| self.seq(&c.id));
        out
    }

    /// Live annotations on `frame`, in draw order.
    #[must_use]
    pub fn annotations_on_frame(&self, frame: u32) -> Vec<&Annotation> {
        let mut out: Vec<&Annotation> =
            self.annotations.values().filter(|a| !a.deleted && a.frame_number == frame).collect();
        out.sort_by_key(|a| self.seq(&a.id));
        out
    }

    /// Live root comments on `frame`, in draw order.
    #[must_use]
    pub fn root_comments_on_frame(&self, frame: u32) -> Vec<&Comment> {
        let mut out: Vec<&Comment> = self
            .comments
            .values()
            .filter(|c| !c.deleted && c.is_root() && c.frame_number == frame)
            .collect();
        out.sort_by_key(|c| self.seq(&c.id));
        out
    }

    /// A root comment followed by its live replies, oldest first.
    ///
    /// Empty when `root_id` is unknown.
    #[must_use]
    pub fn thread(&self, root_id: &EntityId) -> Vec<&Comment> {
        let Some(root) = self.comments.get(root_id) else {
            return Vec::new();
        };
        let mut replies: Vec<&Comment> = self
            .comments
            .values()
            .filter(|c| !c.deleted && c.thread_id.as_ref() == Some(root_id))
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| self.seq(&a.id).cmp(&self.seq(&b.id))));
        let mut out = vec![root];
        out.extend(replies);
        out
    }

    fn seq(&self, id: &EntityId) -> u64 {
        self.order.get(id).copied().unwrap_or(u64::MAX)
    }

    /// Number of entities, tombstoned ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len() + self.comments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.comments.is_empty()
    }
}
