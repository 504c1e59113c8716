//! Persistence collaborator, write execution, and the debounced committer.
//!
//! DESIGN
//! ======
//! The engine never awaits the store. Every write is handed to the
//! [`Committer`], which marks the affected ids in flight, spawns a task that
//! performs the store call, and then applies the outcome to the shared
//! session under one lock: on success the persisted change is mirrored into
//! the `DocStore` and the write's optimistic contribution is reconciled away
//! in the same critical section, so the view never flickers back to stale
//! geometry. The outcome is reported as a [`CommitEvent`] on a channel the
//! engine drains.
//!
//! Keyboard nudges are debounced: each nudge accumulates into a pending move
//! for its id group and arms a trailing timer; only the timer armed by the
//! latest nudge fires. `flush_pending` submits every pending move at once.
//!
//! ERROR HANDLING
//! ==============
//! A failed write rolls back only its own optimistic contribution and is
//! reported as `CommitEvent::Failed`. Nothing here panics or propagates out
//! of the spawned task.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::coords::{NormalizedPoint, NormalizedRect};
use crate::doc::{Annotation, AnnotationKind, Comment, CommentStatus, DocStore, DrawingData, EntityId};
use crate::error::ErrorCode;
use crate::geometry::EntityKind;
use crate::session::{PendingMove, Session, SharedSession};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("entity not found: {0}")]
    NotFound(EntityId),
    #[error("invalid write: {0}")]
    Invalid(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Invalid(_) => "E_INVALID_WRITE",
            Self::Unavailable(_) => "E_STORE_UNAVAILABLE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// =============================================================================
// COLLABORATOR
// =============================================================================

/// Payload for a new annotation; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnotation {
    pub frame_number: u32,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub position: NormalizedPoint,
    pub drawing_data: DrawingData,
}

impl NewAnnotation {
    #[must_use]
    pub fn into_annotation(self, id: EntityId) -> Annotation {
        Annotation {
            id,
            frame_number: self.frame_number,
            kind: self.kind,
            position: self.position,
            drawing_data: self.drawing_data,
            deleted: false,
        }
    }
}

/// Payload for a new comment or reply; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub frame_number: u32,
    pub frame_timestamp: f64,
    pub position: NormalizedPoint,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<EntityId>,
    pub created_at: i64,
    pub created_by_name: String,
}

impl NewComment {
    #[must_use]
    pub fn into_comment(self, id: EntityId) -> Comment {
        Comment {
            id,
            frame_number: self.frame_number,
            frame_timestamp: self.frame_timestamp,
            position: self.position,
            content: self.content,
            thread_id: self.thread_id,
            status: CommentStatus::Open,
            created_at: self.created_at,
            created_by_name: self.created_by_name,
            deleted: false,
        }
    }
}

/// The persistence service holding annotations and comments.
///
/// Calls must be idempotent enough that retrying with the same final bounds
/// or delta yields the same state.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create_annotation(&self, new: NewAnnotation) -> Result<EntityId, StoreError>;

    async fn resize_annotation(&self, id: EntityId, bounds: NormalizedRect) -> Result<(), StoreError>;

    async fn move_entities(&self, ids: &[EntityId], dx: f64, dy: f64) -> Result<(), StoreError>;

    /// Soft delete.
    async fn delete_entity(&self, id: EntityId) -> Result<(), StoreError>;

    async fn create_comment(&self, new: NewComment) -> Result<EntityId, StoreError>;

    async fn resolve_comment(&self, id: EntityId, status: CommentStatus) -> Result<(), StoreError>;
}

/// In-process store backed by a `DocStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<DocStore>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_snapshot(annotations: Vec<Annotation>, comments: Vec<Comment>) -> Self {
        let mut doc = DocStore::new();
        doc.load_snapshot(annotations, comments);
        Self { doc: Mutex::new(doc) }
    }

    /// Clone out every stored entity, tombstoned ones included.
    #[must_use]
    pub fn snapshot(&self) -> (Vec<Annotation>, Vec<Comment>) {
        let doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        (
            doc.annotations().into_iter().cloned().collect(),
            doc.comments().into_iter().cloned().collect(),
        )
    }

    fn with_doc<T>(&self, f: impl FnOnce(&mut DocStore) -> T) -> T {
        let mut doc = self.doc.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut doc)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn create_annotation(&self, new: NewAnnotation) -> Result<EntityId, StoreError> {
        let id = Uuid::new_v4();
        self.with_doc(|doc| doc.insert_annotation(new.into_annotation(id)));
        Ok(id)
    }

    async fn resize_annotation(&self, id: EntityId, bounds: NormalizedRect) -> Result<(), StoreError> {
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return Err(StoreError::Invalid(format!("non-positive bounds for {id}")));
        }
        if self.with_doc(|doc| doc.apply_resize(&id, bounds)) { Ok(()) } else { Err(StoreError::NotFound(id)) }
    }

    async fn move_entities(&self, ids: &[EntityId], dx: f64, dy: f64) -> Result<(), StoreError> {
        self.with_doc(|doc| {
            if let Some(missing) = ids.iter().find(|id| doc.annotation(id).is_none() && doc.comment(id).is_none()) {
                return Err(StoreError::NotFound(*missing));
            }
            doc.apply_move(ids, dx, dy);
            Ok(())
        })
    }

    async fn delete_entity(&self, id: EntityId) -> Result<(), StoreError> {
        if self.with_doc(|doc| doc.tombstone(&id)) { Ok(()) } else { Err(StoreError::NotFound(id)) }
    }

    async fn create_comment(&self, new: NewComment) -> Result<EntityId, StoreError> {
        if new.content.trim().is_empty() {
            return Err(StoreError::Invalid("empty comment".to_owned()));
        }
        let id = Uuid::new_v4();
        self.with_doc(|doc| doc.insert_comment(new.into_comment(id)));
        Ok(id)
    }

    async fn resolve_comment(&self, id: EntityId, status: CommentStatus) -> Result<(), StoreError> {
        if self.with_doc(|doc| doc.set_comment_status(&id, status)) { Ok(()) } else { Err(StoreError::NotFound(id)) }
    }
}

// =============================================================================
// WRITES
// =============================================================================

/// One store call, as queued by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    CreateAnnotation(NewAnnotation),
    CreateComment(NewComment),
    Move { ids: Vec<EntityId>, dx: f64, dy: f64 },
    Resize { id: EntityId, bounds: NormalizedRect },
    Delete { id: EntityId },
    Resolve { id: EntityId, status: CommentStatus },
}

impl Write {
    /// Existing entities this write touches. Creates touch none.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        match self {
            Self::CreateAnnotation(_) | Self::CreateComment(_) => Vec::new(),
            Self::Move { ids, .. } => ids.clone(),
            Self::Resize { id, .. } | Self::Delete { id } | Self::Resolve { id, .. } => vec![*id],
        }
    }

    /// Stable operation name for logs and events.
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::CreateAnnotation(_) => "create_annotation",
            Self::CreateComment(_) => "create_comment",
            Self::Move { .. } => "move_entities",
            Self::Resize { .. } => "resize_annotation",
            Self::Delete { .. } => "delete_entity",
            Self::Resolve { .. } => "resolve_comment",
        }
    }
}

/// Outcome of one write, reported back to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitEvent {
    Committed { op: &'static str, ids: Vec<EntityId> },
    Created { id: EntityId, kind: EntityKind },
    Failed { op: &'static str, ids: Vec<EntityId>, error: StoreError },
}

/// Perform `write` against `store` and apply the outcome to `session`.
pub async fn execute(store: &dyn ReviewStore, session: &SharedSession, write: Write) -> CommitEvent {
    let outcome = match &write {
        Write::CreateAnnotation(new) => store.create_annotation(new.clone()).await.map(Some),
        Write::CreateComment(new) => store.create_comment(new.clone()).await.map(Some),
        Write::Move { ids, dx, dy } => store.move_entities(ids, *dx, *dy).await.map(|()| None),
        Write::Resize { id, bounds } => store.resize_annotation(*id, *bounds).await.map(|()| None),
        Write::Delete { id } => store.delete_entity(*id).await.map(|()| None),
        Write::Resolve { id, status } => store.resolve_comment(*id, *status).await.map(|()| None),
    };

    let op = write.op();
    let ids = write.ids();
    let mut s = session.lock();
    s.release_in_flight(&ids);
    s.outstanding = s.outstanding.saturating_sub(1);

    match outcome {
        Ok(created) => {
            debug!(op, count = ids.len(), "write committed");
            apply_committed(&mut s, write, created)
        }
        Err(error) => {
            warn!(op, code = error.error_code(), error = %error, count = ids.len(), "write failed; rolling back preview");
            roll_back(&mut s, &write);
            CommitEvent::Failed { op, ids, error }
        }
    }
}

fn apply_committed(s: &mut Session, write: Write, created: Option<EntityId>) -> CommitEvent {
    let op = write.op();
    let ids = write.ids();
    match write {
        Write::CreateAnnotation(new) => {
            if let Some(id) = created {
                s.doc.insert_annotation(new.into_annotation(id));
                return CommitEvent::Created { id, kind: EntityKind::Annotation };
            }
        }
        Write::CreateComment(new) => {
            if let Some(id) = created {
                s.doc.insert_comment(new.into_comment(id));
                return CommitEvent::Created { id, kind: EntityKind::Comment };
            }
        }
        Write::Move { ids, dx, dy } => {
            s.doc.apply_move(&ids, dx, dy);
            for id in &ids {
                s.optimistic.settle_move(id, dx, dy);
            }
        }
        Write::Resize { id, bounds } => {
            s.doc.apply_resize(&id, bounds);
            s.optimistic.settle_resize(&id, bounds);
        }
        Write::Delete { id } => {
            s.doc.tombstone(&id);
            s.optimistic.remove(&id);
        }
        Write::Resolve { id, status } => {
            s.doc.set_comment_status(&id, status);
        }
    }
    CommitEvent::Committed { op, ids }
}

fn roll_back(s: &mut Session, write: &Write) {
    match write {
        Write::Move { ids, dx, dy } => {
            for id in ids {
                s.optimistic.settle_move(id, *dx, *dy);
            }
        }
        Write::Resize { id, bounds } => s.optimistic.settle_resize(id, *bounds),
        Write::CreateAnnotation(_) | Write::CreateComment(_) | Write::Delete { .. } | Write::Resolve { .. } => {}
    }
}

// =============================================================================
// COMMITTER
// =============================================================================

/// Hands writes to the store on spawned tasks and debounces nudges.
#[derive(Clone)]
pub struct Committer {
    store: Arc<dyn ReviewStore>,
    session: SharedSession,
    events: mpsc::UnboundedSender<CommitEvent>,
    debounce: Duration,
}

impl Committer {
    /// Build a committer and the receiver its events arrive on.
    #[must_use]
    pub fn new(
        store: Arc<dyn ReviewStore>,
        session: SharedSession,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<CommitEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { store, session, events, debounce }, rx)
    }

    /// Queue `write` immediately. Its ids are in flight until it resolves.
    pub fn submit(&self, write: Write) {
        {
            let mut s = self.session.lock();
            s.mark_in_flight(&write.ids());
            s.outstanding += 1;
        }
        debug!(op = write.op(), "write queued");
        let this = self.clone();
        tokio::spawn(async move {
            let event = execute(this.store.as_ref(), &this.session, write).await;
            if this.events.send(event).is_err() {
                debug!("commit event dropped; engine is gone");
            }
        });
    }

    /// Accumulate a nudge for the id group and (re)arm its trailing timer.
    pub fn schedule_nudge(&self, ids: &[EntityId], dx: f64, dy: f64) {
        let mut key = ids.to_vec();
        key.sort_unstable();
        key.dedup();

        let generation = {
            let mut s = self.session.lock();
            let entry = s.pending.entry(key.clone()).or_insert(PendingMove { dx: 0.0, dy: 0.0, generation: 0 });
            entry.dx += dx;
            entry.dy += dy;
            entry.generation += 1;
            entry.generation
        };

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.debounce).await;
            let due = {
                let mut s = this.session.lock();
                let current = s.pending.get(&key).is_some_and(|p| p.generation == generation);
                if current { s.pending.remove(&key) } else { None }
            };
            if let Some(pending) = due {
                this.submit(Write::Move { ids: key, dx: pending.dx, dy: pending.dy });
            }
        });
    }

    /// Submit every pending nudge now. Returns the id group of each queued write.
    pub fn flush_pending(&self) -> Vec<Vec<EntityId>> {
        let drained: Vec<(Vec<EntityId>, PendingMove)> = {
            let mut s = self.session.lock();
            s.pending.drain().collect()
        };
        drained
            .into_iter()
            .map(|(ids, pending)| {
                self.submit(Write::Move { ids: ids.clone(), dx: pending.dx, dy: pending.dy });
                ids
            })
            .collect()
    }
}
