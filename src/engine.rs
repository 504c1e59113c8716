//! Selection & transform engine.
//!
//! DESIGN
//! ======
//! The engine owns the pointer/keyboard state machine for one canvas. Every
//! handler runs synchronously: it updates the selection, the [`DragState`]
//! and the optimistic previews, queues any store writes on the
//! [`Committer`], and returns the [`Action`]s the host should apply. No
//! handler awaits the network, and nothing is drawn by mutating a previously
//! rendered shape: the host redraws [`Engine::overlay`] whenever it receives
//! `RenderNeeded`.
//!
//! Positions arrive in CSS pixels relative to the container passed to
//! [`Engine::set_viewport`]. Geometry is resolved inside the letterboxed
//! content rectangle, and every delta is converted to normalized units
//! before it reaches the previews or the store.
//!
//! ERROR HANDLING
//! ==============
//! Handlers never return errors. Degenerate resizes are rejected locally by
//! keeping the prior preview. Store failures come back through
//! [`Engine::drain_events`] as `Action::PersistFailed` after the affected
//! previews have been rolled back.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::clock::frame_to_time;
use crate::config::{DEFAULT_FPS, EngineConfig};
use crate::consts::{MOVE_EPSILON_PX, NUDGE_LARGE_PX, NUDGE_PX};
use crate::coords::{CssPoint, CssRect, NormalizedPoint, NormalizedRect, Size, css_delta_to_normalized, letterbox, to_normalized};
use crate::doc::{Annotation, AnnotationKind, Comment, DrawingData, DrawingStyle, EntityId};
use crate::error::ErrorCode;
use crate::geometry::{ElementBounds, EntityKind, annotation_bounds, comment_bounds};
use crate::hit::{Hit, handles, hit_test, intersecting};
use crate::input::{Button, DragMember, DragState, Key, Modifiers, PointerTarget, Side, Tool, resize_bounds};
use crate::optimistic::Change;
use crate::persist::{CommitEvent, Committer, NewAnnotation, NewComment, ReviewStore, Write};
use crate::render::{Overlay, OverlayElement};
use crate::session::{Session, SharedSession};
use crate::snap::{SnapGuide, compute_snap};

/// Actions returned from handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Redraw the overlay from [`Engine::overlay`].
    RenderNeeded,
    SelectionChanged(Vec<EntityId>),
    SetCursor(String),
    /// A write was handed to the store.
    PersistQueued { op: &'static str, ids: Vec<EntityId> },
    /// A write resolved successfully.
    Persisted { op: &'static str, ids: Vec<EntityId> },
    /// A write failed; its previews were rolled back.
    PersistFailed { op: &'static str, ids: Vec<EntityId>, code: &'static str, message: String },
    /// The store assigned an id to a new annotation or comment.
    Created { id: EntityId, kind: EntityKind },
    /// The comment tool was clicked; the host should ask for text and call [`Engine::add_comment`].
    CommentRequested { position: NormalizedPoint },
    /// The text tool was clicked; the host should ask for text and call [`Engine::add_text`].
    TextRequested { position: NormalizedPoint },
}

/// The canvas engine for one review session.
pub struct Engine {
    config: EngineConfig,
    session: SharedSession,
    committer: Committer,
    events: mpsc::UnboundedReceiver<CommitEvent>,
    tool: Tool,
    selection: Vec<EntityId>,
    drag: DragState,
    guides: Vec<SnapGuide>,
    container: CssRect,
    native: Size,
    frame: u32,
    fps: f64,
}

impl Engine {
    #[must_use]
    pub fn new(config: EngineConfig, store: Arc<dyn ReviewStore>, session: SharedSession) -> Self {
        let (committer, events) = Committer::new(store, session.clone(), config.nudge_debounce);
        let usable = config.default_fps.is_finite() && config.default_fps > 0.0;
        let fps = if usable { config.default_fps } else { DEFAULT_FPS };
        Self {
            config,
            session,
            committer,
            events,
            tool: Tool::Select,
            selection: Vec::new(),
            drag: DragState::None,
            guides: Vec::new(),
            container: CssRect::default(),
            native: Size::default(),
            frame: 0,
            fps,
        }
    }

    // --- Data inputs ---

    /// Hydrate the session from a store snapshot.
    pub fn load_snapshot(&mut self, annotations: Vec<Annotation>, comments: Vec<Comment>) {
        info!(annotations = annotations.len(), comments = comments.len(), "loading review snapshot");
        self.session.lock().doc.load_snapshot(annotations, comments);
        self.selection.clear();
        self.drag = DragState::None;
    }

    /// Update the container rectangle and the media's native size.
    pub fn set_viewport(&mut self, container: CssRect, native: Size) -> Vec<Action> {
        self.container = container;
        self.native = native;
        vec![Action::RenderNeeded]
    }

    /// Follow the frame clock. Changing frames drops the selection and any gesture.
    pub fn set_frame(&mut self, frame: u32, fps: f64) -> Vec<Action> {
        if fps.is_finite() && fps > 0.0 {
            self.fps = fps;
        }
        if frame == self.frame {
            return Vec::new();
        }
        let mut actions = self.on_pointer_cancel();
        self.frame = frame;
        if !self.selection.is_empty() {
            self.selection.clear();
            actions.push(Action::SelectionChanged(Vec::new()));
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        let mut actions = self.on_pointer_cancel();
        self.tool = tool;
        actions.push(Action::SetCursor(if tool == Tool::Select { "default" } else { "crosshair" }.to_owned()));
        actions
    }

    // --- Pointer input ---

    pub fn on_pointer_down(
        &mut self,
        p: CssPoint,
        button: Button,
        modifiers: Modifiers,
        target: PointerTarget,
    ) -> Vec<Action> {
        let mut actions = self.flush_nudges();
        self.collect_stale();
        if button != Button::Primary {
            return actions;
        }
        if !self.drag.is_none() {
            actions.extend(self.on_pointer_cancel());
        }

        match self.tool {
            Tool::Draw(kind) => {
                self.drag = DragState::Drawing { kind, start: p, points: vec![p] };
                actions.push(Action::RenderNeeded);
                return actions;
            }
            Tool::Comment => return actions,
            Tool::Select => {}
        }

        let content = self.content_rect();
        let s = self.session.lock();
        let elements = visible_elements(&s, self.frame, content);
        let handles_box = resize_box(&elements, &self.selection);

        match hit_test(p, &elements, handles_box) {
            Some(Hit::Handle(side)) => {
                let members: Vec<(EntityId, CssRect)> = elements
                    .iter()
                    .filter(|e| e.kind == EntityKind::Annotation && self.selection.contains(&e.id))
                    .map(|e| (e.id, e.bounds))
                    .collect();
                let ids: Vec<EntityId> = members.iter().map(|(id, _)| *id).collect();
                if s.any_in_flight(&ids) {
                    debug!(count = ids.len(), "resize refused; previous write still in flight");
                    return actions;
                }
                let single = if self.selection.len() == 1 { members.first().copied() } else { None };
                self.drag = match (single, handles_box) {
                    (Some((id, bounds)), _) => {
                        DragState::Resizing { id, initial_bounds: bounds, side, start: p, preview: bounds }
                    }
                    (None, Some(initial_bounds)) => {
                        DragState::GroupResizing { initial_bounds, side, start: p, members, preview: initial_bounds }
                    }
                    (None, None) => DragState::None,
                };
                actions.push(Action::SetCursor(resize_cursor(side).to_owned()));
            }
            Some(Hit::Element(hit)) => {
                let already = self.selection.contains(&hit.id);
                if modifiers.extends_selection() {
                    if already {
                        self.selection.retain(|id| *id != hit.id);
                        actions.push(Action::SelectionChanged(self.selection.clone()));
                        actions.push(Action::RenderNeeded);
                        return actions;
                    }
                    self.selection.push(hit.id);
                    actions.push(Action::SelectionChanged(self.selection.clone()));
                } else if !already {
                    self.selection = vec![hit.id];
                    actions.push(Action::SelectionChanged(self.selection.clone()));
                }

                if s.any_in_flight(&self.selection) {
                    debug!(count = self.selection.len(), "drag refused; previous write still in flight");
                } else if let Some(grabbed) = selection_box(&elements, &self.selection) {
                    let members = self
                        .selection
                        .iter()
                        .map(|id| {
                            let (base_dx, base_dy) = s.optimistic.move_delta(id);
                            DragMember { id: *id, base_dx, base_dy }
                        })
                        .collect();
                    self.drag = DragState::Translating { members, start: p, current: p, grabbed, delta: (0.0, 0.0) };
                    actions.push(Action::SetCursor("move".to_owned()));
                }
            }
            None => {
                if target == PointerTarget::Canvas {
                    self.drag =
                        DragState::AreaSelecting { origin: p, current: p, additive: modifiers.extends_selection() };
                }
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn on_pointer_move(&mut self, p: CssPoint, modifiers: Modifiers) -> Vec<Action> {
        let content = self.content_rect();
        let min_size = self.config.min_resize_px;
        let now = Instant::now();
        let mut s = self.session.lock();

        match &mut self.drag {
            DragState::None => {
                if self.tool != Tool::Select {
                    return Vec::new();
                }
                let elements = visible_elements(&s, self.frame, content);
                let cursor = match hit_test(p, &elements, resize_box(&elements, &self.selection)) {
                    Some(Hit::Handle(side)) => resize_cursor(side),
                    Some(Hit::Element(_)) => "move",
                    None => "default",
                };
                return vec![Action::SetCursor(cursor.to_owned())];
            }
            DragState::Translating { members, start, current, grabbed, delta } => {
                *current = p;
                let ids: Vec<EntityId> = members.iter().map(|m| m.id).collect();
                let raw = (p.x - start.x, p.y - start.y);
                let elements = visible_elements(&s, self.frame, content);
                let snap = compute_snap(grabbed.translate(raw.0, raw.1), &ids, &elements, &self.config.snap);
                let (dx, dy) = css_delta_to_normalized(raw.0 + snap.dx, raw.1 + snap.dy, content);
                for m in members.iter() {
                    s.optimistic.set_move(m.id, m.base_dx + dx, m.base_dy + dy, now);
                }
                *delta = (dx, dy);
                self.guides = snap.guides;
            }
            DragState::Resizing { id, initial_bounds, side, start, preview } => {
                if let Some(bounds) =
                    resize_bounds(*initial_bounds, *side, p.x - start.x, p.y - start.y, modifiers.shift, min_size)
                {
                    *preview = bounds;
                    s.optimistic.set_resize(*id, bounds.to_normalized(content), now);
                }
            }
            DragState::GroupResizing { initial_bounds, side, start, members, preview } => {
                let proposed =
                    resize_bounds(*initial_bounds, *side, p.x - start.x, p.y - start.y, modifiers.shift, min_size);
                if let Some(bounds) = proposed {
                    let scaled: Vec<(EntityId, CssRect)> =
                        members.iter().map(|(id, r)| (*id, map_rect(*initial_bounds, bounds, *r))).collect();
                    if scaled.iter().all(|(_, r)| r.width >= min_size && r.height >= min_size) {
                        *preview = bounds;
                        for (id, r) in scaled {
                            s.optimistic.set_resize(id, r.to_normalized(content), now);
                        }
                    }
                }
            }
            DragState::AreaSelecting { current, .. } => *current = p,
            DragState::Drawing { kind, start, points } => {
                if *kind == AnnotationKind::Freehand {
                    points.push(p);
                } else {
                    *points = vec![*start, p];
                }
            }
        }
        vec![Action::RenderNeeded]
    }

    pub fn on_pointer_up(&mut self, p: CssPoint, _button: Button, modifiers: Modifiers) -> Vec<Action> {
        // The release point may differ from the last move; fold it into the preview first.
        if matches!(
            self.drag,
            DragState::Translating { .. } | DragState::Resizing { .. } | DragState::GroupResizing { .. }
        ) {
            self.on_pointer_move(p, modifiers);
        }
        let mut actions = Vec::new();
        let content = self.content_rect();
        let drag = std::mem::take(&mut self.drag);
        self.guides.clear();

        let mut writes = Vec::new();
        {
            let mut s = self.session.lock();
            match drag {
                DragState::None => {
                    if self.tool == Tool::Comment && content.contains(p) {
                        actions.push(Action::CommentRequested { position: to_normalized(p, content) });
                    }
                }
                DragState::Translating { members, start, current, delta, .. } => {
                    let ids: Vec<EntityId> = members.iter().map(|m| m.id).collect();
                    if start.distance(current) < MOVE_EPSILON_PX || delta_is_zero(delta) {
                        restore_bases(&mut s, &members);
                    } else {
                        writes.push(Write::Move { ids, dx: delta.0, dy: delta.1 });
                    }
                }
                DragState::Resizing { id, initial_bounds, preview, .. } => {
                    match s.optimistic.get(&id).map(|u| u.change) {
                        Some(Change::Resize { bounds }) if preview != initial_bounds => {
                            writes.push(Write::Resize { id, bounds });
                        }
                        _ => {
                            s.optimistic.remove(&id);
                        }
                    }
                }
                DragState::GroupResizing { initial_bounds, members, preview, .. } => {
                    for (id, _) in members {
                        match s.optimistic.get(&id).map(|u| u.change) {
                            Some(Change::Resize { bounds }) if preview != initial_bounds => {
                                writes.push(Write::Resize { id, bounds });
                            }
                            _ => {
                                s.optimistic.remove(&id);
                            }
                        }
                    }
                }
                DragState::AreaSelecting { origin, additive, .. } => {
                    let area = CssRect::from_corners(origin, p);
                    let before = self.selection.clone();
                    if area.width < MOVE_EPSILON_PX && area.height < MOVE_EPSILON_PX {
                        if !additive {
                            self.selection.clear();
                        }
                    } else {
                        let hits = intersecting(area, &visible_elements(&s, self.frame, content));
                        if additive {
                            for id in hits {
                                if !self.selection.contains(&id) {
                                    self.selection.push(id);
                                }
                            }
                        } else {
                            self.selection = hits;
                        }
                    }
                    if self.selection != before {
                        actions.push(Action::SelectionChanged(self.selection.clone()));
                    }
                }
                DragState::Drawing { kind, start, mut points } => {
                    if kind != AnnotationKind::Freehand {
                        points = vec![start, p];
                    } else if points.last() != Some(&p) {
                        points.push(p);
                    }
                    if kind == AnnotationKind::Text {
                        if content.contains(p) {
                            actions.push(Action::TextRequested { position: to_normalized(p, content) });
                        }
                    } else if let Some(new) = drawn_annotation(kind, &points, content, self.frame, self.config.min_resize_px) {
                        writes.push(Write::CreateAnnotation(new));
                    }
                }
            }
        }

        actions.extend(self.flush_nudges());
        actions.extend(self.submit_all(writes));
        actions.push(Action::SetCursor("default".to_owned()));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Abandon the gesture as if released with zero delta. Nothing is written.
    pub fn on_pointer_cancel(&mut self) -> Vec<Action> {
        let drag = std::mem::take(&mut self.drag);
        if drag.is_none() {
            return Vec::new();
        }
        self.guides.clear();
        let mut s = self.session.lock();
        match drag {
            DragState::Translating { members, .. } => restore_bases(&mut s, &members),
            DragState::Resizing { id, .. } => {
                s.optimistic.remove(&id);
            }
            DragState::GroupResizing { members, .. } => {
                for (id, _) in members {
                    s.optimistic.remove(&id);
                }
            }
            DragState::None | DragState::AreaSelecting { .. } | DragState::Drawing { .. } => {}
        }
        vec![Action::RenderNeeded]
    }

    // --- Keyboard input ---

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        match key.0.as_str() {
            "Escape" => {
                if !self.drag.is_none() {
                    return self.on_pointer_cancel();
                }
                if self.selection.is_empty() {
                    return Vec::new();
                }
                self.selection.clear();
                vec![Action::SelectionChanged(Vec::new()), Action::RenderNeeded]
            }
            "Delete" | "Backspace" => self.delete_selection(),
            "ArrowLeft" | "ArrowRight" | "ArrowUp" | "ArrowDown" => {
                let step = if modifiers.shift { NUDGE_LARGE_PX } else { NUDGE_PX };
                let (dx, dy) = match key.0.as_str() {
                    "ArrowLeft" => (-step, 0.0),
                    "ArrowRight" => (step, 0.0),
                    "ArrowUp" => (0.0, -step),
                    _ => (0.0, step),
                };
                self.nudge(dx, dy)
            }
            _ => Vec::new(),
        }
    }

    /// Move the selection by a CSS-pixel step, writing after the debounce window.
    fn nudge(&mut self, css_dx: f64, css_dy: f64) -> Vec<Action> {
        if !self.drag.is_none() || self.selection.is_empty() {
            return Vec::new();
        }
        let (dx, dy) = css_delta_to_normalized(css_dx, css_dy, self.content_rect());
        {
            let mut s = self.session.lock();
            if s.any_in_flight(&self.selection) {
                debug!(count = self.selection.len(), "nudge ignored; previous write still in flight");
                return Vec::new();
            }
            let now = Instant::now();
            for id in &self.selection {
                let (base_dx, base_dy) = s.optimistic.move_delta(id);
                s.optimistic.set_move(*id, base_dx + dx, base_dy + dy, now);
            }
        }
        self.committer.schedule_nudge(&self.selection, dx, dy);
        vec![Action::RenderNeeded]
    }

    // --- Commands ---

    /// Soft-delete every selected entity.
    pub fn delete_selection(&mut self) -> Vec<Action> {
        if self.selection.is_empty() {
            return Vec::new();
        }
        let ids = std::mem::take(&mut self.selection);
        let writes: Vec<Write> = {
            let s = self.session.lock();
            ids.iter().filter(|id| s.doc.is_live(id)).map(|id| Write::Delete { id: *id }).collect()
        };
        let mut actions = self.submit_all(writes);
        actions.push(Action::SelectionChanged(Vec::new()));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Pin a new root comment on the current frame.
    pub fn add_comment(&mut self, position: NormalizedPoint, content: &str) -> Vec<Action> {
        if content.trim().is_empty() {
            debug!("empty comment ignored");
            return Vec::new();
        }
        let new = NewComment {
            frame_number: self.frame,
            frame_timestamp: frame_to_time(self.frame, self.fps),
            position,
            content: content.to_owned(),
            thread_id: None,
            created_at: now_millis(),
            created_by_name: self.config.author.clone(),
        };
        self.submit_all(vec![Write::CreateComment(new)])
    }

    /// Reply to a comment thread. Replying to a reply joins its root's thread.
    pub fn reply(&mut self, comment_id: &EntityId, content: &str) -> Vec<Action> {
        if content.trim().is_empty() {
            return Vec::new();
        }
        let new = {
            let s = self.session.lock();
            let Some(target) = s.doc.comment(comment_id) else {
                warn!(%comment_id, "reply to unknown comment ignored");
                return Vec::new();
            };
            NewComment {
                frame_number: target.frame_number,
                frame_timestamp: target.frame_timestamp,
                position: target.position,
                content: content.to_owned(),
                thread_id: Some(target.thread_id.unwrap_or(target.id)),
                created_at: now_millis(),
                created_by_name: self.config.author.clone(),
            }
        };
        self.submit_all(vec![Write::CreateComment(new)])
    }

    /// Flip a comment between resolved and open. Refused while the comment has a write in flight.
    pub fn toggle_comment_resolution(&mut self, id: &EntityId) -> Vec<Action> {
        let status = {
            let s = self.session.lock();
            if s.any_in_flight(&[*id]) {
                debug!(%id, "resolution toggle refused; previous write still in flight");
                return Vec::new();
            }
            s.doc.comment(id).map(|c| c.status.toggled())
        };
        match status {
            Some(status) => self.submit_all(vec![Write::Resolve { id: *id, status }]),
            None => Vec::new(),
        }
    }

    /// Create a text annotation anchored at `position` on the current frame.
    pub fn add_text(&mut self, position: NormalizedPoint, text: &str) -> Vec<Action> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let new = NewAnnotation {
            frame_number: self.frame,
            kind: AnnotationKind::Text,
            position,
            drawing_data: DrawingData {
                style: DrawingStyle { text: Some(text.to_owned()), ..DrawingStyle::default() },
                ..DrawingData::default()
            },
        };
        self.submit_all(vec![Write::CreateAnnotation(new)])
    }

    /// The comment thread rooted at `root_id`: the root, then replies oldest first.
    #[must_use]
    pub fn thread(&self, root_id: &EntityId) -> Vec<Comment> {
        self.session.lock().doc.thread(root_id).into_iter().cloned().collect()
    }

    // --- Persistence outcomes ---

    /// Collect every write outcome that has arrived since the last call.
    pub fn drain_events(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            actions.push(event_action(event));
        }
        if !actions.is_empty() {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    /// Wait until every queued write and pending nudge has resolved.
    pub async fn settle(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        loop {
            let settled = self.session.lock().is_settled();
            if settled {
                break;
            }
            match self.events.recv().await {
                Some(event) => actions.push(event_action(event)),
                None => break,
            }
        }
        actions.extend(self.drain_events());
        actions
    }

    /// Drop optimistic previews older than the TTL. Returns how many were dropped.
    pub fn collect_stale(&mut self) -> usize {
        let mut s = self.session.lock();
        let mut keep: HashSet<EntityId> = s.pending_ids();
        keep.extend(self.drag.active_ids());
        let dropped = s.optimistic.gc(Instant::now(), self.config.optimistic_ttl, &keep);
        if !dropped.is_empty() {
            warn!(count = dropped.len(), "dropped optimistic previews past their ttl");
        }
        dropped.len()
    }

    // --- Queries ---

    #[must_use]
    pub fn selection(&self) -> &[EntityId] {
        &self.selection
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    #[must_use]
    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    #[must_use]
    pub fn guides(&self) -> &[SnapGuide] {
        &self.guides
    }

    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// The letterboxed rectangle the media (and every overlay) occupies.
    #[must_use]
    pub fn content_rect(&self) -> CssRect {
        letterbox(self.container, self.native).content_rect(self.container)
    }

    /// Current bounds of the selection, previews included.
    #[must_use]
    pub fn preview_bounds(&self) -> Option<CssRect> {
        let s = self.session.lock();
        selection_box(&visible_elements(&s, self.frame, self.content_rect()), &self.selection)
    }

    #[must_use]
    pub fn annotation(&self, id: &EntityId) -> Option<Annotation> {
        self.session.lock().doc.annotation(id).cloned()
    }

    #[must_use]
    pub fn comment(&self, id: &EntityId) -> Option<Comment> {
        self.session.lock().doc.comment(id).cloned()
    }

    /// Normalized bounds currently previewed for `id`, if a resize is in progress.
    #[must_use]
    pub fn previewed_resize(&self, id: &EntityId) -> Option<NormalizedRect> {
        match self.session.lock().optimistic.get(id).map(|u| u.change) {
            Some(Change::Resize { bounds }) => Some(bounds),
            _ => None,
        }
    }

    /// The annotation layer scene for the current frame.
    #[must_use]
    pub fn overlay(&self) -> Overlay {
        let content = self.content_rect();
        let s = self.session.lock();
        let elements = visible_elements(&s, self.frame, content);
        let selection_box = selection_box(&elements, &self.selection);
        let handle_rects = match (&self.drag, resize_box(&elements, &self.selection)) {
            (DragState::None | DragState::Resizing { .. } | DragState::GroupResizing { .. }, Some(b)) => handles(b),
            _ => Vec::new(),
        };
        let area = match &self.drag {
            DragState::AreaSelecting { origin, current, .. } => Some(CssRect::from_corners(*origin, *current)),
            _ => None,
        };
        let drawing = match &self.drag {
            DragState::Drawing { points, .. } => css_envelope(points),
            _ => None,
        };
        Overlay {
            elements: elements
                .iter()
                .map(|e| OverlayElement {
                    id: e.id,
                    kind: e.kind,
                    bounds: e.bounds,
                    selected: self.selection.contains(&e.id),
                    pending: s.optimistic.get(&e.id).is_some(),
                })
                .collect(),
            selection_box,
            handles: handle_rects,
            area,
            drawing,
            guides: self.guides.clone(),
        }
    }

    // --- Internals ---

    fn submit_all(&self, writes: Vec<Write>) -> Vec<Action> {
        writes
            .into_iter()
            .map(|write| {
                let action = Action::PersistQueued { op: write.op(), ids: write.ids() };
                self.committer.submit(write);
                action
            })
            .collect()
    }

    fn flush_nudges(&self) -> Vec<Action> {
        self.committer
            .flush_pending()
            .into_iter()
            .map(|ids| Action::PersistQueued { op: "move_entities", ids })
            .collect()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Annotations then root comments on `frame`, in draw order, with previews applied.
fn visible_elements(s: &Session, frame: u32, content: CssRect) -> Vec<ElementBounds> {
    let annotations = s.doc.annotations_on_frame(frame).into_iter().map(|a| ElementBounds {
        id: a.id,
        kind: EntityKind::Annotation,
        bounds: annotation_bounds(a, s.optimistic.get(&a.id), content),
    });
    let comments = s.doc.root_comments_on_frame(frame).into_iter().map(|c| ElementBounds {
        id: c.id,
        kind: EntityKind::Comment,
        bounds: comment_bounds(c, s.optimistic.get(&c.id), content),
    });
    annotations.chain(comments).collect()
}

/// Union of the selected elements' bounds.
fn selection_box(elements: &[ElementBounds], selection: &[EntityId]) -> Option<CssRect> {
    elements.iter().filter(|e| selection.contains(&e.id)).map(|e| e.bounds).reduce(CssRect::union)
}

/// Box whose handles resize the selection: the union of selected annotations.
fn resize_box(elements: &[ElementBounds], selection: &[EntityId]) -> Option<CssRect> {
    elements
        .iter()
        .filter(|e| e.kind == EntityKind::Annotation && selection.contains(&e.id))
        .map(|e| e.bounds)
        .reduce(CssRect::union)
}

fn css_envelope(points: &[CssPoint]) -> Option<CssRect> {
    points.iter().map(|p| CssRect::from_corners(*p, *p)).reduce(CssRect::union)
}

/// Map `r` from the `from` frame into the `to` frame.
fn map_rect(from: CssRect, to: CssRect, r: CssRect) -> CssRect {
    let sx = if from.width > 0.0 { to.width / from.width } else { 1.0 };
    let sy = if from.height > 0.0 { to.height / from.height } else { 1.0 };
    CssRect::new(to.x + (r.x - from.x) * sx, to.y + (r.y - from.y) * sy, r.width * sx, r.height * sy)
}

fn delta_is_zero(delta: (f64, f64)) -> bool {
    delta.0.abs() < crate::consts::NORMALIZED_EPSILON && delta.1.abs() < crate::consts::NORMALIZED_EPSILON
}

/// Put each member's preview back to what it was when the gesture began.
fn restore_bases(s: &mut Session, members: &[DragMember]) {
    let now = Instant::now();
    for m in members {
        if delta_is_zero((m.base_dx, m.base_dy)) {
            s.optimistic.remove(&m.id);
        } else {
            s.optimistic.set_move(m.id, m.base_dx, m.base_dy, now);
        }
    }
}

fn resize_cursor(side: Side) -> &'static str {
    match side {
        Side::TOP_LEFT | Side::BOTTOM_RIGHT => "nwse-resize",
        Side::TOP_RIGHT | Side::BOTTOM_LEFT => "nesw-resize",
        Side::TOP | Side::BOTTOM => "ns-resize",
        _ => "ew-resize",
    }
}

fn clamp_unit(p: NormalizedPoint) -> NormalizedPoint {
    NormalizedPoint::new(p.x.clamp(0.0, 1.0), p.y.clamp(0.0, 1.0))
}

/// Build the new annotation for a finished drawing gesture, or `None` when it is too small.
fn drawn_annotation(
    kind: AnnotationKind,
    points: &[CssPoint],
    content: CssRect,
    frame: u32,
    min_size: f64,
) -> Option<NewAnnotation> {
    let first = *points.first()?;
    let last = *points.last()?;
    let normalized: Vec<NormalizedPoint> = points.iter().map(|p| clamp_unit(to_normalized(*p, content))).collect();
    let drawing_data = match kind {
        AnnotationKind::Circle | AnnotationKind::Rectangle => {
            let rect = CssRect::from_corners(first, last);
            if rect.width < min_size || rect.height < min_size {
                return None;
            }
            let bounds = rect.to_normalized(content);
            return Some(NewAnnotation {
                frame_number: frame,
                kind,
                position: NormalizedPoint::new(bounds.x, bounds.y),
                drawing_data: DrawingData::with_bounds(bounds),
            });
        }
        AnnotationKind::Arrow => {
            if first.distance(last) < min_size {
                return None;
            }
            DrawingData::with_points(vec![clamp_unit(to_normalized(first, content)), clamp_unit(to_normalized(last, content))])
        }
        AnnotationKind::Freehand => {
            if normalized.len() < 2 || css_envelope(points).is_none_or(|r| r.width.max(r.height) < min_size) {
                return None;
            }
            DrawingData::with_points(normalized.clone())
        }
        AnnotationKind::Text => return None,
    };
    Some(NewAnnotation { frame_number: frame, kind, position: normalized[0], drawing_data })
}

fn event_action(event: CommitEvent) -> Action {
    match event {
        CommitEvent::Committed { op, ids } => Action::Persisted { op, ids },
        CommitEvent::Created { id, kind } => Action::Created { id, kind },
        CommitEvent::Failed { op, ids, error } => {
            Action::PersistFailed { op, ids, code: error.error_code(), message: error.to_string() }
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
