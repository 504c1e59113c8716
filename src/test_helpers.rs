//! Test doubles shared by the unit tests: a scriptable media element, a
//! surface that records what it was asked to draw, and a store wrapper that
//! records calls and injects latency or failures.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::coords::{NormalizedRect, Size};
use crate::doc::{Annotation, AnnotationKind, Comment, CommentStatus, EntityId};
use crate::media::{MediaElement, MediaError, ReadyState};
use crate::persist::{MemoryStore, NewAnnotation, NewComment, ReviewStore, StoreError};
use crate::render::{DrawOp, Surface};

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MEDIA
// =============================================================================

/// How a [`FakeMedia`] answers seeks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekMode {
    /// Jump to the target and signal completion at once.
    Immediate,
    /// Never signal completion, and never move (a stalled decoder).
    Never,
    /// Signal completion after a delay.
    Delay(Duration),
}

#[derive(Debug)]
struct FakeInner {
    current_time: f64,
    duration: f64,
    ready: ReadyState,
    paused: bool,
    size: Size,
    frame_rate: Option<f64>,
    seek_mode: SeekMode,
    seeks: Vec<f64>,
    loads: Vec<String>,
    load_results: VecDeque<Result<(), MediaError>>,
    clears: u32,
    reject_play: bool,
}

#[derive(Debug)]
pub struct FakeMedia {
    inner: Mutex<FakeInner>,
}

impl FakeMedia {
    /// A paused, fully buffered 1920x1080 element with no detected frame rate.
    pub fn new(duration: f64) -> Self {
        Self {
            inner: Mutex::new(FakeInner {
                current_time: 0.0,
                duration,
                ready: ReadyState::HaveEnoughData,
                paused: true,
                size: Size::new(1920.0, 1080.0),
                frame_rate: None,
                seek_mode: SeekMode::Immediate,
                seeks: Vec::new(),
                loads: Vec::new(),
                load_results: VecDeque::new(),
                clears: 0,
                reject_play: false,
            }),
        }
    }

    pub fn with_seek_mode(self, mode: SeekMode) -> Self {
        guard(&self.inner).seek_mode = mode;
        self
    }

    pub fn with_frame_rate(self, fps: f64) -> Self {
        guard(&self.inner).frame_rate = Some(fps);
        self
    }

    pub fn with_load_results(self, results: Vec<Result<(), MediaError>>) -> Self {
        guard(&self.inner).load_results = results.into();
        self
    }

    pub fn rejecting_play(self) -> Self {
        guard(&self.inner).reject_play = true;
        self
    }

    pub fn set_ready(&self, ready: ReadyState) {
        guard(&self.inner).ready = ready;
    }

    pub fn set_seek_mode(&self, mode: SeekMode) {
        guard(&self.inner).seek_mode = mode;
    }

    /// Move the playhead as the platform would during playback.
    pub fn advance(&self, seconds: f64) {
        let mut inner = guard(&self.inner);
        inner.current_time = (inner.current_time + seconds).min(inner.duration);
    }

    pub fn seeks(&self) -> Vec<f64> {
        guard(&self.inner).seeks.clone()
    }

    pub fn loads(&self) -> Vec<String> {
        guard(&self.inner).loads.clone()
    }

    pub fn clears(&self) -> u32 {
        guard(&self.inner).clears
    }
}

#[async_trait]
impl MediaElement for FakeMedia {
    fn current_time(&self) -> f64 {
        guard(&self.inner).current_time
    }

    fn set_current_time(&self, seconds: f64) {
        guard(&self.inner).current_time = seconds;
    }

    fn duration(&self) -> f64 {
        guard(&self.inner).duration
    }

    fn ready_state(&self) -> ReadyState {
        guard(&self.inner).ready
    }

    fn is_paused(&self) -> bool {
        guard(&self.inner).paused
    }

    fn play(&self) -> Result<(), MediaError> {
        let mut inner = guard(&self.inner);
        if inner.reject_play {
            return Err(MediaError::PlaybackRejected("autoplay blocked".to_owned()));
        }
        inner.paused = false;
        Ok(())
    }

    fn pause(&self) {
        guard(&self.inner).paused = true;
    }

    fn video_size(&self) -> Size {
        guard(&self.inner).size
    }

    fn frame_rate(&self) -> Option<f64> {
        guard(&self.inner).frame_rate
    }

    async fn seek(&self, seconds: f64) {
        let mode = {
            let mut inner = guard(&self.inner);
            inner.seeks.push(seconds);
            inner.seek_mode
        };
        match mode {
            SeekMode::Immediate => self.set_current_time(seconds),
            SeekMode::Never => std::future::pending::<()>().await,
            SeekMode::Delay(d) => {
                tokio::time::sleep(d).await;
                self.set_current_time(seconds);
            }
        }
    }

    async fn load(&self, url: &str) -> Result<(), MediaError> {
        let mut inner = guard(&self.inner);
        inner.loads.push(url.to_owned());
        inner.load_results.pop_front().unwrap_or(Ok(()))
    }

    fn clear_source(&self) {
        guard(&self.inner).clears += 1;
    }
}

// =============================================================================
// SURFACE
// =============================================================================

/// One painted frame: each draw with the source element's time when drawn.
pub type PaintedFrame = Vec<(DrawOp, f64)>;

/// Records every clear as the start of a new painted frame.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    frames: Arc<Mutex<Vec<PaintedFrame>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paint_count(&self) -> usize {
        guard(&self.frames).len()
    }

    pub fn last_frame(&self) -> PaintedFrame {
        guard(&self.frames).last().cloned().unwrap_or_default()
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        guard(&self.frames).push(Vec::new());
    }

    fn draw(&mut self, source: &dyn MediaElement, op: &DrawOp) {
        let mut frames = guard(&self.frames);
        if frames.is_empty() {
            frames.push(Vec::new());
        }
        if let Some(frame) = frames.last_mut() {
            frame.push((*op, source.current_time()));
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// A store call as received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateAnnotation(AnnotationKind),
    Resize(EntityId, NormalizedRect),
    Move(Vec<EntityId>, f64, f64),
    Delete(EntityId),
    CreateComment(String),
    Resolve(EntityId, CommentStatus),
}

/// Wraps a [`MemoryStore`], recording calls and injecting latency and failures.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    inner: MemoryStore,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<VecDeque<StoreError>>,
    latency: Duration,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(annotations: Vec<Annotation>, comments: Vec<Comment>) -> Self {
        Self { inner: MemoryStore::with_snapshot(annotations, comments), ..Self::default() }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The next call fails with `error` instead of reaching the inner store.
    pub fn fail_next(&self, error: StoreError) {
        guard(&self.failures).push_back(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        guard(&self.calls).clone()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    async fn enter(&self, call: Call) -> Result<(), StoreError> {
        guard(&self.calls).push(call);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let failure = guard(&self.failures).pop_front();
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReviewStore for ScriptedStore {
    async fn create_annotation(&self, new: NewAnnotation) -> Result<EntityId, StoreError> {
        self.enter(Call::CreateAnnotation(new.kind)).await?;
        self.inner.create_annotation(new).await
    }

    async fn resize_annotation(&self, id: EntityId, bounds: NormalizedRect) -> Result<(), StoreError> {
        self.enter(Call::Resize(id, bounds)).await?;
        self.inner.resize_annotation(id, bounds).await
    }

    async fn move_entities(&self, ids: &[EntityId], dx: f64, dy: f64) -> Result<(), StoreError> {
        self.enter(Call::Move(ids.to_vec(), dx, dy)).await?;
        self.inner.move_entities(ids, dx, dy).await
    }

    async fn delete_entity(&self, id: EntityId) -> Result<(), StoreError> {
        self.enter(Call::Delete(id)).await?;
        self.inner.delete_entity(id).await
    }

    async fn create_comment(&self, new: NewComment) -> Result<EntityId, StoreError> {
        self.enter(Call::CreateComment(new.content.clone())).await?;
        self.inner.create_comment(new).await
    }

    async fn resolve_comment(&self, id: EntityId, status: CommentStatus) -> Result<(), StoreError> {
        self.enter(Call::Resolve(id, status)).await?;
        self.inner.resolve_comment(id, status).await
    }
}
