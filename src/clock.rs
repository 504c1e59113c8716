//! Frame clock: the single source of truth for which frame is shown.
//!
//! DESIGN
//! ======
//! The clock owns the primary media element's position in frame units. Frame
//! numbers map to times as `frame / fps`, and times back to frames with
//! `floor(t * fps)` plus a small epsilon so that `frame / fps` converts back
//! to `frame` despite float error. The frame rate is fixed when the clock is
//! built: the media-reported rate if there is one, else the configured
//! default.
//!
//! Every exact seek goes through the shared [`SeekGate`], which bounds the
//! wait on the completion signal and applies the frame-0 workaround. After a
//! seek resolves (or times out) the surface is repainted from the element
//! before the new state is returned, so the canvas never lags the clock.
//!
//! Scrubbing is best-effort: the element's time is set without waiting and
//! the surface is repainted at once; `end_scrub` then snaps to the exact
//! frame through `jump_to_frame`.

#[cfg(test)]
#[path = "clock_test.rs"]
mod clock_test;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::consts::FRAME_TIME_EPSILON;
use crate::coords::{CssRect, letterbox};
use crate::media::{MediaElement, MediaError, SeekGate, SeekOutcome};
use crate::render::{DrawOp, Surface, Track, paint};

/// Published frame clock state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameClockState {
    pub current_frame: u32,
    pub total_frames: u32,
    pub fps: f64,
    pub duration: f64,
    pub is_playing: bool,
}

impl FrameClockState {
    /// Highest addressable frame; 0 when nothing is loaded.
    #[must_use]
    pub fn last_frame(&self) -> u32 {
        self.total_frames.saturating_sub(1)
    }

    #[must_use]
    pub fn clamp_frame(&self, frame: u32) -> u32 {
        frame.min(self.last_frame())
    }
}

/// Frame containing media time `seconds` at `fps`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn time_to_frame(seconds: f64, fps: f64) -> u32 {
    if !seconds.is_finite() || !fps.is_finite() || fps <= 0.0 {
        return 0;
    }
    (seconds * fps + FRAME_TIME_EPSILON).floor().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Media time at which `frame` starts.
#[must_use]
pub fn frame_to_time(frame: u32, fps: f64) -> f64 {
    if fps > 0.0 { f64::from(frame) / fps } else { 0.0 }
}

/// Number of whole frames in `duration` seconds.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn total_frames(duration: f64, fps: f64) -> u32 {
    if !duration.is_finite() || duration <= 0.0 || !fps.is_finite() || fps <= 0.0 {
        return 0;
    }
    (duration * fps - FRAME_TIME_EPSILON).ceil().clamp(1.0, f64::from(u32::MAX)) as u32
}

/// The media-reported frame rate when usable, else `default_fps`.
#[must_use]
pub fn session_fps(media: &dyn MediaElement, default_fps: f64) -> f64 {
    media.frame_rate().filter(|fps| fps.is_finite() && *fps > 0.0).unwrap_or(default_fps)
}

pub struct FrameClock {
    media: Arc<dyn MediaElement>,
    gate: Arc<SeekGate>,
    surface: Box<dyn Surface>,
    viewport: CssRect,
    state: FrameClockState,
    scrubbing: bool,
}

impl FrameClock {
    pub fn new(media: Arc<dyn MediaElement>, gate: Arc<SeekGate>, surface: Box<dyn Surface>, default_fps: f64) -> Self {
        let fps = session_fps(media.as_ref(), default_fps);
        info!(fps, "frame clock started");
        let mut clock = Self {
            media,
            gate,
            surface,
            viewport: CssRect::default(),
            state: FrameClockState { fps, ..FrameClockState::default() },
            scrubbing: false,
        };
        clock.sync_from_media();
        clock
    }

    #[must_use]
    pub fn state(&self) -> FrameClockState {
        self.state
    }

    #[must_use]
    pub fn fps(&self) -> f64 {
        self.state.fps
    }

    #[must_use]
    pub fn is_scrubbing(&self) -> bool {
        self.scrubbing
    }

    /// Re-read duration and play state, e.g. after metadata loads. The frame rate is kept.
    pub fn sync_from_media(&mut self) -> FrameClockState {
        let duration = self.media.duration();
        self.state.duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self.state.total_frames = total_frames(self.state.duration, self.state.fps);
        self.state.is_playing = !self.media.is_paused();
        self.state.current_frame = self.state.clamp_frame(time_to_frame(self.media.current_time(), self.state.fps));
        self.state
    }

    /// Set the rectangle the media is painted into and repaint.
    pub fn set_viewport(&mut self, viewport: CssRect) {
        self.viewport = viewport;
        self.repaint();
    }

    /// Seek to `frame` (clamped), wait for the seek, repaint, and publish.
    pub async fn jump_to_frame(&mut self, frame: u32) -> FrameClockState {
        let target = self.state.clamp_frame(frame);
        let seconds = frame_to_time(target, self.state.fps);
        let outcome = self.gate.seek(self.media.as_ref(), seconds).await;
        if outcome == SeekOutcome::TimedOut {
            debug!(frame = target, seconds, "seek fell back to timeout");
        }
        self.repaint();
        self.state.current_frame = target;
        self.state
    }

    /// Move by `delta` frames (clamped), pausing playback first.
    pub async fn step(&mut self, delta: i64) -> FrameClockState {
        if self.state.is_playing {
            self.media.pause();
            self.state.is_playing = false;
        }
        let target = (i64::from(self.state.current_frame) + delta).clamp(0, i64::from(self.state.last_frame()));
        self.jump_to_frame(u32::try_from(target).unwrap_or(0)).await
    }

    /// Best-effort preview while the timeline pointer is held.
    pub fn scrub(&mut self, pointer_x: f64, track: CssRect) -> FrameClockState {
        if !self.scrubbing && self.state.is_playing {
            self.media.pause();
            self.state.is_playing = false;
        }
        self.scrubbing = true;
        let ratio = if track.width > 0.0 { ((pointer_x - track.x) / track.width).clamp(0.0, 1.0) } else { 0.0 };
        let frame = self.state.clamp_frame(time_to_frame(ratio * self.state.duration, self.state.fps));
        self.media.set_current_time(frame_to_time(frame, self.state.fps));
        self.repaint();
        self.state.current_frame = frame;
        self.state
    }

    /// Release the timeline and settle on the exact frame.
    pub async fn end_scrub(&mut self) -> FrameClockState {
        self.scrubbing = false;
        self.jump_to_frame(self.state.current_frame).await
    }

    /// Start or stop playback. Starting from the last frame first seeks back to frame 0.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::PlaybackRejected`] when the element refuses to play.
    pub async fn play_toggle(&mut self) -> Result<FrameClockState, MediaError> {
        if self.state.is_playing {
            self.media.pause();
            self.state.is_playing = false;
            info!(frame = self.state.current_frame, "playback paused");
            return Ok(self.state);
        }
        if self.state.total_frames > 0 && self.state.current_frame >= self.state.last_frame() {
            self.jump_to_frame(0).await;
        }
        self.media.play()?;
        self.state.is_playing = true;
        info!(frame = self.state.current_frame, "playback started");
        Ok(self.state)
    }

    /// Per-animation-frame callback: follow the live time and repaint.
    pub fn tick(&mut self) -> FrameClockState {
        if !self.state.is_playing {
            return self.state;
        }
        let now = self.media.current_time();
        self.state.current_frame = self.state.clamp_frame(time_to_frame(now, self.state.fps));
        let ended = self.state.duration > 0.0 && now >= self.state.duration - FRAME_TIME_EPSILON;
        if ended || self.media.is_paused() {
            self.media.pause();
            self.state.is_playing = false;
            if ended {
                self.state.current_frame = self.state.last_frame();
            }
            debug!(frame = self.state.current_frame, ended, "playback stopped");
        }
        self.repaint();
        self.state
    }

    fn repaint(&mut self) {
        let dest = letterbox(self.viewport, self.media.video_size()).content_rect(self.viewport);
        let ops = [DrawOp { track: Track::Primary, dest, clip: None, alpha: 1.0 }];
        paint(self.surface.as_mut(), &ops, self.media.as_ref(), None);
    }
}
