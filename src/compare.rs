//! Comparison synchronization and compositing.
//!
//! DESIGN
//! ======
//! Two media elements (primary and comparison) are kept in lockstep. The
//! sync master's time and play state are authoritative; `reconcile` is called
//! from the host's render tick and corrects the follower when its time drifts
//! past the tolerance or its play state diverges. Exact frame seeks go
//! through the same [`SeekGate`] as the frame clock and, while synced, wait
//! for both elements so neither track lags the other by a frame.
//!
//! Compositing is described as a list of [`DrawOp`]s by `render_plan`. In
//! `overlay` mode the primary is drawn opaque and the comparison on top at
//! `opacity / 100`; zero-alpha draws are dropped, so `opacity = 0` produces
//! exactly the `normal` plan. Split modes draw each track over the full
//! destination, clipped to its region: `split-horizontal` places the tracks
//! side by side, `split-vertical` stacks them.
//!
//! ERROR HANDLING
//! ==============
//! A frame is skipped, not failed, when a required element is not ready:
//! `HaveCurrentData` while playing, `HaveMetadata` while paused. Playback
//! rejections propagate as [`MediaError`].

#[cfg(test)]
#[path = "compare_test.rs"]
mod compare_test;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{frame_to_time, session_fps, total_frames};
use crate::config::EngineConfig;
use crate::coords::CssRect;
use crate::media::{MediaElement, MediaError, ReadyState, SeekGate, SeekOutcome};
use crate::render::{DrawOp, Surface, Track, paint};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompareMode {
    /// Only the primary is shown.
    #[default]
    Normal,
    /// Comparison alpha-blended over the primary.
    Overlay,
    /// Primary on the left, comparison on the right.
    SplitHorizontal,
    /// Primary on top, comparison below.
    SplitVertical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMaster {
    #[default]
    Primary,
    Comparison,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonState {
    pub mode: CompareMode,
    /// Comparison opacity in overlay mode, 0..=100.
    pub opacity: u8,
    pub is_synced: bool,
    pub sync_master: SyncMaster,
    /// Share of the destination given to the primary in split modes, 0..=1.
    pub split_ratio: f64,
}

impl Default for ComparisonState {
    fn default() -> Self {
        Self {
            mode: CompareMode::Normal,
            opacity: 50,
            is_synced: true,
            sync_master: SyncMaster::Primary,
            split_ratio: 0.5,
        }
    }
}

/// What `reconcile` had to fix on the follower.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCorrection {
    pub reseeked: bool,
    pub play_state: bool,
}

impl SyncCorrection {
    #[must_use]
    pub fn is_none(&self) -> bool {
        !self.reseeked && !self.play_state
    }
}

/// Minimum readiness needed to draw a frame of an element.
#[must_use]
pub fn required_readiness(playing: bool) -> ReadyState {
    if playing { ReadyState::HaveCurrentData } else { ReadyState::HaveMetadata }
}

pub struct ComparisonSync {
    primary: Arc<dyn MediaElement>,
    comparison: Arc<dyn MediaElement>,
    gate: Arc<SeekGate>,
    state: ComparisonState,
    drift_tolerance: f64,
    fps: f64,
}

impl ComparisonSync {
    pub fn new(
        primary: Arc<dyn MediaElement>,
        comparison: Arc<dyn MediaElement>,
        gate: Arc<SeekGate>,
        config: &EngineConfig,
    ) -> Self {
        let fps = session_fps(primary.as_ref(), config.default_fps);
        Self {
            primary,
            comparison,
            gate,
            state: ComparisonState::default(),
            drift_tolerance: config.drift_tolerance_secs,
            fps,
        }
    }

    #[must_use]
    pub fn state(&self) -> ComparisonState {
        self.state
    }

    pub fn set_mode(&mut self, mode: CompareMode) {
        info!(?mode, "comparison mode changed");
        self.state.mode = mode;
    }

    /// Set overlay opacity, clamped to 100.
    pub fn set_opacity(&mut self, opacity: u8) {
        self.state.opacity = opacity.min(100);
    }

    /// Set the split position, clamped to 0..=1. Non-finite values are ignored.
    pub fn set_split_ratio(&mut self, ratio: f64) {
        if ratio.is_finite() {
            self.state.split_ratio = ratio.clamp(0.0, 1.0);
        }
    }

    pub fn set_sync_master(&mut self, master: SyncMaster) {
        self.state.sync_master = master;
    }

    pub fn set_synced(&mut self, synced: bool) {
        self.state.is_synced = synced;
    }

    fn master_and_follower(&self) -> (&dyn MediaElement, &dyn MediaElement) {
        match self.state.sync_master {
            SyncMaster::Primary => (self.primary.as_ref(), self.comparison.as_ref()),
            SyncMaster::Comparison => (self.comparison.as_ref(), self.primary.as_ref()),
        }
    }

    /// Bring the follower back in line with the master.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::PlaybackRejected`] when the follower refuses to play.
    pub async fn reconcile(&self) -> Result<SyncCorrection, MediaError> {
        let mut correction = SyncCorrection::default();
        if !self.state.is_synced {
            return Ok(correction);
        }
        let (master, follower) = self.master_and_follower();

        let target = master.current_time();
        let drift = (target - follower.current_time()).abs();
        if drift > self.drift_tolerance {
            debug!(drift, target, "follower drifted; re-seeking");
            self.gate.seek(follower, target).await;
            correction.reseeked = true;
        }

        if master.is_paused() != follower.is_paused() {
            correction.play_state = true;
            if master.is_paused() {
                follower.pause();
            } else if let Err(e) = follower.play() {
                warn!(error = %e, "follower refused to play");
                return Err(e);
            }
        }
        Ok(correction)
    }

    /// Seek to `frame` (clamped to the primary), waiting for both elements while synced.
    pub async fn seek_frame(&self, frame: u32) -> u32 {
        let last = total_frames(self.primary.duration(), self.fps).saturating_sub(1);
        let target = frame.min(last);
        let seconds = frame_to_time(target, self.fps);
        if self.state.is_synced {
            let outcomes = self.gate.seek_pair(self.primary.as_ref(), self.comparison.as_ref(), seconds).await;
            if outcomes != (SeekOutcome::Completed, SeekOutcome::Completed) {
                debug!(frame = target, ?outcomes, "paired seek fell back to timeout");
            }
        } else {
            self.gate.seek(self.primary.as_ref(), seconds).await;
        }
        target
    }

    /// Start playback on the primary, and on the comparison while synced.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::PlaybackRejected`] when either element refuses to play.
    pub fn play(&self) -> Result<(), MediaError> {
        self.primary.play()?;
        if self.state.is_synced {
            self.comparison.play()?;
        }
        Ok(())
    }

    pub fn pause(&self) {
        self.primary.pause();
        if self.state.is_synced {
            self.comparison.pause();
        }
    }

    /// Toggle playback from the master's state. Returns true when now playing.
    ///
    /// # Errors
    ///
    /// Propagates [`ComparisonSync::play`] failures.
    pub fn toggle(&self) -> Result<bool, MediaError> {
        let (master, _) = self.master_and_follower();
        if master.is_paused() {
            self.play()?;
            Ok(true)
        } else {
            self.pause();
            Ok(false)
        }
    }

    fn ready(media: &dyn MediaElement) -> bool {
        media.ready_state() >= required_readiness(!media.is_paused())
    }

    /// Draw operations for one frame into `dest`, or `None` when the frame must be skipped.
    #[must_use]
    pub fn render_plan(&self, dest: CssRect) -> Option<Vec<DrawOp>> {
        if !Self::ready(self.primary.as_ref()) {
            return None;
        }
        let primary = DrawOp { track: Track::Primary, dest, clip: None, alpha: 1.0 };
        let needs_comparison = match self.state.mode {
            CompareMode::Normal => false,
            CompareMode::Overlay => self.state.opacity > 0,
            CompareMode::SplitHorizontal | CompareMode::SplitVertical => true,
        };
        if !needs_comparison {
            return Some(vec![primary]);
        }
        if !Self::ready(self.comparison.as_ref()) {
            return None;
        }

        let ratio = self.state.split_ratio;
        let ops = match self.state.mode {
            CompareMode::Overlay => {
                let alpha = f64::from(self.state.opacity) / 100.0;
                vec![primary, DrawOp { track: Track::Comparison, dest, clip: None, alpha }]
            }
            CompareMode::SplitHorizontal => {
                let split = dest.width * ratio;
                split_ops(
                    dest,
                    CssRect::new(dest.x, dest.y, split, dest.height),
                    CssRect::new(dest.x + split, dest.y, dest.width - split, dest.height),
                )
            }
            CompareMode::SplitVertical => {
                let split = dest.height * ratio;
                split_ops(
                    dest,
                    CssRect::new(dest.x, dest.y, dest.width, split),
                    CssRect::new(dest.x, dest.y + split, dest.width, dest.height - split),
                )
            }
            CompareMode::Normal => vec![primary],
        };
        Some(ops)
    }

    /// Composite one frame onto `surface`. Returns false when the frame was skipped.
    pub fn render(&self, surface: &mut dyn Surface, dest: CssRect) -> bool {
        let Some(ops) = self.render_plan(dest) else {
            debug!(mode = ?self.state.mode, "comparison frame skipped; media not ready");
            return false;
        };
        paint(surface, &ops, self.primary.as_ref(), Some(self.comparison.as_ref()));
        true
    }
}

/// Draw each track over the whole destination, clipped to its region. Empty regions are omitted.
fn split_ops(dest: CssRect, primary: CssRect, comparison: CssRect) -> Vec<DrawOp> {
    [(Track::Primary, primary), (Track::Comparison, comparison)]
        .into_iter()
        .filter(|(_, clip)| !clip.is_degenerate())
        .map(|(track, clip)| DrawOp { track, dest, clip: Some(clip), alpha: 1.0 })
        .collect()
}
