//! Media element abstraction, the shared seek gate, and load recovery.
//!
//! DESIGN
//! ======
//! A [`MediaElement`] is the host's handle on one decoder (a `<video>` tag in
//! the browser, a native player elsewhere). Handles are shared, so every
//! method takes `&self` and implementations use interior mutability.
//!
//! All seeks go through a [`SeekGate`]. The gate serializes seeks so the frame
//! clock and the comparison engine never issue overlapping seeks, bounds every
//! wait on the completion signal with a fallback timeout, and applies the
//! frame-0 workaround (seek to a near-zero epsilon first) on every path.
//!
//! ERROR HANDLING
//! ==============
//! Seek timeouts are not errors: they are logged at debug and the caller
//! proceeds. Load failures escalate through [`RecoveryStrategy`] steps before
//! [`MediaError::Exhausted`] is reported.

#[cfg(test)]
#[path = "media_test.rs"]
mod media_test;

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::consts::ZERO_SEEK_EPSILON_SECS;
use crate::coords::Size;
use crate::error::ErrorCode;

// =============================================================================
// TYPES
// =============================================================================

/// How much of the media is decodable, mirroring `HTMLMediaElement.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum MediaError {
    #[error("failed to load {url}: {reason}")]
    Load { url: String, reason: String },
    #[error("playback rejected: {0}")]
    PlaybackRejected(String),
    #[error("media unavailable after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl ErrorCode for MediaError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Load { .. } => "E_MEDIA_LOAD",
            Self::PlaybackRejected(_) => "E_MEDIA_PLAYBACK",
            Self::Exhausted { .. } => "E_MEDIA_EXHAUSTED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::PlaybackRejected(_))
    }
}

/// Host handle on a single decodable media source.
#[async_trait::async_trait]
pub trait MediaElement: Send + Sync {
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Set the playback position without waiting for the seek to finish.
    fn set_current_time(&self, seconds: f64);

    /// Total duration in seconds; `0.0` or non-finite before metadata loads.
    fn duration(&self) -> f64;

    fn ready_state(&self) -> ReadyState;

    fn is_paused(&self) -> bool;

    /// Start playback.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::PlaybackRejected`] when the platform refuses to play
    /// (autoplay policy, missing source).
    fn play(&self) -> Result<(), MediaError>;

    fn pause(&self);

    /// Intrinsic frame size in native pixels.
    fn video_size(&self) -> Size;

    /// Frame rate reported by the container, when the platform exposes one.
    fn frame_rate(&self) -> Option<f64> {
        None
    }

    /// Set the position and resolve on the element's seek-completion signal.
    ///
    /// May never resolve if the platform drops the signal; callers bound the
    /// wait through [`SeekGate`].
    async fn seek(&self, seconds: f64);

    /// Point the element at `url` and resolve once metadata is available.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Load`] when the source cannot be decoded.
    async fn load(&self, url: &str) -> Result<(), MediaError>;

    /// Detach the current source so the next load starts from scratch.
    fn clear_source(&self);
}

/// How a bounded seek finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The completion signal fired.
    Completed,
    /// The fallback timeout elapsed first.
    TimedOut,
}

// =============================================================================
// SEEK GATE
// =============================================================================

/// Single entry point for seeks on the session's media elements.
pub struct SeekGate {
    lock: Mutex<()>,
    timeout: Duration,
}

impl SeekGate {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { lock: Mutex::new(()), timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Seek one element, waiting for completion or the fallback timeout.
    pub async fn seek(&self, media: &dyn MediaElement, seconds: f64) -> SeekOutcome {
        let _guard = self.lock.lock().await;
        self.seek_unlocked(media, seconds).await
    }

    /// Seek two elements to the same time and wait for both.
    pub async fn seek_pair(
        &self,
        first: &dyn MediaElement,
        second: &dyn MediaElement,
        seconds: f64,
    ) -> (SeekOutcome, SeekOutcome) {
        let _guard = self.lock.lock().await;
        tokio::join!(self.seek_unlocked(first, seconds), self.seek_unlocked(second, seconds))
    }

    async fn seek_unlocked(&self, media: &dyn MediaElement, seconds: f64) -> SeekOutcome {
        let target = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        if target > 0.0 {
            return self.bounded(media, target).await;
        }

        // EDGE: some decoders never signal completion for a literal 0 seek.
        let primed = self.bounded(media, ZERO_SEEK_EPSILON_SECS).await;
        let zeroed = self.bounded(media, 0.0).await;
        if primed == SeekOutcome::Completed && zeroed == SeekOutcome::Completed {
            SeekOutcome::Completed
        } else {
            SeekOutcome::TimedOut
        }
    }

    async fn bounded(&self, media: &dyn MediaElement, seconds: f64) -> SeekOutcome {
        match tokio::time::timeout(self.timeout, media.seek(seconds)).await {
            Ok(()) => SeekOutcome::Completed,
            Err(_) => {
                debug!(seconds, timeout_ms = self.timeout.as_millis(), "seek completion not signalled; continuing");
                // The element may still be mid-seek; pin the requested position.
                media.set_current_time(seconds);
                SeekOutcome::TimedOut
            }
        }
    }
}

// =============================================================================
// LOAD RECOVERY
// =============================================================================

/// Escalating steps tried after the first load fails, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Load the same URL again.
    Reload,
    /// Clear the source, then reassign the same URL.
    ClearAndReassign,
    /// Load the alternate URL, if one was provided.
    AlternateUrl,
}

pub const RECOVERY_ORDER: [RecoveryStrategy; 3] =
    [RecoveryStrategy::Reload, RecoveryStrategy::ClearAndReassign, RecoveryStrategy::AlternateUrl];

/// Successful load: which URL is playing and how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub url: String,
    pub attempts: u32,
}

/// Load `url`, escalating through [`RECOVERY_ORDER`] with linear back-off.
///
/// # Errors
///
/// Returns [`MediaError::Exhausted`] when every strategy fails.
pub async fn load_with_retry(
    media: &dyn MediaElement,
    url: &str,
    alternate: Option<&str>,
    retry_base: Duration,
) -> Result<LoadReport, MediaError> {
    let mut attempts = 1;
    let mut last = match media.load(url).await {
        Ok(()) => return Ok(LoadReport { url: url.to_owned(), attempts }),
        Err(e) => e,
    };

    for (step, strategy) in (1u32..).zip(RECOVERY_ORDER) {
        let target = match strategy {
            RecoveryStrategy::Reload => url,
            RecoveryStrategy::ClearAndReassign => {
                media.clear_source();
                url
            }
            RecoveryStrategy::AlternateUrl => match alternate {
                Some(alt) => alt,
                None => continue,
            },
        };
        warn!(error = %last, ?strategy, attempt = attempts, "media load failed; retrying");
        tokio::time::sleep(retry_base * step).await;
        attempts += 1;
        match media.load(target).await {
            Ok(()) => {
                info!(url = target, attempts, "media loaded after recovery");
                return Ok(LoadReport { url: target.to_owned(), attempts });
            }
            Err(e) => last = e,
        }
    }

    warn!(error = %last, attempts, "media load exhausted recovery strategies");
    Err(MediaError::Exhausted { attempts, last: last.to_string() })
}
