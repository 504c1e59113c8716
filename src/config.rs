//! Engine configuration parsed from environment variables.
//!
//! Every knob has a typed default; a missing or unparsable variable falls
//! back to it. Values that parse but make no sense (a zero frame rate, a
//! negative tolerance) are rejected with [`ConfigError`].

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::time::Duration;

use crate::consts::MIN_RESIZE_PX;
use crate::error::ErrorCode;
use crate::snap::SnapConfig;

pub const DEFAULT_FPS: f64 = 30.0;
pub const DEFAULT_SEEK_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_OPTIMISTIC_TTL_MS: u64 = 10_000;
pub const DEFAULT_NUDGE_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_DRIFT_TOLERANCE_SECS: f64 = 0.1;
pub const DEFAULT_MEDIA_RETRY_BASE_MS: u64 = 250;
pub const DEFAULT_AUTHOR: &str = "Reviewer";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a positive finite number, got {value}")]
    NotPositive { key: &'static str, value: f64 },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotPositive { .. } => "E_CONFIG_INVALID",
        }
    }
}

/// Tuning knobs for one review canvas session.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Frame rate assumed when the media does not report one.
    pub default_fps: f64,
    /// Fallback bound on waiting for a seek-completion signal.
    pub seek_timeout: Duration,
    /// Age after which an unreconciled optimistic update is dropped.
    pub optimistic_ttl: Duration,
    /// Quiet period before accumulated keyboard nudges are written.
    pub nudge_debounce: Duration,
    /// Comparison drift beyond which the follower is re-seeked.
    pub drift_tolerance_secs: f64,
    /// Smallest rendered width/height a resize may produce.
    pub min_resize_px: f64,
    /// Base delay for the linear media load back-off.
    pub media_retry_base: Duration,
    /// Display name stamped on comments created in this session.
    pub author: String,
    /// Snap guide tuning.
    pub snap: SnapConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_fps: DEFAULT_FPS,
            seek_timeout: Duration::from_millis(DEFAULT_SEEK_TIMEOUT_MS),
            optimistic_ttl: Duration::from_millis(DEFAULT_OPTIMISTIC_TTL_MS),
            nudge_debounce: Duration::from_millis(DEFAULT_NUDGE_DEBOUNCE_MS),
            drift_tolerance_secs: DEFAULT_DRIFT_TOLERANCE_SECS,
            min_resize_px: MIN_RESIZE_PX,
            media_retry_base: Duration::from_millis(DEFAULT_MEDIA_RETRY_BASE_MS),
            author: DEFAULT_AUTHOR.to_owned(),
            snap: SnapConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `FRAMEBOARD_FPS`: default 30
    /// - `FRAMEBOARD_SEEK_TIMEOUT_MS`: default 500
    /// - `FRAMEBOARD_OPTIMISTIC_TTL_MS`: default 10000
    /// - `FRAMEBOARD_NUDGE_DEBOUNCE_MS`: default 300
    /// - `FRAMEBOARD_DRIFT_TOLERANCE_SECS`: default 0.1
    /// - `FRAMEBOARD_MIN_RESIZE_PX`: default 10
    /// - `FRAMEBOARD_MEDIA_RETRY_BASE_MS`: default 250
    /// - `FRAMEBOARD_AUTHOR`: default `Reviewer`
    /// - `FRAMEBOARD_SNAP_THRESHOLD_PX`, `FRAMEBOARD_SNAP_SEARCH_RADIUS_PX`,
    ///   `FRAMEBOARD_SNAP_MAX_CANDIDATES`, `FRAMEBOARD_SNAP_FADE_DISTANCE_PX`,
    ///   `FRAMEBOARD_SNAP_ENABLED`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotPositive`] when a rate, tolerance or size is
    /// zero, negative, or not finite.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = SnapConfig::default();
        let snap = SnapConfig {
            enabled: env_parse("FRAMEBOARD_SNAP_ENABLED", defaults.enabled),
            threshold_px: env_parse("FRAMEBOARD_SNAP_THRESHOLD_PX", defaults.threshold_px),
            search_radius_px: env_parse("FRAMEBOARD_SNAP_SEARCH_RADIUS_PX", defaults.search_radius_px),
            max_candidates: env_parse("FRAMEBOARD_SNAP_MAX_CANDIDATES", defaults.max_candidates),
            fade_distance_px: env_parse("FRAMEBOARD_SNAP_FADE_DISTANCE_PX", defaults.fade_distance_px),
        };
        let config = Self {
            default_fps: env_parse("FRAMEBOARD_FPS", DEFAULT_FPS),
            seek_timeout: Duration::from_millis(env_parse("FRAMEBOARD_SEEK_TIMEOUT_MS", DEFAULT_SEEK_TIMEOUT_MS)),
            optimistic_ttl: Duration::from_millis(env_parse(
                "FRAMEBOARD_OPTIMISTIC_TTL_MS",
                DEFAULT_OPTIMISTIC_TTL_MS,
            )),
            nudge_debounce: Duration::from_millis(env_parse(
                "FRAMEBOARD_NUDGE_DEBOUNCE_MS",
                DEFAULT_NUDGE_DEBOUNCE_MS,
            )),
            drift_tolerance_secs: env_parse("FRAMEBOARD_DRIFT_TOLERANCE_SECS", DEFAULT_DRIFT_TOLERANCE_SECS),
            min_resize_px: env_parse("FRAMEBOARD_MIN_RESIZE_PX", MIN_RESIZE_PX),
            media_retry_base: Duration::from_millis(env_parse(
                "FRAMEBOARD_MEDIA_RETRY_BASE_MS",
                DEFAULT_MEDIA_RETRY_BASE_MS,
            )),
            author: std::env::var("FRAMEBOARD_AUTHOR").unwrap_or_else(|_| DEFAULT_AUTHOR.to_owned()),
            snap,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot drive the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotPositive`] for the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("FRAMEBOARD_FPS", self.default_fps)?;
        require_positive("FRAMEBOARD_DRIFT_TOLERANCE_SECS", self.drift_tolerance_secs)?;
        require_positive("FRAMEBOARD_MIN_RESIZE_PX", self.min_resize_px)?;
        require_positive("FRAMEBOARD_SNAP_THRESHOLD_PX", self.snap.threshold_px)?;
        require_positive("FRAMEBOARD_SNAP_FADE_DISTANCE_PX", self.snap.fade_distance_px)?;
        Ok(())
    }
}

fn require_positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { key, value })
    }
}

/// Parse an environment variable, falling back to `default` when absent or malformed.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
