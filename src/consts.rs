//! Shared numeric constants for the review canvas.

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for resize handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

// ── Geometry ────────────────────────────────────────────────────

/// Diameter of a comment bubble in CSS pixels.
pub const COMMENT_DIAMETER_PX: f64 = 28.0;

/// Side length of the box drawn around position-only annotations (text, bare points).
pub const DEFAULT_ELEMENT_SIZE_PX: f64 = 40.0;

/// Smallest width or height a resize may produce, in rendered pixels.
pub const MIN_RESIZE_PX: f64 = 10.0;

/// Cumulative pointer travel (CSS pixels) below which a drag is treated as a click.
pub const MOVE_EPSILON_PX: f64 = 0.5;

/// Normalized deltas smaller than this are considered zero when reconciling writes.
pub const NORMALIZED_EPSILON: f64 = 1e-9;

// ── Timing ──────────────────────────────────────────────────────

/// Seek target used before a literal zero seek; some decoders stall on `0.0`.
pub const ZERO_SEEK_EPSILON_SECS: f64 = 0.001;

/// Slack added before flooring `time * fps` so `frame / fps` maps back to `frame`.
pub const FRAME_TIME_EPSILON: f64 = 1e-6;

// ── Keyboard ────────────────────────────────────────────────────

/// Arrow-key nudge distance in CSS pixels.
pub const NUDGE_PX: f64 = 1.0;

/// Arrow-key nudge distance in CSS pixels while Shift is held.
pub const NUDGE_LARGE_PX: f64 = 10.0;
