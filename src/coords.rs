//! Coordinate spaces: normalized, native media pixels, and rendered CSS pixels.
//!
//! Persisted geometry is stored *normalized* ([0, 1] of the native media size)
//! so it survives any render size. The canvas backing store matches the
//! *native* resolution of the media, while the DOM element is scaled by CSS,
//! so pointer input and overlays live in *CSS* pixels. Each space has its own
//! point type so a conversion can never be skipped silently.
//!
//! Overlays are placed inside the letterboxed content rectangle (see
//! [`letterbox`]), not the raw container, so they stay pixel-accurate when the
//! container's aspect ratio differs from the media's.

#[cfg(test)]
#[path = "coords_test.rs"]
mod coords_test;

use serde::{Deserialize, Serialize};

/// A point as a fraction of the native media size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Shift by a normalized delta.
    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

/// A point in intrinsic media pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NativePoint {
    pub x: f64,
    pub y: f64,
}

impl NativePoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point in rendered CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CssPoint {
    pub x: f64,
    pub y: f64,
}

impl CssPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: CssPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Width and height of a media frame or surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero, negative, or not finite.
    #[must_use]
    pub fn is_degenerate(self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }
}

/// An axis-aligned rectangle in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Axis-aligned envelope of a set of points. `None` when `points` is empty.
    #[must_use]
    pub fn envelope(points: &[NormalizedPoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self { x: min_x, y: min_y, width: max_x - min_x, height: max_y - min_y })
    }

    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..self }
    }

    #[must_use]
    pub fn center(self) -> NormalizedPoint {
        NormalizedPoint::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Map a point expressed relative to `self` onto the same relative spot in `to`.
    ///
    /// Zero-extent axes map onto the target's origin on that axis.
    #[must_use]
    pub fn map_point(self, to: NormalizedRect, p: NormalizedPoint) -> NormalizedPoint {
        let fx = if self.width.abs() > f64::EPSILON { (p.x - self.x) / self.width } else { 0.0 };
        let fy = if self.height.abs() > f64::EPSILON { (p.y - self.y) / self.height } else { 0.0 };
        NormalizedPoint::new(to.x + fx * to.width, to.y + fy * to.height)
    }

    /// Convert into CSS pixels inside `rect`.
    #[must_use]
    pub fn to_css(self, rect: CssRect) -> CssRect {
        let origin = to_rendered(NormalizedPoint::new(self.x, self.y), rect);
        CssRect::new(origin.x, origin.y, self.width * rect.width, self.height * rect.height)
    }
}

/// An axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CssRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CssRect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanning two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: CssPoint, b: CssPoint) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self { x, y, width: (a.x - b.x).abs(), height: (a.y - b.y).abs() }
    }

    #[must_use]
    pub fn right(self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(self) -> CssPoint {
        CssPoint::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    #[must_use]
    pub fn is_degenerate(self) -> bool {
        Size::new(self.width, self.height).is_degenerate()
    }

    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..self }
    }

    #[must_use]
    pub fn contains(self, p: CssPoint) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// True when the two rectangles overlap or touch.
    #[must_use]
    pub fn intersects(self, other: CssRect) -> bool {
        self.x <= other.right() && other.x <= self.right() && self.y <= other.bottom() && other.y <= self.bottom()
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn union(self, other: CssRect) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self { x, y, width: right - x, height: bottom - y }
    }

    /// Rectangle of the given size centered on `center`.
    #[must_use]
    pub fn centered(center: CssPoint, width: f64, height: f64) -> Self {
        Self { x: center.x - width * 0.5, y: center.y - height * 0.5, width, height }
    }

    /// Convert into normalized coordinates relative to `rect`.
    #[must_use]
    pub fn to_normalized(self, rect: CssRect) -> NormalizedRect {
        let origin = to_normalized(CssPoint::new(self.x, self.y), rect);
        let (width, height) = css_delta_to_normalized(self.width, self.height, rect);
        NormalizedRect::new(origin.x, origin.y, width, height)
    }
}

/// Result of fitting a fixed-aspect frame inside a container.
///
/// Offsets are relative to the container's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub rendered_width: f64,
    pub rendered_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Letterbox {
    /// The letterboxed content rectangle in the container's coordinate space.
    #[must_use]
    pub fn content_rect(self, container: CssRect) -> CssRect {
        CssRect::new(
            container.x + self.offset_x,
            container.y + self.offset_y,
            self.rendered_width,
            self.rendered_height,
        )
    }
}

/// Largest centered rectangle with the aspect ratio of `native` that fits `container`.
///
/// Falls back to the full container when either size is degenerate.
#[must_use]
pub fn letterbox(container: CssRect, native: Size) -> Letterbox {
    if native.is_degenerate() || container.is_degenerate() {
        return Letterbox {
            rendered_width: container.width.max(0.0),
            rendered_height: container.height.max(0.0),
            offset_x: 0.0,
            offset_y: 0.0,
        };
    }
    let scale = (container.width / native.width).min(container.height / native.height);
    let rendered_width = native.width * scale;
    let rendered_height = native.height * scale;
    Letterbox {
        rendered_width,
        rendered_height,
        offset_x: (container.width - rendered_width) * 0.5,
        offset_y: (container.height - rendered_height) * 0.5,
    }
}

/// Convert a normalized point to CSS pixels inside `rect`.
#[must_use]
pub fn to_rendered(p: NormalizedPoint, rect: CssRect) -> CssPoint {
    CssPoint::new(rect.x + p.x * rect.width, rect.y + p.y * rect.height)
}

/// Convert a CSS point to normalized coordinates relative to `rect`.
///
/// Degenerate axes map to 0.
#[must_use]
pub fn to_normalized(css: CssPoint, rect: CssRect) -> NormalizedPoint {
    let (x, y) = css_delta_to_normalized(css.x - rect.x, css.y - rect.y, rect);
    NormalizedPoint::new(x, y)
}

/// Convert a CSS-pixel delta to a normalized delta for content of size `rect`.
#[must_use]
pub fn css_delta_to_normalized(dx: f64, dy: f64, rect: CssRect) -> (f64, f64) {
    let nx = if rect.width > 0.0 { dx / rect.width } else { 0.0 };
    let ny = if rect.height > 0.0 { dy / rect.height } else { 0.0 };
    (nx, ny)
}

/// Convert a native media pixel to CSS pixels within the rendered rectangle.
#[must_use]
pub fn to_css_from_native(native: NativePoint, native_size: Size, rendered: CssRect) -> CssPoint {
    if native_size.is_degenerate() {
        return CssPoint::new(rendered.x, rendered.y);
    }
    CssPoint::new(
        rendered.x + native.x * rendered.width / native_size.width,
        rendered.y + native.y * rendered.height / native_size.height,
    )
}

/// Convert a CSS point inside the rendered rectangle to native media pixels.
#[must_use]
pub fn to_native_from_css(css: CssPoint, native_size: Size, rendered: CssRect) -> NativePoint {
    if rendered.is_degenerate() {
        return NativePoint::default();
    }
    NativePoint::new(
        (css.x - rendered.x) * native_size.width / rendered.width,
        (css.y - rendered.y) * native_size.height / rendered.height,
    )
}
