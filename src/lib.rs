//! Frame-accurate annotation canvas and comparison engine for video review.
//!
//! This crate owns the interactive core of a review session: mapping between
//! media time, frame numbers and drawing coordinates, the pointer-driven
//! selection/move/resize state machine with optimistic previews, snap guides,
//! and two-track comparison playback. It is headless. The host supplies media
//! elements ([`media::MediaElement`]), a drawing target
//! ([`render::Surface`]) and the persistence service
//! ([`persist::ReviewStore`]), then forwards DOM-style input events to
//! [`engine::Engine`] and applies the returned [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`coords`] | Normalized / native / CSS coordinate types and letterboxing |
//! | [`clock`] | Frame clock: time↔frame mapping, seeking, scrubbing, playback ticks |
//! | [`media`] | Media element trait, the shared seek gate, load retry policy |
//! | [`doc`] | Annotation and comment model plus the in-memory document store |
//! | [`optimistic`] | Transient move/resize overrides with TTL collection |
//! | [`geometry`] | Renderable bounds for annotations and comments |
//! | [`hit`] | Hit-testing of element bodies and resize handles |
//! | [`input`] | Tools, modifiers, resize sides and the drag state machine |
//! | [`snap`] | Alignment guides and snapped positions |
//! | [`persist`] | Persistence collaborator trait and the debounced committer |
//! | [`session`] | Per-canvas shared state touched by the engine and write tasks |
//! | [`engine`] | Selection & transform engine |
//! | [`compare`] | Primary/comparison synchronization and compositing |
//! | [`render`] | Draw operations, surfaces and the overlay scene |
//! | [`config`] | Environment-driven configuration |
//! | [`consts`] | Shared numeric constants |
//! | [`error`] | Error code trait shared by the error enums |

pub mod clock;
pub mod compare;
pub mod config;
pub mod consts;
pub mod coords;
pub mod doc;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod hit;
pub mod input;
pub mod media;
pub mod optimistic;
pub mod persist;
pub mod render;
pub mod session;
pub mod snap;

#[cfg(test)]
mod test_helpers;
