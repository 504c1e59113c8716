#![allow(clippy::float_cmp)]

use std::time::Duration;

use super::*;
use crate::test_helpers::{FakeMedia, RecordingSurface, SeekMode};

fn clock_with(media: FakeMedia) -> (FrameClock, Arc<FakeMedia>, RecordingSurface) {
    let media = Arc::new(media);
    let surface = RecordingSurface::new();
    let gate = Arc::new(SeekGate::new(Duration::from_millis(500)));
    let mut clock = FrameClock::new(media.clone(), gate, Box::new(surface.clone()), 30.0);
    clock.set_viewport(CssRect::new(0.0, 0.0, 1000.0, 500.0));
    (clock, media, surface)
}

// =============================================================
// time <-> frame
// =============================================================

#[test]
fn frame_time_round_trip() {
    for fps in [24.0, 25.0, 29.97, 30.0, 59.94, 60.0] {
        for frame in 0..500 {
            assert_eq!(time_to_frame(frame_to_time(frame, fps), fps), frame, "fps {fps} frame {frame}");
        }
    }
}

#[test]
fn time_to_frame_floors_mid_frame_times() {
    assert_eq!(time_to_frame(0.049, 30.0), 1);
    assert_eq!(time_to_frame(0.033, 30.0), 0);
    assert_eq!(time_to_frame(-1.0, 30.0), 0);
    assert_eq!(time_to_frame(f64::NAN, 30.0), 0);
}

#[test]
fn total_frames_counts_partial_last_frame() {
    assert_eq!(total_frames(10.0, 30.0), 300);
    assert_eq!(total_frames(10.01, 30.0), 301);
    assert_eq!(total_frames(0.0, 30.0), 0);
    assert_eq!(total_frames(f64::INFINITY, 30.0), 0);
}

#[test]
fn fps_prefers_media_rate() {
    assert_eq!(session_fps(&FakeMedia::new(1.0).with_frame_rate(24.0), 30.0), 24.0);
    assert_eq!(session_fps(&FakeMedia::new(1.0).with_frame_rate(0.0), 30.0), 30.0);
    assert_eq!(session_fps(&FakeMedia::new(1.0), 30.0), 30.0);
}

// =============================================================
// jump_to_frame
// =============================================================

#[tokio::test(start_paused = true)]
async fn jump_clamps_to_last_frame() {
    let (mut clock, media, _) = clock_with(FakeMedia::new(10.0));
    assert_eq!(clock.state().total_frames, 300);

    let state = clock.jump_to_frame(10_000).await;
    assert_eq!(state.current_frame, 299);
    assert_eq!(media.seeks(), vec![299.0 / 30.0]);
}

#[tokio::test(start_paused = true)]
async fn jump_repaints_after_seek() {
    let (mut clock, media, surface) = clock_with(FakeMedia::new(10.0).with_seek_mode(SeekMode::Delay(Duration::from_millis(40))));
    let before = surface.paint_count();

    clock.jump_to_frame(90).await;

    assert_eq!(surface.paint_count(), before + 1);
    let frame = surface.last_frame();
    assert_eq!(frame.len(), 1);
    assert_eq!(frame[0].1, 3.0);
    assert_eq!(media.current_time(), 3.0);
}

#[tokio::test(start_paused = true)]
async fn stalled_zero_seek_still_paints_frame_zero() {
    let (mut clock, media, surface) = clock_with(FakeMedia::new(10.0).with_seek_mode(SeekMode::Never));
    media.set_current_time(3.0);
    clock.sync_from_media();
    assert_eq!(clock.state().current_frame, 90);

    let state = clock.jump_to_frame(0).await;

    assert_eq!(state.current_frame, 0);
    assert_eq!(media.seeks(), vec![crate::consts::ZERO_SEEK_EPSILON_SECS, 0.0]);
    let frame = surface.last_frame();
    assert!(frame.iter().all(|(_, time)| *time == 0.0));
    assert!(!frame.is_empty());
}

#[tokio::test(start_paused = true)]
async fn paint_targets_letterboxed_content() {
    let (mut clock, _, surface) = clock_with(FakeMedia::new(10.0));
    clock.set_viewport(CssRect::new(0.0, 0.0, 1000.0, 1000.0));
    let (op, _) = surface.last_frame()[0];
    let expected = [0.0, 218.75, 1000.0, 562.5];
    let actual = [op.dest.x, op.dest.y, op.dest.width, op.dest.height];
    assert!(expected.iter().zip(actual).all(|(e, a)| (e - a).abs() < 1e-9), "{:?}", op.dest);
}

// =============================================================
// step / scrub
// =============================================================

#[tokio::test(start_paused = true)]
async fn step_clamps_at_both_ends() {
    let (mut clock, _, _) = clock_with(FakeMedia::new(10.0));
    clock.jump_to_frame(10).await;
    assert_eq!(clock.step(-20).await.current_frame, 0);
    assert_eq!(clock.step(5).await.current_frame, 5);
    clock.jump_to_frame(299).await;
    assert_eq!(clock.step(1).await.current_frame, 299);
}

#[tokio::test(start_paused = true)]
async fn scrub_previews_without_seeking_then_snaps() {
    let (mut clock, media, surface) = clock_with(FakeMedia::new(10.0));
    let track = CssRect::new(0.0, 0.0, 300.0, 10.0);
    let before = surface.paint_count();

    let state = clock.scrub(150.0, track);
    assert_eq!(state.current_frame, 150);
    assert!(clock.is_scrubbing());
    assert!(media.seeks().is_empty());
    assert_eq!(media.current_time(), 5.0);
    assert_eq!(surface.paint_count(), before + 1);

    assert_eq!(clock.scrub(900.0, track).current_frame, 299);

    let state = clock.end_scrub().await;
    assert!(!clock.is_scrubbing());
    assert_eq!(state.current_frame, 299);
    assert_eq!(media.seeks(), vec![299.0 / 30.0]);
}

// =============================================================
// playback
// =============================================================

#[tokio::test(start_paused = true)]
async fn tick_follows_live_time_and_stops_at_end() {
    let (mut clock, media, _) = clock_with(FakeMedia::new(2.0));
    assert!(clock.play_toggle().await.unwrap().is_playing);

    media.advance(1.0);
    assert_eq!(clock.tick().current_frame, 30);

    media.advance(5.0);
    let state = clock.tick();
    assert!(!state.is_playing);
    assert_eq!(state.current_frame, 59);
    assert!(media.is_paused());
}

#[tokio::test(start_paused = true)]
async fn tick_while_paused_is_a_no_op() {
    let (mut clock, media, surface) = clock_with(FakeMedia::new(2.0));
    let before = surface.paint_count();
    media.advance(1.0);
    assert_eq!(clock.tick().current_frame, 0);
    assert_eq!(surface.paint_count(), before);
}

#[tokio::test(start_paused = true)]
async fn play_toggle_pauses_and_restarts_from_end() {
    let (mut clock, media, _) = clock_with(FakeMedia::new(2.0));
    clock.jump_to_frame(59).await;

    let before = media.seeks().len();
    let state = clock.play_toggle().await.unwrap();
    assert!(state.is_playing);
    assert_eq!(state.current_frame, 0);
    assert_eq!(media.current_time(), 0.0);
    assert_eq!(media.seeks()[before..], [crate::consts::ZERO_SEEK_EPSILON_SECS, 0.0]);

    assert!(!clock.play_toggle().await.unwrap().is_playing);
    assert!(media.is_paused());
}

#[tokio::test(start_paused = true)]
async fn rejected_play_leaves_clock_paused() {
    let (mut clock, _, _) = clock_with(FakeMedia::new(2.0).rejecting_play());
    assert!(matches!(clock.play_toggle().await, Err(MediaError::PlaybackRejected(_))));
    assert!(!clock.state().is_playing);
}

#[tokio::test(start_paused = true)]
async fn restart_from_end_waits_for_stalled_zero_seek() {
    let (mut clock, media, surface) = clock_with(FakeMedia::new(2.0));
    clock.jump_to_frame(59).await;
    media.set_seek_mode(SeekMode::Never);
    let started = tokio::time::Instant::now();

    let state = clock.play_toggle().await.unwrap();

    assert!(state.is_playing);
    // Both the priming seek and the zero seek run into the timeout.
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
    assert_eq!(media.current_time(), 0.0);
    assert!(surface.last_frame().iter().all(|(_, time)| *time == 0.0));
}
