//! Integration tests for the pipeline lifecycle
//!
//! These tests validate the controller with a real producer thread:
//! - Start/stop/pause/resume transitions and their idempotence
//! - Rate control and measured rate
//! - Seeking, wraparound and reload while running
//! - Config updates and stall reporting while running

mod common;

use common::builders::{playback, tiny_config, SessionBuilder};
use common::{collect_frames, test_timeout, wait_for_frame};
use gaitvis_rs::config::{FrameCountPolicy, PipelineConfig, PlaybackConfig};
use gaitvis_rs::pipeline::PipelineEvent;
use gaitvis_rs::{ConfigPatch, PipelineController, PlaybackState};
use serial_test::serial;
use std::thread;
use std::time::{Duration, Instant};

fn controller_with(frames: usize) -> PipelineController {
    let mut controller =
        PipelineController::new(tiny_config(), playback(FrameCountPolicy::Shortest)).unwrap();
    let (left, right, layout) = SessionBuilder::new(frames).build();
    controller.set_data(left, right, layout).unwrap();
    controller
}

#[test]
#[serial]
fn test_rate_converges_to_target() {
    let mut controller = controller_with(1000);
    assert_eq!(controller.set_rate(30.0), 30.0);
    let events = controller.subscribe();

    controller.start().unwrap();
    assert!(wait_for_frame(&events, test_timeout(), |_| true).is_some());

    let frames = collect_frames(&events, Duration::from_secs(2));
    assert!(
        (54..=66).contains(&frames.len()),
        "expected ~60 frames in 2 s, got {}",
        frames.len()
    );

    let measured = controller.measured_rate();
    assert!(
        (27.0..=33.0).contains(&measured),
        "measured rate {measured} not within 10% of 30 Hz"
    );
    controller.stop();
}

#[test]
#[serial]
fn test_start_and_stop_are_idempotent() {
    let mut controller = controller_with(50);
    assert_eq!(controller.playback_state(), PlaybackState::Idle);

    controller.start().unwrap();
    controller.start().unwrap();
    assert_eq!(controller.playback_state(), PlaybackState::Running);

    controller.stop();
    controller.stop();
    assert_eq!(controller.playback_state(), PlaybackState::Stopped);

    // Pause and resume outside of Running/Paused do nothing
    controller.pause();
    controller.resume();
    assert_eq!(controller.playback_state(), PlaybackState::Stopped);
}

#[test]
#[serial]
fn test_stop_then_set_data_leaves_no_stale_frames() {
    let mut controller = controller_with(100);
    controller.set_rate(120.0);
    let events = controller.subscribe();
    controller.start().unwrap();
    assert!(wait_for_frame(&events, test_timeout(), |f| f.index >= 3).is_some());

    controller.stop();
    let old_session = controller.session();
    let (left, right, layout) = SessionBuilder::new(20).build();
    controller.set_data(left, right, layout).unwrap();

    assert!(controller.reader().is_empty());
    assert_eq!(controller.frame_count(), 20);
    assert_eq!(controller.session(), old_session + 1);
    assert_eq!(controller.playback_state(), PlaybackState::Stopped);
}

#[test]
#[serial]
fn test_set_data_while_running_stops_producer() {
    let mut controller = controller_with(100);
    controller.set_rate(120.0);
    let events = controller.subscribe();
    controller.start().unwrap();
    assert!(wait_for_frame(&events, test_timeout(), |_| true).is_some());

    let (left, right, layout) = SessionBuilder::new(30).build();
    controller.set_data(left, right, layout).unwrap();
    assert_eq!(controller.playback_state(), PlaybackState::Stopped);
    assert!(controller.reader().is_empty());

    // Nothing is produced until an explicit start
    events.drain();
    thread::sleep(Duration::from_millis(100));
    assert!(events.latest_frame().is_none());

    controller.start().unwrap();
    let frame = wait_for_frame(&events, test_timeout(), |_| true).unwrap();
    assert_eq!(frame.index, 0);
    assert_eq!(frame.session, controller.session());
    controller.stop();
}

#[test]
#[serial]
fn test_pause_halts_and_resume_continues() {
    let mut controller = controller_with(500);
    controller.set_rate(100.0);
    let events = controller.subscribe();
    controller.start().unwrap();
    assert!(wait_for_frame(&events, test_timeout(), |f| f.index >= 5).is_some());

    controller.pause();
    assert_eq!(controller.playback_state(), PlaybackState::Paused);
    // Let any frame rendered before the pause land
    thread::sleep(Duration::from_millis(50));
    events.drain();
    let paused_at = controller.current_frame_index();

    thread::sleep(Duration::from_millis(200));
    assert!(events.latest_frame().is_none());
    assert_eq!(controller.current_frame_index(), paused_at);

    controller.resume();
    let next = wait_for_frame(&events, test_timeout(), |_| true).unwrap();
    assert_eq!(next.index, paused_at + 1);
    controller.stop();
}

#[test]
#[serial]
fn test_seek_while_paused_renders_clamped_frame_once() {
    let mut controller = controller_with(40);
    let events = controller.subscribe();
    controller.start().unwrap();
    assert!(wait_for_frame(&events, test_timeout(), |_| true).is_some());
    controller.pause();
    thread::sleep(Duration::from_millis(50));
    events.drain();

    assert_eq!(controller.seek(10_000), 39);
    let frame = wait_for_frame(&events, test_timeout(), |_| true).unwrap();
    assert_eq!(frame.index, 39);
    assert!(controller.reader().get(39).is_some());

    // Still paused: no further frames
    thread::sleep(Duration::from_millis(100));
    assert!(events.latest_frame().is_none());
    assert_eq!(controller.playback_state(), PlaybackState::Paused);
    controller.stop();
}

#[test]
#[serial]
fn test_seek_while_running_continues_from_target() {
    let mut controller = controller_with(300);
    controller.set_rate(60.0);
    let events = controller.subscribe();
    controller.start().unwrap();
    assert!(wait_for_frame(&events, test_timeout(), |_| true).is_some());

    controller.seek(200);
    let landed = wait_for_frame(&events, test_timeout(), |f| f.index >= 200).unwrap();
    assert_eq!(landed.index, 200);
    let next = wait_for_frame(&events, test_timeout(), |_| true).unwrap();
    assert_eq!(next.index, 201);
    controller.stop();
}

#[test]
#[serial]
fn test_free_running_index_wraps() {
    let mut controller = controller_with(5);
    controller.set_rate(120.0);
    let events = controller.subscribe();
    controller.start().unwrap();

    let frames = collect_frames(&events, Duration::from_millis(300));
    controller.stop();

    assert!(frames.len() >= 10, "too few frames: {frames:?}");
    assert_eq!(&frames[..6], &[0, 1, 2, 3, 4, 0]);
    assert!(frames.iter().all(|i| *i < 5));
}

#[test]
#[serial]
fn test_update_config_applies_without_restart() {
    let mut controller = controller_with(200);
    controller.set_rate(60.0);
    let events = controller.subscribe();
    controller.start().unwrap();
    let before = wait_for_frame(&events, test_timeout(), |_| true).unwrap();

    controller
        .update_config(ConfigPatch::new().size(20, 30).radius(12.0))
        .unwrap();
    let expected = controller.config().output_size();
    assert_ne!((before.width(), before.height()), expected);

    let after = wait_for_frame(&events, test_timeout(), |f| {
        (f.width(), f.height()) == expected
    });
    assert!(after.is_some());
    assert_eq!(controller.playback_state(), PlaybackState::Running);

    // A rejected update leaves the running config alone
    assert!(controller
        .update_config(ConfigPatch::new().smoothness(0.0))
        .is_err());
    assert_eq!(controller.config().radius, 12.0);
    controller.stop();
}

#[test]
#[serial]
fn test_oversized_config_update_is_rejected_while_running() {
    let mut controller = controller_with(200);
    let events = controller.subscribe();
    controller.start().unwrap();
    let before = controller.config();

    let err = controller
        .update_config(ConfigPatch::new().margin(u32::MAX / 2))
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(controller
        .update_config(ConfigPatch::new().size(20_000, 20_000))
        .is_err());
    assert_eq!(*controller.config(), *before);

    // The producer keeps rendering at the old size
    events.drain();
    let expected = before.output_size();
    let frame = wait_for_frame(&events, test_timeout(), |f| (f.width(), f.height()) == expected);
    assert!(frame.is_some());
    assert_eq!(controller.playback_state(), PlaybackState::Running);
    controller.stop();
}

#[test]
#[serial]
fn test_over_budget_renders_report_a_stall() {
    // Large grid and many sensors: far slower than the 120 Hz budget
    let config = PipelineConfig {
        width: 1000,
        height: 2000,
        grid_width: 256,
        grid_height: 512,
        radius: 200.0,
        margin: 10,
        legend_width: 40,
        ..Default::default()
    };
    let playback = PlaybackConfig {
        stall_streak: 1,
        ..playback(FrameCountPolicy::Shortest)
    };
    let mut controller = PipelineController::new(config, playback).unwrap();
    let (left, right, layout) = SessionBuilder::new(20).sensors(128).build();
    controller.set_data(left, right, layout).unwrap();
    assert_eq!(controller.set_rate(120.0), 120.0);
    let events = controller.subscribe();
    controller.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(60);
    let mut stalled = None;
    while stalled.is_none() && Instant::now() < deadline {
        if let Some(PipelineEvent::RateReport(r)) = events.recv_timeout(Duration::from_millis(100)) {
            if r.stalled {
                stalled = Some(r);
            }
        }
    }
    let report = stalled.expect("no stall report received");
    assert_eq!(report.target_hz, 120.0);
    assert!(report.avg_render_time_us > 1_000_000.0 / 120.0);

    // Production continues while stalled
    let frame = wait_for_frame(&events, Duration::from_secs(30), |_| true);
    assert!(frame.is_some());
    assert_eq!(controller.playback_state(), PlaybackState::Running);
    controller.stop();
}

#[test]
#[serial]
fn test_rate_reports_are_published() {
    let mut controller = controller_with(500);
    controller.set_rate(50.0);
    let events = controller.subscribe();
    controller.start().unwrap();

    let mut report = None;
    let deadline = std::time::Instant::now() + test_timeout();
    while std::time::Instant::now() < deadline {
        if let Some(PipelineEvent::RateReport(r)) = events.recv_timeout(Duration::from_millis(100)) {
            if r.frames_rendered > 0 {
                report = Some(r);
                break;
            }
        }
    }
    controller.stop();

    let report = report.expect("no rate report received");
    assert_eq!(report.target_hz, 50.0);
    assert!(report.measured_hz > 0.0);
    assert!(!report.stalled);
}

#[test]
fn test_frame_count_policy_is_configurable() {
    let (left, right, layout) = SessionBuilder::new(500).right_frames(480).build();

    let mut shortest =
        PipelineController::new(tiny_config(), playback(FrameCountPolicy::Shortest)).unwrap();
    shortest
        .set_data(left.clone(), right.clone(), layout.clone())
        .unwrap();
    assert_eq!(shortest.frame_count(), 480);

    let mut longest =
        PipelineController::new(tiny_config(), playback(FrameCountPolicy::Longest)).unwrap();
    longest.set_data(left, right, layout).unwrap();
    assert_eq!(longest.frame_count(), 500);
    assert_eq!(longest.seek(10_000), 499);
}

#[test]
fn test_drop_joins_running_producer() {
    let mut controller = controller_with(50);
    controller.start().unwrap();
    drop(controller);
}
