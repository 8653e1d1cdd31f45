//! Integration tests for following an external timeline
//!
//! Tests the position mapping, the controller's sync toggle and a mocked
//! master clock driving a running producer.

mod common;

use common::builders::{playback, tiny_config, SessionBuilder};
use common::{test_timeout, wait_for_frame};
use gaitvis_rs::config::FrameCountPolicy;
use gaitvis_rs::pipeline::{map_external_position, ExternalPosition, MasterClock};
use gaitvis_rs::PipelineController;
use mockall::mock;
use serial_test::serial;
use std::thread;
use std::time::Duration;

mock! {
    Clock {}

    impl MasterClock for Clock {
        fn position(&self) -> Option<ExternalPosition>;
    }
}

fn controller_with(frames: usize) -> PipelineController {
    let mut controller =
        PipelineController::new(tiny_config(), playback(FrameCountPolicy::Shortest)).unwrap();
    let (left, right, layout) = SessionBuilder::new(frames).build();
    controller.set_data(left, right, layout).unwrap();
    controller
}

#[test]
fn test_position_mapping() {
    assert_eq!(map_external_position(250, 500, 500), 250);
    assert_eq!(map_external_position(0, 500, 500), 0);
    assert_eq!(map_external_position(499, 500, 100), 99);
    assert_eq!(map_external_position(10_000, 500, 100), 99);
    assert_eq!(map_external_position(42, 0, 100), 0);
    assert_eq!(map_external_position(42, 500, 0), 0);
}

#[test]
fn test_external_advance_ignored_while_disabled() {
    let mut controller = controller_with(500);
    assert!(!controller.is_sync_enabled());
    assert_eq!(controller.external_advance(250, 500), None);

    controller.set_sync_enabled(true);
    assert_eq!(controller.external_advance(250, 500), Some(250));
    // Same position again is not a new seek
    assert_eq!(controller.external_advance(250, 500), None);
    assert_eq!(controller.external_advance(251, 500), Some(251));
}

#[test]
#[serial]
fn test_synced_producer_renders_only_on_external_advance() {
    let mut controller = controller_with(500);
    controller.set_sync_enabled(true);
    let events = controller.subscribe();
    controller.start().unwrap();

    // No self-advance while synced
    thread::sleep(Duration::from_millis(150));
    assert!(events.latest_frame().is_none());

    assert_eq!(controller.external_advance(250, 500), Some(250));
    let frame = wait_for_frame(&events, test_timeout(), |_| true).unwrap();
    assert_eq!(frame.index, 250);

    thread::sleep(Duration::from_millis(150));
    assert!(events.latest_frame().is_none());
    assert_eq!(controller.current_frame_index(), 250);
    controller.stop();
}

#[test]
#[serial]
fn test_disabling_sync_resumes_after_target_and_keeps_buffer() {
    let mut controller = controller_with(500);
    controller.set_rate(60.0);
    controller.set_sync_enabled(true);
    let events = controller.subscribe();
    controller.start().unwrap();

    controller.external_advance(100, 500);
    assert!(wait_for_frame(&events, test_timeout(), |f| f.index == 100).is_some());
    let buffered = controller.reader().len();
    assert!(buffered >= 1);

    controller.set_sync_enabled(false);
    assert!(controller.reader().len() >= buffered);
    let next = wait_for_frame(&events, test_timeout(), |_| true).unwrap();
    assert_eq!(next.index, 101);

    controller.set_sync_enabled(true);
    assert!(controller.reader().get(100).is_some());
    controller.stop();
}

#[test]
#[serial]
fn test_mock_clock_drives_running_producer() {
    let mut controller = controller_with(100);
    controller.set_sync_enabled(true);
    let events = controller.subscribe();
    controller.start().unwrap();

    // External timeline is twice as long as the local one
    let mut clock = MockClock::new();
    clock
        .expect_position()
        .times(1)
        .returning(|| Some(ExternalPosition::new(100, 200)));
    assert_eq!(controller.sync_to(&clock), Some(50));

    let frame = wait_for_frame(&events, test_timeout(), |_| true).unwrap();
    assert_eq!(frame.index, 50);
    controller.stop();
}

#[test]
fn test_clock_without_position_is_ignored() {
    let mut controller = controller_with(100);
    controller.set_sync_enabled(true);

    let mut clock = MockClock::new();
    clock.expect_position().times(2).returning(|| None);
    assert_eq!(controller.sync_to(&clock), None);
    assert_eq!(controller.sync_to(&clock), None);
}

#[test]
fn test_clock_not_polled_while_sync_disabled() {
    let mut controller = controller_with(100);

    let mut clock = MockClock::new();
    clock.expect_position().never();
    assert_eq!(controller.sync_to(&clock), None);
}
