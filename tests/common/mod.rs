//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use gaitvis_rs::pipeline::{EventReceiver, PipelineEvent};
use gaitvis_rs::RenderedImage;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_secs(2)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Wait for the first frame-ready event matching `pred`
pub fn wait_for_frame(
    events: &EventReceiver,
    timeout: Duration,
    pred: impl Fn(&RenderedImage) -> bool,
) -> Option<Arc<RenderedImage>> {
    let deadline = Instant::now() + timeout;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match events.recv_timeout(remaining) {
            Some(PipelineEvent::FrameReady(frame)) if pred(&frame) => return Some(frame),
            Some(_) => continue,
            None => return None,
        }
    }
    None
}

/// Collect frame indices delivered within `window`
pub fn collect_frames(events: &EventReceiver, window: Duration) -> Vec<usize> {
    let deadline = Instant::now() + window;
    let mut indices = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match events.recv_timeout(remaining) {
            Some(PipelineEvent::FrameReady(frame)) => indices.push(frame.index),
            Some(_) => {}
            None => break,
        }
    }
    indices
}
