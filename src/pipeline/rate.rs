//! Production rate control
//!
//! [`RateController`] lives on the producer thread and hands out frame
//! deadlines spaced `1 / rate` apart. Deadlines are scheduled from the
//! previous deadline rather than from the previous render, so short renders
//! don't drift the rate. When production falls more than one interval behind,
//! the schedule restarts from the current time instead of bursting to catch up.
//!
//! The target rate itself lives in a [`RateHandle`], a lock-free cell the
//! controller thread can update while the producer is running.

use crate::config::{clamp_rate, DEFAULT_TARGET_RATE_HZ};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Length of the sliding window used for the measured rate
const MEASURE_WINDOW: Duration = Duration::from_secs(1);

/// Upper bound on the number of timestamps kept in the window
const MAX_SAMPLES: usize = 128;

/// Shared, lock-free target rate
#[derive(Debug, Clone)]
pub struct RateHandle(Arc<AtomicU64>);

impl Default for RateHandle {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_RATE_HZ)
    }
}

impl RateHandle {
    pub fn new(hz: f64) -> Self {
        Self(Arc::new(AtomicU64::new(clamp_rate(hz).to_bits())))
    }

    /// Set the target rate, clamped into the supported range
    ///
    /// Returns the rate actually stored.
    pub fn set_rate(&self, hz: f64) -> f64 {
        let hz = clamp_rate(hz);
        self.0.store(hz.to_bits(), Ordering::Relaxed);
        hz
    }

    pub fn target_rate(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Time between two frames at the current target rate
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_rate())
    }
}

/// Deadline scheduler and rate meter for the producer loop
#[derive(Debug)]
pub struct RateController {
    handle: RateHandle,
    last_deadline: Option<Instant>,
    stamps: VecDeque<Instant>,
}

impl RateController {
    pub fn new(handle: RateHandle) -> Self {
        Self {
            handle,
            last_deadline: None,
            stamps: VecDeque::with_capacity(MAX_SAMPLES),
        }
    }

    pub fn handle(&self) -> &RateHandle {
        &self.handle
    }

    pub fn set_rate(&self, hz: f64) -> f64 {
        self.handle.set_rate(hz)
    }

    pub fn target_rate(&self) -> f64 {
        self.handle.target_rate()
    }

    /// When the next frame should be produced
    ///
    /// The first call after construction or [`reset`](Self::reset) returns
    /// `now`. Rate changes take effect from the next deadline.
    pub fn next_deadline(&mut self, now: Instant) -> Instant {
        let interval = self.handle.interval();
        let deadline = match self.last_deadline {
            None => now,
            Some(last) => {
                let next = last + interval;
                if next + interval < now {
                    tracing::trace!(
                        behind_us = (now - next).as_micros() as u64,
                        "Producer fell behind schedule, resyncing"
                    );
                    now
                } else {
                    next
                }
            }
        };
        self.last_deadline = Some(deadline);
        deadline
    }

    /// Note that a frame was produced at `at`
    pub fn record_frame(&mut self, at: Instant) {
        self.stamps.push_back(at);
        while self.stamps.len() > MAX_SAMPLES {
            self.stamps.pop_front();
        }
        while let Some(front) = self.stamps.front() {
            if at.saturating_duration_since(*front) > MEASURE_WINDOW {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Frames per second over the sliding window; 0.0 until two frames exist
    pub fn measured_rate(&self) -> f64 {
        let (Some(first), Some(last)) = (self.stamps.front(), self.stamps.back()) else {
            return 0.0;
        };
        if self.stamps.len() < 2 {
            return 0.0;
        }
        let span = last.saturating_duration_since(*first).as_secs_f64();
        if span <= 0.0 {
            return 0.0;
        }
        (self.stamps.len() - 1) as f64 / span
    }

    /// Forget the schedule and the measured history
    pub fn reset(&mut self) {
        self.last_deadline = None;
        self.stamps.clear();
    }

    /// Restart the schedule without dropping the rate history
    pub fn restart_schedule(&mut self) {
        self.last_deadline = None;
    }
}

/// Wait until `deadline`, sleeping for most of it and spinning the rest
pub fn wait_until(deadline: Instant) {
    let now = Instant::now();
    if deadline <= now {
        return;
    }
    let remaining = deadline - now;
    if remaining > Duration::from_millis(2) {
        std::thread::sleep(remaining - Duration::from_millis(1));
    }
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_is_clamped() {
        let handle = RateHandle::new(30.0);
        assert_eq!(handle.set_rate(1000.0), 120.0);
        assert_eq!(handle.target_rate(), 120.0);
        assert_eq!(handle.set_rate(0.0), 1.0);
        assert_eq!(handle.set_rate(f64::NAN), 1.0);
    }

    #[test]
    fn test_deadlines_are_spaced_by_interval() {
        let mut rate = RateController::new(RateHandle::new(50.0));
        let t0 = Instant::now();
        assert_eq!(rate.next_deadline(t0), t0);
        let d1 = rate.next_deadline(t0 + Duration::from_millis(5));
        assert_eq!(d1 - t0, Duration::from_millis(20));
        let d2 = rate.next_deadline(t0 + Duration::from_millis(25));
        assert_eq!(d2 - t0, Duration::from_millis(40));
    }

    #[test]
    fn test_resync_when_far_behind() {
        let mut rate = RateController::new(RateHandle::new(100.0));
        let t0 = Instant::now();
        rate.next_deadline(t0);
        let late = t0 + Duration::from_millis(500);
        assert_eq!(rate.next_deadline(late), late);
    }

    #[test]
    fn test_rate_change_applies_to_next_deadline() {
        let handle = RateHandle::new(10.0);
        let mut rate = RateController::new(handle.clone());
        let t0 = Instant::now();
        rate.next_deadline(t0);
        handle.set_rate(100.0);
        let d1 = rate.next_deadline(t0);
        assert_eq!(d1 - t0, Duration::from_millis(10));
    }

    #[test]
    fn test_measured_rate() {
        let mut rate = RateController::new(RateHandle::new(20.0));
        assert_eq!(rate.measured_rate(), 0.0);
        let t0 = Instant::now();
        for i in 0..11 {
            rate.record_frame(t0 + Duration::from_millis(50 * i));
        }
        assert!((rate.measured_rate() - 20.0).abs() < 1e-6);

        rate.reset();
        assert_eq!(rate.measured_rate(), 0.0);
    }

    #[test]
    fn test_window_drops_old_samples() {
        let mut rate = RateController::new(RateHandle::new(10.0));
        let t0 = Instant::now();
        rate.record_frame(t0);
        rate.record_frame(t0 + Duration::from_secs(5));
        rate.record_frame(t0 + Duration::from_millis(5100));
        assert!((rate.measured_rate() - 10.0).abs() < 1e-6);
    }
}
