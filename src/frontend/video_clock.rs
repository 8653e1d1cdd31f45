//! Simulated video clock
//!
//! Stands in for a video player when driving the pipeline in sync mode. The
//! clock advances at `fps` while playing and loops back to frame 0 after
//! `total_frames`.

use crate::pipeline::{ExternalPosition, MasterClock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SimulatedVideoClock {
    fps: f64,
    total_frames: u64,
    /// Position accumulated before the current play span, in frames
    base_frames: f64,
    playing_since: Option<Instant>,
}

impl SimulatedVideoClock {
    pub fn new(fps: f64, total_frames: u64) -> Self {
        Self {
            fps: if fps.is_finite() && fps > 0.0 { fps } else { 30.0 },
            total_frames,
            base_frames: 0.0,
            playing_since: None,
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    pub fn play(&mut self) {
        self.play_at(Instant::now());
    }

    pub fn play_at(&mut self, now: Instant) {
        if self.playing_since.is_none() {
            self.playing_since = Some(now);
        }
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub fn pause_at(&mut self, now: Instant) {
        if let Some(since) = self.playing_since.take() {
            self.base_frames += now.saturating_duration_since(since).as_secs_f64() * self.fps;
        }
    }

    /// Jump to `frame`, keeping the play state
    pub fn seek(&mut self, frame: u64) {
        self.base_frames = frame.min(self.total_frames.saturating_sub(1)) as f64;
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    /// Frame shown at `now`
    pub fn frame_at(&self, now: Instant) -> u64 {
        if self.total_frames == 0 {
            return 0;
        }
        let elapsed = self
            .playing_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or(Duration::ZERO);
        let frames = self.base_frames + elapsed.as_secs_f64() * self.fps;
        (frames.floor() as u64) % self.total_frames
    }

    pub fn position_at(&self, now: Instant) -> Option<ExternalPosition> {
        if self.total_frames == 0 {
            return None;
        }
        Some(ExternalPosition::new(self.frame_at(now), self.total_frames))
    }
}

impl MasterClock for SimulatedVideoClock {
    fn position(&self) -> Option<ExternalPosition> {
        self.position_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advances_while_playing() {
        let mut clock = SimulatedVideoClock::new(30.0, 900);
        let t0 = Instant::now();
        clock.play_at(t0);
        assert_eq!(clock.frame_at(t0 + Duration::from_secs(2)), 60);

        clock.pause_at(t0 + Duration::from_secs(2));
        assert_eq!(clock.frame_at(t0 + Duration::from_secs(10)), 60);
    }

    #[test]
    fn test_loops_at_end() {
        let mut clock = SimulatedVideoClock::new(10.0, 20);
        let t0 = Instant::now();
        clock.play_at(t0);
        assert_eq!(clock.frame_at(t0 + Duration::from_millis(2500)), 5);
    }

    #[test]
    fn test_empty_clock_has_no_position() {
        let clock = SimulatedVideoClock::new(30.0, 0);
        assert!(clock.position().is_none());
    }

    #[test]
    fn test_seek_clamps() {
        let mut clock = SimulatedVideoClock::new(30.0, 100);
        clock.seek(500);
        assert_eq!(clock.position().map(|p| p.frame), Some(99));
    }
}
