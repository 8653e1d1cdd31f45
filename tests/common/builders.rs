//! Test data builders for creating sessions and configs

use gaitvis_rs::config::{FrameCountPolicy, PipelineConfig, PlaybackConfig};
use gaitvis_rs::{SensorFrame, SensorLayout, SensorPoint};

/// A config small enough that rendering never limits the production rate
pub fn tiny_config() -> PipelineConfig {
    PipelineConfig {
        width: 16,
        height: 24,
        grid_width: 4,
        grid_height: 6,
        radius: 8.0,
        smoothness: 2.0,
        margin: 2,
        legend_width: 6,
        trail_length: 10,
        ..Default::default()
    }
}

/// Builder for synthetic two-sided sessions
pub struct SessionBuilder {
    left_frames: usize,
    right_frames: usize,
    sensors: usize,
}

impl SessionBuilder {
    pub fn new(frames: usize) -> Self {
        Self {
            left_frames: frames,
            right_frames: frames,
            sensors: 4,
        }
    }

    pub fn left_frames(mut self, n: usize) -> Self {
        self.left_frames = n;
        self
    }

    pub fn right_frames(mut self, n: usize) -> Self {
        self.right_frames = n;
        self
    }

    pub fn sensors(mut self, n: usize) -> Self {
        self.sensors = n;
        self
    }

    pub fn layout(&self) -> SensorLayout {
        let points: Vec<SensorPoint> = (0..self.sensors)
            .map(|i| SensorPoint::new(4.0 + (i % 2) as f32 * 8.0, 4.0 + (i / 2) as f32 * 6.0))
            .collect();
        SensorLayout::new(points.clone(), points)
    }

    fn frames(&self, n: usize) -> Vec<SensorFrame> {
        SensorFrame::sequence(
            (0..n)
                .map(|f| {
                    (0..self.sensors)
                        .map(|s| ((f * 37 + s * 101) % 4096) as f32)
                        .collect()
                })
                .collect(),
        )
    }

    /// `(left, right, layout)`, ready for `set_data`
    pub fn build(self) -> (Vec<SensorFrame>, Vec<SensorFrame>, SensorLayout) {
        (
            self.frames(self.left_frames),
            self.frames(self.right_frames),
            self.layout(),
        )
    }
}

pub fn playback(policy: FrameCountPolicy) -> PlaybackConfig {
    PlaybackConfig {
        frame_count_policy: policy,
        rate_report_interval_ms: 200,
        event_queue_capacity: 1024,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_builder() {
        let (left, right, layout) = SessionBuilder::new(10).right_frames(7).sensors(3).build();
        assert_eq!(left.len(), 10);
        assert_eq!(right.len(), 7);
        assert_eq!(layout.left.len(), 3);
        assert!(left.iter().all(|f| f.readings.len() == 3));
    }
}
