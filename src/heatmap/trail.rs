//! Center-of-pressure trails
//!
//! A trail is a bounded FIFO of the most recent center-of-pressure points of
//! one side. The oldest point is dropped first once the bound is reached.

use crate::types::{SensorPoint, Side};
use std::collections::VecDeque;

/// Trails of both sides with a shared length bound
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrailState {
    left: VecDeque<SensorPoint>,
    right: VecDeque<SensorPoint>,
    capacity: usize,
}

impl TrailState {
    pub fn new(capacity: usize) -> Self {
        Self {
            left: VecDeque::with_capacity(capacity),
            right: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the bound, dropping the oldest points if the trail is now too long
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        for trail in [&mut self.left, &mut self.right] {
            while trail.len() > capacity {
                trail.pop_front();
            }
        }
    }

    /// Append a point, evicting the oldest one beyond the bound
    pub fn push(&mut self, side: Side, point: SensorPoint) {
        let capacity = self.capacity;
        let trail = self.side_mut(side);
        if capacity == 0 {
            trail.clear();
            return;
        }
        if trail.len() == capacity {
            trail.pop_front();
        }
        trail.push_back(point);
    }

    /// Points of one side, oldest first
    pub fn points(&self, side: Side) -> impl DoubleEndedIterator<Item = &SensorPoint> + ExactSizeIterator {
        match side {
            Side::Left => self.left.iter(),
            Side::Right => self.right.iter(),
        }
    }

    pub fn len(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left.len(),
            Side::Right => self.right.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    pub fn clear(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    fn side_mut(&mut self, side: Side) -> &mut VecDeque<SensorPoint> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}
