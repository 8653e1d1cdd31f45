//! Synchronization with an external timeline
//!
//! When sync is enabled, the producer stops advancing on its own and follows
//! a master clock (usually a video player) instead. Positions are mapped
//! proportionally, so a 500-frame video and a 100-frame sensor recording stay
//! aligned from start to end:
//!
//! ```text
//! local = floor(external_frame / external_total * local_total)
//! ```
//!
//! clamped to `[0, local_total - 1]`.

/// A position on the external timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExternalPosition {
    pub frame: u64,
    pub total: u64,
}

impl ExternalPosition {
    pub fn new(frame: u64, total: u64) -> Self {
        Self { frame, total }
    }

    /// This position mapped onto a timeline of `local_total` frames
    pub fn map_to(&self, local_total: usize) -> usize {
        map_external_position(self.frame, self.total, local_total)
    }
}

/// Map an external frame number onto the local frame-index domain
///
/// Returns 0 when either timeline is empty. Integer arithmetic keeps the
/// mapping exact for any frame counts.
pub fn map_external_position(external_frame: u64, external_total: u64, local_total: usize) -> usize {
    if external_total == 0 || local_total == 0 {
        return 0;
    }
    let scaled = external_frame as u128 * local_total as u128 / external_total as u128;
    let last = (local_total - 1) as u128;
    scaled.min(last) as usize
}

/// Source of external timeline positions
pub trait MasterClock {
    /// Current position, or `None` when the clock has nothing loaded
    fn position(&self) -> Option<ExternalPosition>;
}

/// Sync state kept by the controller
///
/// Turns external clock advances into seek targets, skipping repeated
/// positions so a paused video doesn't re-seek every repaint.
#[derive(Debug, Clone, Default)]
pub struct SyncBridge {
    enabled: bool,
    last: Option<ExternalPosition>,
}

impl SyncBridge {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable following the external clock
    ///
    /// Returns whether the state changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled {
            return false;
        }
        self.enabled = enabled;
        self.last = None;
        true
    }

    /// Seek target for an external advance, if one is due
    ///
    /// `None` when sync is disabled or the position hasn't changed since the
    /// last call.
    pub fn on_external_advance(&mut self, position: ExternalPosition, local_total: usize) -> Option<usize> {
        if !self.enabled {
            return None;
        }
        if self.last == Some(position) {
            return None;
        }
        self.last = Some(position);
        Some(position.map_to(local_total))
    }

    /// Poll `clock` and return a seek target if its position moved
    pub fn poll(&mut self, clock: &dyn MasterClock, local_total: usize) -> Option<usize> {
        if !self.enabled {
            return None;
        }
        let position = clock.position()?;
        self.on_external_advance(position, local_total)
    }

    /// Forget the last seen position so the next advance always seeks
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mapping_reference_values() {
        assert_eq!(map_external_position(250, 500, 500), 250);
        assert_eq!(map_external_position(0, 500, 500), 0);
        assert_eq!(map_external_position(499, 500, 100), 99);
        assert_eq!(map_external_position(42, 0, 500), 0);
    }

    #[test]
    fn test_mapping_clamps_past_end() {
        assert_eq!(map_external_position(500, 500, 100), 99);
        assert_eq!(map_external_position(10_000, 500, 100), 99);
        assert_eq!(map_external_position(3, 10, 0), 0);
    }

    #[test]
    fn test_bridge_ignores_when_disabled() {
        let mut bridge = SyncBridge::new(false);
        assert_eq!(bridge.on_external_advance(ExternalPosition::new(5, 10), 100), None);
        assert!(bridge.set_enabled(true));
        assert!(!bridge.set_enabled(true));
        assert_eq!(bridge.on_external_advance(ExternalPosition::new(5, 10), 100), Some(50));
    }

    #[test]
    fn test_bridge_skips_repeated_positions() {
        let mut bridge = SyncBridge::new(true);
        let pos = ExternalPosition::new(7, 30);
        assert_eq!(bridge.on_external_advance(pos, 60), Some(14));
        assert_eq!(bridge.on_external_advance(pos, 60), None);
        bridge.reset();
        assert_eq!(bridge.on_external_advance(pos, 60), Some(14));
    }

    proptest! {
        #[test]
        fn test_mapping_stays_in_range(
            frame in 0u64..1_000_000,
            total in 1u64..1_000_000,
            local in 1usize..100_000
        ) {
            let mapped = map_external_position(frame, total, local);
            prop_assert!(mapped < local);
        }

        #[test]
        fn test_mapping_is_monotonic(
            a in 0u64..10_000,
            b in 0u64..10_000,
            total in 1u64..10_000,
            local in 1usize..10_000
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(map_external_position(lo, total, local) <= map_external_position(hi, total, local));
        }
    }
}
