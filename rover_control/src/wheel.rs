//! Per-wheel shared state.
//!
//! Everything the feedback thread and the control thread both touch for a
//! wheel — the commanded motor state, the rotation tracker, the active
//! segment, and the stall detector — lives behind a single per-wheel
//! lock. When both wheels are needed, the left lock is taken first.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::params::{DIRECTION_DEADBAND_NS, NEUTRAL_NS};
use crate::tracker::RotationTracker;

/// Wheel identity. Left is index 0, right is index 1 everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelSide {
    Left,
    Right,
}

impl WheelSide {
    pub const BOTH: [WheelSide; 2] = [WheelSide::Left, WheelSide::Right];

    pub fn index(self) -> usize {
        match self {
            WheelSide::Left => 0,
            WheelSide::Right => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WheelSide::Left => "left",
            WheelSide::Right => "right",
        }
    }
}

/// Commanded motor state for one ESC.
#[derive(Debug, Clone)]
pub struct MotorState {
    /// Pulse width currently on the wire, nanoseconds
    pub last_pulse_ns: i64,
    /// Monotonic time of the last pulse application
    pub last_update_sec: f64,
    /// Last requested speed percentage, -100..100
    pub current_speed: i32,
}

impl MotorState {
    fn new() -> Self {
        Self {
            last_pulse_ns: NEUTRAL_NS,
            last_update_sec: 0.0,
            current_speed: 0,
        }
    }

    /// Direction hint for rotation tracking: +1 forward, -1 reverse,
    /// 0 within +-10 us of neutral.
    pub fn direction(&self) -> i8 {
        if self.last_pulse_ns > NEUTRAL_NS + DIRECTION_DEADBAND_NS {
            1
        } else if self.last_pulse_ns < NEUTRAL_NS - DIRECTION_DEADBAND_NS {
            -1
        } else {
            0
        }
    }
}

/// All mutable state for one wheel. Guarded by the wheel's lock.
#[derive(Debug, Clone)]
pub struct WheelState {
    pub motor: MotorState,
    pub tracker: RotationTracker,

    /// total_counts snapshot when the current segment started
    pub move_start_counts: i32,
    /// Signed counts to traverse from move_start_counts
    pub target_counts: i32,
    /// A segment is active on this wheel
    pub has_target: bool,

    /// Relative position at the last stall check
    pub stall_last_position: i32,
    /// Monotonic time of the last stall check
    pub stall_check_sec: f64,
    /// Consecutive stalled checks
    pub stall_count: u32,
}

impl WheelState {
    pub fn new() -> Self {
        Self {
            motor: MotorState::new(),
            tracker: RotationTracker::new(),
            move_start_counts: 0,
            target_counts: 0,
            has_target: false,
            stall_last_position: 0,
            stall_check_sec: 0.0,
            stall_count: 0,
        }
    }

    /// Position within the current segment, counts.
    pub fn relative_counts(&self) -> i32 {
        self.tracker.total_counts - self.move_start_counts
    }

    /// Arm a segment of `target_counts` starting at the current position.
    pub fn start_segment(&mut self, target_counts: i32, now_sec: f64) {
        self.move_start_counts = self.tracker.total_counts;
        self.target_counts = target_counts;
        self.has_target = true;
        self.stall_last_position = 0;
        self.stall_check_sec = now_sec;
        self.stall_count = 0;
    }

    /// Drop any active segment without touching the motor.
    pub fn clear_segment(&mut self) {
        self.has_target = false;
        self.stall_count = 0;
    }
}

impl Default for WheelState {
    fn default() -> Self {
        Self::new()
    }
}

/// The two wheel locks. Clone shares the underlying state.
#[derive(Clone)]
pub struct WheelPair {
    wheels: [Arc<Mutex<WheelState>>; 2],
}

impl WheelPair {
    pub fn new() -> Self {
        Self {
            wheels: [
                Arc::new(Mutex::new(WheelState::new())),
                Arc::new(Mutex::new(WheelState::new())),
            ],
        }
    }

    pub fn lock(&self, side: WheelSide) -> MutexGuard<'_, WheelState> {
        self.wheels[side.index()].lock()
    }

    /// Take both wheel locks in the fixed left-then-right order.
    pub fn lock_both(&self) -> (MutexGuard<'_, WheelState>, MutexGuard<'_, WheelState>) {
        let left = self.wheels[WheelSide::Left.index()].lock();
        let right = self.wheels[WheelSide::Right.index()].lock();
        (left, right)
    }
}

impl Default for WheelPair {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_direction_deadband() {
        let mut m = MotorState::new();
        assert_eq!(m.direction(), 0);

        m.last_pulse_ns = params::NEUTRAL_NS + params::DIRECTION_DEADBAND_NS;
        assert_eq!(m.direction(), 0);
        m.last_pulse_ns = params::NEUTRAL_NS + params::DIRECTION_DEADBAND_NS + 1;
        assert_eq!(m.direction(), 1);

        m.last_pulse_ns = params::NEUTRAL_NS - params::DIRECTION_DEADBAND_NS;
        assert_eq!(m.direction(), 0);
        m.last_pulse_ns = params::NEUTRAL_NS - params::DIRECTION_DEADBAND_NS - 1;
        assert_eq!(m.direction(), -1);
    }

    #[test]
    fn test_segment_lifecycle() {
        let mut w = WheelState::new();
        w.tracker.update(1000, 0);
        w.tracker.update(1500, 1);
        w.start_segment(2000, 1.0);
        assert!(w.has_target);
        assert_eq!(w.relative_counts(), 0);

        w.tracker.update(1900, 1);
        assert_eq!(w.relative_counts(), 400);

        w.clear_segment();
        assert!(!w.has_target);
        assert_eq!(w.stall_count, 0);
    }

    #[test]
    fn test_lock_both_is_usable() {
        let pair = WheelPair::new();
        {
            let (mut left, mut right) = pair.lock_both();
            left.target_counts = 10;
            right.target_counts = -10;
        }
        assert_eq!(pair.lock(WheelSide::Left).target_counts, 10);
        assert_eq!(pair.lock(WheelSide::Right).target_counts, -10);
    }
}
