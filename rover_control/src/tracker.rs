//! Signed multi-turn position from an absolute angle sensor.
//!
//! The on-axis magnetic encoders report an absolute 0..4095 angle with no
//! direction bit. Direction is inferred from the pulse width currently
//! commanded to that wheel's ESC: a wrap across the 0/4095 boundary only
//! counts as a revolution when the commanded direction agrees with the
//! wrap direction, which rejects boundary jitter while parked near zero.

use crate::params::{BOUNDARY_HIGH, BOUNDARY_LOW, COUNTS_PER_REV};

/// Rotation tracking state for one wheel.
#[derive(Debug, Clone)]
pub struct RotationTracker {
    /// Latest raw angle, 0..4095
    pub current_raw_angle: i16,
    /// Previous raw angle; negative until the first update
    pub last_raw_angle: i16,
    /// Angle captured on the first update; zero reference within a turn
    pub start_raw_angle: i16,
    /// Completed signed revolutions
    pub rotation_count: i32,
    /// rotation_count * COUNTS_PER_REV + (current - start)
    pub total_counts: i32,
    /// Commanded direction at the latest update: -1, 0, +1
    pub motor_state: i8,
    /// Commanded direction at the previous update
    pub last_motor_state: i8,
}

impl RotationTracker {
    pub fn new() -> Self {
        Self {
            current_raw_angle: 0,
            last_raw_angle: -1,
            start_raw_angle: 0,
            rotation_count: 0,
            total_counts: 0,
            motor_state: 0,
            last_motor_state: 0,
        }
    }

    /// Fold one raw angle reading into the multi-turn position.
    ///
    /// `motor_state` is the direction hint derived from the commanded
    /// pulse width (-1 reverse, 0 neutral, +1 forward). While neutral,
    /// boundary crossings are not counted; a coasting wheel can lose a
    /// revolution there.
    pub fn update(&mut self, raw: i16, motor_state: i8) {
        self.last_motor_state = self.motor_state;
        self.motor_state = motor_state;

        if self.last_raw_angle < 0 {
            self.current_raw_angle = raw;
            self.last_raw_angle = raw;
            self.start_raw_angle = raw;
            self.total_counts = 0;
            return;
        }

        if motor_state > 0 && self.last_raw_angle > BOUNDARY_HIGH && raw < BOUNDARY_LOW {
            self.rotation_count += 1;
        } else if motor_state < 0 && self.last_raw_angle < BOUNDARY_LOW && raw > BOUNDARY_HIGH {
            self.rotation_count -= 1;
        }

        self.current_raw_angle = raw;
        self.last_raw_angle = raw;
        self.total_counts =
            self.rotation_count * COUNTS_PER_REV + (raw - self.start_raw_angle) as i32;
    }
}

impl Default for RotationTracker {
    fn default() -> Self {
        Self::new()
    }
}
