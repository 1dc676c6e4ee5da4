//! Physical and control constants for the platform.
//!
//! Geometry comes from the chassis (5.3" wheels on a 16" wheelbase with
//! 12-bit absolute encoders on the wheel axes); the pulse range is the
//! standard 1000-2000 us ESC protocol at a 2.5 ms period.

use std::f64::consts::PI;

// Encoder geometry
pub const COUNTS_PER_REV: i32 = 4096;
pub const WHEEL_DIAMETER_INCHES: f64 = 5.3;
pub const WHEELBASE_INCHES: f64 = 16.0;
pub const COUNTS_PER_INCH: f64 = COUNTS_PER_REV as f64 / (PI * WHEEL_DIAMETER_INCHES);
pub const COUNTS_PER_FOOT: f64 = 12.0 * COUNTS_PER_INCH;

// ESC pulse widths, nanoseconds
pub const PWM_PERIOD_NS: i64 = 2_500_000;
pub const NEUTRAL_NS: i64 = 1_500_000;
pub const FORWARD_MAX_NS: i64 = 2_000_000;
pub const REVERSE_MAX_NS: i64 = 1_000_000;
// No dead band between neutral and the start of either direction.
pub const FORWARD_START_NS: i64 = 1_500_000;
pub const REVERSE_START_NS: i64 = 1_500_000;

/// Ramp limiter slope: full +-500 us swing over 3 s.
pub const RAMP_NS_PER_SEC: f64 = 166_667.0;

/// Pulse widths within +-10 us of neutral count as "not driving" when
/// inferring wheel direction for rotation tracking.
pub const DIRECTION_DEADBAND_NS: i64 = 10_000;

// Rotation boundary detection on the 0..4095 absolute angle.
pub const BOUNDARY_HIGH: i16 = 3000;
pub const BOUNDARY_LOW: i16 = 1000;

// Segment termination, counts (~0.5 inches)
pub const STOP_THRESHOLD: i32 = 50;
pub const DEADBAND_THRESHOLD: i32 = 50;

// Goto planner tolerances
pub const GOTO_TOLERANCE_FT: f64 = 1.0;
pub const HEADING_TOLERANCE_DEG: f64 = 5.0;

// Odometry gates
pub const GYRO_DEADBAND_DPS: f64 = 0.25;
pub const MOTION_GATE_FT: f64 = 0.001;

// Stall detection
pub const STALL_CHECK_PERIOD_SEC: f64 = 0.5;
pub const STALL_MIN_DELTA: i32 = 20;
pub const STALL_MIN_ERROR: i32 = 100;
pub const STALL_BOOST_STEP: i32 = 10;

// Output limits, percent
pub const DEFAULT_MIN_PWM: i32 = 45;
pub const DEFAULT_MAX_PWM: i32 = 80;
pub const SETPWM_FLOOR: i32 = 20;
pub const SETPWM_CEIL: i32 = 100;
pub const DEFAULT_SPEED_MULTIPLIER: f64 = 0.3;

// Control loop
pub const CONTROL_PERIOD_US: u64 = 5_000;
pub const STATUS_EVERY_N_TICKS: u64 = 10;

// IMU calibration
pub const IMU_SETTLE_MS: u64 = 500;
pub const IMU_DISCARD_READS: u32 = 200;
pub const IMU_SAMPLE_INTERVAL_US: u64 = 5_000;
pub const DEFAULT_CALIBRATION_SAMPLES: u32 = 500;

// ESC arm time after PWM comes up
pub const ESC_ARM_DELAY_MS: u64 = 2_000;

// Telemetry
pub const DEFAULT_LOG_CAPACITY: usize = 1_000_000;
