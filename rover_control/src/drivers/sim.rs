//! Simulated two-wheel plant.
//!
//! Backs the simulation encoder, IMU, and motor drivers with one shared
//! physical model so the control stack closes the loop without hardware:
//! commanded pulse widths become wheel velocities, wheel velocities
//! become absolute encoder angles, and the differential wheel travel
//! becomes a yaw rate for the simulated gyro.
//!
//! The plant advances explicitly through [`SimWorld::advance`] for
//! deterministic tests, or against the wall clock when constructed with
//! [`SimWorld::with_auto_advance`] for live `--sim` runs.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::params::{
    COUNTS_PER_FOOT, COUNTS_PER_REV, FORWARD_MAX_NS, NEUTRAL_NS,
    WHEELBASE_INCHES,
};
use crate::wheel::WheelSide;

/// Wheel revolutions per second at full forward pulse.
const MAX_WHEEL_RPS: f64 = 2.0;

/// Reverse thrust relative to forward at the same pulse offset. Hobby
/// ESCs are rarely symmetric; modeling that keeps pivot turns from being
/// perfectly motion-balanced.
const REVERSE_GAIN: f64 = 0.85;

struct Plant {
    pulse_ns: [i64; 2],
    angle_counts: [f64; 2],
    gyro_bias_dps: f64,
    auto_advance: bool,
    last_advance: Option<Instant>,
}

impl Plant {
    fn wheel_velocity_counts(&self, wheel: usize) -> f64 {
        let half_range = (FORWARD_MAX_NS - NEUTRAL_NS) as f64;
        let mut frac = (self.pulse_ns[wheel] - NEUTRAL_NS) as f64 / half_range;
        frac = frac.clamp(-1.0, 1.0);
        if frac < 0.0 {
            frac *= REVERSE_GAIN;
        }
        frac * MAX_WHEEL_RPS * COUNTS_PER_REV as f64
    }

    fn advance(&mut self, dt_sec: f64) {
        for wheel in 0..2 {
            self.angle_counts[wheel] += self.wheel_velocity_counts(wheel) * dt_sec;
        }
    }

    fn maybe_auto_advance(&mut self) {
        if !self.auto_advance {
            return;
        }
        let now = Instant::now();
        if let Some(last) = self.last_advance {
            self.advance(now.duration_since(last).as_secs_f64());
        }
        self.last_advance = Some(now);
    }
}

/// Handle to the shared simulated plant. Cheap to clone.
#[derive(Clone)]
pub struct SimWorld {
    inner: Arc<Mutex<Plant>>,
}

impl SimWorld {
    /// Create a plant that only moves when `advance` is called.
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Create a plant that integrates against the wall clock on each read.
    pub fn with_auto_advance() -> Self {
        Self::build(true)
    }

    fn build(auto_advance: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Plant {
                pulse_ns: [NEUTRAL_NS; 2],
                angle_counts: [0.0; 2],
                gyro_bias_dps: 0.0,
                auto_advance,
                last_advance: None,
            })),
        }
    }

    /// True when the plant integrates on its own against the wall clock.
    pub fn is_live(&self) -> bool {
        self.inner.lock().auto_advance
    }

    /// Advance the plant by `dt_sec` of simulated time.
    pub fn advance(&self, dt_sec: f64) {
        self.inner.lock().advance(dt_sec);
    }

    /// Command a pulse width onto one wheel's ESC.
    pub fn set_pulse(&self, side: WheelSide, pulse_ns: i64) {
        self.inner.lock().pulse_ns[side.index()] = pulse_ns;
    }

    pub fn pulse(&self, side: WheelSide) -> i64 {
        self.inner.lock().pulse_ns[side.index()]
    }

    /// Inject a constant gyro bias (exercises the calibration path).
    pub fn set_gyro_bias_dps(&self, bias: f64) {
        self.inner.lock().gyro_bias_dps = bias;
    }

    /// Absolute encoder angle for one wheel, wrapped to 0..4095.
    ///
    /// Live plants add a count of measurement jitter, matching the way
    /// the real sensors flicker between adjacent codes. Manually-stepped
    /// plants stay exact so tests are deterministic.
    pub fn raw_angle(&self, side: WheelSide) -> i16 {
        let mut plant = self.inner.lock();
        plant.maybe_auto_advance();
        let mut counts = plant.angle_counts[side.index()];
        if plant.auto_advance {
            counts += rand::Rng::gen_range(&mut rand::thread_rng(), -1.0..1.0);
        }
        counts.rem_euclid(COUNTS_PER_REV as f64) as i16
    }

    /// Yaw rate in degrees per second, positive when the left wheel
    /// advances relative to the right.
    pub fn gyro_z_dps(&self) -> f64 {
        let mut plant = self.inner.lock();
        plant.maybe_auto_advance();
        let v_left_ft = plant.wheel_velocity_counts(0) / COUNTS_PER_FOOT;
        let v_right_ft = plant.wheel_velocity_counts(1) / COUNTS_PER_FOOT;
        let wheelbase_ft = WHEELBASE_INCHES / 12.0;
        let rate_rad = (v_left_ft - v_right_ft) / wheelbase_ft;
        rate_rad.to_degrees() + plant.gyro_bias_dps
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}
