//! Pose estimation from wheel travel and gyro rate.
//!
//! Wheel encoders provide distance, the gyro provides heading rate.
//! Heading only integrates while the wheels are actually moving; a
//! stationary robot must not spin in software because of gyro drift.
//! Position advances along the average of the old and new heading so a
//! tick that turns and translates traces the chord, not the tangent.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::kalman::HeadingFilter;
use crate::params::{COUNTS_PER_FOOT, GYRO_DEADBAND_DPS, MOTION_GATE_FT};

/// Wrap degrees to [0, 360).
pub fn normalize_deg(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can land exactly on 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap degrees to (-180, 180].
pub fn wrap_pm_180(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Estimated robot pose plus the encoder baselines the next integration
/// tick diffs against.
#[derive(Debug, Clone)]
pub struct Pose {
    /// Position, feet
    pub x_ft: f64,
    pub y_ft: f64,
    /// Heading, degrees in [0, 360)
    pub heading_deg: f64,
    /// Wheel totals at the previous integration tick
    pub last_left_total: i32,
    pub last_right_total: i32,
}

impl Pose {
    pub fn new() -> Self {
        Self {
            x_ft: 0.0,
            y_ft: 0.0,
            heading_deg: 0.0,
            last_left_total: 0,
            last_right_total: 0,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds sensor samples into the shared pose. Runs on the feedback
/// thread; nothing else writes the pose except an explicit `setpos`.
pub struct OdometryIntegrator {
    pose: Arc<Mutex<Pose>>,
    filter: HeadingFilter,
    last_time_sec: Option<f64>,
}

impl OdometryIntegrator {
    pub fn new(pose: Arc<Mutex<Pose>>) -> Self {
        Self {
            pose,
            filter: HeadingFilter::new(),
            last_time_sec: None,
        }
    }

    pub fn pose(&self) -> Arc<Mutex<Pose>> {
        Arc::clone(&self.pose)
    }

    /// Integrate one sample. `left_total`/`right_total` are the wheels'
    /// multi-turn count totals at `timestamp_sec`; `gyro_z_dps` is the
    /// offset-corrected yaw rate.
    pub fn update(
        &mut self,
        timestamp_sec: f64,
        left_total: i32,
        right_total: i32,
        gyro_z_dps: f64,
    ) {
        let mut pose = self.pose.lock();

        let Some(last_time) = self.last_time_sec else {
            // First tick only captures baselines.
            pose.last_left_total = left_total;
            pose.last_right_total = right_total;
            self.last_time_sec = Some(timestamp_sec);
            return;
        };
        let dt = timestamp_sec - last_time;
        self.last_time_sec = Some(timestamp_sec);
        if dt <= 0.0 {
            return;
        }

        let d_left = left_total - pose.last_left_total;
        let d_right = right_total - pose.last_right_total;
        pose.last_left_total = left_total;
        pose.last_right_total = right_total;

        let dist_left = d_left as f64 / COUNTS_PER_FOOT;
        let dist_right = d_right as f64 / COUNTS_PER_FOOT;
        let center_dist = (dist_left + dist_right) / 2.0;

        let mut gyro_rate = gyro_z_dps;
        if gyro_rate.abs() < GYRO_DEADBAND_DPS {
            gyro_rate = 0.0;
        }

        let delta_heading = if center_dist.abs() > MOTION_GATE_FT {
            gyro_rate * dt
        } else {
            0.0
        };

        let new_heading = pose.heading_deg + delta_heading;
        let avg_heading_rad = ((pose.heading_deg + new_heading) / 2.0).to_radians();
        pose.x_ft += center_dist * avg_heading_rad.cos();
        pose.y_ft += center_dist * avg_heading_rad.sin();
        pose.heading_deg = normalize_deg(new_heading);

        // Keep the fusion path's state consistent with the authoritative
        // estimate so it can be re-enabled without a jump.
        self.filter.update(pose.heading_deg, gyro_rate, dt);
        self.filter.anchor(pose.heading_deg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::params::COUNTS_PER_FOOT;

    fn integrator() -> (OdometryIntegrator, Arc<Mutex<Pose>>) {
        let pose = Arc::new(Mutex::new(Pose::new()));
        (OdometryIntegrator::new(Arc::clone(&pose)), pose)
    }

    #[test]
    fn test_normalize_deg() {
        assert_relative_eq!(normalize_deg(0.0), 0.0);
        assert_relative_eq!(normalize_deg(360.0), 0.0);
        assert_relative_eq!(normalize_deg(365.0), 5.0);
        assert_relative_eq!(normalize_deg(-10.0), 350.0);
        assert_relative_eq!(normalize_deg(-720.0), 0.0);
    }

    #[test]
    fn test_wrap_pm_180() {
        assert_relative_eq!(wrap_pm_180(90.0), 90.0);
        assert_relative_eq!(wrap_pm_180(180.0), 180.0);
        assert_relative_eq!(wrap_pm_180(181.0), -179.0);
        assert_relative_eq!(wrap_pm_180(270.0), -90.0);
        assert_relative_eq!(wrap_pm_180(-90.0), -90.0);
        // setpos 180 then target at 90: turn -90, never +270
        assert_relative_eq!(wrap_pm_180(90.0 - 180.0), -90.0);
    }

    #[test]
    fn test_first_tick_captures_baselines() {
        let (mut odom, pose) = integrator();
        odom.update(0.0, 5000, 6000, 0.0);
        let p = pose.lock();
        assert_eq!(p.last_left_total, 5000);
        assert_eq!(p.last_right_total, 6000);
        assert_relative_eq!(p.x_ft, 0.0);
        assert_relative_eq!(p.y_ft, 0.0);
    }

    #[test]
    fn test_straight_drive_advances_along_heading() {
        let (mut odom, pose) = integrator();
        pose.lock().heading_deg = 90.0;

        odom.update(0.0, 0, 0, 0.0);
        let one_foot = COUNTS_PER_FOOT as i32;
        odom.update(0.1, one_foot, one_foot, 0.0);

        let p = pose.lock();
        assert_relative_eq!(p.x_ft, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.y_ft, 1.0, epsilon = 1e-3);
        assert_relative_eq!(p.heading_deg, 90.0);
    }

    #[test]
    fn test_stationary_gyro_is_gated() {
        // Wheels parked, gyro reporting 1 dps for a full second: heading
        // must not move.
        let (mut odom, pose) = integrator();
        odom.update(0.0, 0, 0, 1.0);
        for i in 1..=200 {
            odom.update(i as f64 * 0.005, 0, 0, 1.0);
        }
        assert!(pose.lock().heading_deg.abs() < 1e-9);
    }

    #[test]
    fn test_gyro_deadband_zeroes_small_rates() {
        let (mut odom, pose) = integrator();
        odom.update(0.0, 0, 0, 0.0);
        // Moving, but the rate sits inside the +-0.25 dps deadband.
        odom.update(1.0, 3000, 3000, 0.2);
        let p = pose.lock();
        assert_relative_eq!(p.heading_deg, 0.0);
        assert!(p.x_ft > 0.9);
    }

    #[test]
    fn test_heading_integrates_while_moving() {
        let (mut odom, pose) = integrator();
        odom.update(0.0, 0, 0, 0.0);
        // 10 dps for one second while rolling forward.
        let mut counts = 0i32;
        for i in 1..=100 {
            counts += 30;
            odom.update(i as f64 * 0.01, counts, counts, 10.0);
        }
        let p = pose.lock();
        assert_relative_eq!(p.heading_deg, 10.0, epsilon = 1e-6);
        // The path curves, so x alone undershoots the arc length.
        let arc_ft = 3000.0 / COUNTS_PER_FOOT;
        assert!(p.x_ft < arc_ft);
        assert!(p.y_ft > 0.0);
    }

    #[test]
    fn test_heading_normalized_after_wrap() {
        let (mut odom, pose) = integrator();
        pose.lock().heading_deg = 359.0;
        odom.update(0.0, 0, 0, 0.0);
        odom.update(0.1, 300, 300, 50.0);
        let h = pose.lock().heading_deg;
        assert!((0.0..360.0).contains(&h));
        assert_relative_eq!(h, 4.0, epsilon = 1e-6);
    }
}
