//! The sensor feedback loop.
//!
//! Runs as fast as the buses deliver: sample all three sensors, fold the
//! raw angles into each wheel's rotation tracker under that wheel's
//! lock, publish the gyro rate, and integrate odometry. Invalid samples
//! are dropped whole; a tick with one bad bus updates nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::odometry::OdometryIntegrator;
use crate::sensors::{SensorRig, SensorSample};
use crate::wheel::{WheelPair, WheelSide};

/// Fold one sample into trackers, the shared gyro rate, and the pose.
pub fn process_sample(
    sample: &SensorSample,
    wheels: &WheelPair,
    odometry: &mut OdometryIntegrator,
    latest_gyro: &Mutex<f64>,
) {
    if !sample.valid {
        return;
    }

    let left_total = {
        let mut wheel = wheels.lock(WheelSide::Left);
        let direction = wheel.motor.direction();
        wheel.tracker.update(sample.left_raw, direction);
        wheel.tracker.total_counts
    };
    let right_total = {
        let mut wheel = wheels.lock(WheelSide::Right);
        let direction = wheel.motor.direction();
        wheel.tracker.update(sample.right_raw, direction);
        wheel.tracker.total_counts
    };

    *latest_gyro.lock() = sample.gyro_z_dps;
    odometry.update(
        sample.timestamp_sec,
        left_total,
        right_total,
        sample.gyro_z_dps,
    );
}

/// The feedback thread body. No explicit sleep; the sample call blocks
/// on bus latency.
pub fn run(
    rig: SensorRig,
    wheels: WheelPair,
    mut odometry: OdometryIntegrator,
    latest_gyro: Arc<Mutex<f64>>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Relaxed) {
        let sample = rig.sample();
        process_sample(&sample, &wheels, &mut odometry, &latest_gyro);
    }
}
