//! Three-bus sensor acquisition.
//!
//! The left encoder, right encoder, and IMU sit on three separate I2C
//! buses precisely so their transaction latencies can overlap. Each bus
//! gets a long-lived worker thread that owns its driver; a sample
//! request fans out to all three workers and joins their replies, so one
//! acquisition costs one bus transaction of wall time instead of three.
//!
//! The timestamp is captured once, before the fan-out, so the combined
//! sample reflects a single logical instant.

use crossbeam::channel::{bounded, Receiver, Sender};
use std::thread::JoinHandle;

use rover_core::time::monotonic_sec;

use crate::drivers::encoder::EncoderDriver;
use crate::drivers::imu::ImuDriver;

/// One fused reading of all three sensors.
#[derive(Debug, Clone, Copy)]
pub struct SensorSample {
    /// Left encoder absolute angle, 0..4095; -1 on read failure
    pub left_raw: i16,
    /// Right encoder absolute angle, 0..4095; -1 on read failure
    pub right_raw: i16,
    /// Offset-corrected yaw rate, degrees per second
    pub gyro_z_dps: f64,
    /// Monotonic capture time, seconds
    pub timestamp_sec: f64,
    /// All three sub-reads succeeded
    pub valid: bool,
}

struct EncoderWorker {
    req: Option<Sender<()>>,
    resp: Receiver<Option<i16>>,
    handle: Option<JoinHandle<()>>,
}

struct ImuWorker {
    req: Option<Sender<()>>,
    resp: Receiver<f64>,
    handle: Option<JoinHandle<()>>,
}

fn spawn_encoder_worker(name: &str, mut driver: EncoderDriver) -> EncoderWorker {
    let (req_tx, req_rx) = bounded::<()>(1);
    let (resp_tx, resp_rx) = bounded::<Option<i16>>(1);
    let handle = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            while req_rx.recv().is_ok() {
                let reading = driver.read_raw_angle().ok();
                if resp_tx.send(reading).is_err() {
                    break;
                }
            }
        })
        .expect("failed to spawn encoder worker");
    EncoderWorker {
        req: Some(req_tx),
        resp: resp_rx,
        handle: Some(handle),
    }
}

fn spawn_imu_worker(mut driver: ImuDriver) -> ImuWorker {
    let (req_tx, req_rx) = bounded::<()>(1);
    let (resp_tx, resp_rx) = bounded::<f64>(1);
    let handle = std::thread::Builder::new()
        .name("imu-bus".to_string())
        .spawn(move || {
            while req_rx.recv().is_ok() {
                // The IMU read surface is infallible: a dead gyro reads
                // 0.0 rather than invalidating the whole sample.
                if resp_tx.send(driver.read_gyro_z()).is_err() {
                    break;
                }
            }
        })
        .expect("failed to spawn IMU worker");
    ImuWorker {
        req: Some(req_tx),
        resp: resp_rx,
        handle: Some(handle),
    }
}

/// The acquisition rig: one worker per bus.
pub struct SensorRig {
    left: EncoderWorker,
    right: EncoderWorker,
    imu: ImuWorker,
}

impl SensorRig {
    /// Take ownership of the three initialized drivers and park each on
    /// its own bus worker.
    pub fn new(left: EncoderDriver, right: EncoderDriver, imu: ImuDriver) -> Self {
        Self {
            left: spawn_encoder_worker("left-encoder-bus", left),
            right: spawn_encoder_worker("right-encoder-bus", right),
            imu: spawn_imu_worker(imu),
        }
    }

    /// Read all three sensors concurrently.
    pub fn sample(&self) -> SensorSample {
        let timestamp_sec = monotonic_sec();

        let dispatched = [
            self.left.req.as_ref().map(|tx| tx.send(())).transpose(),
            self.right.req.as_ref().map(|tx| tx.send(())).transpose(),
            self.imu.req.as_ref().map(|tx| tx.send(())).transpose(),
        ];
        if dispatched.iter().any(|d| d.is_err()) {
            return SensorSample {
                left_raw: -1,
                right_raw: -1,
                gyro_z_dps: 0.0,
                timestamp_sec,
                valid: false,
            };
        }

        let left = self.left.resp.recv().ok().flatten();
        let right = self.right.resp.recv().ok().flatten();
        let gyro = self.imu.resp.recv().ok();

        SensorSample {
            left_raw: left.unwrap_or(-1),
            right_raw: right.unwrap_or(-1),
            gyro_z_dps: gyro.unwrap_or(0.0),
            timestamp_sec,
            valid: left.is_some() && right.is_some() && gyro.is_some(),
        }
    }
}

impl Drop for SensorRig {
    fn drop(&mut self) {
        // Closing the request channels ends the workers.
        self.left.req.take();
        self.right.req.take();
        self.imu.req.take();
        for handle in [
            self.left.handle.take(),
            self.right.handle.take(),
            self.imu.handle.take(),
        ]
        .into_iter()
        .flatten()
        {
            let _ = handle.join();
        }
    }
}
