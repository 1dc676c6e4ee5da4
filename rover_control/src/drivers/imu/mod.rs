//! IMU drivers.
//!
//! Heading rate comes from the gyroscope z axis only; the rest of the
//! inertial data is unused by this controller. Backends:
//!
//! - `Mpu6050Driver` - register-level MPU-6050 over Linux I2C
//! - `SimulationImuDriver` - yaw rate from the simulated plant
//!
//! IMU failure is never fatal: a driver that failed to initialize reads
//! 0.0 deg/s and odometry degrades to encoder-only heading.

mod mpu6050;
mod simulation;

pub use mpu6050::{Mpu6050Config, Mpu6050Driver};
pub use simulation::SimulationImuDriver;

use rover_core::driver::DriverStatus;
use rover_core::error::RoverResult;

/// Type-erased IMU driver
pub enum ImuDriver {
    Mpu6050(Mpu6050Driver),
    Simulation(SimulationImuDriver),
}

impl ImuDriver {
    pub fn init(&mut self) -> RoverResult<()> {
        match self {
            Self::Mpu6050(d) => d.init(),
            Self::Simulation(d) => d.init(),
        }
    }

    pub fn shutdown(&mut self) -> RoverResult<()> {
        match self {
            Self::Mpu6050(d) => d.shutdown(),
            Self::Simulation(d) => d.shutdown(),
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            Self::Mpu6050(d) => d.is_available(),
            Self::Simulation(d) => d.is_available(),
        }
    }

    pub fn status(&self) -> DriverStatus {
        match self {
            Self::Mpu6050(d) => d.status(),
            Self::Simulation(d) => d.status(),
        }
    }

    /// Measure the zero-rate offset while the robot is stationary.
    pub fn calibrate(&mut self, samples: u32) {
        match self {
            Self::Mpu6050(d) => d.calibrate(samples),
            Self::Simulation(d) => d.calibrate(samples),
        }
    }

    /// Offset-corrected yaw rate in degrees per second, positive
    /// counter-clockwise. Reads 0.0 when the device is unavailable.
    pub fn read_gyro_z(&mut self) -> f64 {
        match self {
            Self::Mpu6050(d) => d.read_gyro_z(),
            Self::Simulation(d) => d.read_gyro_z(),
        }
    }
}
