//! Simulation IMU driver.

use std::time::Duration;

use rover_core::driver::DriverStatus;
use rover_core::error::RoverResult;

use crate::drivers::sim::SimWorld;
use crate::params::IMU_SAMPLE_INTERVAL_US;

/// Gyro backed by the simulated plant.
pub struct SimulationImuDriver {
    world: SimWorld,
    status: DriverStatus,
    offset_dps: f64,
}

impl SimulationImuDriver {
    pub fn new(world: SimWorld) -> Self {
        Self {
            world,
            status: DriverStatus::Uninitialized,
            offset_dps: 0.0,
        }
    }

    pub fn init(&mut self) -> RoverResult<()> {
        self.status = DriverStatus::Ready;
        Ok(())
    }

    pub fn shutdown(&mut self) -> RoverResult<()> {
        self.status = DriverStatus::Shutdown;
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        true
    }

    pub fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    pub fn calibrate(&mut self, samples: u32) {
        if samples == 0 {
            return;
        }
        self.offset_dps = 0.0;
        let mut sum = 0.0;
        for _ in 0..samples {
            sum += self.world.gyro_z_dps();
            if self.world.is_live() {
                std::thread::sleep(Duration::from_micros(IMU_SAMPLE_INTERVAL_US));
            }
        }
        self.offset_dps = sum / samples as f64;
    }

    pub fn read_gyro_z(&mut self) -> f64 {
        self.status = DriverStatus::Running;
        self.world.gyro_z_dps() - self.offset_dps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_removes_bias() {
        let world = SimWorld::new();
        world.set_gyro_bias_dps(1.5);

        let mut imu = SimulationImuDriver::new(world);
        imu.init().unwrap();
        assert!((imu.read_gyro_z() - 1.5).abs() < 1e-9);

        imu.calibrate(100);
        assert!(imu.read_gyro_z().abs() < 1e-9);
    }
}
