//! Simulation encoder driver.

use std::time::Duration;

use rover_core::driver::DriverStatus;
use rover_core::error::RoverResult;

use crate::drivers::sim::SimWorld;
use crate::wheel::WheelSide;

/// Encoder backed by the simulated plant.
pub struct SimulationEncoderDriver {
    world: SimWorld,
    side: WheelSide,
    status: DriverStatus,
}

impl SimulationEncoderDriver {
    pub fn new(world: SimWorld, side: WheelSide) -> Self {
        Self {
            world,
            side,
            status: DriverStatus::Uninitialized,
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

    pub fn read_raw_angle(&mut self) -> RoverResult<i16> {
        self.status = DriverStatus::Running;
        if self.world.is_live() {
            // Emulate bus transaction latency so the acquisition loop runs
            // at a realistic rate instead of spinning.
            std::thread::sleep(Duration::from_micros(500));
        }
        Ok(self.world.raw_angle(self.side))
    }
}
