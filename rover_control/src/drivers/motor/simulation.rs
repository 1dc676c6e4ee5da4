//! Simulation motor driver.

use rover_core::driver::DriverStatus;
use rover_core::error::RoverResult;

use crate::drivers::sim::SimWorld;
use crate::params::NEUTRAL_NS;
use crate::wheel::WheelSide;

/// ESC backed by the simulated plant.
pub struct SimulationMotorDriver {
    world: SimWorld,
    side: WheelSide,
    status: DriverStatus,
}

impl SimulationMotorDriver {
    pub fn new(world: SimWorld, side: WheelSide) -> Self {
        Self {
            world,
            side,
            status: DriverStatus::Uninitialized,
        }
    }

    pub fn init(&mut self) -> RoverResult<()> {
        self.world.set_pulse(self.side, NEUTRAL_NS);
        self.status = DriverStatus::Ready;
        Ok(())
    }

    pub fn shutdown(&mut self) -> RoverResult<()> {
        self.world.set_pulse(self.side, NEUTRAL_NS);
        self.status = DriverStatus::Shutdown;
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        true
    }

    pub fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    pub fn set_pulse_ns(&mut self, pulse_ns: i64) -> RoverResult<()> {
        self.status = DriverStatus::Running;
        self.world.set_pulse(self.side, pulse_ns);
        Ok(())
    }
}
