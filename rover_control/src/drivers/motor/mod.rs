//! ESC output drivers.
//!
//! Each wheel's ESC takes a 1000-2000 us pulse at a 2.5 ms period.
//! Backends:
//!
//! - `SysfsPwmDriver` - Linux sysfs PWM (pwmchip export / period /
//!   duty_cycle / enable)
//! - `SimulationMotorDriver` - drives the simulated plant

mod simulation;
mod sysfs_pwm;

pub use simulation::SimulationMotorDriver;
pub use sysfs_pwm::{SysfsPwmConfig, SysfsPwmDriver};

use rover_core::driver::DriverStatus;
use rover_core::error::RoverResult;

/// Type-erased motor driver
pub enum MotorDriver {
    SysfsPwm(SysfsPwmDriver),
    Simulation(SimulationMotorDriver),
}

impl MotorDriver {
    pub fn init(&mut self) -> RoverResult<()> {
        match self {
            Self::SysfsPwm(d) => d.init(),
            Self::Simulation(d) => d.init(),
        }
    }

    /// Neutral the output and disable the channel.
    pub fn shutdown(&mut self) -> RoverResult<()> {
        match self {
            Self::SysfsPwm(d) => d.shutdown(),
            Self::Simulation(d) => d.shutdown(),
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            Self::SysfsPwm(d) => d.is_available(),
            Self::Simulation(d) => d.is_available(),
        }
    }

    pub fn status(&self) -> DriverStatus {
        match self {
            Self::SysfsPwm(d) => d.status(),
            Self::Simulation(d) => d.status(),
        }
    }

    /// Put a pulse width on the wire. The caller owns range clamping.
    pub fn set_pulse_ns(&mut self, pulse_ns: i64) -> RoverResult<()> {
        match self {
            Self::SysfsPwm(d) => d.set_pulse_ns(pulse_ns),
            Self::Simulation(d) => d.set_pulse_ns(pulse_ns),
        }
    }
}
