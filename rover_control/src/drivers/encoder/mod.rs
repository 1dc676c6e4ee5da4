//! Wheel encoder drivers.
//!
//! The wheels carry AS5600-class absolute magnetic encoders: 12-bit angle,
//! no quadrature, no direction bit. Backends:
//!
//! - `As5600Driver` - the real sensor over Linux I2C
//! - `SimulationEncoderDriver` - reads the shared simulated plant

mod as5600;
mod simulation;

pub use as5600::{As5600Config, As5600Driver};
pub use simulation::SimulationEncoderDriver;

use rover_core::driver::DriverStatus;
use rover_core::error::RoverResult;

/// Type-erased encoder driver
pub enum EncoderDriver {
    As5600(As5600Driver),
    Simulation(SimulationEncoderDriver),
}

impl EncoderDriver {
    pub fn init(&mut self) -> RoverResult<()> {
        match self {
            Self::As5600(d) => d.init(),
            Self::Simulation(d) => d.init(),
        }
    }

    pub fn shutdown(&mut self) -> RoverResult<()> {
        match self {
            Self::As5600(d) => d.shutdown(),
            Self::Simulation(d) => d.shutdown(),
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            Self::As5600(d) => d.is_available(),
            Self::Simulation(d) => d.is_available(),
        }
    }

    pub fn status(&self) -> DriverStatus {
        match self {
            Self::As5600(d) => d.status(),
            Self::Simulation(d) => d.status(),
        }
    }

    /// Read the absolute angle, 0..4095.
    pub fn read_raw_angle(&mut self) -> RoverResult<i16> {
        match self {
            Self::As5600(d) => d.read_raw_angle(),
            Self::Simulation(d) => d.read_raw_angle(),
        }
    }
}
