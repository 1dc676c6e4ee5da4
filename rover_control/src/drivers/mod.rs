//! Hardware drivers.
//!
//! Each driver family has a hardware backend and a simulation backend
//! dispatched through a family enum. Simulation backends share the
//! [`sim::SimWorld`] plant so the whole control stack can run closed-loop
//! without a robot attached.

pub mod bus;
pub mod encoder;
pub mod imu;
pub mod motor;
pub mod sim;

pub use bus::I2cDevice;
pub use encoder::{As5600Driver, EncoderDriver, SimulationEncoderDriver};
pub use imu::{ImuDriver, Mpu6050Driver, SimulationImuDriver};
pub use motor::{MotorDriver, SimulationMotorDriver, SysfsPwmDriver};
pub use sim::SimWorld;
