//! Communication buses.

mod linux_i2c;

pub use linux_i2c::I2cDevice;
