//! AS5600 absolute angle encoder driver.

use rover_core::driver::DriverStatus;
use rover_core::error::{RoverError, RoverResult};

use crate::drivers::bus::I2cDevice;

/// RAW ANGLE register, high byte first
const REG_RAW_ANGLE_H: u8 = 0x0C;

/// AS5600 driver configuration
#[derive(Debug, Clone)]
pub struct As5600Config {
    /// I2C bus path (e.g., "/dev/i2c-1")
    pub bus: String,
    /// 7-bit slave address
    pub address: u16,
}

impl Default for As5600Config {
    fn default() -> Self {
        Self {
            bus: "/dev/i2c-1".to_string(),
            address: 0x36,
        }
    }
}

/// AS5600 absolute magnetic encoder.
///
/// Reports a 12-bit on-axis angle. There is no direction or multi-turn
/// output; the rotation tracker upstream reconstructs both.
pub struct As5600Driver {
    config: As5600Config,
    status: DriverStatus,
    device: Option<I2cDevice>,
}

impl As5600Driver {
    pub fn new(config: As5600Config) -> Self {
        Self {
            config,
            status: DriverStatus::Uninitialized,
            device: None,
        }
    }

    pub fn init(&mut self) -> RoverResult<()> {
        self.device = Some(I2cDevice::open(&self.config.bus, self.config.address)?);
        self.status = DriverStatus::Ready;
        Ok(())
    }

    pub fn shutdown(&mut self) -> RoverResult<()> {
        self.device = None;
        self.status = DriverStatus::Shutdown;
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.device.is_some()
    }

    pub fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    /// Read the absolute angle, 0..4095.
    pub fn read_raw_angle(&mut self) -> RoverResult<i16> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| RoverError::driver("AS5600 not initialized"))?;

        let mut buf = [0u8; 2];
        device.read_register(REG_RAW_ANGLE_H, &mut buf)?;
        self.status = DriverStatus::Running;
        Ok((((buf[0] & 0x0F) as i16) << 8) | buf[1] as i16)
    }
}
