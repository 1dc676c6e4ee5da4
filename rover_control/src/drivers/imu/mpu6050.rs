//! MPU-6050 gyro driver.
//!
//! Register-level driver for the InvenSense MPU-6050. Only the z-axis
//! gyro is read; the controller has no use for the accelerometer.

use std::time::Duration;

use rover_core::driver::DriverStatus;
use rover_core::error::{RoverError, RoverResult};

use crate::drivers::bus::I2cDevice;
use crate::params::{IMU_DISCARD_READS, IMU_SAMPLE_INTERVAL_US, IMU_SETTLE_MS};

// Register map
const PWR_MGMT_1: u8 = 0x6B;
const SMPLRT_DIV: u8 = 0x19;
const CONFIG: u8 = 0x1A;
const GYRO_CONFIG: u8 = 0x1B;
const GYRO_ZOUT_H: u8 = 0x47;

/// LSB per deg/s at the +-250 dps full-scale setting
const GYRO_SENSITIVITY: f64 = 131.0;

/// MPU-6050 driver configuration
#[derive(Debug, Clone)]
pub struct Mpu6050Config {
    /// I2C bus path (e.g., "/dev/i2c-2")
    pub bus: String,
    /// 7-bit slave address; 0x68 with AD0 low
    pub address: u16,
}

impl Default for Mpu6050Config {
    fn default() -> Self {
        Self {
            bus: "/dev/i2c-2".to_string(),
            address: 0x68,
        }
    }
}

/// MPU-6050 z-axis gyro.
pub struct Mpu6050Driver {
    config: Mpu6050Config,
    status: DriverStatus,
    device: Option<I2cDevice>,
    offset_dps: f64,
}

impl Mpu6050Driver {
    pub fn new(config: Mpu6050Config) -> Self {
        Self {
            config,
            status: DriverStatus::Uninitialized,
            device: None,
            offset_dps: 0.0,
        }
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> RoverResult<()> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| RoverError::driver("MPU-6050 not initialized"))?;
        device.write(&[reg, value])
    }

    /// Wake the device and configure it for 1 kHz sampling with the
    /// 44 Hz low-pass filter and +-250 dps full scale.
    pub fn init(&mut self) -> RoverResult<()> {
        self.device = Some(I2cDevice::open(&self.config.bus, self.config.address)?);

        // Clear the sleep bit, then give the oscillator time to start.
        self.write_reg(PWR_MGMT_1, 0x00)?;
        std::thread::sleep(Duration::from_millis(100));

        // Sample rate = 1 kHz / (1 + 7) with the DLPF enabled
        self.write_reg(SMPLRT_DIV, 0x07)?;
        // DLPF bandwidth 44 Hz
        self.write_reg(CONFIG, 0x03)?;
        // FS_SEL=0: +-250 dps, 131 LSB/dps
        self.write_reg(GYRO_CONFIG, 0x00)?;

        self.status = DriverStatus::Ready;
        tracing::info!("MPU-6050 initialized on {}", self.config.bus);
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

    /// Offset-corrected yaw rate, degrees per second.
    ///
    /// The sign is flipped so positive means counter-clockwise in the
    /// robot frame. Reads 0.0 when the device is absent or the
    /// transaction fails; a dead gyro must not poison odometry.
    pub fn read_gyro_z(&mut self) -> f64 {
        let Some(device) = self.device.as_mut() else {
            return 0.0;
        };

        let mut buf = [0u8; 2];
        if device.read_register(GYRO_ZOUT_H, &mut buf).is_err() {
            return 0.0;
        }

        let raw = i16::from_be_bytes(buf);
        let dps = raw as f64 / GYRO_SENSITIVITY;
        -(dps - self.offset_dps)
    }

    /// Average `samples` stationary readings into the persistent offset.
    ///
    /// Blocks for roughly 0.5 s settle + 1 s discard + samples * 5 ms.
    /// The robot must not move during this window.
    pub fn calibrate(&mut self, samples: u32) {
        if self.device.is_none() || samples == 0 {
            return;
        }

        tracing::info!("Calibrating gyro; keep the robot still");
        std::thread::sleep(Duration::from_millis(IMU_SETTLE_MS));

        for _ in 0..IMU_DISCARD_READS {
            self.read_gyro_z();
            std::thread::sleep(Duration::from_micros(IMU_SAMPLE_INTERVAL_US));
        }

        self.offset_dps = 0.0;
        let mut sum = 0.0;
        for _ in 0..samples {
            sum += self.read_gyro_z();
            std::thread::sleep(Duration::from_micros(IMU_SAMPLE_INTERVAL_US));
        }

        // read_gyro_z negates, so the raw offset is the negated mean.
        self.offset_dps = -(sum / samples as f64);
        tracing::info!("Gyro calibration complete, offset {:.4} dps", self.offset_dps);
    }
}
