//! Single-slave I2C device handles over Linux i2cdev.
//!
//! The whole point of this robot's three-bus layout is that each sensor
//! sits alone on its own bus so reads can overlap. A handle therefore
//! binds its slave address once at open instead of re-selecting before
//! every transaction; there is nothing else on the wire to select away
//! from. Errors carry the bus path and address so a worker thread's
//! failure names the device that caused it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;

use rover_core::error::{RoverError, RoverResult};

const I2C_SLAVE: libc::c_ulong = 0x0703;

/// One slave device on a Linux I2C bus.
pub struct I2cDevice {
    bus: String,
    address: u16,
    file: File,
}

impl I2cDevice {
    /// Open the bus and select the slave. The returned handle is ready
    /// for transactions; dropping it closes the descriptor.
    pub fn open(bus: &str, address: u16) -> RoverResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(bus)
            .map_err(|e| RoverError::driver(format!("Failed to open {}: {}", bus, e)))?;

        let ret = unsafe { libc::ioctl(file.as_raw_fd(), I2C_SLAVE, address as libc::c_ulong) };
        if ret < 0 {
            return Err(RoverError::driver(format!(
                "Failed to select slave 0x{:02x} on {}: {}",
                address,
                bus,
                std::io::Error::last_os_error()
            )));
        }

        Ok(Self {
            bus: bus.to_string(),
            address,
            file,
        })
    }

    pub fn bus(&self) -> &str {
        &self.bus
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    fn fault(&self, what: &str, e: std::io::Error) -> RoverError {
        RoverError::driver(format!(
            "{} 0x{:02x} on {}: {}",
            what, self.address, self.bus, e
        ))
    }

    /// Raw write to the device.
    pub fn write(&mut self, data: &[u8]) -> RoverResult<()> {
        self.file
            .write_all(data)
            .map_err(|e| self.fault("Write to", e))
    }

    /// Raw read from the device.
    pub fn read(&mut self, buf: &mut [u8]) -> RoverResult<()> {
        self.file
            .read_exact(buf)
            .map_err(|e| self.fault("Read from", e))
    }

    /// Register read: point the device at `reg`, then fill `buf`.
    pub fn read_register(&mut self, reg: u8, buf: &mut [u8]) -> RoverResult<()> {
        self.write(&[reg])?;
        self.read(buf)
    }
}
