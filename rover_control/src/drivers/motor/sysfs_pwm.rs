//! Sysfs PWM driver for ESC control.
//!
//! Drives `/sys/class/pwm/pwmchip<N>/pwm<chan>/{period,duty_cycle,enable}`.
//! The duty_cycle file is kept open across writes; each update seeks to
//! the start and rewrites the value, which is the cheapest path the sysfs
//! interface offers at 200 Hz.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rover_core::driver::DriverStatus;
use rover_core::error::{RoverError, RoverResult};

use crate::params::{NEUTRAL_NS, PWM_PERIOD_NS};

/// Sysfs PWM configuration
#[derive(Debug, Clone)]
pub struct SysfsPwmConfig {
    /// pwmchip index; None probes pwmchip0..9 for the first present
    pub chip: Option<u32>,
    /// Channel under the chip
    pub channel: u32,
}

/// One ESC channel on a sysfs PWM chip.
pub struct SysfsPwmDriver {
    config: SysfsPwmConfig,
    status: DriverStatus,
    duty: Option<File>,
    enable: Option<File>,
}

impl SysfsPwmDriver {
    pub fn new(config: SysfsPwmConfig) -> Self {
        Self {
            config,
            status: DriverStatus::Uninitialized,
            duty: None,
            enable: None,
        }
    }

    /// Find the first pwmchip present under /sys/class/pwm.
    fn find_pwm_chip() -> RoverResult<u32> {
        for i in 0..10 {
            if Path::new(&format!("/sys/class/pwm/pwmchip{}", i)).exists() {
                return Ok(i);
            }
        }
        Err(RoverError::driver("No pwmchip found under /sys/class/pwm"))
    }

    fn chip_dir(chip: u32) -> PathBuf {
        PathBuf::from(format!("/sys/class/pwm/pwmchip{}", chip))
    }

    /// Export the channel (if not already exported), program the period,
    /// preload neutral, and enable the output.
    pub fn init(&mut self) -> RoverResult<()> {
        let chip = match self.config.chip {
            Some(chip) => chip,
            None => Self::find_pwm_chip()?,
        };
        let chip_dir = Self::chip_dir(chip);
        let channel_dir = chip_dir.join(format!("pwm{}", self.config.channel));

        if !channel_dir.exists() {
            std::fs::write(chip_dir.join("export"), self.config.channel.to_string()).map_err(
                |e| {
                    RoverError::driver(format!(
                        "Failed to export pwm{} on pwmchip{}: {}",
                        self.config.channel, chip, e
                    ))
                },
            )?;
            // The kernel needs a moment to populate the channel directory.
            std::thread::sleep(Duration::from_millis(100));
        }

        std::fs::write(channel_dir.join("period"), PWM_PERIOD_NS.to_string())
            .map_err(|e| RoverError::driver(format!("Failed to set PWM period: {}", e)))?;

        let mut duty = OpenOptions::new()
            .write(true)
            .open(channel_dir.join("duty_cycle"))
            .map_err(|e| RoverError::driver(format!("Failed to open duty_cycle: {}", e)))?;
        duty.write_all(NEUTRAL_NS.to_string().as_bytes())
            .map_err(|e| RoverError::driver(format!("Failed to preload neutral: {}", e)))?;

        let mut enable = OpenOptions::new()
            .write(true)
            .open(channel_dir.join("enable"))
            .map_err(|e| RoverError::driver(format!("Failed to open enable: {}", e)))?;
        enable
            .write_all(b"1")
            .map_err(|e| RoverError::driver(format!("Failed to enable PWM: {}", e)))?;

        self.duty = Some(duty);
        self.enable = Some(enable);
        self.status = DriverStatus::Ready;
        Ok(())
    }

    /// Neutral the output and disable the channel.
    pub fn shutdown(&mut self) -> RoverResult<()> {
        if let Some(duty) = self.duty.as_mut() {
            let _ = Self::rewrite(duty, &NEUTRAL_NS.to_string());
        }
        if let Some(enable) = self.enable.as_mut() {
            let _ = Self::rewrite(enable, "0");
        }
        self.duty = None;
        self.enable = None;
        self.status = DriverStatus::Shutdown;
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.duty.is_some()
    }

    pub fn status(&self) -> DriverStatus {
        self.status.clone()
    }

    fn rewrite(file: &mut File, value: &str) -> std::io::Result<()> {
        file.seek(SeekFrom::Start(0))?;
        file.write_all(value.as_bytes())
    }

    /// Put a pulse width on the wire.
    pub fn set_pulse_ns(&mut self, pulse_ns: i64) -> RoverResult<()> {
        let duty = self
            .duty
            .as_mut()
            .ok_or_else(|| RoverError::driver("PWM not initialized"))?;

        Self::rewrite(duty, &pulse_ns.to_string())
            .map_err(|e| RoverError::driver(format!("Failed to write duty_cycle: {}", e)))?;

        self.status = DriverStatus::Running;
        Ok(())
    }
}
