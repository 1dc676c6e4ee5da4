//! Robot configuration.
//!
//! Bus mapping, device addresses, and PWM channel assignment vary between
//! chassis builds, so they load from a YAML or TOML file rather than being
//! baked in. Everything has a default matching the reference wiring.

use std::path::{Path, PathBuf};

use rover_core::error::{RoverError, RoverResult};
use serde::{Deserialize, Serialize};

use crate::params;

/// One I2C-attached device: bus path plus slave address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct I2cEndpoint {
    /// I2C device path (e.g., "/dev/i2c-1")
    pub bus: String,
    /// 7-bit slave address
    pub address: u16,
}

/// PWM output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PwmConfig {
    /// pwmchip index under /sys/class/pwm; None probes pwmchip0..9
    #[serde(default)]
    pub chip: Option<u32>,
    /// Left ESC channel
    #[serde(default = "default_left_channel")]
    pub left_channel: u32,
    /// Right ESC channel
    #[serde(default = "default_right_channel")]
    pub right_channel: u32,
}

fn default_left_channel() -> u32 {
    0
}

fn default_right_channel() -> u32 {
    1
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            chip: None,
            left_channel: 0,
            right_channel: 1,
        }
    }
}

/// Full robot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub left_encoder: I2cEndpoint,
    pub right_encoder: I2cEndpoint,
    pub imu: I2cEndpoint,
    pub pwm: PwmConfig,
    /// Directory telemetry CSVs are dumped into
    pub log_dir: PathBuf,
    /// Telemetry ring capacity, records
    pub log_capacity: usize,
    /// Gyro calibration sample count
    pub calibration_samples: u32,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            left_encoder: I2cEndpoint {
                bus: "/dev/i2c-3".to_string(),
                address: 0x40,
            },
            right_encoder: I2cEndpoint {
                bus: "/dev/i2c-1".to_string(),
                address: 0x1B,
            },
            imu: I2cEndpoint {
                bus: "/dev/i2c-2".to_string(),
                address: 0x68,
            },
            pwm: PwmConfig::default(),
            log_dir: PathBuf::from("../logs"),
            log_capacity: params::DEFAULT_LOG_CAPACITY,
            calibration_samples: params::DEFAULT_CALIBRATION_SAMPLES,
        }
    }
}

impl RobotConfig {
    /// Load config from a file, dispatching on extension with fallback.
    pub fn from_file<P: AsRef<Path>>(path: P) -> RoverResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RoverError::config(format!("Failed to read robot config: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str());
        match extension {
            Some("toml") => Self::from_toml(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => Self::from_yaml(&contents).or_else(|_| Self::from_toml(&contents)),
        }
    }

    /// Parse config from YAML string
    pub fn from_yaml(contents: &str) -> RoverResult<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| RoverError::config(format!("Failed to parse robot YAML: {}", e)))
    }

    /// Parse config from TOML string
    pub fn from_toml(contents: &str) -> RoverResult<Self> {
        toml::from_str(contents)
            .map_err(|e| RoverError::config(format!("Failed to parse robot TOML: {}", e)))
    }

    /// Find and load config from standard search paths, or fall back to
    /// the reference wiring defaults.
    pub fn find_and_load() -> Self {
        for candidate in ["rover.yaml", "rover.yml", "rover.toml"] {
            let path = PathBuf::from(candidate);
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Ignoring {}: {}", candidate, e);
                    }
                }
            }
        }
        Self::default()
    }
}
