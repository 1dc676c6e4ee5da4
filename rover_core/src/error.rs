//! Unified error handling for the rover controller.
//!
//! A single error type keeps propagation uniform across drivers, the
//! control loop, and the telemetry path.

use thiserror::Error;

/// Main error type for rover operations
#[derive(Debug, Error)]
pub enum RoverError {
    /// I/O related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hardware driver errors (I2C, PWM, sensors)
    #[error("Driver error: {0}")]
    Driver(String),

    /// Telemetry recording or dump errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Parse errors
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid input/argument errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Initialization errors
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Catch-all for other error types
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using RoverError
pub type RoverResult<T> = Result<T, RoverError>;

impl From<std::num::ParseIntError> for RoverError {
    fn from(err: std::num::ParseIntError) -> Self {
        RoverError::ParseError(format!("Integer parse error: {}", err))
    }
}

impl From<std::num::ParseFloatError> for RoverError {
    fn from(err: std::num::ParseFloatError) -> Self {
        RoverError::ParseError(format!("Float parse error: {}", err))
    }
}

impl From<&str> for RoverError {
    fn from(msg: &str) -> Self {
        RoverError::Other(msg.to_string())
    }
}

impl From<String> for RoverError {
    fn from(msg: String) -> Self {
        RoverError::Other(msg)
    }
}

// Helper methods
impl RoverError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        RoverError::Config(msg.into())
    }

    /// Create a driver error
    pub fn driver<S: Into<String>>(msg: S) -> Self {
        RoverError::Driver(msg.into())
    }

    /// Create a telemetry error
    pub fn telemetry<S: Into<String>>(msg: S) -> Self {
        RoverError::Telemetry(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        RoverError::InvalidInput(msg.into())
    }

    /// Create an initialization error
    pub fn init<S: Into<String>>(msg: S) -> Self {
        RoverError::InitializationFailed(msg.into())
    }
}
