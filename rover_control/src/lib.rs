//! # Rover controller
//!
//! Real-time control process for a two-wheeled differential-drive robot:
//! three-bus parallel sensor acquisition, quadrature-less rotation
//! tracking, gyro + encoder odometry, a goto-point navigation state
//! machine with bang-bang motor control, and a line-oriented command
//! channel on stdin/stdout.
//!
//! ## Structure
//!
//! ```text
//! rover_control/
//! ── drivers/        # I2C bus, AS5600 encoders, MPU-6050, sysfs PWM, sim plant
//! ── sensors         # three-bus acquisition rig
//! ── tracker         # absolute-angle -> signed multi-turn position
//! ── wheel           # per-wheel shared state (motor + tracker, one lock)
//! ── actuator        # speed% -> ESC pulse with ramp limiting
//! ── odometry        # pose integration (x, y, heading)
//! ── nav             # GOTO / TURNING / DRIVING state machine
//! ── command         # stdin line protocol
//! ── telemetry       # in-memory flight recorder + CSV dump
//! ── control         # 200 Hz control loop
//! ── feedback        # acquisition + odometry loop
//! ```

pub mod actuator;
pub mod command;
pub mod config;
pub mod control;
pub mod drivers;
pub mod feedback;
pub mod kalman;
pub mod nav;
pub mod odometry;
pub mod params;
pub mod sensors;
pub mod telemetry;
pub mod tracker;
pub mod wheel;

pub use actuator::Actuator;
pub use command::Command;
pub use config::RobotConfig;
pub use nav::{NavController, NavState};
pub use odometry::{OdometryIntegrator, Pose};
pub use sensors::{SensorRig, SensorSample};
pub use telemetry::{FlightRecorder, OperatingMode};
pub use wheel::{WheelPair, WheelSide, WheelState};
