use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use rover_control::actuator::Actuator;
use rover_control::command;
use rover_control::config::RobotConfig;
use rover_control::control::Controller;
use rover_control::drivers::encoder::{As5600Config, As5600Driver, EncoderDriver, SimulationEncoderDriver};
use rover_control::drivers::imu::{ImuDriver, Mpu6050Config, Mpu6050Driver, SimulationImuDriver};
use rover_control::drivers::motor::{MotorDriver, SimulationMotorDriver, SysfsPwmConfig, SysfsPwmDriver};
use rover_control::drivers::sim::SimWorld;
use rover_control::feedback;
use rover_control::odometry::{OdometryIntegrator, Pose};
use rover_control::params;
use rover_control::sensors::SensorRig;
use rover_control::telemetry::FlightRecorder;
use rover_control::wheel::{WheelPair, WheelSide};

#[derive(Parser)]
#[command(name = "rover_control")]
#[command(about = "Differential-drive rover controller")]
struct Cli {
    /// Robot configuration file (YAML or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drive the simulated plant instead of real hardware
    #[arg(long)]
    sim: bool,

    /// Skip the ESC arm delay (bench and simulation convenience)
    #[arg(long)]
    skip_arm_delay: bool,
}

struct DriverSet {
    left_encoder: EncoderDriver,
    right_encoder: EncoderDriver,
    imu: ImuDriver,
    left_motor: MotorDriver,
    right_motor: MotorDriver,
}

fn hardware_drivers(config: &RobotConfig) -> DriverSet {
    DriverSet {
        left_encoder: EncoderDriver::As5600(As5600Driver::new(As5600Config {
            bus: config.left_encoder.bus.clone(),
            address: config.left_encoder.address,
        })),
        right_encoder: EncoderDriver::As5600(As5600Driver::new(As5600Config {
            bus: config.right_encoder.bus.clone(),
            address: config.right_encoder.address,
        })),
        imu: ImuDriver::Mpu6050(Mpu6050Driver::new(Mpu6050Config {
            bus: config.imu.bus.clone(),
            address: config.imu.address,
        })),
        left_motor: MotorDriver::SysfsPwm(SysfsPwmDriver::new(SysfsPwmConfig {
            chip: config.pwm.chip,
            channel: config.pwm.left_channel,
        })),
        right_motor: MotorDriver::SysfsPwm(SysfsPwmDriver::new(SysfsPwmConfig {
            chip: config.pwm.chip,
            channel: config.pwm.right_channel,
        })),
    }
}

fn simulation_drivers() -> DriverSet {
    let world = SimWorld::with_auto_advance();
    DriverSet {
        left_encoder: EncoderDriver::Simulation(SimulationEncoderDriver::new(
            world.clone(),
            WheelSide::Left,
        )),
        right_encoder: EncoderDriver::Simulation(SimulationEncoderDriver::new(
            world.clone(),
            WheelSide::Right,
        )),
        imu: ImuDriver::Simulation(SimulationImuDriver::new(world.clone())),
        left_motor: MotorDriver::Simulation(SimulationMotorDriver::new(
            world.clone(),
            WheelSide::Left,
        )),
        right_motor: MotorDriver::Simulation(SimulationMotorDriver::new(world, WheelSide::Right)),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    rover_core::time::init_clock();

    let config = match &cli.config {
        Some(path) => RobotConfig::from_file(path)?,
        None => RobotConfig::find_and_load(),
    };

    let mut drivers = if cli.sim {
        tracing::info!("Running against the simulated plant");
        simulation_drivers()
    } else {
        hardware_drivers(&config)
    };

    // Encoders and PWM are load-bearing: failure here is fatal.
    drivers.left_encoder.init()?;
    drivers.right_encoder.init()?;

    let mut actuator = Actuator::new(drivers.left_motor, drivers.right_motor);
    actuator.init()?;

    if !cli.skip_arm_delay {
        tracing::info!("Arming ESCs...");
        std::thread::sleep(Duration::from_millis(params::ESC_ARM_DELAY_MS));
    }

    // A dead gyro degrades odometry to encoder-only; it does not stop
    // the robot.
    match drivers.imu.init() {
        Ok(()) => drivers.imu.calibrate(config.calibration_samples),
        Err(e) => tracing::warn!("IMU init failed ({}); continuing with gyro disabled", e),
    }

    let wheels = WheelPair::new();
    let pose = Arc::new(Mutex::new(Pose::new()));
    let latest_gyro = Arc::new(Mutex::new(0.0f64));
    let odometry = OdometryIntegrator::new(Arc::clone(&pose));
    let recorder = FlightRecorder::new(config.log_capacity, &config.log_dir);
    let rig = SensorRig::new(drivers.left_encoder, drivers.right_encoder, drivers.imu);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::Relaxed);
        })
        .context("Failed to install signal handler")?;
    }

    let (command_tx, command_rx) = crossbeam::channel::unbounded();

    println!("READY coordinated");

    let feedback_handle = {
        let wheels = wheels.clone();
        let latest_gyro = Arc::clone(&latest_gyro);
        let running = Arc::clone(&running);
        std::thread::Builder::new()
            .name("feedback".to_string())
            .spawn(move || feedback::run(rig, wheels, odometry, latest_gyro, running))
            .context("Failed to spawn feedback thread")?
    };

    let control_handle = {
        let mut controller = Controller::new(wheels, pose, actuator, recorder, latest_gyro);
        let running = Arc::clone(&running);
        std::thread::Builder::new()
            .name("control".to_string())
            .spawn(move || controller.run(command_rx, running))
            .context("Failed to spawn control thread")?
    };

    let _input_handle = command::spawn_stdin_reader(command_tx, Arc::clone(&running));

    let _ = control_handle.join();
    let _ = feedback_handle.join();
    // The input thread may still be parked in a blocking stdin read;
    // process exit reaps it.
    Ok(())
}

fn main() {
    // stdout carries the operator protocol; all logging goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
