//! Closed-loop navigation tests against the simulated plant.
//!
//! Each harness step advances the plant, feeds one fused sensor sample
//! through the feedback path, and runs one control tick with a synthetic
//! clock. No threads, no wall-clock sleeps: every run is deterministic.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;

use rover_control::command::Command;
use rover_control::control::Controller;
use rover_control::drivers::encoder::SimulationEncoderDriver;
use rover_control::drivers::imu::SimulationImuDriver;
use rover_control::drivers::motor::{MotorDriver, SimulationMotorDriver};
use rover_control::drivers::sim::SimWorld;
use rover_control::feedback;
use rover_control::nav::NavState;
use rover_control::odometry::{OdometryIntegrator, Pose};
use rover_control::params;
use rover_control::sensors::SensorSample;
use rover_control::telemetry::FlightRecorder;
use rover_control::wheel::{WheelPair, WheelSide};
use rover_control::Actuator;

/// Feedback/control step, seconds of simulated time.
const DT: f64 = 0.02;

struct Harness {
    world: SimWorld,
    wheels: WheelPair,
    pose: Arc<Mutex<Pose>>,
    odometry: OdometryIntegrator,
    latest_gyro: Arc<Mutex<f64>>,
    controller: Controller,
    left_encoder: SimulationEncoderDriver,
    right_encoder: SimulationEncoderDriver,
    imu: SimulationImuDriver,
    running: AtomicBool,
    now_sec: f64,
    lines: Vec<String>,
    _log_dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let world = SimWorld::new();
        let wheels = WheelPair::new();
        let pose = Arc::new(Mutex::new(Pose::new()));
        let latest_gyro = Arc::new(Mutex::new(0.0f64));
        let odometry = OdometryIntegrator::new(Arc::clone(&pose));

        let mut actuator = Actuator::new(
            MotorDriver::Simulation(SimulationMotorDriver::new(world.clone(), WheelSide::Left)),
            MotorDriver::Simulation(SimulationMotorDriver::new(world.clone(), WheelSide::Right)),
        );
        actuator.init().unwrap();

        let log_dir = tempfile::tempdir().unwrap();
        let recorder = FlightRecorder::new(100_000, log_dir.path());
        let controller = Controller::new(
            wheels.clone(),
            Arc::clone(&pose),
            actuator,
            recorder,
            Arc::clone(&latest_gyro),
        );

        let mut left_encoder = SimulationEncoderDriver::new(world.clone(), WheelSide::Left);
        let mut right_encoder = SimulationEncoderDriver::new(world.clone(), WheelSide::Right);
        let mut imu = SimulationImuDriver::new(world.clone());
        left_encoder.init().unwrap();
        right_encoder.init().unwrap();
        imu.init().unwrap();

        let mut harness = Self {
            world,
            wheels,
            pose,
            odometry,
            latest_gyro,
            controller,
            left_encoder,
            right_encoder,
            imu,
            running: AtomicBool::new(true),
            now_sec: 0.0,
            lines: Vec::new(),
            _log_dir: log_dir,
        };
        // Seed trackers and odometry baselines with one stationary sample.
        harness.step();
        harness
    }

    fn command(&mut self, cmd: Command) {
        let replies = self.controller.apply_command(cmd, &self.running);
        self.lines.extend(replies);
    }

    fn step(&mut self) {
        self.world.advance(DT);
        self.now_sec += DT;

        let sample = SensorSample {
            left_raw: self.left_encoder.read_raw_angle().unwrap(),
            right_raw: self.right_encoder.read_raw_angle().unwrap(),
            gyro_z_dps: self.imu.read_gyro_z(),
            timestamp_sec: self.now_sec,
            valid: true,
        };
        feedback::process_sample(&sample, &self.wheels, &mut self.odometry, &self.latest_gyro);

        let lines = self.controller.tick(self.now_sec);
        self.lines.extend(lines);
    }

    /// Step until ARRIVED is emitted, bailing out after `max_steps`.
    fn run_until_arrived(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            self.step();
            if self.lines.iter().any(|l| l == "ARRIVED") {
                return;
            }
        }
        panic!(
            "never arrived; nav state {:?}, pose {:?}",
            self.controller.nav.state,
            *self.pose.lock()
        );
    }

    fn pose_snapshot(&self) -> Pose {
        self.pose.lock().clone()
    }

    fn states_seen(&mut self, steps: usize) -> Vec<NavState> {
        let mut seen = Vec::new();
        for _ in 0..steps {
            self.step();
            if seen.last() != Some(&self.controller.nav.state) {
                seen.push(self.controller.nav.state);
            }
        }
        seen
    }
}

#[test]
fn test_straight_goto_converges_and_arrives() {
    let mut h = Harness::new();
    h.command(Command::Goto {
        x_ft: 10.0,
        y_ft: 0.0,
    });
    assert!(h.lines.iter().any(|l| l.starts_with("OK goto 10 0")));

    // Aligned target: the first planned segment is a drive, no turn.
    h.step();
    assert_eq!(h.controller.nav.state, NavState::Driving);
    let expected_counts = (10.0 * params::COUNTS_PER_FOOT).round() as i32;
    assert_eq!(
        h.wheels.lock(WheelSide::Left).target_counts,
        expected_counts
    );

    h.run_until_arrived(3_000);
    assert_eq!(h.controller.nav.state, NavState::Idle);

    let pose = h.pose_snapshot();
    let miss = ((pose.x_ft - 10.0).powi(2) + pose.y_ft.powi(2)).sqrt();
    assert!(miss < 1.0, "arrived {:.3} ft from target", miss);

    // Motors neutral once idle
    assert_eq!(h.world.pulse(WheelSide::Left), params::NEUTRAL_NS);
    assert_eq!(h.world.pulse(WheelSide::Right), params::NEUTRAL_NS);
}

#[test]
fn test_diagonal_goto_turns_then_drives() {
    let mut h = Harness::new();
    h.command(Command::Goto { x_ft: 3.0, y_ft: 3.0 });

    h.step();
    assert_eq!(h.controller.nav.state, NavState::Turning);
    assert!((h.controller.nav.target_heading_deg - 45.0).abs() < 1e-9);

    // Pivot: left forward, right reverse (commanded on the next tick)
    h.step();
    assert!(h.world.pulse(WheelSide::Left) > params::NEUTRAL_NS);
    assert!(h.world.pulse(WheelSide::Right) < params::NEUTRAL_NS);

    h.run_until_arrived(5_000);

    let pose = h.pose_snapshot();
    let miss = ((pose.x_ft - 3.0).powi(2) + (pose.y_ft - 3.0).powi(2)).sqrt();
    assert!(miss < 1.0, "arrived {:.3} ft from target", miss);
    // The pivot must have actually rotated the pose estimate.
    assert!(pose.heading_deg > 30.0 && pose.heading_deg < 60.0);
}

#[test]
fn test_goto_walks_through_turning_driving_idle() {
    let mut h = Harness::new();
    h.command(Command::Goto { x_ft: 0.0, y_ft: 6.0 });

    let states = h.states_seen(4_000);
    let turning_at = states.iter().position(|s| *s == NavState::Turning);
    let driving_at = states.iter().position(|s| *s == NavState::Driving);
    let idle_at = states.iter().rposition(|s| *s == NavState::Idle);

    let turning_at = turning_at.expect("never entered TURNING");
    let driving_at = driving_at.expect("never entered DRIVING");
    let idle_at = idle_at.expect("never returned to IDLE");
    assert!(turning_at < driving_at && driving_at < idle_at);
}

#[test]
fn test_pulse_applies_raw_widths_and_stays_idle() {
    let mut h = Harness::new();
    h.command(Command::Pulse {
        left_ns: 2_000_000,
        right_ns: 1_000_000,
    });

    assert!(h
        .lines
        .iter()
        .any(|l| l == "OK pulse L:2000000 R:1000000"));
    assert_eq!(h.controller.nav.state, NavState::Idle);
    assert_eq!(h.world.pulse(WheelSide::Left), params::FORWARD_MAX_NS);
    assert_eq!(h.world.pulse(WheelSide::Right), params::REVERSE_MAX_NS);
    assert!(!h.wheels.lock(WheelSide::Left).has_target);
    assert!(!h.wheels.lock(WheelSide::Right).has_target);

    // Out-of-range widths clamp to the legal pulse range.
    h.command(Command::Pulse {
        left_ns: 5_000_000,
        right_ns: 0,
    });
    let clamped_replies = h
        .lines
        .iter()
        .filter(|l| *l == "OK pulse L:2000000 R:1000000")
        .count();
    assert_eq!(clamped_replies, 2);
}

#[test]
fn test_stop_during_drive_neutrals_and_dumps() {
    let mut h = Harness::new();
    h.command(Command::Goto {
        x_ft: 10.0,
        y_ft: 0.0,
    });
    for _ in 0..50 {
        h.step();
    }
    assert_eq!(h.controller.nav.state, NavState::Driving);
    assert!(h.world.pulse(WheelSide::Left) > params::NEUTRAL_NS);

    let log_dir = h._log_dir.path().to_path_buf();
    h.command(Command::Stop);

    assert!(h.lines.iter().any(|l| l == "OK stopall (log dumped)"));
    assert_eq!(h.controller.nav.state, NavState::Idle);
    assert_eq!(h.world.pulse(WheelSide::Left), params::NEUTRAL_NS);
    assert_eq!(h.world.pulse(WheelSide::Right), params::NEUTRAL_NS);
    assert!(!h.wheels.lock(WheelSide::Left).has_target);
    assert!(h.controller.recorder.is_empty());

    let dumped: Vec<_> = std::fs::read_dir(&log_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(
        dumped.iter().any(|name| name.starts_with("motor_log_VOICE_")),
        "no dump found in {:?}",
        dumped
    );
}

#[test]
fn test_stop_with_nothing_recorded_still_dumps() {
    let mut h = Harness::new();
    // Empty the buffer so this stop runs before any tick has recorded.
    h.controller.recorder.reset();
    let log_dir = h._log_dir.path().to_path_buf();

    h.command(Command::Stop);
    assert!(h.lines.iter().any(|l| l == "OK stopall (log dumped)"));

    // The reply promised a dump, so a file must exist even with zero
    // records: header line only.
    let dumped: Vec<_> = std::fs::read_dir(&log_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("motor_log_IDLE_")
        })
        .collect();
    assert_eq!(dumped.len(), 1, "expected exactly one dump file");

    let contents = std::fs::read_to_string(dumped[0].path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("time,mode,pwm_l,"));
}

#[test]
fn test_setpos_redirects_next_turn() {
    let mut h = Harness::new();
    h.command(Command::SetPos {
        x_ft: 5.0,
        y_ft: 5.0,
        heading_deg: 180.0,
    });
    assert!(h.lines.iter().any(|l| l == "OK setpos 5 5 180"));
    assert_eq!(h.pose_snapshot().heading_deg, 180.0);

    h.command(Command::Goto { x_ft: 5.0, y_ft: 10.0 });
    h.step();

    // Target bearing is 90; from heading 180 that is a -90 turn, never
    // +270: the left wheel runs backward.
    assert_eq!(h.controller.nav.state, NavState::Turning);
    let left = h.wheels.lock(WheelSide::Left);
    let right = h.wheels.lock(WheelSide::Right);
    assert!(left.target_counts < 0);
    assert_eq!(left.target_counts, -right.target_counts);
}

#[test]
fn test_status_cadence_and_format() {
    let mut h = Harness::new();
    for _ in 0..25 {
        h.step();
    }
    let status_count = h.lines.iter().filter(|l| l.starts_with("STATUS ")).count();
    // 26 ticks total (one seeding step) at one STATUS per 10 ticks
    assert!(status_count >= 2);

    let status = h
        .lines
        .iter()
        .find(|l| l.starts_with("STATUS "))
        .unwrap()
        .clone();
    let fields: Vec<&str> = status.split_whitespace().collect();
    assert_eq!(fields.len(), 5);
    fields[1].parse::<f64>().unwrap();
    fields[2].parse::<f64>().unwrap();
    fields[3].parse::<f64>().unwrap();
    let code: u8 = fields[4].parse().unwrap();
    assert!(code <= 3);
}

#[test]
fn test_speed_and_setpwm_replies() {
    let mut h = Harness::new();
    h.command(Command::Speed(0.5));
    assert!(h.lines.iter().any(|l| l == "OK speed 0.5"));
    assert_eq!(h.controller.nav.speed_multiplier, 0.5);

    h.command(Command::SetPwm { min: 10, max: 120 });
    assert!(h.lines.iter().any(|l| l == "OK setpwm 20 100"));

    h.command(Command::SetPwm { min: 90, max: 60 });
    assert!(h.lines.iter().any(|l| l == "OK setpwm 60 90"));
    assert_eq!(h.controller.nav.min_pwm, 60);
    assert_eq!(h.controller.nav.max_pwm, 90);
}

#[test]
fn test_quit_drops_running_flag() {
    let mut h = Harness::new();
    h.command(Command::Quit);
    assert!(h.lines.iter().any(|l| l == "OK quit"));
    assert!(!h.running.load(std::sync::atomic::Ordering::Relaxed));
}
