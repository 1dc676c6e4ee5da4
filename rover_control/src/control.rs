//! The 200 Hz control loop.
//!
//! The control thread is the single writer of navigation state and the
//! only context that commands the motors in normal operation. Commands
//! arrive over a channel from the input thread and are applied between
//! navigation ticks, so there is no moment where two writers race on a
//! target. Replies and STATUS lines are returned as strings and printed
//! at the loop level; stdout is the operator protocol, nothing else
//! writes to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::Receiver;
use parking_lot::Mutex;

use rover_core::time::{monotonic_sec, Ticker};

use crate::actuator::Actuator;
use crate::command::Command;
use crate::nav::{NavController, NavEvent, NavState};
use crate::odometry::{normalize_deg, Pose};
use crate::params::{CONTROL_PERIOD_US, SETPWM_CEIL, SETPWM_FLOOR, STATUS_EVERY_N_TICKS};
use crate::telemetry::{FlightRecorder, LogRecord, OperatingMode};
use crate::wheel::{WheelPair, WheelSide};

/// Write one protocol line to stdout. The operator disappearing must not
/// take the control loop down with it.
fn emit(line: &str) {
    use std::io::Write;
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{}", line);
}

/// Everything the control thread owns.
pub struct Controller {
    pub nav: NavController,
    wheels: WheelPair,
    pose: Arc<Mutex<Pose>>,
    actuator: Actuator,
    pub recorder: FlightRecorder,
    mode: OperatingMode,
    latest_gyro: Arc<Mutex<f64>>,
    tick_count: u64,
}

impl Controller {
    pub fn new(
        wheels: WheelPair,
        pose: Arc<Mutex<Pose>>,
        actuator: Actuator,
        recorder: FlightRecorder,
        latest_gyro: Arc<Mutex<f64>>,
    ) -> Self {
        Self {
            nav: NavController::new(),
            wheels,
            pose,
            actuator,
            recorder,
            mode: OperatingMode::Idle,
            latest_gyro,
            tick_count: 0,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    fn status_line(&self, pose: &Pose) -> String {
        format!(
            "STATUS {:.2} {:.2} {:.1} {}",
            pose.x_ft,
            pose.y_ft,
            pose.heading_deg,
            self.nav.state.wire_code()
        )
    }

    /// Apply one operator command. Returns the lines to print.
    pub fn apply_command(&mut self, cmd: Command, running: &AtomicBool) -> Vec<String> {
        match cmd {
            Command::Goto { x_ft, y_ft } => {
                self.nav.set_target(x_ft, y_ft);
                self.mode = OperatingMode::Voice;
                let pose = self.pose.lock().clone();
                vec![
                    format!("OK goto {} {}", x_ft, y_ft),
                    self.status_line(&pose),
                ]
            }
            Command::Speed(s) => {
                self.nav.speed_multiplier = s.clamp(0.0, 1.0);
                vec![format!("OK speed {}", self.nav.speed_multiplier)]
            }
            Command::SetPwm { min, max } => {
                let mut min = min.clamp(SETPWM_FLOOR, SETPWM_CEIL);
                let mut max = max.clamp(SETPWM_FLOOR, SETPWM_CEIL);
                if min > max {
                    std::mem::swap(&mut min, &mut max);
                }
                self.nav.min_pwm = min;
                self.nav.max_pwm = max;
                vec![format!("OK setpwm {} {}", min, max)]
            }
            Command::SetPos {
                x_ft,
                y_ft,
                heading_deg,
            } => {
                // Both wheel locks are held while the pose and its
                // baselines change, so the feedback thread can never see
                // a half-updated baseline and synthesize a huge delta.
                let (left, right) = self.wheels.lock_both();
                {
                    let mut pose = self.pose.lock();
                    pose.x_ft = x_ft;
                    pose.y_ft = y_ft;
                    pose.heading_deg = normalize_deg(heading_deg);
                    pose.last_left_total = left.tracker.total_counts;
                    pose.last_right_total = right.tracker.total_counts;
                }
                drop(left);
                drop(right);
                let pose = self.pose.lock().clone();
                vec![
                    format!("OK setpos {} {} {}", x_ft, y_ft, heading_deg),
                    self.status_line(&pose),
                ]
            }
            Command::Pulse { left_ns, right_ns } => {
                self.nav.state = NavState::Idle;
                let mut applied = [0i64; 2];
                for (slot, (side, requested)) in applied.iter_mut().zip([
                    (WheelSide::Left, left_ns),
                    (WheelSide::Right, right_ns),
                ]) {
                    let mut wheel = self.wheels.lock(side);
                    wheel.clear_segment();
                    match self.actuator.apply_pulse(side, &mut wheel, requested) {
                        Ok(pulse) => *slot = pulse,
                        Err(e) => tracing::warn!("{} pulse failed: {}", side.label(), e),
                    }
                }
                self.mode = OperatingMode::Joystick;
                vec![format!("OK pulse L:{} R:{}", applied[0], applied[1])]
            }
            Command::Stop => {
                self.nav.state = NavState::Idle;
                for side in WheelSide::BOTH {
                    let mut wheel = self.wheels.lock(side);
                    wheel.clear_segment();
                    if let Err(e) = self.actuator.set_speed(side, &mut wheel, 0, true) {
                        tracing::warn!("{} stop failed: {}", side.label(), e);
                    }
                }
                if let Err(e) = self.recorder.dump(self.mode) {
                    tracing::warn!("Telemetry dump failed: {}", e);
                }
                self.recorder.reset();
                self.mode = OperatingMode::Idle;
                let pose = self.pose.lock().clone();
                vec![
                    "OK stopall (log dumped)".to_string(),
                    self.status_line(&pose),
                ]
            }
            Command::Quit => {
                running.store(false, Ordering::Relaxed);
                vec!["OK quit".to_string()]
            }
        }
    }

    /// One control tick. Returns the lines to print.
    pub fn tick(&mut self, now_sec: f64) -> Vec<String> {
        let pose = self.pose.lock().clone();
        let events = self
            .nav
            .tick_at(&pose, &self.wheels, &mut self.actuator, now_sec);

        let mut lines = Vec::new();
        if events.contains(&NavEvent::Arrived) {
            lines.push("ARRIVED".to_string());
        }
        if events.contains(&NavEvent::StateChanged) {
            lines.push(self.status_line(&pose));
        }

        self.tick_count += 1;
        if self.tick_count % STATUS_EVERY_N_TICKS == 0 {
            lines.push(self.status_line(&pose));
        }

        self.record(now_sec, &pose);
        lines
    }

    fn record(&mut self, now_sec: f64, pose: &Pose) {
        let (left, right) = self.wheels.lock_both();
        let record = LogRecord {
            time_sec: now_sec,
            mode: self.mode,
            pwm_left_ns: left.motor.last_pulse_ns,
            raw_left: left.tracker.current_raw_angle,
            pwm_right_ns: right.motor.last_pulse_ns,
            raw_right: right.tracker.current_raw_angle,
            target_left: left.target_counts,
            actual_left: left.relative_counts(),
            target_right: right.target_counts,
            actual_right: right.relative_counts(),
            gyro_z_dps: *self.latest_gyro.lock(),
            x_ft: pose.x_ft,
            y_ft: pose.y_ft,
            heading_deg: pose.heading_deg,
            nav_state: self.nav.state,
        };
        drop(left);
        drop(right);
        self.recorder.append(record);
    }

    /// The 200 Hz loop. Runs until the flag drops, then performs the
    /// shutdown sequence.
    pub fn run(&mut self, commands: Receiver<Command>, running: Arc<AtomicBool>) {
        let mut ticker = Ticker::new(Duration::from_micros(CONTROL_PERIOD_US));
        while running.load(Ordering::Relaxed) {
            for cmd in commands.try_iter() {
                for line in self.apply_command(cmd, &running) {
                    emit(&line);
                }
            }
            for line in self.tick(monotonic_sec()) {
                emit(&line);
            }
            ticker.wait();
        }
        self.shutdown();
    }

    /// Dump telemetry and leave the drivetrain safe.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.recorder.dump(self.mode) {
            tracing::warn!("Telemetry dump failed: {}", e);
        }
        for side in WheelSide::BOTH {
            let mut wheel = self.wheels.lock(side);
            wheel.clear_segment();
            if let Err(e) = self.actuator.set_speed(side, &mut wheel, 0, true) {
                tracing::warn!("{} neutral failed: {}", side.label(), e);
            }
        }
        self.actuator.shutdown();
    }
}
