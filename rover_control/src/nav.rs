//! Goto-point navigation.
//!
//! A target point turns into alternating pivot-turn and straight-drive
//! segments: GOTO plans against the current pose, TURNING/DRIVING run the
//! active segment on both wheels, and completion falls back to GOTO for
//! re-evaluation until the target is inside the arrival tolerance.
//!
//! Segments execute per-wheel as bang-bang on count error, with a
//! slowdown-free stop window, and a stall detector that steps the output
//! up when a wheel is commanded but not moving (carpet edges, thresholds,
//! low-battery sag).

use std::f64::consts::PI;

use rover_core::time::monotonic_sec;

use crate::actuator::Actuator;
use crate::odometry::{normalize_deg, wrap_pm_180, Pose};
use crate::params::{
    COUNTS_PER_FOOT, COUNTS_PER_INCH, DEADBAND_THRESHOLD, DEFAULT_MAX_PWM, DEFAULT_MIN_PWM,
    DEFAULT_SPEED_MULTIPLIER, GOTO_TOLERANCE_FT, HEADING_TOLERANCE_DEG, STALL_BOOST_STEP,
    STALL_CHECK_PERIOD_SEC, STALL_MIN_DELTA, STALL_MIN_ERROR, STOP_THRESHOLD, WHEELBASE_INCHES,
};
use crate::wheel::{WheelPair, WheelSide};

/// Navigation state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Idle,
    Goto,
    Turning,
    Driving,
}

impl NavState {
    /// Numeric code used on the STATUS line.
    pub fn wire_code(self) -> u8 {
        match self {
            NavState::Idle => 0,
            NavState::Turning => 1,
            NavState::Driving => 2,
            NavState::Goto => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NavState::Idle => "IDLE",
            NavState::Goto => "GOTO",
            NavState::Turning => "TURNING",
            NavState::Driving => "DRIVING",
        }
    }
}

/// Things a tick wants the caller to tell the operator about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    /// The state machine changed state; emit a STATUS line.
    StateChanged,
    /// The target point was reached.
    Arrived,
}

/// The navigation controller. Owned and ticked by the control thread,
/// which is its only writer.
pub struct NavController {
    pub state: NavState,
    pub target_x_ft: f64,
    pub target_y_ft: f64,
    /// Heading the current plan wants, degrees
    pub target_heading_deg: f64,
    /// Distance the current plan wants, feet
    pub target_distance_ft: f64,
    /// Scales the output ceiling, 0..1
    pub speed_multiplier: f64,
    /// Output floor/ceiling, percent
    pub min_pwm: i32,
    pub max_pwm: i32,
}

impl NavController {
    pub fn new() -> Self {
        Self {
            state: NavState::Idle,
            target_x_ft: 0.0,
            target_y_ft: 0.0,
            target_heading_deg: 0.0,
            target_distance_ft: 0.0,
            speed_multiplier: DEFAULT_SPEED_MULTIPLIER,
            min_pwm: DEFAULT_MIN_PWM,
            max_pwm: DEFAULT_MAX_PWM,
        }
    }

    /// Aim at a new target point and enter GOTO.
    pub fn set_target(&mut self, x_ft: f64, y_ft: f64) {
        self.target_x_ft = x_ft;
        self.target_y_ft = y_ft;
        self.state = NavState::Goto;
    }

    /// Bang-bang output magnitude for the current tick. The floor wins
    /// over small multipliers: a wheel that gets commanded at all gets
    /// enough output to actually move.
    pub fn max_output(&self) -> i32 {
        let scaled = (self.max_pwm as f64 * self.speed_multiplier).floor() as i32;
        scaled.clamp(self.min_pwm, self.max_pwm)
    }

    /// One control tick against a pose snapshot.
    pub fn tick(&mut self, pose: &Pose, wheels: &WheelPair, actuator: &mut Actuator) -> Vec<NavEvent> {
        self.tick_at(pose, wheels, actuator, monotonic_sec())
    }

    /// `tick` with an explicit clock, for deterministic tests.
    pub fn tick_at(
        &mut self,
        pose: &Pose,
        wheels: &WheelPair,
        actuator: &mut Actuator,
        now_sec: f64,
    ) -> Vec<NavEvent> {
        match self.state {
            NavState::Idle => Vec::new(),
            NavState::Goto => self.plan(pose, wheels, now_sec),
            NavState::Turning | NavState::Driving => {
                let left_done = self.tick_wheel(WheelSide::Left, wheels, actuator, now_sec);
                let right_done = self.tick_wheel(WheelSide::Right, wheels, actuator, now_sec);
                if left_done && right_done {
                    self.state = NavState::Goto;
                    vec![NavEvent::StateChanged]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// GOTO planning: arrive, turn, or drive.
    fn plan(&mut self, pose: &Pose, wheels: &WheelPair, now_sec: f64) -> Vec<NavEvent> {
        let dx = self.target_x_ft - pose.x_ft;
        let dy = self.target_y_ft - pose.y_ft;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance < GOTO_TOLERANCE_FT {
            self.state = NavState::Idle;
            return vec![NavEvent::Arrived, NavEvent::StateChanged];
        }

        let target_heading = normalize_deg(dy.atan2(dx).to_degrees());
        let heading_diff = wrap_pm_180(target_heading - pose.heading_deg);
        self.target_heading_deg = target_heading;
        self.target_distance_ft = distance;

        if heading_diff.abs() > HEADING_TOLERANCE_DEG {
            self.program_turn(heading_diff, wheels, now_sec);
            self.state = NavState::Turning;
        } else {
            self.program_drive(distance, wheels, now_sec);
            self.state = NavState::Driving;
        }
        vec![NavEvent::StateChanged]
    }

    /// Differential pivot: wheels travel equal arcs in opposite
    /// directions. Positive heading change drives the left wheel forward.
    fn program_turn(&mut self, heading_diff_deg: f64, wheels: &WheelPair, now_sec: f64) {
        let arc_counts =
            (heading_diff_deg.abs() / 360.0 * PI * WHEELBASE_INCHES * COUNTS_PER_INCH).round()
                as i32;
        let signed = if heading_diff_deg >= 0.0 {
            arc_counts
        } else {
            -arc_counts
        };

        let (mut left, mut right) = wheels.lock_both();
        left.start_segment(signed, now_sec);
        right.start_segment(-signed, now_sec);
        tracing::debug!(
            "turn segment: {:.1} deg -> {} counts",
            heading_diff_deg,
            signed
        );
    }

    /// Straight segment: both wheels travel the same distance forward.
    fn program_drive(&mut self, distance_ft: f64, wheels: &WheelPair, now_sec: f64) {
        let counts = (distance_ft * COUNTS_PER_FOOT).round() as i32;
        let (mut left, mut right) = wheels.lock_both();
        left.start_segment(counts, now_sec);
        right.start_segment(counts, now_sec);
        tracing::debug!("drive segment: {:.2} ft -> {} counts", distance_ft, counts);
    }

    /// Run one wheel's segment. Returns true when the wheel is done
    /// (stopped inside the tolerance window, or had no segment at all).
    fn tick_wheel(
        &self,
        side: WheelSide,
        wheels: &WheelPair,
        actuator: &mut Actuator,
        now_sec: f64,
    ) -> bool {
        let mut wheel = wheels.lock(side);
        if !wheel.has_target {
            return true;
        }

        let current = wheel.relative_counts();
        let error = wheel.target_counts - current;

        if error.abs() < STOP_THRESHOLD {
            if let Err(e) = actuator.set_speed_at(side, &mut wheel, 0, true, now_sec) {
                tracing::warn!("{} wheel stop failed: {}", side.label(), e);
            }
            wheel.has_target = false;
            wheel.stall_count = 0;
            return true;
        }

        // Inside the deadband with no stall history: park rather than
        // reversing across the target.
        if error.abs() < DEADBAND_THRESHOLD && wheel.stall_count == 0 {
            if let Err(e) = actuator.set_speed_at(side, &mut wheel, 0, true, now_sec) {
                tracing::warn!("{} wheel stop failed: {}", side.label(), e);
            }
            wheel.has_target = false;
            return true;
        }

        if now_sec - wheel.stall_check_sec >= STALL_CHECK_PERIOD_SEC {
            let moved = (current - wheel.stall_last_position).abs();
            if moved < STALL_MIN_DELTA && error.abs() > STALL_MIN_ERROR {
                wheel.stall_count += 1;
                tracing::debug!(
                    "{} wheel stalled: moved {} counts, error {}, stall_count {}",
                    side.label(),
                    moved,
                    error,
                    wheel.stall_count
                );
            } else {
                wheel.stall_count = 0;
            }
            wheel.stall_last_position = current;
            wheel.stall_check_sec = now_sec;
        }

        let mut pwm = error.signum() * self.max_output();
        let boost = wheel.stall_count as i32 * STALL_BOOST_STEP;
        pwm += pwm.signum() * boost;
        pwm = pwm.clamp(-100, 100);

        if let Err(e) = actuator.set_speed_at(side, &mut wheel, pwm, true, now_sec) {
            tracing::warn!("{} wheel command failed: {}", side.label(), e);
        }
        false
    }
}

impl Default for NavController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::motor::{MotorDriver, SimulationMotorDriver};
    use crate::drivers::sim::SimWorld;
    use crate::params;

    fn fixture() -> (NavController, WheelPair, Actuator, SimWorld) {
        let world = SimWorld::new();
        let mut actuator = Actuator::new(
            MotorDriver::Simulation(SimulationMotorDriver::new(world.clone(), WheelSide::Left)),
            MotorDriver::Simulation(SimulationMotorDriver::new(world.clone(), WheelSide::Right)),
        );
        actuator.init().unwrap();
        let wheels = WheelPair::new();
        // Seed the trackers so segments have a defined start.
        wheels.lock(WheelSide::Left).tracker.update(0, 0);
        wheels.lock(WheelSide::Right).tracker.update(0, 0);
        (NavController::new(), wheels, actuator, world)
    }

    /// Expected pivot counts for 90 degrees on this chassis.
    const NINETY_DEG_COUNTS: i32 = 3092;

    #[test]
    fn test_turn_before_drive_for_perpendicular_target() {
        let (mut nav, wheels, mut actuator, _world) = fixture();
        let pose = Pose::new();
        nav.set_target(0.0, 10.0);

        let events = nav.tick_at(&pose, &wheels, &mut actuator, 0.0);
        assert_eq!(nav.state, NavState::Turning);
        assert!(events.contains(&NavEvent::StateChanged));

        let left = wheels.lock(WheelSide::Left);
        let right = wheels.lock(WheelSide::Right);
        assert_eq!(left.target_counts, NINETY_DEG_COUNTS);
        assert_eq!(right.target_counts, -NINETY_DEG_COUNTS);
        assert!(left.has_target && right.has_target);
    }

    #[test]
    fn test_aligned_target_goes_straight_to_driving() {
        let (mut nav, wheels, mut actuator, _world) = fixture();
        let mut pose = Pose::new();
        pose.y_ft = 15.0;
        pose.heading_deg = 90.0;
        nav.set_target(0.0, 20.0);

        nav.tick_at(&pose, &wheels, &mut actuator, 0.0);
        assert_eq!(nav.state, NavState::Driving);

        let expected = (5.0 * params::COUNTS_PER_FOOT).round() as i32;
        assert_eq!(wheels.lock(WheelSide::Left).target_counts, expected);
        assert_eq!(wheels.lock(WheelSide::Right).target_counts, expected);
    }

    #[test]
    fn test_diagonal_target_heading() {
        let (mut nav, wheels, mut actuator, _world) = fixture();
        let pose = Pose::new();
        nav.set_target(3.0, 3.0);

        nav.tick_at(&pose, &wheels, &mut actuator, 0.0);
        assert_eq!(nav.state, NavState::Turning);
        assert!((nav.target_heading_deg - 45.0).abs() < 1e-9);
        assert!((nav.target_distance_ft - 18.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_reflex_turns_take_the_short_way() {
        // Facing 180, target due "east" in pose frame (heading 90):
        // must turn -90, not +270.
        let (mut nav, wheels, mut actuator, _world) = fixture();
        let mut pose = Pose::new();
        pose.x_ft = 5.0;
        pose.y_ft = 5.0;
        pose.heading_deg = 180.0;
        nav.set_target(5.0, 10.0);

        nav.tick_at(&pose, &wheels, &mut actuator, 0.0);
        assert_eq!(nav.state, NavState::Turning);
        assert_eq!(
            wheels.lock(WheelSide::Left).target_counts,
            -NINETY_DEG_COUNTS
        );
        assert_eq!(
            wheels.lock(WheelSide::Right).target_counts,
            NINETY_DEG_COUNTS
        );
    }

    #[test]
    fn test_arrival_inside_tolerance() {
        let (mut nav, wheels, mut actuator, _world) = fixture();
        let mut pose = Pose::new();
        pose.x_ft = 9.5;
        nav.set_target(10.0, 0.0);

        let events = nav.tick_at(&pose, &wheels, &mut actuator, 0.0);
        assert_eq!(nav.state, NavState::Idle);
        assert!(events.contains(&NavEvent::Arrived));
        assert!(!wheels.lock(WheelSide::Left).has_target);
    }

    #[test]
    fn test_max_output_floor_overrides_small_multiplier() {
        let mut nav = NavController::new();
        // floor(80 * 0.3) = 24, lifted to the 45 floor
        assert_eq!(nav.max_output(), 45);
        nav.speed_multiplier = 1.0;
        assert_eq!(nav.max_output(), 80);
        nav.speed_multiplier = 0.7;
        assert_eq!(nav.max_output(), 56);
    }

    #[test]
    fn test_wheel_stops_inside_threshold() {
        let (mut nav, wheels, mut actuator, world) = fixture();
        let pose = Pose::new();
        nav.set_target(10.0, 0.0);
        nav.tick_at(&pose, &wheels, &mut actuator, 0.0);
        assert_eq!(nav.state, NavState::Driving);

        // Teleport both wheels to within the stop window.
        for side in WheelSide::BOTH {
            let mut w = wheels.lock(side);
            let target = w.target_counts;
            w.tracker.total_counts = w.move_start_counts + target - 10;
        }
        nav.tick_at(&pose, &wheels, &mut actuator, 0.005);

        for side in WheelSide::BOTH {
            let w = wheels.lock(side);
            assert!(!w.has_target);
            assert_eq!(w.motor.last_pulse_ns, params::NEUTRAL_NS);
        }
        assert_eq!(world.pulse(WheelSide::Left), params::NEUTRAL_NS);
        // Both wheels done collapses back to GOTO for re-evaluation.
        assert_eq!(nav.state, NavState::Goto);
    }

    #[test]
    fn test_stall_boosts_output_by_ten_per_check() {
        let (mut nav, wheels, mut actuator, _world) = fixture();
        let pose = Pose::new();
        nav.set_target(10.0, 0.0);
        nav.tick_at(&pose, &wheels, &mut actuator, 0.0);

        // Freeze the encoders: every 0.5 s check should add one stall.
        let mut now = 0.0;
        let base = nav.max_output();
        for expected_stalls in 1..=6u32 {
            now += 0.5;
            nav.tick_at(&pose, &wheels, &mut actuator, now);
            let w = wheels.lock(WheelSide::Left);
            assert_eq!(w.stall_count, expected_stalls);
            let expected_speed =
                (base + expected_stalls as i32 * params::STALL_BOOST_STEP).min(100);
            assert_eq!(w.motor.current_speed, expected_speed);
        }
    }

    #[test]
    fn test_wire_codes() {
        assert_eq!(NavState::Idle.wire_code(), 0);
        assert_eq!(NavState::Turning.wire_code(), 1);
        assert_eq!(NavState::Driving.wire_code(), 2);
        assert_eq!(NavState::Goto.wire_code(), 3);
    }
}
