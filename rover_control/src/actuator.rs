//! Speed-to-pulse conversion at the ESC boundary.
//!
//! Navigation and the command channel think in signed speed percent;
//! the ESCs take pulse widths. The mapping is linear on each side of
//! neutral with no dead band, and non-immediate updates pass through a
//! slope limiter so manual speed changes cannot slam the drivetrain.
//! Every applied pulse is persisted on the wheel state because the
//! rotation tracker infers wheel direction from it.

use rover_core::error::RoverResult;
use rover_core::time::monotonic_sec;

use crate::drivers::motor::MotorDriver;
use crate::params::{
    FORWARD_MAX_NS, FORWARD_START_NS, NEUTRAL_NS, RAMP_NS_PER_SEC, REVERSE_MAX_NS,
    REVERSE_START_NS,
};
use crate::wheel::{WheelSide, WheelState};

/// Map signed speed percent onto an ESC pulse width.
pub fn speed_to_pulse_ns(speed_percent: i32) -> i64 {
    let speed = speed_percent.clamp(-100, 100) as i64;
    let pulse = if speed > 0 {
        FORWARD_START_NS + speed * (FORWARD_MAX_NS - FORWARD_START_NS) / 100
    } else if speed < 0 {
        REVERSE_START_NS - (-speed) * (REVERSE_START_NS - REVERSE_MAX_NS) / 100
    } else {
        NEUTRAL_NS
    };
    pulse.clamp(REVERSE_MAX_NS, FORWARD_MAX_NS)
}

/// Both ESC output channels.
pub struct Actuator {
    drivers: [MotorDriver; 2],
}

impl Actuator {
    pub fn new(left: MotorDriver, right: MotorDriver) -> Self {
        Self {
            drivers: [left, right],
        }
    }

    pub fn init(&mut self) -> RoverResult<()> {
        for driver in self.drivers.iter_mut() {
            driver.init()?;
        }
        Ok(())
    }

    /// Command a speed on one wheel. The caller must hold that wheel's
    /// lock and pass its state in.
    pub fn set_speed(
        &mut self,
        side: WheelSide,
        wheel: &mut WheelState,
        speed_percent: i32,
        immediate: bool,
    ) -> RoverResult<()> {
        self.set_speed_at(side, wheel, speed_percent, immediate, monotonic_sec())
    }

    /// `set_speed` with an explicit clock, for deterministic ramp tests.
    pub fn set_speed_at(
        &mut self,
        side: WheelSide,
        wheel: &mut WheelState,
        speed_percent: i32,
        immediate: bool,
        now_sec: f64,
    ) -> RoverResult<()> {
        let speed = speed_percent.clamp(-100, 100);
        let target = speed_to_pulse_ns(speed);

        let pulse = if immediate {
            target
        } else {
            let dt = (now_sec - wheel.motor.last_update_sec).max(0.0);
            let max_step = (RAMP_NS_PER_SEC * dt) as i64;
            let step = (target - wheel.motor.last_pulse_ns).clamp(-max_step, max_step);
            (wheel.motor.last_pulse_ns + step).clamp(REVERSE_MAX_NS, FORWARD_MAX_NS)
        };

        self.drivers[side.index()].set_pulse_ns(pulse)?;
        wheel.motor.last_pulse_ns = pulse;
        wheel.motor.last_update_sec = now_sec;
        wheel.motor.current_speed = speed;
        Ok(())
    }

    /// Put a raw pulse width on one wheel, clamped to the legal range.
    /// Used by the `pulse` command; bypasses the ramp limiter.
    pub fn apply_pulse(
        &mut self,
        side: WheelSide,
        wheel: &mut WheelState,
        pulse_ns: i64,
    ) -> RoverResult<i64> {
        let pulse = pulse_ns.clamp(REVERSE_MAX_NS, FORWARD_MAX_NS);
        self.drivers[side.index()].set_pulse_ns(pulse)?;
        wheel.motor.last_pulse_ns = pulse;
        wheel.motor.last_update_sec = monotonic_sec();
        // Back out the equivalent speed so telemetry stays meaningful.
        wheel.motor.current_speed =
            ((pulse - NEUTRAL_NS) * 100 / (FORWARD_MAX_NS - NEUTRAL_NS)) as i32;
        Ok(pulse)
    }

    /// Neutral both outputs and disable the channels.
    pub fn shutdown(&mut self) {
        for driver in self.drivers.iter_mut() {
            if let Err(e) = driver.shutdown() {
                tracing::warn!("PWM shutdown failed: {}", e);
            }
        }
    }
}
