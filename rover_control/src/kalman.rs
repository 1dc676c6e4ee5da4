//! One-dimensional Kalman filter over heading.
//!
//! Carried alongside the gyro-integrated heading estimate. The current
//! odometry revision treats pure gyro integration (with motion gating) as
//! authoritative, but the filter state is kept tracking it so a fused
//! estimate can be switched back in without a discontinuity.

/// Heading filter state: angle and gyro bias, with a 2x2 error covariance.
#[derive(Debug, Clone)]
pub struct HeadingFilter {
    /// Filtered angle, degrees
    pub angle: f64,
    /// Estimated gyro bias, degrees per second
    pub bias: f64,
    /// Error covariance
    p: [[f64; 2]; 2],

    q_angle: f64,
    q_bias: f64,
    r_measure: f64,
}

impl HeadingFilter {
    pub fn new() -> Self {
        Self {
            angle: 0.0,
            bias: 0.0,
            p: [[0.0; 2]; 2],
            q_angle: 0.001,
            q_bias: 0.003,
            r_measure: 0.03,
        }
    }

    /// One predict/correct cycle. `new_angle` in degrees, `new_rate` in
    /// degrees per second, `dt` in seconds. Returns the filtered angle.
    pub fn update(&mut self, new_angle: f64, new_rate: f64, dt: f64) -> f64 {
        // Predict: project the state ahead on the gyro rate.
        let rate = new_rate - self.bias;
        self.angle += dt * rate;

        self.p[0][0] += dt * (dt * self.p[1][1] - self.p[0][1] - self.p[1][0] + self.q_angle);
        self.p[0][1] -= dt * self.p[1][1];
        self.p[1][0] -= dt * self.p[1][1];
        self.p[1][1] += self.q_bias * dt;

        // Correct: innovation against the measured angle.
        let y = new_angle - self.angle;
        let s = self.p[0][0] + self.r_measure;
        let k = [self.p[0][0] / s, self.p[1][0] / s];

        self.angle += k[0] * y;
        self.bias += k[1] * y;

        let p00 = self.p[0][0];
        let p01 = self.p[0][1];
        self.p[0][0] -= k[0] * p00;
        self.p[0][1] -= k[0] * p01;
        self.p[1][0] -= k[1] * p00;
        self.p[1][1] -= k[1] * p01;

        self.angle
    }

    /// Pin the filtered angle to the authoritative heading. Bias and
    /// covariance keep evolving; only the angle is re-anchored so that
    /// re-enabling fusion cannot introduce a heading jump.
    pub fn anchor(&mut self, heading_deg: f64) {
        self.angle = heading_deg;
    }
}

impl Default for HeadingFilter {
    fn default() -> Self {
        Self::new()
    }
}
