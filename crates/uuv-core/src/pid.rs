use serde::{Deserialize, Serialize};

fn default_windup_guard() -> f64 {
    20.0
}

/// Gains and bounds of a single-axis PID.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_windup_guard")]
    pub windup_guard: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64, min: f64, max: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            min,
            max,
            windup_guard: 20.0,
        }
    }

    pub const fn with_windup_guard(mut self, windup_guard: f64) -> Self {
        self.windup_guard = windup_guard;
        self
    }

    pub fn is_valid(&self) -> bool {
        [self.kp, self.ki, self.kd, self.min, self.max, self.windup_guard]
            .iter()
            .all(|v| v.is_finite())
            && self.min <= self.max
            && self.windup_guard >= 0.0
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 1.0)
    }
}

// Unlike `f64::clamp` this never panics on inverted or NaN bounds.
fn bound(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Contributions of each term to the last output.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidTerms {
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

/// Single-axis PID with integral anti-windup and output clamping.
///
/// The proportional term is clamped to `[min, max]` before the integral and
/// derivative terms are added, and the sum is clamped again with the same
/// bounds.
#[derive(Debug, Clone)]
pub struct Pid {
    gains: PidGains,
    target: f64,
    integral: f64,
    previous_error: Option<f64>,
    terms: PidTerms,
    output: f64,
}

impl Pid {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            target: 0.0,
            integral: 0.0,
            previous_error: None,
            terms: PidTerms::default(),
            output: 0.0,
        }
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn terms(&self) -> PidTerms {
        self.terms
    }

    pub fn update(&mut self, feedback: f64, dt: f64) -> f64 {
        let g = &self.gains;
        let error = self.target - feedback;

        self.integral = bound(self.integral + error * dt, -g.windup_guard, g.windup_guard);

        let derivative = match self.previous_error {
            Some(previous) if dt > 0.0 => (error - previous) / dt,
            _ => 0.0,
        };
        self.previous_error = Some(error);

        let p = bound(g.kp * error, g.min, g.max);
        let i = g.ki * self.integral;
        let d = g.kd * derivative;

        self.terms = PidTerms { p, i, d };
        self.output = bound(p + i + d, g.min, g.max);
        self.output
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = None;
        self.terms = PidTerms::default();
        self.output = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn proportional_only() {
        let mut pid = Pid::new(PidGains::new(2.0, 0.0, 0.0, -10.0, 10.0));
        pid.set_target(1.5);
        assert_relative_eq!(pid.update(0.5, 0.1), 2.0);
    }

    #[test]
    fn first_update_has_no_derivative() {
        let mut pid = Pid::new(PidGains::new(0.0, 0.0, 5.0, -100.0, 100.0));
        pid.set_target(1.0);
        assert_eq!(pid.update(0.0, 0.1), 0.0);
        // Error unchanged, derivative still zero.
        assert_eq!(pid.update(0.0, 0.1), 0.0);
        // Error drops from 1.0 to 0.5 over 0.1s.
        assert_relative_eq!(pid.update(0.5, 0.1), -25.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_dt_disables_derivative() {
        let mut pid = Pid::new(PidGains::new(0.0, 0.0, 5.0, -100.0, 100.0));
        pid.update(0.0, 0.1);
        pid.set_target(3.0);
        assert_eq!(pid.update(0.0, 0.0), 0.0);
    }

    #[test]
    fn integral_is_bounded_by_windup_guard() {
        let mut pid = Pid::new(PidGains::new(0.0, 1.0, 0.0, -100.0, 100.0).with_windup_guard(2.0));
        pid.set_target(10.0);
        for _ in 0..100 {
            pid.update(0.0, 0.1);
        }
        assert_relative_eq!(pid.output(), 2.0);
        assert_relative_eq!(pid.terms().i, 2.0);
    }

    #[test]
    fn proportional_term_clamped_before_sum() {
        // P alone saturates at max; the final clamp holds the sum there.
        let mut pid = Pid::new(PidGains::new(100.0, 1.0, 0.0, -3.0, 3.0));
        pid.set_target(1.0);
        pid.update(0.0, 1.0);
        assert_eq!(pid.terms().p, 3.0);
        assert_eq!(pid.output(), 3.0);

        // Negative P saturates at min even though the integral is positive.
        pid.set_target(-1.0);
        pid.update(0.0, 0.0);
        assert_eq!(pid.terms().p, -3.0);
        assert_relative_eq!(pid.output(), -2.0);
    }

    #[test]
    fn reset_clears_state() {
        let mut pid = Pid::new(PidGains::new(1.0, 1.0, 1.0, -10.0, 10.0));
        pid.set_target(1.0);
        pid.update(0.0, 0.1);
        pid.reset();
        assert_eq!(pid.output(), 0.0);
        assert_eq!(pid.terms(), PidTerms::default());
        // Target is kept, derivative starts fresh.
        assert_eq!(pid.target(), 1.0);
        assert_relative_eq!(pid.update(0.0, 0.1), 1.1);
    }

    #[test]
    fn default_gains_are_valid() {
        assert!(PidGains::default().is_valid());
        assert!(!PidGains::new(f64::NAN, 0.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!PidGains::new(1.0, 0.0, 0.0, 1.0, 0.0).is_valid());
    }
}
