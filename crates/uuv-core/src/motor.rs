use crate::hal::{BodyId, Frame, PhysicsBackend};
use crate::Vec3;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Speed range, ramp and thrust curve of a thruster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorLimits {
    pub max_rpm: f64,
    pub min_rpm: f64,
    /// Largest change of the actual speed per second [rpm/s].
    pub ramp_rate: f64,
    /// Thrust at `max_rpm` [N].
    pub max_forward_thrust: f64,
    /// Thrust magnitude at `min_rpm` [N].
    pub max_reverse_thrust: f64,
}

impl MotorLimits {
    /// Blue Robotics T200 at 16 V.
    pub const T200: MotorLimits = MotorLimits {
        max_rpm: 3900.0,
        min_rpm: -3700.0,
        ramp_rate: 20_000.0,
        max_forward_thrust: 51.5,
        max_reverse_thrust: 40.2,
    };

    pub fn is_valid(&self) -> bool {
        [
            self.max_rpm,
            self.min_rpm,
            self.ramp_rate,
            self.max_forward_thrust,
            self.max_reverse_thrust,
        ]
        .iter()
        .all(|v| v.is_finite())
            && self.min_rpm < 0.0
            && self.max_rpm > 0.0
            && self.ramp_rate > 0.0
            && self.max_forward_thrust > 0.0
            && self.max_reverse_thrust > 0.0
    }

    fn forward_coefficient(&self) -> f64 {
        self.max_forward_thrust / self.max_rpm
    }

    fn reverse_coefficient(&self) -> f64 {
        self.max_reverse_thrust / -self.min_rpm
    }

    pub fn thrust_at(&self, rpm: f64) -> f64 {
        if rpm >= 0.0 {
            rpm * self.forward_coefficient()
        } else {
            rpm * self.reverse_coefficient()
        }
    }

    pub fn rpm_for(&self, thrust: f64) -> f64 {
        if thrust >= 0.0 {
            thrust / self.forward_coefficient()
        } else {
            thrust / self.reverse_coefficient()
        }
    }

    fn clamp_rpm(&self, rpm: f64) -> f64 {
        rpm.max(self.min_rpm).min(self.max_rpm)
    }
}

impl Default for MotorLimits {
    fn default() -> Self {
        Self::T200
    }
}

/// A thruster fixed to the hull, pushing along `direction`.
#[derive(Debug, Clone)]
pub struct Motor {
    name: String,
    /// Mount point in the body frame.
    position: Vec3,
    /// Unit thrust direction in the body frame.
    direction: Vec3,
    limits: MotorLimits,
    rpm: f64,
    desired_rpm: f64,
}

impl Motor {
    /// `direction` is normalized. A zero or non-finite direction leaves the
    /// motor without a thrust axis: it still ramps but pushes nothing.
    pub fn new(name: impl Into<String>, position: Vec3, direction: Vec3, limits: MotorLimits) -> Self {
        let name = name.into();
        let direction = match direction.try_normalize(f64::EPSILON) {
            Some(unit) if unit.iter().all(|v| v.is_finite()) => unit,
            _ => {
                warn!("motor {name}: degenerate thrust direction {direction:?}, thrust disabled");
                Vec3::zeros()
            }
        };
        Self {
            name,
            position,
            direction,
            limits,
            rpm: 0.0,
            desired_rpm: 0.0,
        }
    }

    pub fn t200(name: impl Into<String>, position: Vec3, direction: Vec3) -> Self {
        Self::new(name, position, direction, MotorLimits::T200)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn limits(&self) -> &MotorLimits {
        &self.limits
    }

    pub fn rpm(&self) -> f64 {
        self.rpm
    }

    pub fn desired_rpm(&self) -> f64 {
        self.desired_rpm
    }

    pub fn thrust(&self) -> f64 {
        self.limits.thrust_at(self.rpm)
    }

    /// Non-finite commands are ignored and the previous target kept.
    pub fn set_desired_rpm(&mut self, rpm: f64) {
        if !rpm.is_finite() {
            debug!("motor {}: ignoring non-finite rpm command {}", self.name, rpm);
            return;
        }
        self.desired_rpm = self.limits.clamp_rpm(rpm);
    }

    pub fn set_desired_thrust(&mut self, thrust: f64) {
        self.set_desired_rpm(self.limits.rpm_for(thrust));
    }

    /// Ramp the actual speed toward the target over `dt_us` microseconds.
    pub fn update(&mut self, dt_us: u64) {
        let max_step = self.limits.ramp_rate * dt_us as f64 / 1_000_000.0;
        let delta = (self.desired_rpm - self.rpm).max(-max_step).min(max_step);
        self.rpm += delta;
    }

    pub fn apply_thrust(&self, physics: &mut dyn PhysicsBackend, body: BodyId) {
        let force = self.direction * self.thrust();
        physics.apply_force(body, force, self.position, Frame::Local);
    }
}
