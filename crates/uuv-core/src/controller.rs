//! Cascaded motion controller.
//!
//! Four banks of three PIDs, all working in the body frame:
//!
//! ```text
//! position ──► desired velocity ──► velocity PIDs ──► translation thrust ─┐
//!                                                                         ├─► mixer ─► motor rpm
//! orientation ──► desired rates ──► rate PIDs ──► differential thrust ────┘
//! ```
//!
//! The mixer turns the six stage outputs into one command per motor through a
//! per-motor sign table.

use crate::error::ConfigError;
use crate::hal::Pose;
use crate::pid::{Pid, PidGains};
use crate::transform::{roll_of, rotate_to_local, rotate_to_world};
use crate::{Quat, Vec3};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationAxis {
    X,
    Y,
    Z,
}

impl TranslationAxis {
    pub const ALL: [TranslationAxis; 3] = [TranslationAxis::X, TranslationAxis::Y, TranslationAxis::Z];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationAxis {
    Roll,
    Pitch,
    Yaw,
}

impl RotationAxis {
    pub const ALL: [RotationAxis; 3] = [RotationAxis::Roll, RotationAxis::Pitch, RotationAxis::Yaw];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Measured state of the vehicle, world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
            velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
        }
    }
}

/// Gains of every stage. Translation banks are indexed X, Y, Z; rotation
/// banks roll, pitch, yaw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerGains {
    pub position: [PidGains; 3],
    pub velocity: [PidGains; 3],
    pub orientation: [PidGains; 3],
    pub rate: [PidGains; 3],
}

impl ControllerGains {
    fn validate(&self) -> Result<(), ConfigError> {
        let stages = [
            ("position", &self.position),
            ("velocity", &self.velocity),
            ("orientation", &self.orientation),
            ("rate", &self.rate),
        ];
        for (stage, axes) in stages {
            if let Some(axis) = axes.iter().position(|g| !g.is_valid()) {
                return Err(ConfigError::InvalidGains { stage, axis });
            }
        }
        Ok(())
    }
}

impl Default for ControllerGains {
    fn default() -> Self {
        let position = PidGains::new(2.0, 0.0, 0.5, -3.0, 3.0);
        let velocity = PidGains::new(1000.0, 50.0, 10.0, -3700.0, 3900.0);
        let rate = PidGains::new(500.0, 100.0, 400.0, -4000.0, 4000.0);
        Self {
            position: [position; 3],
            velocity: [velocity; 3],
            orientation: [
                PidGains::new(8.0, 0.0, 0.0, -10.0, 10.0),
                PidGains::new(20.0, 0.0, 0.0, -100.0, 100.0),
                PidGains::new(20.0, 0.0, 0.0, -100.0, 100.0),
            ],
            rate: [rate; 3],
        }
    }
}

/// Contribution of each stage output to one motor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorMix {
    /// Signs of the X, Y, Z velocity outputs.
    pub translation: [f64; 3],
    /// Signs of the roll, pitch, yaw rate outputs.
    pub rotation: [f64; 3],
}

impl MotorMix {
    pub const fn new(translation: [f64; 3], rotation: [f64; 3]) -> Self {
        Self {
            translation,
            rotation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerConfig {
    pub motors: Vec<MotorMix>,
    /// Maps body-frame velocity into the thruster convention, per axis.
    pub velocity_signs: [f64; 3],
}

impl MixerConfig {
    pub fn motor_count(&self) -> usize {
        self.motors.len()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.motors.is_empty() {
            return Err(ConfigError::NoMotors);
        }
        if let Some(i) = self.motors.iter().position(|m| {
            !m.translation
                .iter()
                .chain(m.rotation.iter())
                .all(|v| v.is_finite())
        }) {
            return Err(ConfigError::InvalidMixer(format!(
                "motor {i} has a non-finite coefficient"
            )));
        }
        if !self.velocity_signs.iter().all(|s| s.is_finite()) {
            return Err(ConfigError::InvalidMixer(
                "velocity signs must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MixerConfig {
    /// Eight motors: four forward (0, 1 yaw pair; 2, 3 pitch pair), two
    /// lateral (roll pair), two vertical.
    fn default() -> Self {
        Self {
            motors: vec![
                MotorMix::new([1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
                MotorMix::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
                MotorMix::new([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
                MotorMix::new([1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
                MotorMix::new([0.0, -1.0, 0.0], [1.0, 0.0, 0.0]),
                MotorMix::new([0.0, -1.0, 0.0], [-1.0, 0.0, 0.0]),
                MotorMix::new([0.0, 0.0, -1.0], [0.0, 0.0, 0.0]),
                MotorMix::new([0.0, 0.0, -1.0], [0.0, 0.0, 0.0]),
            ],
            velocity_signs: [1.0, -1.0, -1.0],
        }
    }
}

fn bank(gains: &[PidGains; 3]) -> [Pid; 3] {
    [Pid::new(gains[0]), Pid::new(gains[1]), Pid::new(gains[2])]
}

fn outputs(bank: &[Pid; 3]) -> Vec3 {
    Vec3::new(bank[0].output(), bank[1].output(), bank[2].output())
}

/// Position → velocity and orientation → rate cascade with a motor mixer.
#[derive(Debug, Clone)]
pub struct MotionController {
    position: [Pid; 3],
    velocity: [Pid; 3],
    orientation: [Pid; 3],
    rate: [Pid; 3],
    mixer: MixerConfig,
    rate_bias: [f64; 3],
    desired_velocity: Vec3,
    desired_rates: Vec3,
    motor_outputs: Vec<f64>,
}

impl MotionController {
    pub fn new(gains: ControllerGains, mixer: MixerConfig) -> Result<Self, ConfigError> {
        gains.validate()?;
        mixer.validate()?;
        debug!(
            "motion controller with {} motors, velocity signs {:?}",
            mixer.motor_count(),
            mixer.velocity_signs
        );
        Ok(Self {
            position: bank(&gains.position),
            velocity: bank(&gains.velocity),
            orientation: bank(&gains.orientation),
            rate: bank(&gains.rate),
            motor_outputs: vec![0.0; mixer.motor_count()],
            mixer,
            rate_bias: [0.0; 3],
            desired_velocity: Vec3::zeros(),
            desired_rates: Vec3::zeros(),
        })
    }

    pub fn mixer(&self) -> &MixerConfig {
        &self.mixer
    }

    /// Manual angular rate added on top of the orientation stage [rad/s].
    pub fn set_target_rate(&mut self, axis: RotationAxis, rate: f64) {
        self.rate_bias[axis.index()] = rate;
    }

    pub fn target_rate_bias(&self, axis: RotationAxis) -> f64 {
        self.rate_bias[axis.index()]
    }

    /// Body-frame velocity requested by the position stage at the last update.
    pub fn desired_velocity(&self) -> Vec3 {
        self.desired_velocity
    }

    /// Roll, pitch and yaw rates requested at the last update.
    pub fn desired_rates(&self) -> Vec3 {
        self.desired_rates
    }

    /// Translation thrust of one axis at the last update, thruster convention.
    pub fn velocity_command(&self, axis: TranslationAxis) -> f64 {
        self.velocity[axis.index()].output()
    }

    pub fn motor_outputs(&self) -> &[f64] {
        &self.motor_outputs
    }

    pub fn update(&mut self, state: &VehicleState, desired: &Pose, dt: f64) -> &[f64] {
        let q = state.orientation;

        // Position, body frame.
        let local_desired = rotate_to_local(&q, &desired.position);
        let local_actual = rotate_to_local(&q, &state.position);
        for axis in 0..3 {
            self.position[axis].set_target(local_desired[axis]);
            self.position[axis].update(local_actual[axis], dt);
        }
        self.desired_velocity = outputs(&self.position);

        // Velocity, thruster convention.
        let local_velocity = rotate_to_local(&q, &state.velocity);
        let signs = self.mixer.velocity_signs;
        for axis in 0..3 {
            self.velocity[axis].set_target(signs[axis] * self.desired_velocity[axis]);
            self.velocity[axis].update(signs[axis] * local_velocity[axis], dt);
        }
        let translation = outputs(&self.velocity);

        // Orientation: errors from the desired forward axis seen from the body.
        let pointing = rotate_to_local(&q, &rotate_to_world(&desired.orientation, &Vec3::x()));
        let yaw_error = pointing.y.atan2(pointing.x);
        let pitch_error = -pointing.z.atan2(pointing.x);
        let roll_error = -roll_of(&q);
        let errors = [roll_error, pitch_error, yaw_error];
        for axis in 0..3 {
            self.orientation[axis].set_target(0.0);
            self.orientation[axis].update(-errors[axis], dt);
        }
        self.desired_rates = outputs(&self.orientation) + Vec3::from(self.rate_bias);

        // Rates, body frame: x roll, y pitch, z yaw.
        let local_rates = rotate_to_local(&q, &state.angular_velocity);
        for axis in 0..3 {
            self.rate[axis].set_target(self.desired_rates[axis]);
            self.rate[axis].update(local_rates[axis], dt);
        }
        let rotation = outputs(&self.rate);

        for (output, mix) in self.motor_outputs.iter_mut().zip(&self.mixer.motors) {
            *output = Vec3::from(mix.translation).dot(&translation)
                + Vec3::from(mix.rotation).dot(&rotation);
        }
        &self.motor_outputs
    }

    pub fn reset(&mut self) {
        for pid in self
            .position
            .iter_mut()
            .chain(self.velocity.iter_mut())
            .chain(self.orientation.iter_mut())
            .chain(self.rate.iter_mut())
        {
            pid.reset();
        }
        self.rate_bias = [0.0; 3];
        self.desired_velocity = Vec3::zeros();
        self.desired_rates = Vec3::zeros();
        self.motor_outputs.iter_mut().for_each(|o| *o = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;

    const DT: f64 = 0.004;

    fn controller() -> MotionController {
        MotionController::new(ControllerGains::default(), MixerConfig::default()).unwrap()
    }

    fn at_rest() -> VehicleState {
        VehicleState::default()
    }

    #[test]
    fn deeper_target_drives_vertical_motors_down() {
        let mut c = controller();
        let out = c.update(&at_rest(), &Pose::new(Vec3::new(0.0, 0.0, 2.0), Quat::identity()), DT);
        assert!(out[6] > 0.0 && out[7] > 0.0);
        assert_eq!(out[6], out[7]);
        for o in &out[..6] {
            assert_eq!(*o, 0.0);
        }
        // P saturates at 3 m/s.
        assert_relative_eq!(c.desired_velocity().z, 3.0);
    }

    #[test]
    fn forward_target_drives_forward_motors() {
        let mut c = controller();
        let out = c.update(&at_rest(), &Pose::new(Vec3::new(1.0, 0.0, 0.0), Quat::identity()), DT);
        assert!(out[..4].iter().all(|o| *o > 0.0));
        assert_eq!(out[4], 0.0);
        assert_eq!(out[6], 0.0);
    }

    #[test]
    fn starboard_target_drives_lateral_motors() {
        let mut c = controller();
        let out = c.update(&at_rest(), &Pose::new(Vec3::new(0.0, 1.0, 0.0), Quat::identity()), DT);
        assert!(out[4] > 0.0 && out[5] > 0.0);
        assert!(c.velocity_command(TranslationAxis::Y) < 0.0);
        assert_eq!(c.velocity_command(TranslationAxis::X), 0.0);
    }

    #[test]
    fn yaw_error_spins_toward_desired_heading() {
        let mut c = controller();
        let desired = Pose::new(Vec3::zeros(), Quat::from_euler_angles(0.0, 0.0, FRAC_PI_4));
        let out = c.update(&at_rest(), &desired, DT).to_vec();
        assert!(c.desired_rates().z > 0.0);
        // Starboard motor backs off, port motor pushes: nose swings to starboard.
        assert!(out[0] < 0.0 && out[1] > 0.0);
        assert_relative_eq!(out[0], -out[1]);
    }

    #[test]
    fn pitch_error_pitches_toward_desired_attitude() {
        let mut c = controller();
        let desired = Pose::new(Vec3::zeros(), Quat::from_euler_angles(0.0, 0.3, 0.0));
        c.update(&at_rest(), &desired, DT);
        assert!(c.desired_rates().y > 0.0);
        let out = c.motor_outputs();
        assert!(out[2] > 0.0 && out[3] < 0.0);
    }

    #[test]
    fn roll_is_levelled() {
        let mut c = controller();
        let state = VehicleState {
            orientation: Quat::from_euler_angles(0.2, 0.0, 0.0),
            ..at_rest()
        };
        c.update(&state, &Pose::default(), DT);
        assert!(c.desired_rates().x < 0.0);
        let out = c.motor_outputs();
        assert!(out[4] < out[5]);
    }

    #[test]
    fn rate_bias_adds_to_orientation_output() {
        let mut c = controller();
        c.set_target_rate(RotationAxis::Yaw, 0.5);
        c.update(&at_rest(), &Pose::default(), DT);
        assert_eq!(c.desired_rates(), Vec3::new(0.0, 0.0, 0.5));
        c.reset();
        for axis in RotationAxis::ALL {
            assert_eq!(c.target_rate_bias(axis), 0.0);
        }
        assert!(c.motor_outputs().iter().all(|o| *o == 0.0));
    }

    #[test]
    fn holding_pose_commands_nothing() {
        let mut c = controller();
        for _ in 0..10 {
            let out = c.update(&at_rest(), &Pose::default(), DT);
            assert!(out.iter().all(|o| *o == 0.0));
        }
    }

    #[test]
    fn vertical_command_shrinks_with_error() {
        // A fresh controller per error isolates the static gain.
        let mut previous = f64::INFINITY;
        for depth in [2.0, 1.0, 0.5, 0.25, 0.1] {
            let mut c = controller();
            let out = c.update(&at_rest(), &Pose::new(Vec3::new(0.0, 0.0, depth), Quat::identity()), DT);
            assert!(out[6] > 0.0);
            assert!(out[6] <= previous);
            previous = out[6];
        }
    }

    #[test]
    fn rejects_bad_configuration() {
        let empty = MixerConfig {
            motors: Vec::new(),
            ..MixerConfig::default()
        };
        assert!(matches!(
            MotionController::new(ControllerGains::default(), empty),
            Err(ConfigError::NoMotors)
        ));

        let mut gains = ControllerGains::default();
        gains.rate[2].max = f64::NAN;
        assert!(matches!(
            MotionController::new(gains, MixerConfig::default()),
            Err(ConfigError::InvalidGains { stage: "rate", axis: 2 })
        ));

        let mut mixer = MixerConfig::default();
        mixer.motors[3].rotation[1] = f64::INFINITY;
        assert!(matches!(
            MotionController::new(ControllerGains::default(), mixer),
            Err(ConfigError::InvalidMixer(_))
        ));
    }

    #[test]
    fn gains_deserialize_with_default_windup_guard() {
        let json = r#"{"kp":1.0,"ki":0.0,"kd":0.0,"min":-1.0,"max":1.0}"#;
        let gains: PidGains = serde_json::from_str(json).unwrap();
        assert_eq!(gains.windup_guard, 20.0);
        assert_eq!(gains.kp, 1.0);
    }
}
