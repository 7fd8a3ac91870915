use crate::controller::{ControllerGains, MixerConfig, VehicleState};
use crate::error::ConfigError;
use crate::hal::{BodyId, Frame, PhysicsBackend};
use crate::hal_sim::{BodyConfig, DEFAULT_BODY_MASS};
use crate::motor::{Motor, MotorLimits};
use crate::sensors::{
    Accelerometer, DepthSensor, Dvl, Gyroscope, Magnetometer, Sensor, SensorSample,
};
use crate::timebase::SimulationTime;
use crate::transform::{local_to_world, rotate_to_local};
use crate::{Quat, Vec3, GRAVITY};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorConfig {
    pub name: String,
    /// Mount point in the body frame.
    pub position: Vec3,
    /// Thrust direction in the body frame, need not be normalized.
    pub direction: Vec3,
    #[serde(default)]
    pub limits: MotorLimits,
}

impl MotorConfig {
    pub fn new(name: &str, position: [f64; 3], direction: [f64; 3]) -> Self {
        Self {
            name: name.to_string(),
            position: Vec3::from(position),
            direction: Vec3::from(direction),
            limits: MotorLimits::T200,
        }
    }
}

fn default_center_of_volume() -> Vec3 {
    Vec3::new(0.0, 0.0, -0.05)
}

fn default_damping() -> Vec<f64> {
    vec![8.0, 10.0, 10.0, 2.0, 2.0, 2.0]
}

fn default_damping_scale() -> f64 {
    10.0
}

fn default_buoyancy() -> f64 {
    DEFAULT_BODY_MASS * GRAVITY
}

/// Everything needed to build a [`Vehicle`] and its controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub motors: Vec<MotorConfig>,
    /// Point where buoyancy acts, body frame.
    #[serde(default = "default_center_of_volume")]
    pub center_of_volume: Vec3,
    /// Linear (surge, sway, heave) then angular (roll, pitch, yaw) damping.
    #[serde(default = "default_damping")]
    pub damping_matrix_diag: Vec<f64>,
    #[serde(default = "default_damping_scale")]
    pub damping_scale: f64,
    /// Upward force [N]. Neutral for the default hull.
    #[serde(default = "default_buoyancy")]
    pub buoyancy: f64,
    #[serde(default)]
    pub body: BodyConfig,
    #[serde(default)]
    pub gains: ControllerGains,
    #[serde(default)]
    pub mixer: MixerConfig,
}

impl VehicleConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.motors.is_empty() {
            return Err(ConfigError::NoMotors);
        }
        let mut names = HashMap::new();
        for (index, motor) in self.motors.iter().enumerate() {
            let reason = if names.insert(motor.name.as_str(), index).is_some() {
                Some(format!("duplicate name {:?}", motor.name))
            } else if !motor.position.iter().all(|v| v.is_finite()) {
                Some("position is not finite".to_string())
            } else if !motor.direction.iter().all(|v| v.is_finite())
                || motor.direction.norm() < 1e-9
            {
                Some("direction must be finite and non-zero".to_string())
            } else if !motor.limits.is_valid() {
                Some("invalid motor limits".to_string())
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ConfigError::InvalidMotor { index, reason });
            }
        }

        if self.damping_matrix_diag.len() != 6
            || !self
                .damping_matrix_diag
                .iter()
                .all(|d| d.is_finite() && *d >= 0.0)
        {
            return Err(ConfigError::InvalidDamping(self.damping_matrix_diag.clone()));
        }
        if !self.damping_scale.is_finite() || self.damping_scale < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "damping_scale",
                value: self.damping_scale,
            });
        }
        if !self.buoyancy.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "buoyancy",
                value: self.buoyancy,
            });
        }
        if !self.center_of_volume.iter().all(|v| v.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "center_of_volume",
                value: self.center_of_volume.norm(),
            });
        }
        if !(self.body.mass.is_finite() && self.body.mass > 0.0)
            || !self.body.inertia.iter().all(|i| i.is_finite() && *i > 0.0)
        {
            return Err(ConfigError::InvalidValue {
                field: "body.mass",
                value: self.body.mass,
            });
        }
        if self.mixer.motor_count() != self.motors.len() {
            return Err(ConfigError::MixerMismatch {
                mixer: self.mixer.motor_count(),
                motors: self.motors.len(),
            });
        }
        Ok(())
    }
}

impl Default for VehicleConfig {
    /// Eight T200s matching [`MixerConfig::default`].
    fn default() -> Self {
        Self {
            motors: vec![
                MotorConfig::new("starboard_forward", [0.0, 0.2, 0.0], [1.0, 0.0, 0.0]),
                MotorConfig::new("port_forward", [0.0, -0.2, 0.0], [1.0, 0.0, 0.0]),
                MotorConfig::new("lower_forward", [0.0, 0.0, 0.15], [1.0, 0.0, 0.0]),
                MotorConfig::new("upper_forward", [0.0, 0.0, -0.15], [1.0, 0.0, 0.0]),
                MotorConfig::new("upper_lateral", [0.0, 0.0, -0.15], [0.0, 1.0, 0.0]),
                MotorConfig::new("lower_lateral", [0.0, 0.0, 0.15], [0.0, 1.0, 0.0]),
                MotorConfig::new("front_vertical", [0.4, 0.0, 0.0], [0.0, 0.0, 1.0]),
                MotorConfig::new("rear_vertical", [-0.4, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ],
            center_of_volume: default_center_of_volume(),
            damping_matrix_diag: default_damping(),
            damping_scale: default_damping_scale(),
            buoyancy: default_buoyancy(),
            body: BodyConfig::default(),
            gains: ControllerGains::default(),
            mixer: MixerConfig::default(),
        }
    }
}

/// The hull as the simulation sees it: motors, sensors, buoyancy and
/// hydrodynamic damping acting on one backend body.
#[derive(Debug, Clone)]
pub struct Vehicle {
    body: BodyId,
    motors: Vec<Motor>,
    motor_indices: HashMap<String, usize>,
    center_of_volume: Vec3,
    damping: [f64; 6],
    damping_scale: f64,
    buoyancy: f64,
    depth_sensor: DepthSensor,
    accelerometer: Accelerometer,
    gyroscope: Gyroscope,
    magnetometer: Magnetometer,
    dvl: Dvl,
}

impl Vehicle {
    pub fn new(config: &VehicleConfig, body: BodyId) -> Result<Self, ConfigError> {
        config.validate()?;

        let motors: Vec<Motor> = config
            .motors
            .iter()
            .map(|m| Motor::new(m.name.clone(), m.position, m.direction, m.limits))
            .collect();
        let motor_indices = motors
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name().to_string(), i))
            .collect();

        let mut damping = [0.0; 6];
        damping.copy_from_slice(&config.damping_matrix_diag);

        debug!(
            "vehicle on body {:?}: {} motors, buoyancy {:.1} N",
            body,
            motors.len(),
            config.buoyancy
        );

        Ok(Self {
            body,
            motors,
            motor_indices,
            center_of_volume: config.center_of_volume,
            damping,
            damping_scale: config.damping_scale,
            buoyancy: config.buoyancy,
            depth_sensor: DepthSensor::default(),
            accelerometer: Accelerometer::default(),
            gyroscope: Gyroscope::default(),
            magnetometer: Magnetometer::default(),
            dvl: Dvl::default(),
        })
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn position(&self, physics: &dyn PhysicsBackend) -> Vec3 {
        physics.pose(self.body).position
    }

    pub fn orientation(&self, physics: &dyn PhysicsBackend) -> Quat {
        physics.pose(self.body).orientation
    }

    /// World frame.
    pub fn velocity(&self, physics: &dyn PhysicsBackend) -> Vec3 {
        physics.velocity(self.body).linear
    }

    /// World frame.
    pub fn angular_velocity(&self, physics: &dyn PhysicsBackend) -> Vec3 {
        physics.velocity(self.body).angular
    }

    pub fn state(&self, physics: &dyn PhysicsBackend) -> VehicleState {
        let pose = physics.pose(self.body);
        let twist = physics.velocity(self.body);
        VehicleState {
            position: pose.position,
            orientation: pose.orientation,
            velocity: twist.linear,
            angular_velocity: twist.angular,
        }
    }

    pub fn motors(&self) -> &[Motor] {
        &self.motors
    }

    pub fn motor_index(&self, name: &str) -> Option<usize> {
        self.motor_indices.get(name).copied()
    }

    /// Extra entries beyond the motor count are ignored.
    pub fn set_desired_rpm_motors(&mut self, rpms: &[f64]) {
        for (motor, rpm) in self.motors.iter_mut().zip(rpms) {
            motor.set_desired_rpm(*rpm);
        }
    }

    pub fn set_desired_rpm_motor(&mut self, index: usize, rpm: f64) {
        if let Some(motor) = self.motors.get_mut(index) {
            motor.set_desired_rpm(rpm);
        }
    }

    pub fn set_desired_thrust_motors(&mut self, thrusts: &[f64]) {
        for (motor, thrust) in self.motors.iter_mut().zip(thrusts) {
            motor.set_desired_thrust(*thrust);
        }
    }

    pub fn set_desired_thrust_motor(&mut self, index: usize, thrust: f64) {
        if let Some(motor) = self.motors.get_mut(index) {
            motor.set_desired_thrust(thrust);
        }
    }

    pub fn buoyancy(&self) -> f64 {
        self.buoyancy
    }

    pub fn set_buoyancy(&mut self, newtons: f64) {
        self.buoyancy = newtons;
    }

    pub fn depth_sensor(&self) -> &DepthSensor {
        &self.depth_sensor
    }

    pub fn accelerometer(&self) -> &Accelerometer {
        &self.accelerometer
    }

    pub fn gyroscope(&self) -> &Gyroscope {
        &self.gyroscope
    }

    pub fn magnetometer(&self) -> &Magnetometer {
        &self.magnetometer
    }

    pub fn dvl(&self) -> &Dvl {
        &self.dvl
    }

    /// All sensors in update order.
    pub fn sensors(&self) -> [&dyn Sensor; 5] {
        [
            &self.depth_sensor,
            &self.accelerometer,
            &self.gyroscope,
            &self.magnetometer,
            &self.dvl,
        ]
    }

    fn sensors_mut(&mut self) -> [&mut dyn Sensor; 5] {
        [
            &mut self.depth_sensor,
            &mut self.accelerometer,
            &mut self.gyroscope,
            &mut self.magnetometer,
            &mut self.dvl,
        ]
    }

    pub fn sample_sensors(
        &mut self,
        physics: &dyn PhysicsBackend,
        time: SimulationTime,
        dt: SimulationTime,
    ) {
        let body = self.body;
        for sensor in self.sensors_mut() {
            sensor.update(physics, body, time, dt);
        }
    }

    /// Samples emitted at the last step, sensor by sensor.
    pub fn take_samples(&mut self) -> Vec<SensorSample> {
        self.sensors_mut()
            .into_iter()
            .flat_map(|sensor| sensor.take_samples())
            .collect()
    }

    /// Ramp the motors and push every force of this step into the backend.
    pub fn actuate(&mut self, physics: &mut dyn PhysicsBackend, dt: SimulationTime) {
        for motor in &mut self.motors {
            motor.update(dt.as_micros());
            motor.apply_thrust(physics, self.body);
        }
        self.apply_buoyancy(physics);
        self.apply_damping(physics);
    }

    fn apply_buoyancy(&self, physics: &mut dyn PhysicsBackend) {
        let pose = physics.pose(self.body);
        let at = local_to_world(&pose.position, &pose.orientation, &self.center_of_volume);
        physics.apply_force(self.body, Vec3::new(0.0, 0.0, -self.buoyancy), at, Frame::World);
    }

    fn apply_damping(&self, physics: &mut dyn PhysicsBackend) {
        let q = physics.pose(self.body).orientation;
        let twist = physics.velocity(self.body);
        let v = rotate_to_local(&q, &twist.linear);
        let w = rotate_to_local(&q, &twist.angular);
        let d = &self.damping;
        let k = -self.damping_scale;

        let force = Vec3::new(d[0] * v.x, d[1] * v.y, d[2] * v.z) * k;
        let torque = Vec3::new(d[3] * w.x, d[4] * w.y, d[5] * w.z) * k;
        physics.apply_force(self.body, force, Vec3::zeros(), Frame::Local);
        physics.apply_torque(self.body, torque, Frame::Local);
    }
}

/// Build a body in `world` from the vehicle configuration and attach a
/// vehicle to it.
pub fn spawn(
    world: &mut crate::hal_sim::SimulatedWorld,
    config: &VehicleConfig,
) -> Result<Vehicle, ConfigError> {
    config.validate()?;
    let body = world.add_body(&config.body);
    Vehicle::new(config, body)
}
