//! Inertial sensors. Both read in the sensor frame, i.e. body-frame values
//! rotated by the inverse of the mount orientation.

use super::{FixedRateSampler, Mount, Sensor, SensorSample, VectorSample, DEFAULT_SENSOR_PERIOD};
use crate::hal::{BodyId, PhysicsBackend};
use crate::timebase::SimulationTime;
use crate::transform::rotate_to_local;
use crate::{Vec3, GRAVITY};

fn accelerometer_sample(timestamp: SimulationTime, value: Vec3) -> SensorSample {
    SensorSample::Accelerometer(VectorSample { timestamp, value })
}

fn gyroscope_sample(timestamp: SimulationTime, value: Vec3) -> SensorSample {
    SensorSample::Gyroscope(VectorSample { timestamp, value })
}

/// Specific force `a - g`. At rest it reads `(0, 0, -g)` in a level body
/// frame since world `z` points down.
#[derive(Debug, Clone)]
pub struct Accelerometer {
    mount: Mount,
    gravity: f64,
    previous_velocity: Option<Vec3>,
    sampler: FixedRateSampler<Vec3>,
}

impl Accelerometer {
    pub fn new(mount: Mount, period: SimulationTime) -> Self {
        Self {
            mount,
            gravity: GRAVITY,
            previous_velocity: None,
            sampler: FixedRateSampler::new(period),
        }
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }
}

impl Default for Accelerometer {
    fn default() -> Self {
        Self::new(Mount::at(Vec3::new(1.0, 0.0, 0.0)), DEFAULT_SENSOR_PERIOD)
    }
}

impl Sensor for Accelerometer {
    fn name(&self) -> &'static str {
        "accelerometer"
    }

    fn update(
        &mut self,
        physics: &dyn PhysicsBackend,
        body: BodyId,
        time: SimulationTime,
        dt: SimulationTime,
    ) {
        let velocity = physics.velocity(body).linear;
        let dt_s = dt.as_secs_f64();
        let acceleration = match self.previous_velocity {
            Some(previous) if dt_s > 0.0 => (velocity - previous) / dt_s,
            _ => Vec3::zeros(),
        };
        self.previous_velocity = Some(velocity);

        let specific_force = acceleration - Vec3::new(0.0, 0.0, self.gravity);
        let body_frame = rotate_to_local(&physics.pose(body).orientation, &specific_force);
        let reading = rotate_to_local(&self.mount.orientation, &body_frame);
        self.sampler.record(time, reading, accelerometer_sample);
    }

    fn samples(&self) -> &[SensorSample] {
        self.sampler.samples()
    }

    fn take_samples(&mut self) -> Vec<SensorSample> {
        self.sampler.take_samples()
    }
}

#[derive(Debug, Clone)]
pub struct Gyroscope {
    mount: Mount,
    sampler: FixedRateSampler<Vec3>,
}

impl Gyroscope {
    pub fn new(mount: Mount, period: SimulationTime) -> Self {
        Self {
            mount,
            sampler: FixedRateSampler::new(period),
        }
    }
}

impl Default for Gyroscope {
    fn default() -> Self {
        Self::new(Mount::at(Vec3::new(1.0, 0.0, 0.0)), DEFAULT_SENSOR_PERIOD)
    }
}

impl Sensor for Gyroscope {
    fn name(&self) -> &'static str {
        "gyroscope"
    }

    fn update(
        &mut self,
        physics: &dyn PhysicsBackend,
        body: BodyId,
        time: SimulationTime,
        _dt: SimulationTime,
    ) {
        let omega_world = physics.velocity(body).angular;
        let omega_body = rotate_to_local(&physics.pose(body).orientation, &omega_world);
        let reading = rotate_to_local(&self.mount.orientation, &omega_body);
        self.sampler.record(time, reading, gyroscope_sample);
    }

    fn samples(&self) -> &[SensorSample] {
        self.sampler.samples()
    }

    fn take_samples(&mut self) -> Vec<SensorSample> {
        self.sampler.take_samples()
    }
}
