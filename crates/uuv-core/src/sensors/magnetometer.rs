use super::{FixedRateSampler, Mount, Sensor, SensorSample, VectorSample, DEFAULT_SENSOR_PERIOD};
use crate::hal::{BodyId, PhysicsBackend};
use crate::timebase::SimulationTime;
use crate::transform::rotate_to_local;
use crate::Vec3;

fn magnetometer_sample(timestamp: SimulationTime, value: Vec3) -> SensorSample {
    SensorSample::Magnetometer(VectorSample { timestamp, value })
}

/// Unit field pointing along world `x` (north), seen from the sensor.
#[derive(Debug, Clone)]
pub struct Magnetometer {
    mount: Mount,
    field: Vec3,
    sampler: FixedRateSampler<Vec3>,
}

impl Magnetometer {
    pub fn new(mount: Mount, period: SimulationTime) -> Self {
        Self {
            mount,
            field: Vec3::x(),
            sampler: FixedRateSampler::new(period),
        }
    }

    pub fn with_field(mut self, field: Vec3) -> Self {
        self.field = field;
        self
    }
}

impl Default for Magnetometer {
    fn default() -> Self {
        Self::new(Mount::at(Vec3::new(1.0, 0.0, 0.0)), DEFAULT_SENSOR_PERIOD)
    }
}

impl Sensor for Magnetometer {
    fn name(&self) -> &'static str {
        "magnetometer"
    }

    fn update(
        &mut self,
        physics: &dyn PhysicsBackend,
        body: BodyId,
        time: SimulationTime,
        _dt: SimulationTime,
    ) {
        let body_frame = rotate_to_local(&physics.pose(body).orientation, &self.field);
        let reading = rotate_to_local(&self.mount.orientation, &body_frame);
        self.sampler.record(time, reading, magnetometer_sample);
    }

    fn samples(&self) -> &[SensorSample] {
        self.sampler.samples()
    }

    fn take_samples(&mut self) -> Vec<SensorSample> {
        self.sampler.take_samples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::Pose;
    use crate::hal_sim::{BodyConfig, SimulatedWorld};
    use crate::Quat;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn heading_east_sees_north_to_port() {
        let mut world = SimulatedWorld::default();
        let body = world.add_body(&BodyConfig::default());
        world.reset_pose(
            body,
            Pose::new(Vec3::zeros(), Quat::from_euler_angles(0.0, 0.0, FRAC_PI_2)),
        );
        let mut mag = Magnetometer::default();
        let step = SimulationTime::from_micros(4_000);
        mag.update(&world, body, step, step);

        match mag.last_value() {
            Some(SensorSample::Magnetometer(s)) => {
                assert_relative_eq!(s.value, Vec3::new(0.0, -1.0, 0.0), epsilon = 1e-12)
            }
            other => panic!("unexpected sample {other:?}"),
        }
    }
}
