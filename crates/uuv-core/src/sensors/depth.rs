use super::{FixedRateSampler, Mount, Sensor, SensorSample, DEFAULT_SENSOR_PERIOD};
use crate::hal::{BodyId, PhysicsBackend};
use crate::timebase::SimulationTime;
use crate::{Vec3, GRAVITY};
use serde::{Deserialize, Serialize};

pub const WATER_DENSITY: f64 = 997.0;
pub const ATMOSPHERIC_PRESSURE_PA: f64 = 101_300.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthSample {
    pub timestamp: SimulationTime,
    pub pressure_kpa: f64,
}

/// Absolute pressure gauge. Above the surface it reads atmospheric pressure.
#[derive(Debug, Clone)]
pub struct DepthSensor {
    mount: Mount,
    /// Calibration offset added to the pressure [Pa].
    offset_pa: f64,
    sampler: FixedRateSampler<f64>,
}

impl DepthSensor {
    pub fn new(mount: Mount, period: SimulationTime) -> Self {
        Self {
            mount,
            offset_pa: 0.0,
            sampler: FixedRateSampler::new(period),
        }
    }

    pub fn with_offset(mut self, offset_pa: f64) -> Self {
        self.offset_pa = offset_pa;
        self
    }

    pub fn pressure_kpa_at(&self, depth: f64) -> f64 {
        (depth.max(0.0) * WATER_DENSITY * GRAVITY + self.offset_pa + ATMOSPHERIC_PRESSURE_PA) / 1000.0
    }

    /// Pressure at the last physics step, not interpolated.
    pub fn last_pressure_kpa(&self) -> Option<f64> {
        self.sampler.latest()
    }
}

impl Default for DepthSensor {
    fn default() -> Self {
        Self::new(Mount::at(Vec3::new(1.0, 0.0, 0.0)), DEFAULT_SENSOR_PERIOD)
    }
}

fn depth_sample(timestamp: SimulationTime, pressure_kpa: f64) -> SensorSample {
    SensorSample::Depth(DepthSample {
        timestamp,
        pressure_kpa,
    })
}

impl Sensor for DepthSensor {
    fn name(&self) -> &'static str {
        "depth"
    }

    fn update(
        &mut self,
        physics: &dyn PhysicsBackend,
        body: BodyId,
        time: SimulationTime,
        _dt: SimulationTime,
    ) {
        let depth = self.mount.world_position(&physics.pose(body)).z;
        let pressure = self.pressure_kpa_at(depth);
        self.sampler.record(time, pressure, depth_sample);
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
    use crate::hal_sim::{BodyConfig, SimulatedWorld};
    use approx::assert_relative_eq;

    #[test]
    fn surface_reads_atmospheric() {
        let sensor = DepthSensor::default();
        assert_relative_eq!(sensor.pressure_kpa_at(0.0), 101.3);
        assert_relative_eq!(sensor.pressure_kpa_at(-3.0), 101.3);
        assert_relative_eq!(sensor.pressure_kpa_at(10.0), 101.3 + 97.8057, epsilon = 1e-9);
    }

    #[test]
    fn offset_shifts_reading() {
        let sensor = DepthSensor::default().with_offset(700.0);
        assert_relative_eq!(sensor.pressure_kpa_at(0.0), 102.0);
    }

    #[test]
    fn samples_pressure_at_mount_depth() {
        let mut world = SimulatedWorld::default();
        let body = world.add_body(&BodyConfig {
            position: Vec3::new(0.0, 0.0, 5.0),
            ..BodyConfig::default()
        });
        let mut sensor = DepthSensor::default();
        let step = SimulationTime::from_micros(4_000);
        sensor.update(&world, body, step, step);

        assert_eq!(sensor.samples().len(), 1);
        let expected = sensor.pressure_kpa_at(5.0);
        assert_eq!(sensor.last_pressure_kpa(), Some(expected));
        match sensor.last_value() {
            Some(SensorSample::Depth(s)) => {
                assert_eq!(s.timestamp, step);
                assert_eq!(s.pressure_kpa, expected);
            }
            other => panic!("unexpected sample {other:?}"),
        }
    }
}
