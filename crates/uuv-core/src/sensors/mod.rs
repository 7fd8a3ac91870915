//! Time-stepped sensor sampling.
//!
//! Sensors are updated once per physics step. Each update reads the raw
//! physical quantity at the current physics time and emits every sample
//! whose scheduled time falls in `(previous step, current step]`, linearly
//! interpolated between the raw value of the previous step and the current
//! one. The emitted samples of a step replace those of the previous step.

pub mod depth;
pub mod dvl;
pub mod imu;
pub mod magnetometer;

pub use depth::{DepthSample, DepthSensor};
pub use dvl::{Dvl, DvlFormat, DvlSample};
pub use imu::{Accelerometer, Gyroscope};
pub use magnetometer::Magnetometer;

use crate::hal::{BodyId, PhysicsBackend, Pose};
use crate::interpolation::Interpolate;
use crate::timebase::SimulationTime;
use crate::transform::local_to_world;
use crate::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Default period of the fixed-rate sensors.
pub const DEFAULT_SENSOR_PERIOD: SimulationTime = SimulationTime::from_micros(4_000);

/// Where a sensor sits on the vehicle, in the body frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mount {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Mount {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::identity())
    }

    pub fn world_position(&self, vehicle: &Pose) -> Vec3 {
        local_to_world(&vehicle.position, &vehicle.orientation, &self.position)
    }
}

/// A three-axis reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorSample {
    pub timestamp: SimulationTime,
    pub value: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sensor", rename_all = "snake_case")]
pub enum SensorSample {
    Dvl(DvlSample),
    Depth(DepthSample),
    Accelerometer(VectorSample),
    Gyroscope(VectorSample),
    Magnetometer(VectorSample),
}

impl SensorSample {
    pub fn timestamp(&self) -> SimulationTime {
        match self {
            SensorSample::Dvl(s) => s.timestamp,
            SensorSample::Depth(s) => s.timestamp,
            SensorSample::Accelerometer(s)
            | SensorSample::Gyroscope(s)
            | SensorSample::Magnetometer(s) => s.timestamp,
        }
    }
}

pub trait Sensor {
    fn name(&self) -> &'static str;

    /// Sample against the backend state reached at `time`, `dt` after the
    /// previous update.
    fn update(
        &mut self,
        physics: &dyn PhysicsBackend,
        body: BodyId,
        time: SimulationTime,
        dt: SimulationTime,
    );

    /// Samples emitted by the last update, oldest first.
    fn samples(&self) -> &[SensorSample];

    /// Move the samples of the last update out of the sensor.
    fn take_samples(&mut self) -> Vec<SensorSample>;

    fn last_value(&self) -> Option<&SensorSample> {
        self.samples().last()
    }
}

/// Fixed-period scheduling shared by the constant-rate sensors.
#[derive(Debug, Clone)]
pub struct FixedRateSampler<T: Interpolate> {
    period: SimulationTime,
    next_sample_time: SimulationTime,
    previous: Option<(SimulationTime, T)>,
    latest: Option<T>,
    queue: Vec<SensorSample>,
}

impl<T: Interpolate> FixedRateSampler<T> {
    pub fn new(period: SimulationTime) -> Self {
        // A zero period would never advance the schedule.
        let period = period.max(SimulationTime::from_micros(1));
        Self {
            period,
            next_sample_time: period,
            previous: None,
            latest: None,
            queue: Vec::new(),
        }
    }

    pub fn period(&self) -> SimulationTime {
        self.period
    }

    /// Raw value recorded at the last update.
    pub fn latest(&self) -> Option<T> {
        self.latest
    }

    pub fn samples(&self) -> &[SensorSample] {
        &self.queue
    }

    pub fn take_samples(&mut self) -> Vec<SensorSample> {
        std::mem::take(&mut self.queue)
    }

    /// Record `current` at `time` and emit the samples due up to `time`.
    pub fn record(
        &mut self,
        time: SimulationTime,
        current: T,
        make_sample: impl Fn(SimulationTime, T) -> SensorSample,
    ) {
        let (previous_time, previous) = self.previous.unwrap_or((time, current));
        let x1 = previous_time.as_micros() as f64;
        let x2 = time.as_micros() as f64;

        self.queue.clear();
        while self.next_sample_time <= time {
            let x = self.next_sample_time.as_micros() as f64;
            let value = T::interpolate(x, x1, x2, &previous, &current);
            self.queue.push(make_sample(self.next_sample_time, value));
            self.next_sample_time += self.period;
        }

        self.previous = Some((time, current));
        self.latest = Some(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(t: SimulationTime, v: f64) -> SensorSample {
        SensorSample::Depth(DepthSample {
            timestamp: t,
            pressure_kpa: v,
        })
    }

    fn values(sampler: &FixedRateSampler<f64>) -> Vec<(u64, f64)> {
        sampler
            .samples()
            .iter()
            .map(|s| match s {
                SensorSample::Depth(d) => (d.timestamp.as_micros(), d.pressure_kpa),
                other => panic!("unexpected sample {other:?}"),
            })
            .collect()
    }

    #[test]
    fn emits_interpolated_samples_between_steps() {
        let mut sampler = FixedRateSampler::<f64>::new(SimulationTime::from_micros(1_000));
        sampler.record(SimulationTime::ZERO, 0.0, scalar);
        assert!(sampler.samples().is_empty());

        sampler.record(SimulationTime::from_micros(4_000), 40.0, scalar);
        assert_eq!(
            values(&sampler),
            vec![(1_000, 10.0), (2_000, 20.0), (3_000, 30.0), (4_000, 40.0)]
        );
    }

    #[test]
    fn queue_is_replaced_each_step() {
        let mut sampler = FixedRateSampler::<f64>::new(SimulationTime::from_micros(3_000));
        sampler.record(SimulationTime::from_micros(2_000), 1.0, scalar);
        assert!(sampler.samples().is_empty());

        sampler.record(SimulationTime::from_micros(4_000), 3.0, scalar);
        assert_eq!(values(&sampler), vec![(3_000, 2.0)]);

        sampler.record(SimulationTime::from_micros(5_000), 4.0, scalar);
        assert!(sampler.samples().is_empty());
        assert_eq!(sampler.latest(), Some(4.0));
    }

    #[test]
    fn take_samples_moves_queue_out() {
        let mut sampler = FixedRateSampler::<f64>::new(SimulationTime::from_micros(1_000));
        sampler.record(SimulationTime::from_micros(2_000), 5.0, scalar);
        let taken = sampler.take_samples();
        assert_eq!(taken.len(), 2);
        assert!(sampler.samples().is_empty());
    }

    #[test]
    fn mount_world_position() {
        let vehicle = Pose::new(Vec3::new(0.0, 0.0, 10.0), Quat::identity());
        let mount = Mount::at(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(mount.world_position(&vehicle), Vec3::new(1.0, 0.0, 10.0));
    }
}
