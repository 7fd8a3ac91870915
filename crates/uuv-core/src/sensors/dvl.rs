//! Doppler velocity log with altitude-dependent sampling rate.
//!
//! Four beams splay downward from the sensor at 22.5° from its `z` axis.
//! The closer the seafloor, the faster the sensor pings: the period after
//! each ping is interpolated from the average beam altitude between
//! [`MIN_PERIOD`] at [`MINIMUM_ALTITUDE`] and [`MAX_PERIOD`] at
//! [`MAXIMUM_ALTITUDE`].

use super::{Mount, Sensor, SensorSample};
use crate::hal::{BodyId, PhysicsBackend};
use crate::interpolation::{interpolate, interpolate_vec};
use crate::timebase::SimulationTime;
use crate::transform::local_to_world;
use crate::{Quat, Vec3};
use log::trace;
use serde::{Deserialize, Serialize};

/// Depth of the seafloor used for the reported altitude [m].
pub const SEAFLOOR_DEPTH: f64 = 100.0;

pub const MINIMUM_ALTITUDE: f64 = 0.05;
pub const MAXIMUM_ALTITUDE: f64 = 50.0;

/// 1/26 s.
pub const MIN_PERIOD: SimulationTime = SimulationTime::from_micros(1_000_000 / 26);
/// 1/4 s.
pub const MAX_PERIOD: SimulationTime = SimulationTime::from_micros(1_000_000 / 4);

pub const BEAM_HALF_ANGLE_DEG: f64 = 22.5;

/// Vertical extent of a beam ray in the sensor frame. A hit fraction times
/// this is the beam's altitude; a miss reads as this full range.
pub const BEAM_VERTICAL_RANGE: f64 = 100.0;

const BEAM_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DvlFormat {
    #[serde(rename = "json_v1")]
    JsonV1,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DvlSample {
    pub timestamp: SimulationTime,
    /// Sampling period in effect when this ping was scheduled [ms].
    #[serde(rename = "time")]
    pub period_ms: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    /// `SEAFLOOR_DEPTH` minus the sensor depth at the physics step that
    /// emitted the sample. This is not the interpolated beam average that
    /// drives the sampling period.
    pub altitude: f64,
    /// Bottom lock: every interpolated beam altitude under
    /// [`MAXIMUM_ALTITUDE`].
    pub velocity_valid: bool,
    pub format: DvlFormat,
}

impl DvlSample {
    pub fn velocity(&self) -> Vec3 {
        Vec3::new(self.vx, self.vy, self.vz)
    }
}

#[derive(Debug, Clone, Copy)]
struct Observation {
    time: SimulationTime,
    altitudes: [f64; BEAM_COUNT],
    velocity: Vec3,
}

/// Sampling period for a given average beam altitude, clamped to
/// `[MIN_PERIOD, MAX_PERIOD]`.
pub fn period_for_altitude(altitude: f64) -> SimulationTime {
    let micros = interpolate(
        altitude,
        MINIMUM_ALTITUDE,
        MAXIMUM_ALTITUDE,
        MIN_PERIOD.as_micros() as f64,
        MAX_PERIOD.as_micros() as f64,
    );
    SimulationTime::from_micros(micros as u64)
}

#[derive(Debug, Clone)]
pub struct Dvl {
    mount: Mount,
    beam_end_points: [Vec3; BEAM_COUNT],
    period: SimulationTime,
    next_sample_time: SimulationTime,
    previous: Option<Observation>,
    queue: Vec<SensorSample>,
}

impl Dvl {
    pub fn new(mount: Mount, initial_period: SimulationTime) -> Self {
        let offset = 50.0 * BEAM_HALF_ANGLE_DEG.to_radians().tan();
        let initial_period = initial_period.max(SimulationTime::from_micros(1));
        Self {
            mount,
            beam_end_points: [
                Vec3::new(0.0, offset, 50.0),
                Vec3::new(0.0, -offset, 50.0),
                Vec3::new(offset, 0.0, 50.0),
                Vec3::new(-offset, 0.0, 50.0),
            ],
            period: initial_period,
            next_sample_time: initial_period,
            previous: None,
            queue: Vec::new(),
        }
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub fn period(&self) -> SimulationTime {
        self.period
    }

    pub fn next_sample_time(&self) -> SimulationTime {
        self.next_sample_time
    }

    /// World position of the transducer.
    pub fn world_position(&self, physics: &dyn PhysicsBackend, body: BodyId) -> Vec3 {
        self.mount.world_position(&physics.pose(body))
    }

    fn observe(&self, physics: &dyn PhysicsBackend, body: BodyId, time: SimulationTime) -> Observation {
        let pose = physics.pose(body);
        let origin = self.mount.world_position(&pose);

        let mut altitudes = [0.0; BEAM_COUNT];
        for (altitude, end_point) in altitudes.iter_mut().zip(&self.beam_end_points) {
            // Doubled so the beam still reaches the floor a little past the
            // bottom-lock limit.
            let in_body = local_to_world(&self.mount.position, &self.mount.orientation, &(end_point * 2.0));
            let in_world = local_to_world(&pose.position, &pose.orientation, &in_body);
            *altitude = physics.ray_cast(origin, in_world) * BEAM_VERTICAL_RANGE;
        }

        Observation {
            time,
            altitudes,
            velocity: physics.velocity(body).linear,
        }
    }
}

impl Default for Dvl {
    fn default() -> Self {
        Self::new(
            Mount::new(Vec3::new(-0.5, 0.0, 0.10), Quat::identity()),
            super::DEFAULT_SENSOR_PERIOD,
        )
    }
}

impl Sensor for Dvl {
    fn name(&self) -> &'static str {
        "dvl"
    }

    fn update(
        &mut self,
        physics: &dyn PhysicsBackend,
        body: BodyId,
        time: SimulationTime,
        _dt: SimulationTime,
    ) {
        let current = self.observe(physics, body, time);
        let previous = self.previous.unwrap_or(current);
        let altitude = SEAFLOOR_DEPTH - self.world_position(physics, body).z;

        let x1 = previous.time.as_micros() as f64;
        let x2 = current.time.as_micros() as f64;

        self.queue.clear();
        while self.next_sample_time <= time {
            let x = self.next_sample_time.as_micros() as f64;

            let mut beams = [0.0; BEAM_COUNT];
            for (i, beam) in beams.iter_mut().enumerate() {
                *beam = interpolate(x, x1, x2, previous.altitudes[i], current.altitudes[i]);
            }
            let velocity = interpolate_vec(x, x1, x2, &previous.velocity, &current.velocity);
            let average_altitude = beams.iter().sum::<f64>() / BEAM_COUNT as f64;

            self.queue.push(SensorSample::Dvl(DvlSample {
                timestamp: self.next_sample_time,
                period_ms: self.period.as_millis_f64(),
                vx: velocity.x,
                vy: velocity.y,
                vz: velocity.z,
                altitude,
                velocity_valid: beams.iter().all(|b| *b < MAXIMUM_ALTITUDE),
                format: DvlFormat::JsonV1,
            }));

            self.period = period_for_altitude(average_altitude);
            self.next_sample_time += self.period;
            trace!(
                "dvl ping at {} (avg altitude {:.2} m), next in {} us",
                x,
                average_altitude,
                self.period.as_micros()
            );
        }

        self.previous = Some(current);
    }

    fn samples(&self) -> &[SensorSample] {
        &self.queue
    }

    fn take_samples(&mut self) -> Vec<SensorSample> {
        std::mem::take(&mut self.queue)
    }
}
