use crate::controller::MotionController;
use crate::hal::{PhysicsBackend, Pose};
use crate::timebase::{SimulationClock, SimulationTime};
use crate::vehicle::Vehicle;
use log::{debug, warn};
use std::collections::HashMap;

#[derive(Clone, Default, Debug)]
pub struct SimulationStats {
    pub steps_executed: u64,
    pub samples_emitted: u64,
    /// Samples emitted by the last step, all sensors.
    pub last_step_samples: usize,
    pub time_step_changes: u64,
}

/// Fixed-step driver: owns the clock, the backend and the vehicle.
///
/// Each step runs, in order: clock advance, backend step, sensor sampling,
/// controller update, motor ramp and force application. Forces applied at
/// step `n` are integrated by the backend at step `n + 1`.
pub struct Simulator<B: PhysicsBackend> {
    backend: B,
    clock: SimulationClock,
    time_step: SimulationTime,
    vehicle: Vehicle,
    controller: Option<MotionController>,
    desired_pose: Pose,
    stats: SimulationStats,
}

impl<B: PhysicsBackend> Simulator<B> {
    pub fn new(mut backend: B, vehicle: Vehicle, time_step: SimulationTime) -> Self {
        let time_step = time_step.max(SimulationTime::from_micros(1));
        backend.set_time_step(time_step.as_secs_f64());
        Self {
            backend,
            clock: SimulationClock::new(),
            time_step,
            vehicle,
            controller: None,
            desired_pose: Pose::default(),
            stats: SimulationStats::default(),
        }
    }

    pub fn with_controller(mut self, controller: MotionController) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn time(&self) -> SimulationTime {
        self.clock.now()
    }

    pub fn time_step(&self) -> SimulationTime {
        self.time_step
    }

    /// New step size in microseconds, used from the next step on.
    pub fn set_time_step(&mut self, micros: u64) {
        let step = SimulationTime::from_micros(micros.max(1));
        if step == self.time_step {
            return;
        }
        debug!(
            "time step {} us -> {} us at t={}",
            self.time_step.as_micros(),
            step.as_micros(),
            self.clock.now()
        );
        self.time_step = step;
        self.backend.set_time_step(step.as_secs_f64());
        self.stats.time_step_changes += 1;
    }

    pub fn desired_pose(&self) -> &Pose {
        &self.desired_pose
    }

    pub fn set_desired_pose(&mut self, pose: Pose) {
        self.desired_pose = pose;
    }

    /// Direct motor command. Overwritten on the next step when a controller
    /// is attached.
    pub fn set_rpm_motors(&mut self, rpms: &[f64]) {
        self.vehicle.set_desired_rpm_motors(rpms);
    }

    /// Thrust per motor name [N]. Unknown names are skipped.
    pub fn set_thrust_motors(&mut self, thrusts: &HashMap<String, f64>) {
        for (name, thrust) in thrusts {
            match self.vehicle.motor_index(name) {
                Some(index) => self.vehicle.set_desired_thrust_motor(index, *thrust),
                None => warn!("no motor named {name:?}, thrust command dropped"),
            }
        }
    }

    pub fn do_step(&mut self) {
        let dt = self.time_step;
        let time = self.clock.advance(dt);

        self.backend.step_simulation();

        self.vehicle.sample_sensors(&self.backend, time, dt);
        let emitted: usize = self.vehicle.sensors().iter().map(|s| s.samples().len()).sum();
        self.stats.last_step_samples = emitted;
        self.stats.samples_emitted += emitted as u64;

        if let Some(controller) = &mut self.controller {
            let state = self.vehicle.state(&self.backend);
            let rpms = controller.update(&state, &self.desired_pose, dt.as_secs_f64());
            self.vehicle.set_desired_rpm_motors(rpms);
        }

        self.vehicle.actuate(&mut self.backend, dt);
        self.stats.steps_executed += 1;
    }

    /// True when one more step still ends at or before `seconds`.
    pub fn fits_before(&self, seconds: f64) -> bool {
        self.clock.fits_before(self.time_step, seconds)
    }

    /// Step while a full step still ends at or before `seconds`.
    pub fn step_until(&mut self, seconds: f64) {
        while self.fits_before(seconds) {
            self.do_step();
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn vehicle_mut(&mut self) -> &mut Vehicle {
        &mut self.vehicle
    }

    pub fn controller(&self) -> Option<&MotionController> {
        self.controller.as_ref()
    }

    pub fn controller_mut(&mut self) -> Option<&mut MotionController> {
        self.controller.as_mut()
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }
}
