use crate::infra::recorder::{TelemetryEventType, TelemetryRecorder};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::error::RuntimeError;
use crate::runtime::logging::init_tracing;
use std::process::ExitCode;
use tracing::{debug, error, info};
use uuv_core::vehicle::spawn;
use uuv_core::{
    MotionController, PhysicsBackend, Pose, Quat, SimulatedWorld, SimulationTime, Simulator, Vec3,
    VehicleConfig, WorldConfig,
};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub steps: u64,
    pub samples: u64,
    pub final_position: Vec3,
    pub recorded_entries: u64,
}

pub fn run_from_args() -> ExitCode {
    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}\n");
            RuntimeConfig::print_help();
            return ExitCode::from(2);
        }
    };

    if config.show_help {
        RuntimeConfig::print_help();
        return ExitCode::SUCCESS;
    }

    let _guard = init_tracing(config.json_logs, config.log_dir.as_deref());

    match run(&config) {
        Ok(summary) => {
            debug!(
                steps = summary.steps,
                samples = summary.samples,
                recorded_entries = summary.recorded_entries,
                final_position = ?summary.final_position.as_slice(),
                "Exiting"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Simulation failed");
            ExitCode::FAILURE
        }
    }
}

pub fn run(config: &RuntimeConfig) -> Result<RunSummary, RuntimeError> {
    let vehicle_config = match &config.vehicle_config {
        Some(path) => {
            info!(path = %path.display(), "Loading vehicle configuration");
            VehicleConfig::from_path(path)?
        }
        None => VehicleConfig::default(),
    };

    let time_step = SimulationTime::from_micros(config.time_step_us);
    let mut world = SimulatedWorld::new(WorldConfig {
        time_step_s: time_step.as_secs_f64(),
        ..WorldConfig::default()
    });
    let vehicle = spawn(&mut world, &vehicle_config)?;
    let body = vehicle.body();
    if let Some(depth) = config.start_depth {
        world.reset_pose(body, Pose::new(Vec3::new(0.0, 0.0, depth), Quat::identity()));
    }

    let controller = MotionController::new(vehicle_config.gains, vehicle_config.mixer.clone())?;
    let mut sim = Simulator::new(world, vehicle, time_step).with_controller(controller);
    let target = Vec3::from(config.target);
    sim.set_desired_pose(Pose::new(target, Quat::identity()));

    let mut recorder = match &config.record_path {
        Some(path) => Some(TelemetryRecorder::new(path)?),
        None => None,
    };

    info!(
        run_seconds = config.run_seconds,
        time_step_us = config.time_step_us,
        motors = sim.vehicle().motors().len(),
        target = ?config.target,
        start_depth = config.start_depth.unwrap_or(0.0),
        recording = recorder.is_some(),
        "Starting simulation"
    );

    if let Some(recorder) = recorder.as_mut() {
        recorder.log_event(
            sim.time(),
            TelemetryEventType::RunStart,
            serde_json::json!({
                "run_seconds": config.run_seconds,
                "time_step_us": config.time_step_us,
                "target": config.target,
                "vehicle": vehicle_config,
            }),
        )?;
    }

    let report_every = SimulationTime::from_secs_f64(config.report_every_s);
    let mut next_report = report_every;

    while sim.fits_before(config.run_seconds) {
        sim.do_step();
        let samples = sim.vehicle_mut().take_samples();

        if let Some(recorder) = recorder.as_mut() {
            recorder.log_samples(&samples)?;
        }

        if sim.time() >= next_report {
            next_report += report_every;
            let position = sim.vehicle().position(sim.backend());
            let velocity = sim.vehicle().velocity(sim.backend());
            let outputs = sim
                .controller()
                .map(|c| c.motor_outputs().to_vec())
                .unwrap_or_default();
            info!(
                t = %sim.time(),
                x = position.x,
                y = position.y,
                depth = position.z,
                vz = velocity.z,
                depth_error = target.z - position.z,
                "Progress"
            );
            debug!(rpm = ?outputs, "Motor outputs");
            if let Some(recorder) = recorder.as_mut() {
                recorder.log_motors(sim.time(), sim.vehicle())?;
            }
        }
    }

    let final_position = sim.vehicle().position(sim.backend());
    let stats = sim.stats().clone();
    let mut recorded_entries = 0;
    if let Some(recorder) = recorder.as_mut() {
        recorder.log_event(
            sim.time(),
            TelemetryEventType::RunComplete,
            serde_json::json!({
                "steps": stats.steps_executed,
                "samples": stats.samples_emitted,
                "final_position": final_position,
            }),
        )?;
        recorder.flush()?;
        recorded_entries = recorder.entries();
    }

    info!(
        steps = stats.steps_executed,
        samples = stats.samples_emitted,
        final_depth = final_position.z,
        recorded_entries,
        "Simulation complete"
    );

    Ok(RunSummary {
        steps: stats.steps_executed,
        samples: stats.samples_emitted,
        final_position,
        recorded_entries,
    })
}
