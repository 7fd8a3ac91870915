use uuv_core::sensors::dvl::{DvlSample, MAXIMUM_ALTITUDE, SEAFLOOR_DEPTH};
use uuv_core::vehicle::spawn;
use uuv_core::{
    ControllerGains, MixerConfig, MotionController, PhysicsBackend, Pose, Quat, SensorSample,
    Sensor, SimulatedWorld, SimulationTime, Simulator, Twist, Vec3, VehicleConfig, VehicleState,
};

fn simulator() -> Simulator<SimulatedWorld> {
    let mut world = SimulatedWorld::default();
    let vehicle = spawn(&mut world, &VehicleConfig::default()).unwrap();
    Simulator::new(world, vehicle, SimulationTime::from_micros(4_000))
}

fn default_controller() -> MotionController {
    MotionController::new(ControllerGains::default(), MixerConfig::default()).unwrap()
}

fn dvl_samples(sim: &Simulator<SimulatedWorld>) -> Vec<DvlSample> {
    sim.vehicle()
        .dvl()
        .samples()
        .iter()
        .filter_map(|s| match s {
            SensorSample::Dvl(d) => Some(*d),
            _ => None,
        })
        .collect()
}

fn within(value: f64, a: f64, b: f64) -> bool {
    const EPS: f64 = 1e-9;
    value >= a.min(b) - EPS && value <= a.max(b) + EPS
}

#[test]
fn dvl_samples_are_bounded_by_physics_steps() {
    let mut sim = simulator();
    let body = sim.vehicle().body();
    sim.backend_mut()
        .reset_pose(body, Pose::new(Vec3::new(0.0, 0.0, 80.0), Quat::identity()));
    sim.backend_mut()
        .reset_velocity(body, Twist::new(Vec3::new(1.0, 1.0, 1.0), Vec3::zeros()));

    let sensor_altitude =
        |sim: &Simulator<SimulatedWorld>| SEAFLOOR_DEPTH - sim.vehicle().dvl().world_position(sim.backend(), body).z;

    let mut previous_altitude = sensor_altitude(&sim);
    let mut previous_velocity = sim.backend().velocity(body).linear;
    let mut total = 0;

    for _ in 0..1_000 {
        sim.do_step();
        let altitude = sensor_altitude(&sim);
        let velocity = sim.backend().velocity(body).linear;

        for sample in dvl_samples(&sim) {
            total += 1;
            assert!(within(sample.altitude, previous_altitude, altitude));
            assert!(within(sample.vx, previous_velocity.x, velocity.x));
            assert!(within(sample.vy, previous_velocity.y, velocity.y));
            assert!(within(sample.vz, previous_velocity.z, velocity.z));
            // ~20 m above the floor: every beam has bottom lock.
            assert!(sample.velocity_valid);
            assert!(sample.altitude < MAXIMUM_ALTITUDE);
        }

        previous_altitude = altitude;
        previous_velocity = velocity;
    }

    // Four simulated seconds at roughly 8 Hz.
    assert!(total > 20, "only {total} pings");
}

#[test]
fn dvl_timestamps_increase_across_steps() {
    let mut sim = simulator();
    let mut stamps = Vec::new();
    for _ in 0..500 {
        sim.do_step();
        stamps.extend(dvl_samples(&sim).iter().map(|s| s.timestamp));
        for sample in dvl_samples(&sim) {
            assert!(sample.timestamp <= sim.time());
        }
    }
    assert!(!stamps.is_empty());
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn controller_is_deterministic() {
    let script: Vec<(VehicleState, Pose)> = (0..500)
        .map(|i| {
            let t = i as f64 * 0.004;
            let state = VehicleState {
                position: Vec3::new(t.sin(), 0.5 * t, 0.1 * t * t),
                orientation: Quat::from_euler_angles(0.1 * t.sin(), 0.05 * t, -0.2 * t),
                velocity: Vec3::new(t.cos(), 0.5, 0.2 * t),
                angular_velocity: Vec3::new(0.0, 0.05, -0.2),
            };
            let desired = Pose::new(
                Vec3::new(3.0, -1.0, 5.0),
                Quat::from_euler_angles(0.0, 0.1, 1.0),
            );
            (state, desired)
        })
        .collect();

    let run = || {
        let mut controller = default_controller();
        script
            .iter()
            .flat_map(|(state, desired)| controller.update(state, desired, 0.004).to_vec())
            .map(f64::to_bits)
            .collect::<Vec<u64>>()
    };

    assert_eq!(run(), run());
}

#[test]
fn simulation_is_deterministic() {
    let run = || {
        let mut sim = simulator().with_controller(default_controller());
        sim.set_desired_pose(Pose::new(
            Vec3::new(1.0, 0.5, 3.0),
            Quat::from_euler_angles(0.0, 0.0, 0.5),
        ));
        sim.step_until(5.0);
        let body = sim.vehicle().body();
        let pose = sim.backend().pose(body);
        (
            pose.position.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            pose.orientation.coords.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            sim.stats().samples_emitted,
        )
    };
    assert_eq!(run(), run());
}

fn vertical_command(sim: &Simulator<SimulatedWorld>) -> f64 {
    sim.controller().unwrap().motor_outputs()[6]
}

#[test]
fn reaches_deeper_target() {
    let mut sim = simulator().with_controller(default_controller());
    let target = Vec3::new(0.0, 0.0, 2.0);
    sim.set_desired_pose(Pose::new(target, Quat::identity()));
    let body = sim.vehicle().body();

    sim.do_step();
    let initial = sim.controller().unwrap().motor_outputs().to_vec();
    // Vertical pair pushes down (+z) toward the target.
    assert!(initial[6] > 0.0 && initial[7] > 0.0);

    let mut peak_depth = f64::MIN;
    // Largest vertical command magnitude inside each window after the transient.
    let mut window_peaks = Vec::new();
    let mut depths = Vec::new();
    for checkpoint in [1.0, 5.0, 15.0, 30.0, 60.0, 120.0] {
        let mut largest = 0.0_f64;
        while sim.fits_before(checkpoint) {
            sim.do_step();
            peak_depth = peak_depth.max(sim.backend().pose(body).position.z);
            largest = largest.max(vertical_command(&sim).abs());
        }
        depths.push(sim.backend().pose(body).position.z);
        if checkpoint > 15.0 {
            window_peaks.push(largest);
        }
    }

    assert!(depths[0] > 0.3, "depth after 1 s: {}", depths[0]);
    assert!(depths[1] > 1.5, "depth after 5 s: {}", depths[1]);
    assert!(peak_depth < 2.3, "overshoot to {peak_depth}");
    assert!((depths[4] - target.z).abs() < 0.1, "depth after 60 s: {}", depths[4]);
    assert!((depths[5] - target.z).abs() < 0.05, "final depth {}", depths[5]);

    let pose = sim.backend().pose(body);
    assert!(pose.position.x.abs() < 1e-6 && pose.position.y.abs() < 1e-6);

    // 15-30 s, 30-60 s, 60-120 s.
    assert!(
        window_peaks.windows(2).all(|w| w[1] < w[0]),
        "vertical command not decaying: {window_peaks:?}"
    );
    let late = vertical_command(&sim);
    assert!(late.abs() < 1.0, "residual vertical command {late}");
    assert!(late.abs() < initial[6].abs());
}
