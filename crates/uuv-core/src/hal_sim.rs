use crate::hal::{BodyId, Frame, PhysicsBackend, Pose, Twist, RAY_MISS};
use crate::{Quat, Vec3, GRAVITY};
use log::warn;
use serde::{Deserialize, Serialize};

/// Mass of the default vehicle hull [kg].
pub const DEFAULT_BODY_MASS: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    pub mass: f64,
    /// Principal moments of inertia about body x, y, z [kg·m²].
    pub inertia: Vec3,
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            mass: DEFAULT_BODY_MASS,
            inertia: Vec3::new(1.0, 2.5, 2.5),
            position: Vec3::zeros(),
            orientation: Quat::identity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Gravitational acceleration along world +z (down) [m/s²].
    pub gravity: f64,
    /// Depth of the flat seafloor plane [m].
    pub seafloor_depth: f64,
    pub time_step_s: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            seafloor_depth: crate::sensors::dvl::SEAFLOOR_DEPTH,
            time_step_s: 0.004,
        }
    }
}

#[derive(Debug, Clone)]
struct RigidBody {
    mass: f64,
    inertia: Vec3,
    pose: Pose,
    twist: Twist,
    force: Vec3,
    torque: Vec3,
}

impl RigidBody {
    fn integrate(&mut self, gravity: f64, dt: f64) {
        // Semi-implicit Euler: velocities first, then positions.
        let acceleration = self.force / self.mass + Vec3::new(0.0, 0.0, gravity);
        self.twist.linear += acceleration * dt;
        self.pose.position += self.twist.linear * dt;

        let q = self.pose.orientation;
        let omega_body = q.inverse_transform_vector(&self.twist.angular);
        let torque_body = q.inverse_transform_vector(&self.torque);
        let momentum = self.inertia.component_mul(&omega_body);
        let alpha = (torque_body - omega_body.cross(&momentum)).component_div(&self.inertia);
        let omega_body = omega_body + alpha * dt;
        self.twist.angular = q.transform_vector(&omega_body);

        let mut orientation = Quat::from_scaled_axis(self.twist.angular * dt) * q;
        orientation.renormalize();
        self.pose.orientation = orientation;

        self.force = Vec3::zeros();
        self.torque = Vec3::zeros();
    }
}

/// Minimal rigid-body world: free-floating bodies over a flat seafloor.
#[derive(Debug, Clone)]
pub struct SimulatedWorld {
    config: WorldConfig,
    bodies: Vec<RigidBody>,
    steps: u64,
}

impl SimulatedWorld {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            bodies: Vec::new(),
            steps: 0,
        }
    }

    pub fn add_body(&mut self, config: &BodyConfig) -> BodyId {
        self.bodies.push(RigidBody {
            mass: config.mass,
            inertia: config.inertia,
            pose: Pose::new(config.position, config.orientation),
            twist: Twist::default(),
            force: Vec3::zeros(),
            torque: Vec3::zeros(),
        });
        BodyId(self.bodies.len() - 1)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body(&self, id: BodyId) -> Option<&RigidBody> {
        let body = self.bodies.get(id.0);
        if body.is_none() {
            warn!("unknown body {id:?} in a world of {} bodies", self.bodies.len());
        }
        body
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        let count = self.bodies.len();
        let body = self.bodies.get_mut(id.0);
        if body.is_none() {
            warn!("unknown body {id:?} in a world of {count} bodies");
        }
        body
    }
}

impl Default for SimulatedWorld {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl PhysicsBackend for SimulatedWorld {
    // Unknown bodies read as at rest at the origin.
    fn pose(&self, body: BodyId) -> Pose {
        self.body(body).map(|b| b.pose).unwrap_or_default()
    }

    fn velocity(&self, body: BodyId) -> Twist {
        self.body(body).map(|b| b.twist).unwrap_or_default()
    }

    fn apply_force(&mut self, body: BodyId, force: Vec3, at: Vec3, frame: Frame) {
        let Some(b) = self.body_mut(body) else {
            return;
        };
        let q = b.pose.orientation;
        let (force_world, lever) = match frame {
            Frame::Local => (q.transform_vector(&force), q.transform_vector(&at)),
            Frame::World => (force, at - b.pose.position),
        };
        b.force += force_world;
        b.torque += lever.cross(&force_world);
    }

    fn apply_torque(&mut self, body: BodyId, torque: Vec3, frame: Frame) {
        let Some(b) = self.body_mut(body) else {
            return;
        };
        b.torque += match frame {
            Frame::Local => b.pose.orientation.transform_vector(&torque),
            Frame::World => torque,
        };
    }

    fn ray_cast(&self, from: Vec3, to: Vec3) -> f64 {
        let floor = self.config.seafloor_depth;
        if from.z >= floor {
            return 0.0;
        }
        let dz = to.z - from.z;
        if dz <= 0.0 {
            return RAY_MISS;
        }
        let fraction = (floor - from.z) / dz;
        if fraction <= 1.0 {
            fraction
        } else {
            RAY_MISS
        }
    }

    fn set_time_step(&mut self, seconds: f64) {
        self.config.time_step_s = seconds;
    }

    fn step_simulation(&mut self) {
        let dt = self.config.time_step_s;
        let gravity = self.config.gravity;
        for body in &mut self.bodies {
            body.integrate(gravity, dt);
        }
        self.steps += 1;
    }

    fn reset_pose(&mut self, body: BodyId, pose: Pose) {
        if let Some(b) = self.body_mut(body) {
            b.pose = pose;
        }
    }

    fn reset_velocity(&mut self, body: BodyId, twist: Twist) {
        if let Some(b) = self.body_mut(body) {
            b.twist = twist;
        }
    }
}
