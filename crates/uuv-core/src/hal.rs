use crate::{Quat, Vec3};

/// Handle of a rigid body owned by a physics backend. Only backends mint
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub(crate) usize);

/// Frame in which a force/torque and its application point are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Body frame: vector and point rotate with the body, point relative to
    /// the centre of mass.
    Local,
    /// World frame: vector and point in world coordinates.
    World,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::zeros(), Quat::identity())
    }
}

/// Linear and angular velocity, both in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Twist {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Twist {
    pub fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }
}

/// Ray-cast fraction reported when nothing is hit.
pub const RAY_MISS: f64 = 1.0;

/// The surface of a rigid-body engine the simulation relies on.
///
/// Forces and torques accumulate until the next [`step_simulation`] and are
/// cleared by it.
///
/// [`step_simulation`]: PhysicsBackend::step_simulation
pub trait PhysicsBackend {
    fn pose(&self, body: BodyId) -> Pose;
    fn velocity(&self, body: BodyId) -> Twist;
    fn apply_force(&mut self, body: BodyId, force: Vec3, at: Vec3, frame: Frame);
    fn apply_torque(&mut self, body: BodyId, torque: Vec3, frame: Frame);
    /// Fraction in `[0, 1]` along `from → to` of the first hit, [`RAY_MISS`]
    /// when there is none.
    fn ray_cast(&self, from: Vec3, to: Vec3) -> f64;
    fn set_time_step(&mut self, seconds: f64);
    fn step_simulation(&mut self);

    /// Teleport a body. Test and scenario setup only.
    fn reset_pose(&mut self, body: BodyId, pose: Pose);
    /// Overwrite a body's velocity. Test and scenario setup only.
    fn reset_velocity(&mut self, body: BodyId, twist: Twist);
}
