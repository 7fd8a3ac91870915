//! World ↔ body frame conversions.
//!
//! The world frame is fixed with `z` pointing down (depth grows with `z`).
//! The body frame is attached to the vehicle: `x` forward, `y` starboard,
//! `z` down. An orientation `q` maps body-frame vectors into the world frame.

use crate::{Quat, Vec3};

/// Rotate a world-frame direction into the body frame.
pub fn rotate_to_local(orientation: &Quat, v: &Vec3) -> Vec3 {
    orientation.inverse_transform_vector(v)
}

/// Rotate a body-frame direction into the world frame.
pub fn rotate_to_world(orientation: &Quat, v: &Vec3) -> Vec3 {
    orientation.transform_vector(v)
}

/// Transform a point given in a frame located at `origin` with `orientation`
/// into the parent frame.
pub fn local_to_world(origin: &Vec3, orientation: &Quat, point: &Vec3) -> Vec3 {
    origin + orientation.transform_vector(point)
}

/// Inverse of [`local_to_world`].
pub fn world_to_local(origin: &Vec3, orientation: &Quat, point: &Vec3) -> Vec3 {
    orientation.inverse_transform_vector(&(point - origin))
}

/// Roll angle (rotation about body `x`) of an orientation, in radians.
pub fn roll_of(orientation: &Quat) -> f64 {
    orientation.euler_angles().0
}
