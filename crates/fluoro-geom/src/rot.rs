use glam::{DQuat, DVec3};

use crate::rigid::RigidTransform;

/// Rotation about the x axis by `angle_rad`.
pub fn rot_x(angle_rad: f64) -> RigidTransform {
    RigidTransform::from_rotation(DQuat::from_rotation_x(angle_rad))
}

/// Rotation about the y axis by `angle_rad`.
pub fn rot_y(angle_rad: f64) -> RigidTransform {
    RigidTransform::from_rotation(DQuat::from_rotation_y(angle_rad))
}

/// Rotation about the z axis by `angle_rad`.
pub fn rot_z(angle_rad: f64) -> RigidTransform {
    RigidTransform::from_rotation(DQuat::from_rotation_z(angle_rad))
}

/// Translation along the x axis.
pub fn trans_x(t: f64) -> RigidTransform {
    RigidTransform::from_translation(DVec3::new(t, 0.0, 0.0))
}

/// Translation along the y axis.
pub fn trans_y(t: f64) -> RigidTransform {
    RigidTransform::from_translation(DVec3::new(0.0, t, 0.0))
}

/// Translation along the z axis.
pub fn trans_z(t: f64) -> RigidTransform {
    RigidTransform::from_translation(DVec3::new(0.0, 0.0, t))
}
