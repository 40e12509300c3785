use glam::{DMat3, DMat4, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// A rigid transform in 3D: rotation followed by translation.
///
/// Stored as a unit quaternion plus a translation vector. All pose math in
/// the registration pipeline flows through this type; it is a plain value
/// and is copied freely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    /// Rotation component.
    pub rotation: DQuat,
    /// Translation component.
    pub translation: DVec3,
}

impl RigidTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// Creates a transform from a rotation and a translation.
    pub fn new(rotation: DQuat, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Creates a pure rotation.
    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            rotation,
            translation: DVec3::ZERO,
        }
    }

    /// Creates a pure translation.
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            rotation: DQuat::IDENTITY,
            translation,
        }
    }

    /// Extracts the rigid part of a homogeneous 4x4 matrix.
    ///
    /// The upper-left 3x3 block must be a rotation; no orthonormalization is
    /// performed beyond quaternion conversion.
    pub fn from_mat4(m: &DMat4) -> Self {
        let rot = DMat3::from_cols(
            m.x_axis.truncate(),
            m.y_axis.truncate(),
            m.z_axis.truncate(),
        );
        Self {
            rotation: DQuat::from_mat3(&rot).normalize(),
            translation: m.w_axis.truncate(),
        }
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Self {
        let inv_rot = self.rotation.inverse();
        Self {
            rotation: inv_rot,
            translation: -(inv_rot * self.translation),
        }
    }

    /// Applies the transform to a point.
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.rotation * p + self.translation
    }

    /// Applies only the rotation to a direction vector.
    pub fn transform_vector(&self, v: DVec3) -> DVec3 {
        self.rotation * v
    }

    /// The rotation as a 3x3 matrix.
    pub fn rotation_matrix(&self) -> DMat3 {
        DMat3::from_quat(self.rotation)
    }

    /// The transform as a homogeneous 4x4 matrix.
    pub fn as_mat4(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.rotation, self.translation)
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            rotation: self.rotation * rhs.rotation,
            translation: self.translation + (self.rotation * rhs.translation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_roundtrip() {
        let p = DVec3::new(1.0, -2.0, 3.0);
        assert_eq!(RigidTransform::IDENTITY.transform_point(p), p);
    }

    #[test]
    fn test_compose_inverse() {
        let a = RigidTransform::new(
            DQuat::from_axis_angle(DVec3::new(0.0, 1.0, 0.0), 0.3),
            DVec3::new(1.0, 2.0, 3.0),
        );
        let ident = a * a.inverse();
        assert_relative_eq!(ident.translation.length(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(ident.rotation.xyz().length(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matches_mat4_composition() {
        let a = RigidTransform::new(
            DQuat::from_axis_angle(DVec3::new(1.0, 0.0, 0.0), 0.2),
            DVec3::new(0.5, 0.0, -1.0),
        );
        let b = RigidTransform::new(
            DQuat::from_axis_angle(DVec3::new(0.0, 0.0, 1.0), -0.4),
            DVec3::new(0.0, 2.0, 0.0),
        );

        let p = DVec3::new(-1.0, 0.25, 4.0);
        let via_rigid = (a * b).transform_point(p);
        let via_mat = (a.as_mat4() * b.as_mat4()).transform_point3(p);

        assert_relative_eq!(via_rigid.x, via_mat.x, epsilon = 1e-12);
        assert_relative_eq!(via_rigid.y, via_mat.y, epsilon = 1e-12);
        assert_relative_eq!(via_rigid.z, via_mat.z, epsilon = 1e-12);
    }
}
