#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole camera model with detector geometry.
pub mod camera;

/// Pose parameterizations mapping optimizer vectors to rigid transforms.
pub mod opt_vars;

/// Parallel point-cloud helpers.
pub mod pointcloud;

/// Rigid transform value type.
pub mod rigid;

/// Single-axis rotation and translation factors.
pub mod rot;

/// se(3) exponential and logarithm maps.
pub mod se3;

/// so(3) exponential and logarithm maps.
pub mod so3;

pub use camera::CameraModel;
pub use rigid::RigidTransform;
