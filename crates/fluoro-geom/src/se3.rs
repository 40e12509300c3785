use glam::{DMat3, DVec3};

use crate::rigid::RigidTransform;
use crate::so3;

const SMALL_ANGLE: f64 = 1e-9;

// Left Jacobian of SO(3): V = I + (1-cos t)/t^2 K + (t - sin t)/t^3 K^2.
fn left_jacobian(omega: DVec3) -> DMat3 {
    let theta = omega.length();
    let k = so3::hat(omega);

    let (a, b) = if theta > SMALL_ANGLE {
        let t2 = theta * theta;
        ((1.0 - theta.cos()) / t2, (theta - theta.sin()) / (t2 * theta))
    } else {
        (0.5, 1.0 / 6.0)
    };

    DMat3::IDENTITY + k * a + (k * k) * b
}

fn left_jacobian_inv(omega: DVec3) -> DMat3 {
    let theta = omega.length();
    let k = so3::hat(omega);

    let c = if theta > SMALL_ANGLE {
        let half = 0.5 * theta;
        (1.0 - half * half.cos() / half.sin()) / (theta * theta)
    } else {
        1.0 / 12.0
    };

    DMat3::IDENTITY - k * 0.5 + (k * k) * c
}

/// Exponential map se(3) -> SE(3).
///
/// `x` is ordered `[omega_x, omega_y, omega_z, v_x, v_y, v_z]`; the zero
/// vector maps exactly to the identity transform.
pub fn exp(x: &[f64; 6]) -> RigidTransform {
    let omega = DVec3::new(x[0], x[1], x[2]);
    let v = DVec3::new(x[3], x[4], x[5]);

    RigidTransform {
        rotation: so3::exp(omega),
        translation: left_jacobian(omega) * v,
    }
}

/// Logarithm map SE(3) -> se(3), inverse of [`exp`].
pub fn log(xform: &RigidTransform) -> [f64; 6] {
    let omega = so3::log(xform.rotation);
    let v = left_jacobian_inv(omega) * xform.translation;

    [omega.x, omega.y, omega.z, v.x, v.y, v.z]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exp_zero_is_identity() {
        let xform = exp(&[0.0; 6]);
        assert_eq!(xform.rotation, glam::DQuat::IDENTITY);
        assert_eq!(xform.translation, DVec3::ZERO);
    }

    #[test]
    fn test_pure_translation() {
        let xform = exp(&[0.0, 0.0, 0.0, 1.0, -2.0, 0.5]);
        assert_eq!(xform.translation, DVec3::new(1.0, -2.0, 0.5));
    }

    #[test]
    fn test_exp_log_roundtrip() {
        let xs = [
            [0.1, -0.2, 0.3, 4.0, 5.0, -6.0],
            [1.2, 0.0, 0.0, 0.0, 0.0, 10.0],
            [1e-8, 0.0, 1e-8, 1.0, 1.0, 1.0],
            [-0.7, 0.4, 0.9, -3.0, 0.0, 2.5],
        ];

        for x in xs {
            let back = log(&exp(&x));
            for i in 0..6 {
                assert_relative_eq!(back[i], x[i], epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_exp_log_roundtrip_random() {
        use rand::Rng;

        let mut rng = rand::rng();
        for _ in 0..50 {
            let x: [f64; 6] = std::array::from_fn(|i| {
                if i < 3 {
                    rng.random_range(-1.5..1.5)
                } else {
                    rng.random_range(-50.0..50.0)
                }
            });

            let back = log(&exp(&x));
            for i in 0..6 {
                assert_relative_eq!(back[i], x[i], epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn test_jacobian_inverse() {
        let omega = DVec3::new(0.3, -0.5, 0.2);
        let prod = left_jacobian(omega) * left_jacobian_inv(omega);
        for col in 0..3 {
            for row in 0..3 {
                let expected = if col == row { 1.0 } else { 0.0 };
                assert_relative_eq!(prod.col(col)[row], expected, epsilon = 1e-12);
            }
        }
    }
}
