use glam::{DMat3, DQuat, DVec3};

// Below this rotation magnitude the closed forms are replaced by their
// series expansions to stay finite.
const SMALL_ANGLE: f64 = 1e-9;

/// Skew-symmetric matrix of `v` (the so(3) hat operator).
pub fn hat(v: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, v.z, -v.y),
        DVec3::new(-v.z, 0.0, v.x),
        DVec3::new(v.y, -v.x, 0.0),
    )
}

/// Exponential map so(3) -> SO(3) as a unit quaternion.
pub fn exp(omega: DVec3) -> DQuat {
    let theta = omega.length();

    let (w, b) = if theta > SMALL_ANGLE {
        let half = 0.5 * theta;
        (half.cos(), half.sin() / theta)
    } else {
        // sin(t/2)/t ~ 1/2 - t^2/48
        (1.0 - theta * theta / 8.0, 0.5 - theta * theta / 48.0)
    };

    let xyz = omega * b;
    DQuat::from_xyzw(xyz.x, xyz.y, xyz.z, w).normalize()
}

/// Logarithm map SO(3) -> so(3).
pub fn log(q: DQuat) -> DVec3 {
    // force the scalar part positive so the returned angle is in [0, pi]
    let q = if q.w < 0.0 { -q } else { q };

    let vec = q.xyz();
    let vec_norm = vec.length();

    if vec_norm > SMALL_ANGLE {
        vec * (2.0 * vec_norm.atan2(q.w) / vec_norm)
    } else {
        // 2/w * (1 - |v|^2 / (3 w^2))
        vec * (2.0 / q.w) * (1.0 - vec_norm * vec_norm / (3.0 * q.w * q.w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exp_zero_is_identity() {
        let q = exp(DVec3::ZERO);
        assert_eq!(q, DQuat::IDENTITY);
    }

    #[test]
    fn test_exp_log_roundtrip() {
        let omegas = [
            DVec3::new(0.1, -0.2, 0.3),
            DVec3::new(1.5, 0.0, 0.0),
            DVec3::new(0.0, 1e-7, 0.0),
            DVec3::new(-0.4, 0.9, 2.0),
        ];

        for omega in omegas {
            let back = log(exp(omega));
            assert_relative_eq!(back.x, omega.x, epsilon = 1e-9);
            assert_relative_eq!(back.y, omega.y, epsilon = 1e-9);
            assert_relative_eq!(back.z, omega.z, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_exp_matches_axis_angle() {
        let axis = DVec3::new(1.0, 2.0, -0.5).normalize();
        let angle = 0.7;
        let q = exp(axis * angle);
        let expected = DQuat::from_axis_angle(axis, angle);
        assert_relative_eq!(q.dot(expected).abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hat_antisymmetric() {
        let m = hat(DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(m.x_axis.y, 3.0);
        assert_eq!(m.y_axis.x, -3.0);
        assert_eq!(m.z_axis.x, 2.0);
    }
}
