use glam::DVec3;
use rayon::prelude::*;

use crate::rigid::RigidTransform;

/// Applies `xform` to every point of `src`, writing into `dst`.
///
/// `dst` must already have the same length as `src`.
pub fn transform_points_into(xform: &RigidTransform, src: &[DVec3], dst: &mut [DVec3]) {
    assert!(src.len() == dst.len());

    src.par_iter()
        .zip(dst.par_iter_mut())
        .for_each(|(s, d)| *d = xform.transform_point(*s));
}

/// Applies `xform` to every point of `src`.
pub fn transform_points(xform: &RigidTransform, src: &[DVec3]) -> Vec<DVec3> {
    let mut dst = vec![DVec3::ZERO; src.len()];
    transform_points_into(xform, src, &mut dst);
    dst
}

/// Centroid of a non-empty point set.
///
/// The reduction is associative and commutative; results agree across
/// thread counts only up to floating-point reassociation.
pub fn compute_centroid(pts: &[DVec3]) -> DVec3 {
    assert!(!pts.is_empty());

    let sum = pts
        .par_iter()
        .copied()
        .reduce(|| DVec3::ZERO, |a, b| a + b);

    sum / pts.len() as f64
}

/// Adds `offset` to every point of `src`.
pub fn offset_points(offset: DVec3, src: &[DVec3]) -> Vec<DVec3> {
    src.par_iter().map(|p| *p + offset).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_points_matches_scalar_path() {
        let xform = RigidTransform::new(
            glam::DQuat::from_rotation_y(0.4),
            DVec3::new(1.0, 2.0, 3.0),
        );

        let pts: Vec<DVec3> = (0..100)
            .map(|i| DVec3::new(i as f64, (i * 2) as f64, -(i as f64)))
            .collect();

        let out = transform_points(&xform, &pts);
        for (p, o) in pts.iter().zip(out.iter()) {
            let expected = xform.transform_point(*p);
            assert_relative_eq!((expected - *o).length(), 0.0);
        }
    }

    #[test]
    fn test_centroid_of_cube_corners() {
        let pts = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(0.0, 2.0, 0.0),
            DVec3::new(0.0, 0.0, 2.0),
            DVec3::new(2.0, 2.0, 0.0),
            DVec3::new(2.0, 0.0, 2.0),
            DVec3::new(0.0, 2.0, 2.0),
            DVec3::new(2.0, 2.0, 2.0),
        ];

        let c = compute_centroid(&pts);
        assert_relative_eq!(c.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_offset_points() {
        let pts = [DVec3::ZERO, DVec3::ONE];
        let out = offset_points(DVec3::new(1.0, 0.0, 0.0), &pts);
        assert_eq!(out[0], DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(out[1], DVec3::new(2.0, 1.0, 1.0));
    }
}
