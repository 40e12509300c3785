use glam::{DMat3, DVec3};

use fluoro_image::Volume;

use crate::interp::{sample_gradient, sample_volume, InterpMethod};
use crate::params::{CollisionParams, LineIntKernel, OccContourParams, SurRenderParams};

/// Geometry of one ray expressed in continuous voxel-index space, clipped
/// to the volume bounds.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ray {
    /// Entry point into the volume.
    pub start_idx: DVec3,
    /// Per-step increment.
    pub step_idx: DVec3,
    /// Number of marching steps; `num_steps + 1` samples are taken.
    pub num_steps: usize,
    /// World distance from the source to the entry point.
    pub depth_at_entry: f64,
    /// World length of one step.
    pub step_world: f64,
    /// Unit ray direction in the camera frame.
    pub dir_cam_unit: DVec3,
}

// Slab clipping of p(t) = origin + t * dir against the index-space box.
// t is restricted to [0, inf): the volume may sit anywhere in front of the
// source, including beyond the detector plane.
fn clip_to_aabb(
    aabb_min: DVec3,
    aabb_max: DVec3,
    origin: DVec3,
    dir: DVec3,
) -> Option<(f64, f64)> {
    let mut t0 = 0.0f64;
    let mut t1 = f64::INFINITY;

    let o = origin.to_array();
    let d = dir.to_array();
    let bmin = aabb_min.to_array();
    let bmax = aabb_max.to_array();

    for axis in 0..3 {
        if d[axis].abs() < 1e-12 {
            if o[axis] < bmin[axis] || o[axis] > bmax[axis] {
                return None;
            }
        } else {
            let ta = (bmin[axis] - o[axis]) / d[axis];
            let tb = (bmax[axis] - o[axis]) / d[axis];
            let (tn, tf) = if ta < tb { (ta, tb) } else { (tb, ta) };

            t0 = t0.max(tn);
            t1 = t1.min(tf);
            if t0 > t1 {
                return None;
            }
        }
    }

    Some((t0, t1))
}

/// Builds the marching geometry for one detector pixel, or `None` when the
/// ray never intersects the volume.
///
/// `t` parameterizes the source-to-detector vector identically in camera
/// and index space (the map between them is affine), so world depths fall
/// out of the same parameter that drives the index-space marching.
#[allow(clippy::too_many_arguments)]
pub(crate) fn make_ray(
    pinhole_idx: DVec3,
    det_idx: DVec3,
    aabb_min: DVec3,
    aabb_max: DVec3,
    cam_len: f64,
    dir_cam_unit: DVec3,
    step_world: f64,
) -> Option<Ray> {
    let dir = det_idx - pinhole_idx;

    let (t0, t1) = clip_to_aabb(aabb_min, aabb_max, pinhole_idx, dir)?;

    let dt = step_world / cam_len;
    let num_steps = ((t1 - t0) / dt).floor() as usize;

    Some(Ray {
        start_idx: pinhole_idx + dir * t0,
        step_idx: dir * dt,
        num_steps,
        depth_at_entry: t0 * cam_len,
        step_world,
        dir_cam_unit,
    })
}

/// Line-integral reduction along the ray.
pub(crate) fn line_int_ray(
    vol: &Volume,
    interp: InterpMethod,
    kernel: LineIntKernel,
    ray: &Ray,
) -> f32 {
    let mut p = ray.start_idx;

    match kernel {
        LineIntKernel::Sum => {
            let mut sum = 0.0f32;
            for _ in 0..=ray.num_steps {
                sum += sample_volume(vol, p, interp);
                p += ray.step_idx;
            }
            sum * ray.step_world as f32
        }
        LineIntKernel::Max => {
            let mut max = f32::MIN;
            for _ in 0..=ray.num_steps {
                max = max.max(sample_volume(vol, p, interp));
                p += ray.step_idx;
            }
            max
        }
    }
}

// A surface hit: position in index space and the (possibly fractional,
// after refinement) number of steps from the entry point.
struct Collision {
    pos_idx: DVec3,
    steps_from_entry: f64,
}

fn find_collision(
    vol: &Volume,
    interp: InterpMethod,
    ray: &Ray,
    coll: &CollisionParams,
) -> Option<Collision> {
    let mut p = ray.start_idx;

    for k in 0..=ray.num_steps {
        if sample_volume(vol, p, interp) >= coll.thresh {
            if k == 0 || coll.num_backtracking_steps == 0 {
                return Some(Collision {
                    pos_idx: p,
                    steps_from_entry: k as f64,
                });
            }

            // bisect between the last below-threshold sample and this one
            let prev = p - ray.step_idx;
            let mut lo = 0.0f64;
            let mut hi = 1.0f64;
            for _ in 0..coll.num_backtracking_steps {
                let mid = 0.5 * (lo + hi);
                if sample_volume(vol, prev + ray.step_idx * mid, interp) >= coll.thresh {
                    hi = mid;
                } else {
                    lo = mid;
                }
            }

            return Some(Collision {
                pos_idx: prev + ray.step_idx * hi,
                steps_from_entry: (k - 1) as f64 + hi,
            });
        }

        p += ray.step_idx;
    }

    None
}

/// Depth reduction: world distance from the source to the first sample at
/// or above the collision threshold.
pub(crate) fn depth_ray(
    vol: &Volume,
    interp: InterpMethod,
    coll: &CollisionParams,
    ray: &Ray,
) -> Option<f32> {
    find_collision(vol, interp, ray, coll)
        .map(|c| (ray.depth_at_entry + c.steps_from_entry * ray.step_world) as f32)
}

// Surface normal in the camera frame, oriented toward the viewer.
fn surface_normal_cam(
    vol: &Volume,
    interp: InterpMethod,
    normal_xform: &DMat3,
    pos_idx: DVec3,
    view_dir: DVec3,
) -> Option<DVec3> {
    let n = *normal_xform * sample_gradient(vol, pos_idx, interp);
    let len = n.length();
    if len < 1e-12 {
        return None;
    }

    let mut n = n / len;
    if n.dot(view_dir) < 0.0 {
        n = -n;
    }

    Some(n)
}

/// Surface-render reduction: headlight shading at the refined collision
/// point.
pub(crate) fn surface_render_ray(
    vol: &Volume,
    interp: InterpMethod,
    params: &SurRenderParams,
    normal_xform: &DMat3,
    ray: &Ray,
) -> Option<f32> {
    let coll = find_collision(vol, interp, ray, &params.collision)?;

    let view_dir = -ray.dir_cam_unit;
    let shading = &params.shading;

    let mut val = shading.ambient_reflection_ratio;

    if let Some(n) = surface_normal_cam(vol, interp, normal_xform, coll.pos_idx, view_dir) {
        let n_dot_v = n.dot(view_dir) as f32;
        val += shading.diffuse_reflection_ratio * n_dot_v;

        // light direction equals the view direction, so the reflected ray
        // satisfies dot(R, V) = 2 (N.V)^2 - 1
        let r_dot_v = (2.0 * n_dot_v * n_dot_v - 1.0).max(0.0);
        val += shading.specular_reflection_ratio * r_dot_v.powf(shading.alpha_shininess);
    }

    Some(val)
}

/// Occluding-contour reduction: emits 1 when a surface crossing is grazing
/// (normal close to perpendicular to the ray).
pub(crate) fn occluding_contours_ray(
    vol: &Volume,
    interp: InterpMethod,
    params: &OccContourParams,
    normal_xform: &DMat3,
    ray: &Ray,
) -> Option<f32> {
    let dot_thresh = params.occlusion_angle_thresh_rad.sin();

    let mut p = ray.start_idx;
    let mut prev_above = false;

    for _ in 0..=ray.num_steps {
        let above = sample_volume(vol, p, interp) >= params.collision.thresh;

        if above && !prev_above {
            if let Some(n) =
                surface_normal_cam(vol, interp, normal_xform, p, -ray.dir_cam_unit)
            {
                if n.dot(ray.dir_cam_unit).abs() <= dot_thresh {
                    return Some(1.0);
                }
            }

            if params.stop_after_collision {
                return None;
            }
        }

        prev_above = above;
        p += ray.step_idx;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_volume(val: f32) -> Volume {
        Volume::from_size_val([10, 10, 10], DVec3::ONE, DVec3::ZERO, val)
    }

    fn axis_ray(start: DVec3, step: DVec3, num_steps: usize) -> Ray {
        Ray {
            start_idx: start,
            step_idx: step,
            num_steps,
            depth_at_entry: 100.0,
            step_world: step.length(),
            dir_cam_unit: DVec3::Z,
        }
    }

    #[test]
    fn test_clip_through_center() {
        let (t0, t1) = clip_to_aabb(
            DVec3::ZERO,
            DVec3::splat(9.0),
            DVec3::new(4.5, 4.5, -10.0),
            DVec3::new(0.0, 0.0, 20.0),
        )
        .unwrap();
        assert_relative_eq!(t0, 0.5, epsilon = 1e-12);
        assert_relative_eq!(t1, 0.95, epsilon = 1e-12);
    }

    #[test]
    fn test_clip_miss() {
        assert!(clip_to_aabb(
            DVec3::ZERO,
            DVec3::splat(9.0),
            DVec3::new(20.0, 4.5, -10.0),
            DVec3::new(0.0, 0.0, 20.0),
        )
        .is_none());
    }

    #[test]
    fn test_line_int_sum_counts_path_length() {
        let vol = unit_volume(1.0);
        // 10 steps of world length 0.5 through a unit-intensity volume
        let ray = axis_ray(DVec3::new(4.5, 4.5, 0.0), DVec3::new(0.0, 0.0, 0.5), 10);

        let v = line_int_ray(&vol, InterpMethod::Linear, LineIntKernel::Sum, &ray);
        assert_relative_eq!(v, 11.0 * 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_depth_reports_first_crossing() {
        let mut vol = unit_volume(0.0);
        // plane z >= 6 is "bone"
        for z in 6..10usize {
            for y in 0..10usize {
                for x in 0..10usize {
                    vol.as_slice_mut()[(z * 10 + y) * 10 + x] = 500.0;
                }
            }
        }

        let ray = axis_ray(DVec3::new(4.5, 4.5, 0.0), DVec3::new(0.0, 0.0, 1.0), 9);
        let coll = CollisionParams {
            thresh: 200.0,
            num_backtracking_steps: 0,
        };

        let d = depth_ray(&vol, InterpMethod::NearestNeighbor, &coll, &ray).unwrap();
        // entry depth 100, crossing after 6 unit steps of the marcher
        assert_relative_eq!(d, 106.0, epsilon = 1e-5);
    }

    #[test]
    fn test_backtracking_refines_crossing() {
        let mut vol = unit_volume(0.0);
        for z in 5..10usize {
            for y in 0..10usize {
                for x in 0..10usize {
                    vol.as_slice_mut()[(z * 10 + y) * 10 + x] = 1000.0;
                }
            }
        }

        // coarse steps of 2 voxels; linear interpolation puts the 500
        // iso-crossing at z = 4.5
        let ray = axis_ray(DVec3::new(4.5, 4.5, 0.0), DVec3::new(0.0, 0.0, 2.0), 4);
        let coll = CollisionParams {
            thresh: 500.0,
            num_backtracking_steps: 30,
        };

        let c = find_collision(&vol, InterpMethod::Linear, &ray, &coll).unwrap();
        assert_relative_eq!(c.pos_idx.z, 4.5, epsilon = 1e-3);
    }

    #[test]
    fn test_miss_returns_none() {
        let vol = unit_volume(0.0);
        let ray = axis_ray(DVec3::new(4.5, 4.5, 0.0), DVec3::new(0.0, 0.0, 1.0), 9);
        let coll = CollisionParams::default();

        assert!(depth_ray(&vol, InterpMethod::Linear, &coll, &ray).is_none());
    }
}
