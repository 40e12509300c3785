use std::sync::Arc;

use approx::assert_relative_eq;
use glam::DVec3;

use fluoro_geom::{CameraModel, RigidTransform};
use fluoro_image::{Image2, Volume};
use fluoro_metrics::{
    ImgSimMetric2D, ImgSimMetric2DGradNCC, ImgSimMetric2DNCC, ImgSimMetric2DSSD, MaskImage,
    SimMetricError,
};
use fluoro_raycast::{InterpMethod, RayCaster};

fn sphere_volume(n: usize, radius: f64, intensity: f32) -> Volume {
    let half = (n as f64 - 1.0) / 2.0;
    let origin = DVec3::splat(-half);

    let mut vol = Volume::from_size_val([n, n, n], DVec3::ONE, origin, 0.0);
    let data = vol.as_slice_mut();

    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let p = DVec3::new(x as f64, y as f64, z as f64) + origin;
                if p.length() <= radius {
                    data[(z * n + y) * n + x] = intensity;
                }
            }
        }
    }

    vol
}

// renders two projections: index 0 at the reference pose, index 1 shifted
fn rendered_pair() -> RayCaster {
    let intrins = CameraModel::intrins_from_focal_len(300.0, (10.0, 10.0), 1.0, 1.0);
    let cam = CameraModel::new(intrins, RigidTransform::IDENTITY, 21, 21, 1.0, 1.0);

    let mut rc = RayCaster::line_int();
    rc.set_volume(Arc::new(sphere_volume(41, 10.0, 1.0)));
    rc.set_camera_model(cam);
    rc.set_num_projs(2);
    rc.set_ray_step_size(0.25);
    rc.set_interp_method(InterpMethod::Linear);
    rc.allocate_resources();

    rc.set_xforms_cam_to_phys(vec![
        RigidTransform::from_translation(DVec3::new(0.0, 0.0, -150.0)),
        RigidTransform::from_translation(DVec3::new(3.0, 0.0, -150.0)),
    ]);
    rc.use_proj_store_replace_method();
    rc.compute(0);

    rc
}

fn fixed_from_proj(rc: &RayCaster, proj_idx: usize) -> Arc<Image2<f32>> {
    Arc::new(rc.proj(proj_idx))
}

#[test]
fn ssd_is_zero_for_identical_images() {
    let rc = rendered_pair();
    let fixed = fixed_from_proj(&rc, 0);

    let mut metric = ImgSimMetric2DSSD::new(fixed);
    metric.base_mut().set_num_moving_images(2);
    metric.allocate_resources();
    metric.set_mov_imgs_buf_from_ray_caster(&rc, 0).unwrap();

    metric.compute(&rc).unwrap();

    assert_relative_eq!(metric.base().sim_val(0), 0.0, epsilon = 1e-12);
    assert!(metric.base().sim_val(1) > 0.0);
}

#[test]
fn ncc_prefers_the_matching_pose() {
    let rc = rendered_pair();
    let fixed = fixed_from_proj(&rc, 0);

    let mut metric = ImgSimMetric2DNCC::new(fixed);
    metric.base_mut().set_num_moving_images(2);
    metric.allocate_resources();
    metric.set_mov_imgs_buf_from_ray_caster(&rc, 0).unwrap();

    metric.compute(&rc).unwrap();

    // 1 - NCC: zero for the identical projection, larger for the shifted
    assert_relative_eq!(metric.base().sim_val(0), 0.0, epsilon = 1e-9);
    assert!(metric.base().sim_val(1) > metric.base().sim_val(0));
}

#[test]
fn grad_ncc_prefers_the_matching_pose() {
    let rc = rendered_pair();
    let fixed = fixed_from_proj(&rc, 0);

    let mut metric = ImgSimMetric2DGradNCC::new(fixed);
    metric.base_mut().set_num_moving_images(2);
    metric.allocate_resources();
    metric.set_mov_imgs_buf_from_ray_caster(&rc, 0).unwrap();

    metric.compute(&rc).unwrap();

    assert_relative_eq!(metric.base().sim_val(0), 0.0, epsilon = 1e-9);
    assert!(metric.base().sim_val(1) > metric.base().sim_val(0));
}

#[test]
fn binding_with_offset_scores_the_tail_projection() {
    let rc = rendered_pair();
    let fixed = fixed_from_proj(&rc, 1);

    let mut metric = ImgSimMetric2DSSD::new(fixed);
    metric.base_mut().set_num_moving_images(1);
    metric.allocate_resources();
    metric.set_mov_imgs_buf_from_ray_caster(&rc, 1).unwrap();

    metric.compute(&rc).unwrap();
    assert_relative_eq!(metric.base().sim_val(0), 0.0, epsilon = 1e-12);
}

#[test]
fn binding_range_is_validated() {
    let rc = rendered_pair();
    let fixed = fixed_from_proj(&rc, 0);

    let mut metric = ImgSimMetric2DSSD::new(fixed);
    metric.base_mut().set_num_moving_images(2);
    metric.allocate_resources();

    assert!(matches!(
        metric.set_mov_imgs_buf_from_ray_caster(&rc, 1),
        Err(SimMetricError::ProjRangeOutOfBounds(1, 3, 2))
    ));
}

#[test]
fn masked_ncc_ignores_pixels_outside_the_mask() {
    let rc = rendered_pair();
    let fixed = fixed_from_proj(&rc, 0);
    let npix = fixed.num_pixels();

    let mut metric = ImgSimMetric2DNCC::new(fixed);
    metric.base_mut().set_num_moving_images(1);
    metric.allocate_resources();
    metric.set_mov_imgs_buf_from_ray_caster(&rc, 0).unwrap();

    assert_eq!(metric.num_valid_pixels(), Some(npix));

    // mask away the left half of the detector
    let mut mask = MaskImage::from_size_val(21, 21, 1.0, 1.0, 0u8);
    for r in 0..21 {
        for c in 10..21 {
            mask.set(r, c, 1);
        }
    }
    metric.set_mask(Some(Arc::new(mask)));

    metric.compute(&rc).unwrap();
    assert_eq!(metric.num_valid_pixels(), Some(21 * 11));
}
