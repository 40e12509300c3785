use std::sync::Arc;

use approx::assert_relative_eq;
use glam::DVec3;
use rand::Rng;

use fluoro_geom::opt_vars::SE3OptVarsLieAlg;
use fluoro_geom::{CameraModel, RigidTransform};
use fluoro_image::Volume;
use fluoro_metrics::{ImgSimMetric2D, ImgSimMetric2DNCC};
use fluoro_raycast::{InterpMethod, RayCaster};
use fluoro_regi::{Intensity2D3DRegiEval, SingleRegiDebugResults};

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

fn test_cam() -> CameraModel {
    let intrins = CameraModel::intrins_from_focal_len(300.0, (10.0, 10.0), 1.0, 1.0);
    CameraModel::new(intrins, RigidTransform::IDENTITY, 21, 21, 1.0, 1.0)
}

fn guess_pose() -> RigidTransform {
    RigidTransform::from_translation(DVec3::new(0.0, 0.0, -150.0))
}

fn configured_caster(vol: Arc<Volume>) -> RayCaster {
    let mut rc = RayCaster::line_int();
    rc.set_volume(vol);
    rc.set_camera_model(test_cam());
    rc.set_ray_step_size(0.25);
    rc.set_interp_method(InterpMethod::Linear);
    rc
}

// renders the "observed" projection at the reference pose
fn observed_projection(vol: Arc<Volume>) -> Arc<fluoro_image::Image2<f32>> {
    let mut rc = configured_caster(vol);
    rc.set_num_projs(1);
    rc.allocate_resources();
    rc.distribute_xform_among_cam_models(&guess_pose());
    rc.compute(0);
    Arc::new(rc.proj(0))
}

fn build_eval(vol: Arc<Volume>) -> Intensity2D3DRegiEval {
    let fixed = observed_projection(vol.clone());

    let metric = ImgSimMetric2DNCC::new(fixed);
    let rc = configured_caster(vol);

    let mut eval = Intensity2D3DRegiEval::new(
        rc,
        vec![Box::new(metric)],
        Box::new(SE3OptVarsLieAlg),
        vec![guess_pose()],
    );
    eval.allocate_resources().unwrap();
    eval
}

#[test]
fn identity_parameters_score_best() {
    let vol = Arc::new(sphere_volume(41, 10.0, 1.0));
    let mut eval = build_eval(vol);

    let at_identity = eval.eval(&[vec![0.0; 6]]).unwrap();
    assert_relative_eq!(at_identity, 0.0, epsilon = 1e-9);

    // 2 units of in-plane translation moves the rendered sphere
    let shifted = eval.eval(&[vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0]]).unwrap();
    assert!(shifted > at_identity + 1e-6);
}

#[test]
fn random_in_plane_offsets_never_beat_identity() {
    let vol = Arc::new(sphere_volume(41, 10.0, 1.0));
    let mut eval = build_eval(vol);

    let at_identity = eval.eval(&[vec![0.0; 6]]).unwrap();

    let mut rng = rand::rng();
    for _ in 0..5 {
        let magnitude = rng.random_range(1.0..3.0);
        let angle: f64 = rng.random_range(0.0..std::f64::consts::TAU);

        let x = vec![
            0.0,
            0.0,
            0.0,
            magnitude * angle.cos(),
            magnitude * angle.sin(),
            0.0,
        ];

        let off_pose = eval.eval(&[x]).unwrap();
        assert!(off_pose > at_identity);
    }
}

#[test]
fn debug_capture_records_every_iteration() {
    let vol = Arc::new(sphere_volume(41, 10.0, 1.0));
    let mut eval = build_eval(vol);

    eval.start_debug(&[0], 8);

    eval.eval(&[vec![0.0; 6]]).unwrap();
    eval.eval(&[vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]]).unwrap();

    let dbg = eval.take_debug().unwrap();
    assert_eq!(dbg.num_iters(), 2);
    assert_eq!(dbg.opt_vars_name, "se3-lie-alg");
    assert_eq!(dbg.num_params, 6);
    assert_eq!(dbg.iter_vars[0][1][3], 1.0);
    assert!(dbg.sims[0] < dbg.sims[1]);

    // final pose reflects the last evaluated proposal
    assert_relative_eq!(dbg.final_poses[0].translation.x, 1.0, epsilon = 1e-9);
}

#[test]
fn debug_records_serialize_round_trip() {
    let vol = Arc::new(sphere_volume(41, 10.0, 1.0));
    let mut eval = build_eval(vol);

    eval.start_debug(&[0], 4);
    eval.eval(&[vec![0.0; 6]]).unwrap();
    let dbg = eval.take_debug().unwrap();

    let json = serde_json::to_string(&dbg).unwrap();
    let back: SingleRegiDebugResults = serde_json::from_str(&json).unwrap();

    assert_eq!(back.num_iters(), dbg.num_iters());
    assert_eq!(back.vols_used, dbg.vols_used);
    assert_eq!(back.sims, dbg.sims);
    assert_eq!(
        back.final_poses[0].translation,
        dbg.final_poses[0].translation
    );
}
