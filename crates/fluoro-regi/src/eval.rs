use fluoro_geom::opt_vars::SE3OptVars;
use fluoro_geom::RigidTransform;
use fluoro_metrics::{ImgSimMetric2D, SimMetricError};
use fluoro_raycast::{RayCastError, RayCastSceneFn, RayCaster, SceneInterFrames};

use crate::debug::SingleRegiDebugResults;

/// Errors surfaced by the evaluation pipeline.
#[derive(thiserror::Error, Debug)]
pub enum RegiError {
    /// A metric rejected its configuration or computation.
    #[error(transparent)]
    SimMetric(#[from] SimMetricError),

    /// A ray-caster capability error.
    #[error(transparent)]
    RayCast(#[from] RayCastError),
}

/// The pose-to-score pipeline an external optimizer drives.
///
/// Holds a ray caster, one similarity metric per camera view, a pose
/// parameterization shared by every moving object, and per-object reference
/// poses. Each [`Intensity2D3DRegiEval::eval`] call maps the optimizer's
/// parameter vectors to camera-to-volume transforms, renders the
/// multi-object scene, scores every view, and returns the mean similarity
/// (lower is better). The optimization algorithm itself stays outside; any
/// driver that proposes parameter vectors can call `eval`.
pub struct Intensity2D3DRegiEval {
    ray_caster: RayCaster,
    metrics: Vec<Box<dyn ImgSimMetric2D>>,
    opt_vars: Box<dyn SE3OptVars>,
    regi_xform_guesses: Vec<RigidTransform>,
    inter_frames: Option<SceneInterFrames>,
    last_poses: Vec<RigidTransform>,
    debug: Option<SingleRegiDebugResults>,
}

impl Intensity2D3DRegiEval {
    /// Assembles the pipeline.
    ///
    /// One metric per camera model of the ray caster, and one reference
    /// pose (initial camera-world-to-volume transform) per moving object;
    /// mismatches are programming errors.
    pub fn new(
        ray_caster: RayCaster,
        metrics: Vec<Box<dyn ImgSimMetric2D>>,
        opt_vars: Box<dyn SE3OptVars>,
        regi_xform_guesses: Vec<RigidTransform>,
    ) -> Self {
        assert!(metrics.len() == ray_caster.num_camera_models());
        assert!(!regi_xform_guesses.is_empty());

        let last_poses = regi_xform_guesses.clone();

        Self {
            ray_caster,
            metrics,
            opt_vars,
            regi_xform_guesses,
            inter_frames: None,
            last_poses,
            debug: None,
        }
    }

    /// Sets per-object intermediate-frame corrections applied by the scene
    /// pass.
    pub fn set_inter_frames(&mut self, inter_frames: Option<SceneInterFrames>) {
        self.inter_frames = inter_frames;
    }

    /// The wrapped ray caster.
    pub fn ray_caster(&self) -> &RayCaster {
        &self.ray_caster
    }

    /// Mutable access to the wrapped ray caster (configuration phase).
    pub fn ray_caster_mut(&mut self) -> &mut RayCaster {
        &mut self.ray_caster
    }

    /// Number of moving objects.
    pub fn num_objs(&self) -> usize {
        self.regi_xform_guesses.len()
    }

    /// Allocates the ray caster and every metric, and binds each metric to
    /// its camera's rendered projection.
    ///
    /// The ray caster renders one projection per camera during evaluation,
    /// so the projection count is fixed here.
    pub fn allocate_resources(&mut self) -> Result<(), RegiError> {
        let num_cams = self.ray_caster.num_camera_models();

        self.ray_caster.set_num_projs(num_cams);
        self.ray_caster.allocate_resources();

        for (cam_idx, metric) in self.metrics.iter_mut().enumerate() {
            metric.base_mut().set_num_moving_images(1);
            metric.allocate_resources();
            metric.set_mov_imgs_buf_from_ray_caster(&self.ray_caster, cam_idx)?;
        }

        Ok(())
    }

    /// Starts capturing per-iteration debug state.
    ///
    /// `global_vol_inds` are the volume indices the objects refer to;
    /// initial poses are the reference poses.
    pub fn start_debug(&mut self, global_vol_inds: &[usize], init_num_iters_capacity: usize) {
        assert!(global_vol_inds.len() == self.num_objs());

        let mut dbg = SingleRegiDebugResults::init(
            self.opt_vars.as_ref(),
            global_vol_inds,
            init_num_iters_capacity,
        );
        dbg.init_poses = self.regi_xform_guesses.clone();

        if let Some(inter) = &self.inter_frames {
            dbg.inter_frames = inter.frames.clone();
            dbg.inter_frames_wrt_vol = inter.wrt_vol.clone();
        }

        self.debug = Some(dbg);
    }

    /// Finishes debug capture, recording the most recent poses as final.
    pub fn take_debug(&mut self) -> Option<SingleRegiDebugResults> {
        let mut dbg = self.debug.take()?;
        dbg.final_poses = self.last_poses.clone();
        Some(dbg)
    }

    /// Scores one parameter proposal (one vector per moving object).
    ///
    /// Each object's transform is the parameterized delta composed onto its
    /// reference pose. Returns the mean per-view similarity; lower is
    /// better.
    pub fn eval(&mut self, params_per_obj: &[Vec<f64>]) -> Result<f64, RegiError> {
        assert!(params_per_obj.len() == self.num_objs());

        let cam_world_to_vols: Vec<RigidTransform> = params_per_obj
            .iter()
            .zip(self.regi_xform_guesses.iter())
            .map(|(x, guess)| self.opt_vars.pose(x) * *guess)
            .collect();

        self.last_poses = cam_world_to_vols.clone();

        let mut scene = RayCastSceneFn {
            cam_world_to_vols,
            inter_frames: self.inter_frames.clone(),
            ..Default::default()
        };
        scene.run(&mut self.ray_caster);

        let mut total = 0.0;
        for metric in self.metrics.iter_mut() {
            metric.compute(&self.ray_caster)?;
            total += metric.base().sim_val(0);
        }
        let score = total / self.metrics.len() as f64;

        log::debug!("evaluated pose proposal, similarity {score}");

        if let Some(dbg) = &mut self.debug {
            dbg.append_iter(params_per_obj, score);
        }

        Ok(score)
    }
}
