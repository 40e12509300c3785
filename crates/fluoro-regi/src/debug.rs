use serde::{Deserialize, Serialize};

use fluoro_geom::opt_vars::SE3OptVars;
use fluoro_geom::RigidTransform;

/// Per-iteration record of one registration run.
///
/// Append-only while the optimization runs, read-only afterwards. The
/// record is serde-serializable so an external hierarchical persistence
/// layer can write it out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SingleRegiDebugResults {
    /// Name of the pose parameterization driving the run.
    pub opt_vars_name: String,
    /// Parameter count of the parameterization.
    pub num_params: usize,
    /// Global volume indices of the moving objects, in optimization order.
    pub vols_used: Vec<usize>,
    /// Initial pose per object.
    pub init_poses: Vec<RigidTransform>,
    /// Final pose per object.
    pub final_poses: Vec<RigidTransform>,
    /// Intermediate frame per object.
    pub inter_frames: Vec<RigidTransform>,
    /// Whether each intermediate frame is expressed with respect to the
    /// volume.
    pub inter_frames_wrt_vol: Vec<bool>,
    /// Parameter vector per object per iteration.
    pub iter_vars: Vec<Vec<Vec<f64>>>,
    /// Similarity value per iteration.
    pub sims: Vec<f64>,
}

impl SingleRegiDebugResults {
    /// Initializes the record for a run over the given objects, reserving
    /// iteration capacity.
    pub fn init(
        opt_vars: &dyn SE3OptVars,
        global_vol_inds: &[usize],
        init_num_iters_capacity: usize,
    ) -> Self {
        let num_objs = global_vol_inds.len();

        let mut iter_vars = Vec::with_capacity(num_objs);
        for _ in 0..num_objs {
            iter_vars.push(Vec::with_capacity(init_num_iters_capacity));
        }

        let mut sims = Vec::new();
        sims.reserve(init_num_iters_capacity);

        Self {
            opt_vars_name: opt_vars.name().to_string(),
            num_params: opt_vars.num_params(),
            vols_used: global_vol_inds.to_vec(),
            init_poses: vec![RigidTransform::IDENTITY; num_objs],
            final_poses: vec![RigidTransform::IDENTITY; num_objs],
            inter_frames: vec![RigidTransform::IDENTITY; num_objs],
            inter_frames_wrt_vol: vec![false; num_objs],
            iter_vars,
            sims,
        }
    }

    /// Number of moving objects.
    pub fn num_objs(&self) -> usize {
        self.vols_used.len()
    }

    /// Number of recorded iterations.
    pub fn num_iters(&self) -> usize {
        self.sims.len()
    }

    /// Appends one iteration: the parameter vector evaluated per object and
    /// the resulting similarity value.
    pub fn append_iter(&mut self, params_per_obj: &[Vec<f64>], sim: f64) {
        assert!(params_per_obj.len() == self.num_objs());

        for (obj_vars, params) in self.iter_vars.iter_mut().zip(params_per_obj.iter()) {
            obj_vars.push(params.clone());
        }

        self.sims.push(sim);
    }
}

/// Debug records of a multi-object, multi-resolution registration:
/// `regi_results[level][regi]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugRegiResultsMultiLevel {
    /// Per-level, per-registration records.
    pub regi_results: Vec<Vec<SingleRegiDebugResults>>,
    /// Downsample factor of each resolution level.
    pub ds_factors: Vec<f64>,
}

impl DebugRegiResultsMultiLevel {
    /// Total projections needed to replay every run of every level for one
    /// view: the recorded iterations plus the initial and final poses.
    pub fn total_num_projs_per_view(&self) -> usize {
        let mut num_projs = 0;

        for level in &self.regi_results {
            for regi in level {
                num_projs += regi.iter_vars.first().map_or(0, |v| v.len()) + 2;
            }
        }

        num_projs
    }
}
