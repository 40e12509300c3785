use glam::DVec3;

use crate::camera::CameraModel;
use crate::rigid::RigidTransform;
use crate::rot::{rot_x, rot_y, rot_z, trans_x, trans_y, trans_z};
use crate::se3;

/// Maps a flat optimizer parameter vector to a rigid transform.
///
/// Separating "how many numbers the optimizer sees" from "how those numbers
/// become a transform" lets one optimization driver run full 6-DOF searches,
/// reduced-DOF searches and camera-source searches without touching the ray
/// caster.
pub trait SE3OptVars {
    /// The rigid transform encoded by `x`.
    ///
    /// `x.len()` must equal [`SE3OptVars::num_params`]; a mismatch is a
    /// programming error.
    fn pose(&self, x: &[f64]) -> RigidTransform;

    /// Number of parameters this parameterization consumes.
    fn num_params(&self) -> usize;

    /// Short name recorded in registration debug output.
    fn name(&self) -> &'static str;
}

/// Canonical 6-DOF parameterization via the se(3) exponential map.
///
/// Singularity-free around the identity; the zero vector maps exactly to
/// the identity transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct SE3OptVarsLieAlg;

impl SE3OptVars for SE3OptVarsLieAlg {
    fn pose(&self, x: &[f64]) -> RigidTransform {
        assert!(x.len() == 6);
        se3::exp(&[x[0], x[1], x[2], x[3], x[4], x[5]])
    }

    fn num_params(&self) -> usize {
        6
    }

    fn name(&self) -> &'static str {
        "se3-lie-alg"
    }
}

type FactorFn = fn(f64) -> RigidTransform;

/// 6-DOF Euler parameterization with a caller-specified factor order.
///
/// The transform is the product of six single-axis factors; the order
/// indices state where each rotation/translation factor sits in that
/// product.
#[derive(Debug, Clone)]
pub struct SE3OptVarsEuler {
    xform_fns: [FactorFn; 6],
    param_idx: [usize; 6],
}

impl SE3OptVarsEuler {
    /// Creates the parameterization.
    ///
    /// All six order indices must be distinct and in `[0, 6)`; duplicates
    /// or out-of-range indices are programming errors and fail fast.
    pub fn new(
        rot_x_idx: usize,
        rot_y_idx: usize,
        rot_z_idx: usize,
        trans_x_idx: usize,
        trans_y_idx: usize,
        trans_z_idx: usize,
    ) -> Self {
        let inds = [
            rot_x_idx,
            rot_y_idx,
            rot_z_idx,
            trans_x_idx,
            trans_y_idx,
            trans_z_idx,
        ];

        for (i, &idx) in inds.iter().enumerate() {
            assert!(idx < 6);
            for &later in &inds[i + 1..] {
                assert!(idx != later);
            }
        }

        let factors: [FactorFn; 6] = [rot_x, rot_y, rot_z, trans_x, trans_y, trans_z];

        let mut xform_fns: [FactorFn; 6] = [rot_x; 6];
        let mut param_idx = [0usize; 6];
        for k in 0..6 {
            xform_fns[inds[k]] = factors[k];
            param_idx[inds[k]] = k;
        }

        Self {
            xform_fns,
            param_idx,
        }
    }

    fn lookup_xform_idx(&self, k: usize) -> usize {
        self.param_idx
            .iter()
            .position(|&p| p == k)
            .expect("factor index is always present")
    }

    /// Position of the x-rotation factor in the product.
    pub fn rot_x_order(&self) -> usize {
        self.lookup_xform_idx(0)
    }

    /// Position of the y-rotation factor in the product.
    pub fn rot_y_order(&self) -> usize {
        self.lookup_xform_idx(1)
    }

    /// Position of the z-rotation factor in the product.
    pub fn rot_z_order(&self) -> usize {
        self.lookup_xform_idx(2)
    }

    /// Position of the x-translation factor in the product.
    pub fn trans_x_order(&self) -> usize {
        self.lookup_xform_idx(3)
    }

    /// Position of the y-translation factor in the product.
    pub fn trans_y_order(&self) -> usize {
        self.lookup_xform_idx(4)
    }

    /// Position of the z-translation factor in the product.
    pub fn trans_z_order(&self) -> usize {
        self.lookup_xform_idx(5)
    }
}

impl SE3OptVars for SE3OptVarsEuler {
    fn pose(&self, x: &[f64]) -> RigidTransform {
        assert!(x.len() == 6);

        (self.xform_fns[0])(x[self.param_idx[0]])
            * (self.xform_fns[1])(x[self.param_idx[1]])
            * (self.xform_fns[2])(x[self.param_idx[2]])
            * (self.xform_fns[3])(x[self.param_idx[3]])
            * (self.xform_fns[4])(x[self.param_idx[4]])
            * (self.xform_fns[5])(x[self.param_idx[5]])
    }

    fn num_params(&self) -> usize {
        6
    }

    fn name(&self) -> &'static str {
        "se3-euler"
    }
}

/// Translation-only search over any subset of {x, y, z}.
#[derive(Debug, Clone, Copy)]
pub struct SE3OptVarsTransOnly {
    use_x: bool,
    use_y: bool,
    use_z: bool,
    num_comps: usize,
}

impl SE3OptVarsTransOnly {
    /// Selects the translation components to expose; at least one must be
    /// enabled.
    pub fn new(use_x: bool, use_y: bool, use_z: bool) -> Self {
        let num_comps = usize::from(use_x) + usize::from(use_y) + usize::from(use_z);
        assert!(num_comps > 0);

        Self {
            use_x,
            use_y,
            use_z,
            num_comps,
        }
    }

    /// Whether x translation is searched.
    pub fn use_x(&self) -> bool {
        self.use_x
    }

    /// Whether y translation is searched.
    pub fn use_y(&self) -> bool {
        self.use_y
    }

    /// Whether z translation is searched.
    pub fn use_z(&self) -> bool {
        self.use_z
    }
}

impl SE3OptVars for SE3OptVarsTransOnly {
    fn pose(&self, x: &[f64]) -> RigidTransform {
        assert!(x.len() == self.num_comps);

        let mut t = DVec3::ZERO;
        let mut idx = 0;

        if self.use_x {
            t.x = x[idx];
            idx += 1;
        }
        if self.use_y {
            t.y = x[idx];
            idx += 1;
        }
        if self.use_z {
            t.z = x[idx];
        }

        RigidTransform::from_translation(t)
    }

    fn num_params(&self) -> usize {
        self.num_comps
    }

    fn name(&self) -> &'static str {
        "trans-only"
    }
}

/// Rotation-only parameterization via the so(3) exponential map.
#[derive(Debug, Clone, Copy, Default)]
pub struct SO3OptVarsLieAlg;

impl SE3OptVars for SO3OptVarsLieAlg {
    fn pose(&self, x: &[f64]) -> RigidTransform {
        assert!(x.len() == 3);
        RigidTransform::from_rotation(crate::so3::exp(DVec3::new(x[0], x[1], x[2])))
    }

    fn num_params(&self) -> usize {
        3
    }

    fn name(&self) -> &'static str {
        "so3-lie-alg"
    }
}

/// Rotation-only Euler parameterization with caller-specified order.
#[derive(Debug, Clone)]
pub struct SO3OptVarsEuler {
    xform_fns: [FactorFn; 3],
    param_idx: [usize; 3],
}

impl SO3OptVarsEuler {
    /// The three order indices must be distinct and in `[0, 3)`.
    pub fn new(rot_x_idx: usize, rot_y_idx: usize, rot_z_idx: usize) -> Self {
        let inds = [rot_x_idx, rot_y_idx, rot_z_idx];

        for (i, &idx) in inds.iter().enumerate() {
            assert!(idx < 3);
            for &later in &inds[i + 1..] {
                assert!(idx != later);
            }
        }

        let factors: [FactorFn; 3] = [rot_x, rot_y, rot_z];

        let mut xform_fns: [FactorFn; 3] = [rot_x; 3];
        let mut param_idx = [0usize; 3];
        for k in 0..3 {
            xform_fns[inds[k]] = factors[k];
            param_idx[inds[k]] = k;
        }

        Self {
            xform_fns,
            param_idx,
        }
    }
}

impl SE3OptVars for SO3OptVarsEuler {
    fn pose(&self, x: &[f64]) -> RigidTransform {
        assert!(x.len() == 3);

        (self.xform_fns[0])(x[self.param_idx[0]])
            * (self.xform_fns[1])(x[self.param_idx[1]])
            * (self.xform_fns[2])(x[self.param_idx[2]])
    }

    fn num_params(&self) -> usize {
        3
    }

    fn name(&self) -> &'static str {
        "so3-euler"
    }
}

/// Single rotation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotAxis {
    /// Rotation about x.
    X,
    /// Rotation about y.
    Y,
    /// Rotation about z.
    Z,
}

/// One-parameter rotation about a fixed axis.
#[derive(Debug, Clone, Copy)]
pub struct SO3OptVarsOneAxis {
    axis: RotAxis,
}

impl SO3OptVarsOneAxis {
    /// Rotation about the given axis.
    pub fn new(axis: RotAxis) -> Self {
        Self { axis }
    }
}

impl SE3OptVars for SO3OptVarsOneAxis {
    fn pose(&self, x: &[f64]) -> RigidTransform {
        assert!(x.len() == 1);
        match self.axis {
            RotAxis::X => rot_x(x[0]),
            RotAxis::Y => rot_y(x[0]),
            RotAxis::Z => rot_z(x[0]),
        }
    }

    fn num_params(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "so3-one-axis"
    }
}

/// Joint camera-source and object-pose search: the first three parameters
/// perturb the X-ray source position, the last six parameterize the object
/// pose through the se(3) exponential map.
#[derive(Debug, Clone)]
pub struct CamSourceObjPoseOptVars {
    ref_cam: CameraModel,
}

impl CamSourceObjPoseOptVars {
    /// `ref_cam` is the unperturbed camera the source offsets apply to.
    pub fn new(ref_cam: CameraModel) -> Self {
        Self { ref_cam }
    }

    /// Object pose encoded in the last six parameters.
    pub fn obj_pose(&self, x: &[f64]) -> RigidTransform {
        assert!(x.len() == 9);
        se3::exp(&[x[3], x[4], x[5], x[6], x[7], x[8]])
    }

    /// Camera with the source moved by the first three parameters.
    pub fn cam(&self, x: &[f64]) -> CameraModel {
        assert!(x.len() >= 3);
        self.ref_cam
            .move_focal_pt(DVec3::new(x[0], x[1], x[2]))
    }
}

impl SE3OptVars for CamSourceObjPoseOptVars {
    fn pose(&self, x: &[f64]) -> RigidTransform {
        self.obj_pose(x)
    }

    fn num_params(&self) -> usize {
        9
    }

    fn name(&self) -> &'static str {
        "cam-source-obj-pose"
    }
}
