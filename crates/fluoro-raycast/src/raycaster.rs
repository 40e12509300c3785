use std::sync::Arc;

use glam::{DMat3, DVec3};
use rayon::prelude::*;

use fluoro_geom::{CameraModel, RigidTransform};
use fluoro_image::{Image2, Volume};

use crate::error::RayCastError;
use crate::interp::InterpMethod;
use crate::kernels;
use crate::params::{CollisionParams, LineIntKernel, OccContourParams, SurRenderParams};

/// Per-ray reduction performed by a [`RayCaster`].
///
/// The kernel is the only behavioral axis of the engine; buffer lifecycle,
/// projection bookkeeping and transform plumbing are shared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayCastKernel {
    /// Attenuation line integral (or maximum intensity).
    LineInt(LineIntKernel),
    /// Distance from the source to the first above-threshold sample.
    Depth(CollisionParams),
    /// Shaded surface rendering.
    SurRender(SurRenderParams),
    /// Occluding-contour detection.
    OccludingContours(OccContourParams),
}

/// Write policy applied when a volume's rendering lands in the shared
/// projection buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjPixelStoreMethod {
    /// Overwrite the buffer (first object of a scene).
    #[default]
    Replace,
    /// Composite into the buffer (subsequent objects).
    Accum,
}

/// Kind of rendered-projection buffer a caller may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjBufKind {
    /// Host-memory buffer.
    Host,
    /// Device-memory buffer of a GPU engine.
    Device,
}

/// Forward-projection engine.
///
/// A `RayCaster` owns a set of volumes (shared handles, voxel data is never
/// copied), a set of camera models, and per-projection camera-to-volume
/// transforms. After one-time [`RayCaster::allocate_resources`],
/// [`RayCaster::compute`] renders every configured projection for one
/// volume into the shared rendered buffer.
///
/// The per-projection association and transform lists always have exactly
/// `num_projs` entries; every mutation of the projection count maintains
/// this.
#[derive(Debug, Clone)]
pub struct RayCaster {
    kernel: RayCastKernel,
    interp_method: InterpMethod,
    proj_store_method: ProjPixelStoreMethod,
    ray_step_size: f64,

    vols: Vec<Arc<Volume>>,
    camera_models: Vec<CameraModel>,

    num_projs: usize,
    max_num_projs: Option<usize>,
    cam_model_for_proj: Vec<usize>,
    xforms_cam_to_phys: Vec<RigidTransform>,

    use_bg_projs: bool,
    bg_projs_for_each_cam: Vec<Arc<Image2<f32>>>,
    default_bg_pixel_val: f32,

    rendered: Vec<f32>,
    resources_allocated: bool,
}

impl RayCaster {
    /// Creates an engine with the given kernel.
    ///
    /// The default background pixel value is kernel-specific: depth rays
    /// that never collide report an infinite distance, the other kernels
    /// report zero.
    pub fn new(kernel: RayCastKernel) -> Self {
        let default_bg_pixel_val = match kernel {
            RayCastKernel::Depth(_) => f32::MAX,
            _ => 0.0,
        };

        Self {
            kernel,
            interp_method: InterpMethod::default(),
            proj_store_method: ProjPixelStoreMethod::default(),
            ray_step_size: 0.5,
            vols: Vec::new(),
            camera_models: Vec::new(),
            num_projs: 0,
            max_num_projs: None,
            cam_model_for_proj: Vec::new(),
            xforms_cam_to_phys: Vec::new(),
            use_bg_projs: false,
            bg_projs_for_each_cam: Vec::new(),
            default_bg_pixel_val,
            rendered: Vec::new(),
            resources_allocated: false,
        }
    }

    /// Line-integral engine with the summation kernel.
    pub fn line_int() -> Self {
        Self::new(RayCastKernel::LineInt(LineIntKernel::Sum))
    }

    /// Depth engine.
    pub fn depth(params: CollisionParams) -> Self {
        Self::new(RayCastKernel::Depth(params))
    }

    /// Surface-render engine.
    pub fn surface_render(params: SurRenderParams) -> Self {
        Self::new(RayCastKernel::SurRender(params))
    }

    /// Occluding-contour engine.
    pub fn occluding_contours(params: OccContourParams) -> Self {
        Self::new(RayCastKernel::OccludingContours(params))
    }

    /// The configured kernel.
    pub fn kernel(&self) -> &RayCastKernel {
        &self.kernel
    }

    /// Replaces the kernel; only valid before resources are allocated.
    pub fn set_kernel(&mut self, kernel: RayCastKernel) {
        assert!(!self.resources_allocated);
        self.kernel = kernel;
    }

    /// Supplies a single volume (shared handle, voxel data is not copied).
    pub fn set_volume(&mut self, vol: Arc<Volume>) {
        self.vols = vec![vol];
    }

    /// Supplies the volume list (shared handles).
    pub fn set_volumes(&mut self, vols: Vec<Arc<Volume>>) {
        self.vols = vols;
    }

    /// Number of volumes.
    pub fn num_vols(&self) -> usize {
        self.vols.len()
    }

    /// A volume handle.
    pub fn volume(&self, vol_idx: usize) -> &Arc<Volume> {
        &self.vols[vol_idx]
    }

    /// Replaces the camera-model list.
    pub fn set_camera_models(&mut self, camera_models: Vec<CameraModel>) {
        self.camera_models = camera_models;
    }

    /// Uses a single camera model.
    pub fn set_camera_model(&mut self, camera_model: CameraModel) {
        self.camera_models = vec![camera_model];
    }

    /// Number of camera models.
    pub fn num_camera_models(&self) -> usize {
        self.camera_models.len()
    }

    /// The camera-model list.
    pub fn camera_models(&self) -> &[CameraModel] {
        &self.camera_models
    }

    /// One camera model.
    pub fn camera_model(&self, cam_idx: usize) -> &CameraModel {
        &self.camera_models[cam_idx]
    }

    /// Sets the number of projections rendered per compute pass.
    ///
    /// After allocation the requested count must not exceed the frozen
    /// maximum; the engine will not silently resize device-era resources.
    /// The per-projection association and transform lists are resized to
    /// match.
    pub fn set_num_projs(&mut self, num_projs: usize) {
        if let Some(max) = self.max_num_projs {
            assert!(num_projs <= max);
        }

        self.num_projs = num_projs;
        self.cam_model_for_proj.resize(num_projs, 0);
        self.xforms_cam_to_phys
            .resize(num_projs, RigidTransform::IDENTITY);
    }

    /// Number of projections rendered per compute pass.
    pub fn num_projs(&self) -> usize {
        self.num_projs
    }

    /// Projection ceiling frozen by [`RayCaster::allocate_resources`].
    pub fn max_num_projs(&self) -> Option<usize> {
        self.max_num_projs
    }

    /// Associates one projection with a camera model.
    pub fn set_proj_cam_model(&mut self, proj_idx: usize, cam_idx: usize) {
        self.cam_model_for_proj[proj_idx] = cam_idx;
    }

    /// Per-projection camera-model indices.
    pub fn camera_model_proj_associations(&self) -> &[usize] {
        &self.cam_model_for_proj
    }

    /// Replaces the per-projection camera associations.
    ///
    /// The list length must equal the current projection count.
    pub fn set_camera_model_proj_associations(&mut self, cam_model_for_proj: Vec<usize>) {
        assert!(cam_model_for_proj.len() == self.num_projs);
        self.cam_model_for_proj = cam_model_for_proj;
    }

    /// Assigns `N` object transforms across `M` camera models.
    ///
    /// Requires `num_projs == N * M`. Projections are filled camera-major:
    /// projection `cam_idx * N + obj_idx` is bound to camera `cam_idx` and
    /// transform `obj_idx`. Callers rely on this ordering.
    pub fn distribute_xforms_among_cam_models(&mut self, xforms_cam_to_phys: &[RigidTransform]) {
        let num_passed_xforms = xforms_cam_to_phys.len();
        let num_cams = self.num_camera_models();

        assert!((num_passed_xforms * num_cams) == self.num_projs);

        let mut global_proj_idx = 0;
        for cam_idx in 0..num_cams {
            for xform in xforms_cam_to_phys {
                self.xforms_cam_to_phys[global_proj_idx] = *xform;
                self.cam_model_for_proj[global_proj_idx] = cam_idx;
                global_proj_idx += 1;
            }
        }
    }

    /// Assigns one object transform to every camera model.
    pub fn distribute_xform_among_cam_models(&mut self, xform_cam_to_phys: &RigidTransform) {
        self.distribute_xforms_among_cam_models(std::slice::from_ref(xform_cam_to_phys));
    }

    /// Sets the ray marching step size in world units.
    pub fn set_ray_step_size(&mut self, step_size: f64) {
        self.ray_step_size = step_size;
    }

    /// Ray marching step size in world units.
    pub fn ray_step_size(&self) -> f64 {
        self.ray_step_size
    }

    /// Sets the volume interpolation method.
    pub fn set_interp_method(&mut self, interp_method: InterpMethod) {
        self.interp_method = interp_method;
    }

    /// Volume interpolation method.
    pub fn interp_method(&self) -> InterpMethod {
        self.interp_method
    }

    /// Sets the pixel store policy of the next compute pass.
    pub fn set_proj_store_method(&mut self, m: ProjPixelStoreMethod) {
        self.proj_store_method = m;
    }

    /// Pixel store policy.
    pub fn proj_store_method(&self) -> ProjPixelStoreMethod {
        self.proj_store_method
    }

    /// Shorthand for selecting [`ProjPixelStoreMethod::Replace`].
    pub fn use_proj_store_replace_method(&mut self) {
        self.proj_store_method = ProjPixelStoreMethod::Replace;
    }

    /// Shorthand for selecting [`ProjPixelStoreMethod::Accum`].
    pub fn use_proj_store_accum_method(&mut self) {
        self.proj_store_method = ProjPixelStoreMethod::Accum;
    }

    /// Replaces all per-projection camera-to-volume transforms.
    ///
    /// The projection count follows the list length.
    pub fn set_xforms_cam_to_phys(&mut self, xforms: Vec<RigidTransform>) {
        self.set_num_projs(xforms.len());
        self.xforms_cam_to_phys = xforms;
    }

    /// Per-projection camera-to-volume transforms.
    pub fn xforms_cam_to_phys(&self) -> &[RigidTransform] {
        &self.xforms_cam_to_phys
    }

    /// One camera-to-volume transform.
    pub fn xform_cam_to_phys(&self, proj_idx: usize) -> &RigidTransform {
        &self.xforms_cam_to_phys[proj_idx]
    }

    /// Mutable access to one camera-to-volume transform.
    pub fn xform_cam_to_phys_mut(&mut self, proj_idx: usize) -> &mut RigidTransform {
        &mut self.xforms_cam_to_phys[proj_idx]
    }

    /// Right-multiplies every per-projection transform by `post_xform`.
    pub fn post_multiply_all_xforms(&mut self, post_xform: &RigidTransform) {
        self.xforms_cam_to_phys[..self.num_projs]
            .par_iter_mut()
            .for_each(|cur| *cur = *cur * *post_xform);
    }

    /// Left-multiplies every per-projection transform by `pre_xform`.
    pub fn pre_multiply_all_xforms(&mut self, pre_xform: &RigidTransform) {
        self.xforms_cam_to_phys[..self.num_projs]
            .par_iter_mut()
            .for_each(|cur| *cur = *pre_xform * *cur);
    }

    /// Translation mapping volume-center-origin coordinates into the
    /// volume's physical space.
    ///
    /// Physical coordinates usually have their origin at the zero voxel;
    /// this helper lets callers express poses about the volume center
    /// instead.
    pub fn xform_vol_center_to_phys(&self, vol_idx: usize) -> RigidTransform {
        RigidTransform::from_translation(self.vols[vol_idx].center_phys())
    }

    /// Camera frame shifted to the C-arm center of rotation (half the focal
    /// length towards the detector).
    pub fn xform_cam_wrt_carm_center_of_rot(&self, cam_idx: usize) -> RigidTransform {
        RigidTransform::from_translation(DVec3::new(
            0.0,
            0.0,
            -self.camera_models[cam_idx].focal_len() / 2.0,
        ))
    }

    /// Enables or disables background projections.
    pub fn set_use_bg_projs(&mut self, use_bg_projs: bool) {
        self.use_bg_projs = use_bg_projs;
    }

    /// Whether background projections are composited under missed rays.
    pub fn use_bg_projs(&self) -> bool {
        self.use_bg_projs
    }

    /// Uses one background projection for every camera.
    pub fn set_bg_proj(&mut self, proj: Arc<Image2<f32>>, use_bg_projs: bool) {
        self.bg_projs_for_each_cam = vec![proj; self.num_camera_models()];
        self.use_bg_projs = use_bg_projs;
    }

    /// Uses one background projection per camera.
    pub fn set_bg_projs(&mut self, projs: Vec<Arc<Image2<f32>>>, use_bg_projs: bool) {
        assert!(self.num_camera_models() == projs.len());
        self.bg_projs_for_each_cam = projs;
        self.use_bg_projs = use_bg_projs;
    }

    /// Pixel value written where a ray misses the volume and no background
    /// projection applies.
    pub fn default_bg_pixel_val(&self) -> f32 {
        self.default_bg_pixel_val
    }

    /// Sets the miss pixel value.
    pub fn set_default_bg_pixel_val(&mut self, bg_val: f32) {
        self.default_bg_pixel_val = bg_val;
    }

    /// Number of pixels per projection; all cameras share detector
    /// dimensions.
    pub fn num_pix_per_proj(&self) -> usize {
        let cam = &self.camera_models[0];
        cam.num_det_rows() * cam.num_det_cols()
    }

    /// Whether [`RayCaster::allocate_resources`] has run.
    pub fn resources_allocated(&self) -> bool {
        self.resources_allocated
    }

    /// One-time resource allocation; a precondition for
    /// [`RayCaster::compute`].
    ///
    /// Requires non-empty volume and camera lists, a positive projection
    /// count and step size, and uniform detector dimensions across cameras.
    /// Freezes the current projection count as the session ceiling. The
    /// depth kernel additionally requires zero backtracking steps:
    /// backtracking refines a surface crossing and has no meaning for a
    /// plain depth query.
    pub fn allocate_resources(&mut self) {
        assert!(self.num_projs > 0);
        assert!(!self.vols.is_empty());
        assert!(!self.camera_models.is_empty());
        assert!(self.ray_step_size > 0.0);

        let rows = self.camera_models[0].num_det_rows();
        let cols = self.camera_models[0].num_det_cols();
        assert!(self
            .camera_models
            .iter()
            .all(|c| c.num_det_rows() == rows && c.num_det_cols() == cols));

        if let RayCastKernel::Depth(coll) = &self.kernel {
            assert!(
                coll.num_backtracking_steps == 0,
                "backtracking is not supported for the depth kernel"
            );
        }

        self.max_num_projs = Some(self.num_projs);

        self.cam_model_for_proj.resize(self.num_projs, 0);
        self.xforms_cam_to_phys
            .resize(self.num_projs, RigidTransform::IDENTITY);

        self.rendered = vec![self.default_bg_pixel_val; self.num_projs * rows * cols];

        self.resources_allocated = true;

        log::debug!(
            "allocated ray caster resources: {} projs of {}x{} pixels, {} vols, {} cams",
            self.num_projs,
            rows,
            cols,
            self.vols.len(),
            self.camera_models.len()
        );
    }

    /// Renders every configured projection for one volume.
    ///
    /// Writes into the shared rendered buffer according to the current
    /// store policy: `Replace` overwrites (misses receive the background
    /// value), `Accum` composites hits with the kernel's operator (sum for
    /// line integrals, minimum for depth, maximum for the surface kernels)
    /// and leaves misses untouched. The call blocks until every ray of
    /// every projection has been written; scene composition relies on this.
    pub fn compute(&mut self, vol_idx: usize) {
        assert!(
            self.resources_allocated,
            "allocate_resources() must run before compute()"
        );
        assert!(vol_idx < self.vols.len());

        let vol = self.vols[vol_idx].clone();
        let phys_to_idx = vol.phys_to_idx();

        let size = vol.size();
        let aabb_min = DVec3::ZERO;
        let aabb_max = DVec3::new(
            (size[0] - 1) as f64,
            (size[1] - 1) as f64,
            (size[2] - 1) as f64,
        );

        let rows = self.camera_models[0].num_det_rows();
        let cols = self.camera_models[0].num_det_cols();
        let npix = rows * cols;

        let det_grids: Vec<Vec<DVec3>> = self
            .camera_models
            .iter()
            .map(|c| c.detector_grid())
            .collect();

        log::debug!(
            "ray casting volume {} into {} projections",
            vol_idx,
            self.num_projs
        );

        for proj_idx in 0..self.num_projs {
            let cam_idx = self.cam_model_for_proj[proj_idx];
            assert!(cam_idx < self.camera_models.len());

            let focal_pt = self.camera_models[cam_idx].focal_pt();

            let cam_to_idx = phys_to_idx * self.xforms_cam_to_phys[proj_idx].as_mat4();
            let pinhole_idx = cam_to_idx.transform_point3(focal_pt);

            // gradients live in index space; mapping them back to the
            // camera frame uses the transpose of the forward linear map
            let lin = DMat3::from_cols(
                cam_to_idx.x_axis.truncate(),
                cam_to_idx.y_axis.truncate(),
                cam_to_idx.z_axis.truncate(),
            );
            let normal_xform = lin.transpose();

            let bg_img: Option<Arc<Image2<f32>>> = if self.use_bg_projs {
                self.bg_projs_for_each_cam.get(cam_idx).cloned()
            } else {
                None
            };

            let kernel = self.kernel;
            let interp = self.interp_method;
            let store = self.proj_store_method;
            let step_size = self.ray_step_size;
            let default_bg = self.default_bg_pixel_val;
            let det_grid = &det_grids[cam_idx];

            let out = &mut self.rendered[proj_idx * npix..(proj_idx + 1) * npix];

            out.par_chunks_exact_mut(cols)
                .enumerate()
                .for_each(|(row, out_row)| {
                    for (col, out_px) in out_row.iter_mut().enumerate() {
                        let det_cam = det_grid[row * cols + col];

                        let to_det = det_cam - focal_pt;
                        let cam_len = to_det.length();
                        let dir_cam_unit = to_det / cam_len;

                        let det_idx = cam_to_idx.transform_point3(det_cam);

                        let val = kernels::make_ray(
                            pinhole_idx,
                            det_idx,
                            aabb_min,
                            aabb_max,
                            cam_len,
                            dir_cam_unit,
                            step_size,
                        )
                        .and_then(|ray| match &kernel {
                            RayCastKernel::LineInt(k) => {
                                Some(kernels::line_int_ray(&vol, interp, *k, &ray))
                            }
                            RayCastKernel::Depth(c) => {
                                kernels::depth_ray(&vol, interp, c, &ray)
                            }
                            RayCastKernel::SurRender(p) => kernels::surface_render_ray(
                                &vol,
                                interp,
                                p,
                                &normal_xform,
                                &ray,
                            ),
                            RayCastKernel::OccludingContours(p) => {
                                kernels::occluding_contours_ray(
                                    &vol,
                                    interp,
                                    p,
                                    &normal_xform,
                                    &ray,
                                )
                            }
                        });

                        match store {
                            ProjPixelStoreMethod::Replace => {
                                *out_px = val.unwrap_or_else(|| {
                                    bg_img
                                        .as_ref()
                                        .map(|bg| bg.get(row, col))
                                        .unwrap_or(default_bg)
                                });
                            }
                            ProjPixelStoreMethod::Accum => {
                                if let Some(v) = val {
                                    *out_px = composite(&kernel, *out_px, v);
                                }
                            }
                        }
                    }
                });
        }
    }

    /// Whether a projection-buffer kind is available.
    ///
    /// This is the capability probe callers use instead of catching an
    /// unsupported-operation error.
    pub fn supports_proj_buf(&self, kind: ProjBufKind) -> bool {
        matches!(kind, ProjBufKind::Host)
    }

    /// The rendered buffer of the requested kind.
    ///
    /// # Errors
    ///
    /// Returns [`RayCastError::UnsupportedBufferKind`] for kinds this
    /// engine does not provide; see [`RayCaster::supports_proj_buf`].
    pub fn proj_buf(&self, kind: ProjBufKind) -> Result<&[f32], RayCastError> {
        match kind {
            ProjBufKind::Host => Ok(self.host_proj_buf()),
            ProjBufKind::Device => Err(RayCastError::UnsupportedBufferKind(kind)),
        }
    }

    /// The full rendered host buffer (`num_projs * num_pix_per_proj`
    /// values, projection-major).
    pub fn host_proj_buf(&self) -> &[f32] {
        assert!(self.resources_allocated);
        &self.rendered
    }

    /// The rendered pixels of one projection.
    pub fn proj_slice(&self, proj_idx: usize) -> &[f32] {
        assert!(self.resources_allocated);
        assert!(proj_idx < self.num_projs);

        let npix = self.num_pix_per_proj();
        &self.rendered[proj_idx * npix..(proj_idx + 1) * npix]
    }

    /// Copies one rendered projection out as an image carrying the
    /// associated camera's detector spacing.
    pub fn proj(&self, proj_idx: usize) -> Image2<f32> {
        let cam = &self.camera_models[self.cam_model_for_proj[proj_idx]];

        Image2::new(
            cam.num_det_rows(),
            cam.num_det_cols(),
            cam.det_row_spacing(),
            cam.det_col_spacing(),
            self.proj_slice(proj_idx).to_vec(),
        )
        .expect("projection buffer matches detector shape")
    }
}

fn composite(kernel: &RayCastKernel, existing: f32, new: f32) -> f32 {
    match kernel {
        RayCastKernel::LineInt(_) => existing + new,
        RayCastKernel::Depth(_) => existing.min(new),
        RayCastKernel::SurRender(_) | RayCastKernel::OccludingContours(_) => existing.max(new),
    }
}
