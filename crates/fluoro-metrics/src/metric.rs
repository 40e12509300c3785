use std::sync::Arc;

use fluoro_image::Image2;
use fluoro_raycast::{ProjBufKind, RayCaster};

use crate::error::SimMetricError;

/// Binary mask over the fixed image; nonzero pixels participate in the
/// similarity computation.
pub type MaskImage = Image2<u8>;

/// Where a metric reads its moving images from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayCasterBinding {
    /// Index of the first rendered projection this metric scores.
    pub proj_offset: usize,
}

/// State shared by every similarity metric: the fixed image, the number of
/// moving images, the per-image score outputs, the mask with its dirty
/// flag, and the moving-image binding.
///
/// Concrete metrics embed this struct; shared behavior lives in the
/// [`ImgSimMetric2D`] trait defaults.
#[derive(Debug, Clone)]
pub struct SimMetricBase {
    fixed_img: Arc<Image2<f32>>,
    num_mov_imgs: usize,
    sim_vals: Vec<f64>,
    mask: Option<Arc<MaskImage>>,
    mask_updated: bool,
    binding: Option<RayCasterBinding>,
}

impl SimMetricBase {
    /// Creates the shared state around a fixed image.
    pub fn new(fixed_img: Arc<Image2<f32>>) -> Self {
        Self {
            fixed_img,
            num_mov_imgs: 0,
            sim_vals: Vec::new(),
            mask: None,
            mask_updated: false,
            binding: None,
        }
    }

    /// The fixed (observed) image.
    pub fn fixed_image(&self) -> &Arc<Image2<f32>> {
        &self.fixed_img
    }

    /// Replaces the fixed image.
    pub fn set_fixed_image(&mut self, fixed_img: Arc<Image2<f32>>) {
        self.fixed_img = fixed_img;
    }

    /// Sets how many moving images are scored per computation.
    pub fn set_num_moving_images(&mut self, n: usize) {
        self.num_mov_imgs = n;
    }

    /// Number of moving images scored per computation.
    pub fn num_moving_images(&self) -> usize {
        self.num_mov_imgs
    }

    /// Pixels per projection, from the fixed image shape.
    pub fn num_pix_per_proj(&self) -> usize {
        self.fixed_img.num_pixels()
    }

    /// Similarity value of one moving image.
    pub fn sim_val(&self, mov_img_idx: usize) -> f64 {
        self.sim_vals[mov_img_idx]
    }

    /// All similarity values.
    pub fn sim_vals(&self) -> &[f64] {
        &self.sim_vals
    }

    /// Mutable similarity-value storage, for concrete metrics.
    pub fn sim_vals_mut(&mut self) -> &mut Vec<f64> {
        &mut self.sim_vals
    }

    /// Sets (or clears) the mask.
    ///
    /// The mask is considered updated if it was already pending an update
    /// or the handle identity changed; setting the same handle repeatedly
    /// does not re-trigger mask processing.
    pub fn set_mask(&mut self, mask: Option<Arc<MaskImage>>) {
        let changed = match (&self.mask, &mask) {
            (None, None) => false,
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            _ => true,
        };

        self.mask_updated = self.mask_updated || changed;
        self.mask = mask;
    }

    /// The current mask.
    pub fn mask(&self) -> Option<&Arc<MaskImage>> {
        self.mask.as_ref()
    }

    /// Whether a mask change is pending processing.
    pub fn mask_updated(&self) -> bool {
        self.mask_updated
    }

    /// Marks the pending mask change as processed.
    pub fn clear_mask_updated(&mut self) {
        self.mask_updated = false;
    }

    /// Binds the moving images to a ray caster's rendered buffer starting
    /// at `proj_offset`.
    ///
    /// The binding stores the offset only; the buffer itself is borrowed at
    /// computation time, so scoring stays zero-copy without the metric
    /// holding a pointer into state the ray caster rewrites each iteration.
    ///
    /// # Errors
    ///
    /// * [`SimMetricError::UnsupportedMovImgSource`] when the ray caster
    ///   has no host-readable buffer,
    /// * [`SimMetricError::ShapeMismatch`] when projection and fixed-image
    ///   shapes differ,
    /// * [`SimMetricError::ProjRangeOutOfBounds`] when the offset plus the
    ///   moving-image count exceeds the rendered projections.
    pub fn bind_ray_caster(
        &mut self,
        ray_caster: &RayCaster,
        proj_offset: usize,
    ) -> Result<(), SimMetricError> {
        if !ray_caster.supports_proj_buf(ProjBufKind::Host) {
            return Err(SimMetricError::UnsupportedMovImgSource);
        }

        if ray_caster.num_pix_per_proj() != self.num_pix_per_proj() {
            return Err(SimMetricError::ShapeMismatch(
                ray_caster.num_pix_per_proj(),
                self.num_pix_per_proj(),
            ));
        }

        if proj_offset + self.num_mov_imgs > ray_caster.num_projs() {
            return Err(SimMetricError::ProjRangeOutOfBounds(
                proj_offset,
                proj_offset + self.num_mov_imgs,
                ray_caster.num_projs(),
            ));
        }

        self.binding = Some(RayCasterBinding { proj_offset });
        Ok(())
    }

    /// The current moving-image binding.
    pub fn binding(&self) -> Option<RayCasterBinding> {
        self.binding
    }

    /// Borrows the bound moving images from the ray caster's rendered
    /// buffer.
    pub fn mov_imgs_slice<'a>(
        &self,
        ray_caster: &'a RayCaster,
    ) -> Result<&'a [f32], SimMetricError> {
        let binding = self.binding.ok_or(SimMetricError::NoMovImgSource)?;

        let npix = self.num_pix_per_proj();
        let start = binding.proj_offset * npix;
        let end = (binding.proj_offset + self.num_mov_imgs) * npix;

        Ok(&ray_caster.host_proj_buf()[start..end])
    }
}

/// A 2D similarity metric comparing a stack of moving (rendered) images
/// against one fixed (observed) image.
pub trait ImgSimMetric2D {
    /// Shared metric state.
    fn base(&self) -> &SimMetricBase;

    /// Mutable shared metric state.
    fn base_mut(&mut self) -> &mut SimMetricBase;

    /// Sizes the per-moving-image output buffer; call once after
    /// configuring the moving-image count.
    fn allocate_resources(&mut self) {
        let n = self.base().num_moving_images();
        self.base_mut().sim_vals_mut().resize(n, 0.0);
    }

    /// Binds the metric's moving images to a ray caster's rendered buffer.
    ///
    /// The default reports the source as unsupported; concrete metrics that
    /// can read host buffers override this with
    /// [`SimMetricBase::bind_ray_caster`].
    fn set_mov_imgs_buf_from_ray_caster(
        &mut self,
        _ray_caster: &RayCaster,
        _proj_offset: usize,
    ) -> Result<(), SimMetricError> {
        Err(SimMetricError::UnsupportedMovImgSource)
    }

    /// Sets (or clears) the mask; see [`SimMetricBase::set_mask`].
    fn set_mask(&mut self, mask: Option<Arc<MaskImage>>) {
        self.base_mut().set_mask(mask);
    }

    /// Recomputes mask-dependent precomputation (e.g. valid-pixel counts).
    fn process_mask(&mut self) {}

    /// Runs [`ImgSimMetric2D::process_mask`] exactly once per pending mask
    /// change; called lazily before each similarity computation.
    fn process_updated_mask(&mut self) {
        if self.base().mask_updated() {
            self.process_mask();
            self.base_mut().clear_mask_updated();
        }
    }

    /// Scores every bound moving image against the fixed image, filling
    /// [`SimMetricBase::sim_vals`]. Lower values indicate better agreement.
    fn compute(&mut self, ray_caster: &RayCaster) -> Result<(), SimMetricError>;
}
