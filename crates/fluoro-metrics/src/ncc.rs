use std::sync::Arc;

use rayon::prelude::*;

use fluoro_image::Image2;
use fluoro_raycast::RayCaster;

use crate::error::SimMetricError;
use crate::metric::{ImgSimMetric2D, SimMetricBase};
use crate::stats::{fixed_stats, ncc_with_fixed_stats, FixedStats};

/// Normalized cross-correlation similarity, reported as `1 - NCC` so lower
/// is better (0 for perfectly correlated images, 2 for anti-correlated).
///
/// The fixed image's mean, standard deviation and valid-pixel count depend
/// only on the fixed image and the mask, so they are precomputed in
/// `process_mask` rather than on every iteration.
#[derive(Debug, Clone)]
pub struct ImgSimMetric2DNCC {
    base: SimMetricBase,
    fixed_stats: Option<FixedStats>,
}

impl ImgSimMetric2DNCC {
    /// Creates the metric around a fixed image.
    pub fn new(fixed_img: Arc<Image2<f32>>) -> Self {
        Self {
            base: SimMetricBase::new(fixed_img),
            fixed_stats: None,
        }
    }

    /// Valid pixels of the current mask (the whole image when unmasked);
    /// available after allocation.
    pub fn num_valid_pixels(&self) -> Option<usize> {
        self.fixed_stats.as_ref().map(|s| s.count)
    }
}

impl ImgSimMetric2D for ImgSimMetric2DNCC {
    fn base(&self) -> &SimMetricBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SimMetricBase {
        &mut self.base
    }

    fn allocate_resources(&mut self) {
        let n = self.base.num_moving_images();
        self.base.sim_vals_mut().resize(n, 0.0);

        // fixed statistics exist even when no mask is ever supplied
        self.process_mask();
    }

    fn set_mov_imgs_buf_from_ray_caster(
        &mut self,
        ray_caster: &RayCaster,
        proj_offset: usize,
    ) -> Result<(), SimMetricError> {
        self.base.bind_ray_caster(ray_caster, proj_offset)
    }

    fn process_mask(&mut self) {
        let mask = self.base.mask().cloned();
        let mask_slice = mask.as_deref().map(|m| m.as_slice());

        self.fixed_stats = Some(fixed_stats(
            self.base.fixed_image().as_slice(),
            mask_slice,
        ));
    }

    fn compute(&mut self, ray_caster: &RayCaster) -> Result<(), SimMetricError> {
        self.process_updated_mask();

        let fs = match self.fixed_stats {
            Some(fs) => fs,
            None => {
                let mask = self.base.mask().cloned();
                let fs = fixed_stats(
                    self.base.fixed_image().as_slice(),
                    mask.as_deref().map(|m| m.as_slice()),
                );
                self.fixed_stats = Some(fs);
                fs
            }
        };

        let npix = self.base.num_pix_per_proj();
        let fixed_img = self.base.fixed_image().clone();
        let mask = self.base.mask().cloned();

        let mov = self.base.mov_imgs_slice(ray_caster)?;

        let fixed = fixed_img.as_slice();
        let mask_slice = mask.as_deref().map(|m| m.as_slice());

        let vals: Vec<f64> = mov
            .par_chunks_exact(npix)
            .map(|mov_img| 1.0 - ncc_with_fixed_stats(fixed, mov_img, mask_slice, &fs))
            .collect();

        *self.base.sim_vals_mut() = vals;
        Ok(())
    }
}
