use std::sync::Arc;

use rayon::prelude::*;

use fluoro_image::Image2;
use fluoro_raycast::RayCaster;

use crate::error::SimMetricError;
use crate::metric::{ImgSimMetric2D, SimMetricBase};
use crate::stats::{fixed_stats, image_gradients, ncc_with_fixed_stats, FixedStats};

/// Gradient NCC: normalized cross-correlation of the central-difference
/// gradient images, averaged over the two gradient directions and reported
/// as `1 - NCC` so lower is better.
///
/// Correlating gradients instead of intensities suppresses low-frequency
/// intensity mismatch between rendered and acquired projections.
#[derive(Debug, Clone)]
pub struct ImgSimMetric2DGradNCC {
    base: SimMetricBase,
    fixed_grad_x: Vec<f32>,
    fixed_grad_y: Vec<f32>,
    stats_x: Option<FixedStats>,
    stats_y: Option<FixedStats>,
}

impl ImgSimMetric2DGradNCC {
    /// Creates the metric around a fixed image.
    pub fn new(fixed_img: Arc<Image2<f32>>) -> Self {
        Self {
            base: SimMetricBase::new(fixed_img),
            fixed_grad_x: Vec::new(),
            fixed_grad_y: Vec::new(),
            stats_x: None,
            stats_y: None,
        }
    }
}

impl ImgSimMetric2D for ImgSimMetric2DGradNCC {
    fn base(&self) -> &SimMetricBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SimMetricBase {
        &mut self.base
    }

    fn allocate_resources(&mut self) {
        let n = self.base.num_moving_images();
        self.base.sim_vals_mut().resize(n, 0.0);

        let fixed = self.base.fixed_image().clone();
        let (gx, gy) = image_gradients(fixed.as_slice(), fixed.rows(), fixed.cols());
        self.fixed_grad_x = gx;
        self.fixed_grad_y = gy;

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

        self.stats_x = Some(fixed_stats(&self.fixed_grad_x, mask_slice));
        self.stats_y = Some(fixed_stats(&self.fixed_grad_y, mask_slice));
    }

    fn compute(&mut self, ray_caster: &RayCaster) -> Result<(), SimMetricError> {
        self.process_updated_mask();

        let (fs_x, fs_y) = match (self.stats_x, self.stats_y) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                let mask = self.base.mask().cloned();
                let mask_slice = mask.as_deref().map(|m| m.as_slice());
                let x = fixed_stats(&self.fixed_grad_x, mask_slice);
                let y = fixed_stats(&self.fixed_grad_y, mask_slice);
                self.stats_x = Some(x);
                self.stats_y = Some(y);
                (x, y)
            }
        };

        let npix = self.base.num_pix_per_proj();
        let fixed_img = self.base.fixed_image().clone();
        let (rows, cols) = (fixed_img.rows(), fixed_img.cols());
        let mask = self.base.mask().cloned();

        let mov = self.base.mov_imgs_slice(ray_caster)?;
        let mask_slice = mask.as_deref().map(|m| m.as_slice());

        let fixed_gx = &self.fixed_grad_x;
        let fixed_gy = &self.fixed_grad_y;

        let vals: Vec<f64> = mov
            .par_chunks_exact(npix)
            .map(|mov_img| {
                let (mov_gx, mov_gy) = image_gradients(mov_img, rows, cols);

                let ncc_x = ncc_with_fixed_stats(fixed_gx, &mov_gx, mask_slice, &fs_x);
                let ncc_y = ncc_with_fixed_stats(fixed_gy, &mov_gy, mask_slice, &fs_y);

                1.0 - 0.5 * (ncc_x + ncc_y)
            })
            .collect();

        *self.base.sim_vals_mut() = vals;
        Ok(())
    }
}
