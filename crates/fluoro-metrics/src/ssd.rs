use std::sync::Arc;

use rayon::prelude::*;

use fluoro_image::Image2;
use fluoro_raycast::RayCaster;

use crate::error::SimMetricError;
use crate::metric::{ImgSimMetric2D, SimMetricBase};

/// Mean-of-squared-differences similarity; zero for identical images,
/// larger is worse.
#[derive(Debug, Clone)]
pub struct ImgSimMetric2DSSD {
    base: SimMetricBase,
}

impl ImgSimMetric2DSSD {
    /// Creates the metric around a fixed image.
    pub fn new(fixed_img: Arc<Image2<f32>>) -> Self {
        Self {
            base: SimMetricBase::new(fixed_img),
        }
    }
}

impl ImgSimMetric2D for ImgSimMetric2DSSD {
    fn base(&self) -> &SimMetricBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SimMetricBase {
        &mut self.base
    }

    fn set_mov_imgs_buf_from_ray_caster(
        &mut self,
        ray_caster: &RayCaster,
        proj_offset: usize,
    ) -> Result<(), SimMetricError> {
        self.base.bind_ray_caster(ray_caster, proj_offset)
    }

    fn compute(&mut self, ray_caster: &RayCaster) -> Result<(), SimMetricError> {
        self.process_updated_mask();

        let npix = self.base.num_pix_per_proj();
        let fixed_img = self.base.fixed_image().clone();
        let mask = self.base.mask().cloned();

        let mov = self.base.mov_imgs_slice(ray_caster)?;

        let fixed = fixed_img.as_slice();
        let mask_slice = mask.as_deref().map(|m| m.as_slice());

        let vals: Vec<f64> = mov
            .par_chunks_exact(npix)
            .map(|mov_img| {
                let mut sum = 0.0f64;
                let mut count = 0usize;

                for (i, (f, m)) in fixed.iter().zip(mov_img.iter()).enumerate() {
                    if mask_slice.map(|mk| mk[i] != 0).unwrap_or(true) {
                        let d = (*f - *m) as f64;
                        sum += d * d;
                        count += 1;
                    }
                }

                if count > 0 {
                    sum / count as f64
                } else {
                    0.0
                }
            })
            .collect();

        *self.base.sim_vals_mut() = vals;
        Ok(())
    }
}
