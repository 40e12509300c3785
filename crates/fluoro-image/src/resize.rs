use rayon::prelude::*;

use crate::error::ImageError;
use crate::image2::{Image2, PixelScalar};

// Bilinear tap at a (possibly fractional) source coordinate, clamped to the
// image bounds.
fn bilinear_tap<T: PixelScalar>(src: &Image2<T>, u: f32, v: f32) -> f32 {
    let (rows, cols) = (src.rows(), src.cols());

    let iu0 = (u.trunc() as usize).min(cols - 1);
    let iv0 = (v.trunc() as usize).min(rows - 1);
    let iu1 = (iu0 + 1).min(cols - 1);
    let iv1 = (iv0 + 1).min(rows - 1);

    let frac_u = u.fract();
    let frac_v = v.fract();

    let p00 = src.get(iv0, iu0).to_f32_lossy();
    let p01 = src.get(iv0, iu1).to_f32_lossy();
    let p10 = src.get(iv1, iu0).to_f32_lossy();
    let p11 = src.get(iv1, iu1).to_f32_lossy();

    let top = p00 * (1.0 - frac_u) + p01 * frac_u;
    let bot = p10 * (1.0 - frac_u) + p11 * frac_u;

    top * (1.0 - frac_v) + bot * frac_v
}

/// Bilinearly resamples `src` into `dst`, covering the full source extent.
///
/// Destination pixel `(0, 0)` samples source `(0, 0)` and the last
/// destination pixel samples the last source pixel; rows are processed in
/// parallel.
pub fn resize_bilinear<T: PixelScalar>(
    src: &Image2<T>,
    dst: &mut Image2<T>,
) -> Result<(), ImageError> {
    if src.num_pixels() == 0 || dst.num_pixels() == 0 {
        return Err(ImageError::ShapeMismatch(
            src.rows(),
            src.cols(),
            dst.rows(),
            dst.cols(),
        ));
    }

    let scale_u = if dst.cols() > 1 {
        (src.cols() - 1) as f32 / (dst.cols() - 1) as f32
    } else {
        0.0
    };
    let scale_v = if dst.rows() > 1 {
        (src.rows() - 1) as f32 / (dst.rows() - 1) as f32
    } else {
        0.0
    };

    let dst_cols = dst.cols();

    dst.as_slice_mut()
        .par_chunks_exact_mut(dst_cols)
        .enumerate()
        .for_each(|(row, out_row)| {
            let v = row as f32 * scale_v;
            for (col, out) in out_row.iter_mut().enumerate() {
                let u = col as f32 * scale_u;
                *out = T::from_f32(bilinear_tap(src, u, v));
            }
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_resize() {
        let src =
            Image2::<f32>::new(2, 2, 1.0, 1.0, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let mut dst = Image2::<f32>::from_size_val(2, 2, 1.0, 1.0, 0.0);

        resize_bilinear(&src, &mut dst).unwrap();
        assert_eq!(dst.as_slice(), src.as_slice());
    }

    #[test]
    fn test_constant_image_stays_constant() {
        let src = Image2::<f32>::from_size_val(8, 8, 1.0, 1.0, 5.0);
        let mut dst = Image2::<f32>::from_size_val(3, 5, 1.0, 1.0, 0.0);

        resize_bilinear(&src, &mut dst).unwrap();
        for v in dst.as_slice() {
            assert_relative_eq!(*v, 5.0);
        }
    }

    #[test]
    fn test_upsample_midpoint() {
        let src = Image2::<f32>::new(1, 2, 1.0, 1.0, vec![0.0, 2.0]).unwrap();
        let mut dst = Image2::<f32>::from_size_val(1, 3, 1.0, 1.0, 0.0);

        resize_bilinear(&src, &mut dst).unwrap();
        assert_relative_eq!(dst.as_slice()[1], 1.0);
    }
}
