// Masked first/second-moment helpers shared by the correlation metrics.

#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedStats {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

fn masked_pixels<'a>(
    img: &'a [f32],
    mask: Option<&'a [u8]>,
) -> impl Iterator<Item = f64> + 'a {
    img.iter().enumerate().filter_map(move |(i, v)| {
        let keep = mask.map(|m| m[i] != 0).unwrap_or(true);
        keep.then_some(*v as f64)
    })
}

pub(crate) fn fixed_stats(fixed: &[f32], mask: Option<&[u8]>) -> FixedStats {
    let mut count = 0usize;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;

    for v in masked_pixels(fixed, mask) {
        count += 1;
        sum += v;
        sum_sq += v * v;
    }

    if count == 0 {
        return FixedStats {
            mean: 0.0,
            std: 0.0,
            count: 0,
        };
    }

    let mean = sum / count as f64;
    let var = (sum_sq / count as f64 - mean * mean).max(0.0);

    FixedStats {
        mean,
        std: var.sqrt(),
        count,
    }
}

// Pearson correlation of `mov` against `fixed` using the precomputed fixed
// statistics; zero when either signal is constant over the valid pixels.
pub(crate) fn ncc_with_fixed_stats(
    fixed: &[f32],
    mov: &[f32],
    mask: Option<&[u8]>,
    fs: &FixedStats,
) -> f64 {
    if fs.count == 0 || fs.std <= 0.0 {
        return 0.0;
    }

    let mut sum_m = 0.0f64;
    let mut sum_m_sq = 0.0f64;
    let mut sum_fm = 0.0f64;

    for (i, (f, m)) in fixed.iter().zip(mov.iter()).enumerate() {
        if mask.map(|mk| mk[i] != 0).unwrap_or(true) {
            let fv = *f as f64;
            let mv = *m as f64;
            sum_m += mv;
            sum_m_sq += mv * mv;
            sum_fm += fv * mv;
        }
    }

    let n = fs.count as f64;
    let mean_m = sum_m / n;
    let var_m = (sum_m_sq / n - mean_m * mean_m).max(0.0);
    let std_m = var_m.sqrt();

    if std_m <= 0.0 {
        return 0.0;
    }

    let cov = sum_fm / n - fs.mean * mean_m;
    cov / (fs.std * std_m)
}

// Central-difference gradients of a row-major image; borders clamp.
pub(crate) fn image_gradients(img: &[f32], rows: usize, cols: usize) -> (Vec<f32>, Vec<f32>) {
    let mut gx = vec![0.0f32; rows * cols];
    let mut gy = vec![0.0f32; rows * cols];

    for r in 0..rows {
        for c in 0..cols {
            let cl = c.saturating_sub(1);
            let cr = (c + 1).min(cols - 1);
            let ru = r.saturating_sub(1);
            let rd = (r + 1).min(rows - 1);

            gx[r * cols + c] = 0.5 * (img[r * cols + cr] - img[r * cols + cl]);
            gy[r * cols + c] = 0.5 * (img[rd * cols + c] - img[ru * cols + c]);
        }
    }

    (gx, gy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_stats_unmasked() {
        let s = fixed_stats(&[1.0, 2.0, 3.0, 4.0], None);
        assert_eq!(s.count, 4);
        assert_relative_eq!(s.mean, 2.5, epsilon = 1e-12);
        assert_relative_eq!(s.std, (1.25f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_fixed_stats_masked_count() {
        let mask = [1u8, 0, 1, 0];
        let s = fixed_stats(&[1.0, 100.0, 3.0, 100.0], Some(&mask));
        assert_eq!(s.count, 2);
        assert_relative_eq!(s.mean, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ncc_perfect_correlation() {
        let fixed = [1.0f32, 2.0, 3.0, 4.0];
        let mov = [2.0f32, 4.0, 6.0, 8.0];

        let fs = fixed_stats(&fixed, None);
        let ncc = ncc_with_fixed_stats(&fixed, &mov, None, &fs);
        assert_relative_eq!(ncc, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ncc_anticorrelation() {
        let fixed = [1.0f32, 2.0, 3.0, 4.0];
        let mov = [4.0f32, 3.0, 2.0, 1.0];

        let fs = fixed_stats(&fixed, None);
        let ncc = ncc_with_fixed_stats(&fixed, &mov, None, &fs);
        assert_relative_eq!(ncc, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gradients_of_ramp() {
        // 3x3 image with value = column index
        let img = [0.0f32, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        let (gx, gy) = image_gradients(&img, 3, 3);

        assert_relative_eq!(gx[4], 1.0, epsilon = 1e-6);
        assert_relative_eq!(gy[4], 0.0, epsilon = 1e-6);
    }
}
