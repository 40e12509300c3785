use glam::DVec3;

use fluoro_image::Volume;

/// Interpolation used when sampling the volume along a ray.
///
/// One method is chosen per compute pass; methods are never mixed within a
/// pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpMethod {
    /// Nearest-neighbor lookup.
    NearestNeighbor,
    /// Trilinear interpolation.
    #[default]
    Linear,
    /// Cubic B-spline over a 4x4x4 neighborhood (smoothing weights, no
    /// prefilter).
    BSpline,
    /// Lanczos-windowed sinc over a 6x6x6 neighborhood.
    Sinc,
}

/// Samples the volume at a continuous voxel index with the given method.
///
/// Out-of-range taps clamp to the volume boundary.
#[inline]
pub fn sample_volume(vol: &Volume, p: DVec3, method: InterpMethod) -> f32 {
    match method {
        InterpMethod::NearestNeighbor => sample_nn(vol, p),
        InterpMethod::Linear => sample_trilinear(vol, p),
        InterpMethod::BSpline => sample_bspline(vol, p),
        InterpMethod::Sinc => sample_sinc(vol, p),
    }
}

fn sample_nn(vol: &Volume, p: DVec3) -> f32 {
    vol.voxel_clamped(
        p.x.round() as i64,
        p.y.round() as i64,
        p.z.round() as i64,
    )
}

fn sample_trilinear(vol: &Volume, p: DVec3) -> f32 {
    let x0 = p.x.floor();
    let y0 = p.y.floor();
    let z0 = p.z.floor();

    let fx = (p.x - x0) as f32;
    let fy = (p.y - y0) as f32;
    let fz = (p.z - z0) as f32;

    let (xi, yi, zi) = (x0 as i64, y0 as i64, z0 as i64);

    let c000 = vol.voxel_clamped(xi, yi, zi);
    let c100 = vol.voxel_clamped(xi + 1, yi, zi);
    let c010 = vol.voxel_clamped(xi, yi + 1, zi);
    let c110 = vol.voxel_clamped(xi + 1, yi + 1, zi);
    let c001 = vol.voxel_clamped(xi, yi, zi + 1);
    let c101 = vol.voxel_clamped(xi + 1, yi, zi + 1);
    let c011 = vol.voxel_clamped(xi, yi + 1, zi + 1);
    let c111 = vol.voxel_clamped(xi + 1, yi + 1, zi + 1);

    let c00 = c000 * (1.0 - fx) + c100 * fx;
    let c10 = c010 * (1.0 - fx) + c110 * fx;
    let c01 = c001 * (1.0 - fx) + c101 * fx;
    let c11 = c011 * (1.0 - fx) + c111 * fx;

    let c0 = c00 * (1.0 - fy) + c10 * fy;
    let c1 = c01 * (1.0 - fy) + c11 * fy;

    c0 * (1.0 - fz) + c1 * fz
}

// Uniform cubic B-spline basis weights for a fractional offset t in [0, 1).
fn bspline_weights(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    let omt = 1.0 - t;

    [
        omt * omt * omt / 6.0,
        (3.0 * t3 - 6.0 * t2 + 4.0) / 6.0,
        (-3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0) / 6.0,
        t3 / 6.0,
    ]
}

fn sample_bspline(vol: &Volume, p: DVec3) -> f32 {
    let x0 = p.x.floor();
    let y0 = p.y.floor();
    let z0 = p.z.floor();

    let wx = bspline_weights((p.x - x0) as f32);
    let wy = bspline_weights((p.y - y0) as f32);
    let wz = bspline_weights((p.z - z0) as f32);

    let (xi, yi, zi) = (x0 as i64 - 1, y0 as i64 - 1, z0 as i64 - 1);

    let mut acc = 0.0f32;
    for (kz, wkz) in wz.iter().enumerate() {
        for (ky, wky) in wy.iter().enumerate() {
            let wyz = wky * wkz;
            for (kx, wkx) in wx.iter().enumerate() {
                acc += wkx
                    * wyz
                    * vol.voxel_clamped(xi + kx as i64, yi + ky as i64, zi + kz as i64);
            }
        }
    }

    acc
}

const SINC_RADIUS: i64 = 3;

fn lanczos(d: f32) -> f32 {
    if d.abs() < 1e-6 {
        return 1.0;
    }
    if d.abs() >= SINC_RADIUS as f32 {
        return 0.0;
    }

    let pd = std::f32::consts::PI * d;
    let pda = pd / SINC_RADIUS as f32;
    (pd.sin() / pd) * (pda.sin() / pda)
}

// Per-axis Lanczos weights, normalized so flat regions stay flat.
fn sinc_axis_weights(frac: f32) -> [f32; 6] {
    let mut w = [0.0f32; 6];
    let mut sum = 0.0f32;

    for (k, wk) in w.iter_mut().enumerate() {
        let d = frac - (k as f32 - (SINC_RADIUS - 1) as f32);
        *wk = lanczos(d);
        sum += *wk;
    }
    for wk in w.iter_mut() {
        *wk /= sum;
    }

    w
}

fn sample_sinc(vol: &Volume, p: DVec3) -> f32 {
    let x0 = p.x.floor();
    let y0 = p.y.floor();
    let z0 = p.z.floor();

    let wx = sinc_axis_weights((p.x - x0) as f32);
    let wy = sinc_axis_weights((p.y - y0) as f32);
    let wz = sinc_axis_weights((p.z - z0) as f32);

    let (xi, yi, zi) = (
        x0 as i64 - (SINC_RADIUS - 1),
        y0 as i64 - (SINC_RADIUS - 1),
        z0 as i64 - (SINC_RADIUS - 1),
    );

    let mut acc = 0.0f32;
    for (kz, wkz) in wz.iter().enumerate() {
        for (ky, wky) in wy.iter().enumerate() {
            let wyz = wky * wkz;
            for (kx, wkx) in wx.iter().enumerate() {
                acc += wkx
                    * wyz
                    * vol.voxel_clamped(xi + kx as i64, yi + ky as i64, zi + kz as i64);
            }
        }
    }

    acc
}

/// Central-difference gradient of the sampled volume in index space.
pub fn sample_gradient(vol: &Volume, p: DVec3, method: InterpMethod) -> DVec3 {
    let dx = sample_volume(vol, p + DVec3::X, method) - sample_volume(vol, p - DVec3::X, method);
    let dy = sample_volume(vol, p + DVec3::Y, method) - sample_volume(vol, p - DVec3::Y, method);
    let dz = sample_volume(vol, p + DVec3::Z, method) - sample_volume(vol, p - DVec3::Z, method);

    DVec3::new(dx as f64, dy as f64, dz as f64) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DVec3;

    fn ramp_volume() -> Volume {
        // value equals the x index
        let mut vol = Volume::from_size_val([4, 4, 4], DVec3::ONE, DVec3::ZERO, 0.0);
        for z in 0..4usize {
            for y in 0..4usize {
                for x in 0..4usize {
                    vol.as_slice_mut()[(z * 4 + y) * 4 + x] = x as f32;
                }
            }
        }
        vol
    }

    #[test]
    fn test_methods_exact_on_grid_points() {
        let vol = ramp_volume();
        let p = DVec3::new(2.0, 1.0, 1.0);

        for method in [
            InterpMethod::NearestNeighbor,
            InterpMethod::Linear,
            InterpMethod::Sinc,
        ] {
            assert_relative_eq!(sample_volume(&vol, p, method), 2.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_trilinear_midpoint() {
        let vol = ramp_volume();
        let v = sample_volume(&vol, DVec3::new(1.5, 2.0, 2.0), InterpMethod::Linear);
        assert_relative_eq!(v, 1.5, epsilon = 1e-6);
    }

    #[test]
    fn test_constant_region_invariant() {
        let vol = Volume::from_size_val([6, 6, 6], DVec3::ONE, DVec3::ZERO, 7.0);
        let p = DVec3::new(2.3, 2.7, 3.1);

        for method in [
            InterpMethod::NearestNeighbor,
            InterpMethod::Linear,
            InterpMethod::BSpline,
            InterpMethod::Sinc,
        ] {
            assert_relative_eq!(sample_volume(&vol, p, method), 7.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_gradient_of_ramp() {
        let vol = ramp_volume();
        let g = sample_gradient(&vol, DVec3::new(1.5, 1.5, 1.5), InterpMethod::Linear);
        assert_relative_eq!(g.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(g.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(g.z, 0.0, epsilon = 1e-6);
    }
}
