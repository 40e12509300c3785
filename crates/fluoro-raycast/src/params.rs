/// Collision detection settings shared by the depth, surface-render and
/// occluding-contour kernels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionParams {
    /// Intensity threshold defining a surface hit.
    pub thresh: f32,
    /// Bisection steps used to refine the boundary crossing.
    ///
    /// Only meaningful for kernels that refine a crossing; the depth kernel
    /// requires zero.
    pub num_backtracking_steps: usize,
}

impl Default for CollisionParams {
    fn default() -> Self {
        Self {
            thresh: 200.0,
            num_backtracking_steps: 20,
        }
    }
}

/// Shading settings of the surface-render kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurRenderShadingParams {
    /// Ambient reflection ratio.
    pub ambient_reflection_ratio: f32,
    /// Diffuse reflection ratio.
    pub diffuse_reflection_ratio: f32,
    /// Specular reflection ratio.
    pub specular_reflection_ratio: f32,
    /// Specular shininess exponent.
    pub alpha_shininess: f32,
}

impl Default for SurRenderShadingParams {
    fn default() -> Self {
        Self {
            ambient_reflection_ratio: 0.25,
            diffuse_reflection_ratio: 0.7,
            specular_reflection_ratio: 0.05,
            alpha_shininess: 1.0,
        }
    }
}

/// Full parameter set of the surface-render kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurRenderParams {
    /// Collision settings; surface rendering defaults to a threshold of 200
    /// and 20 backtracking steps.
    pub collision: CollisionParams,
    /// Shading settings.
    pub shading: SurRenderShadingParams,
}

impl Default for SurRenderParams {
    fn default() -> Self {
        Self {
            collision: CollisionParams::default(),
            shading: SurRenderShadingParams::default(),
        }
    }
}

/// Parameters of the occluding-contour kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccContourParams {
    /// Collision settings; contours default to a threshold of 150 and no
    /// backtracking.
    pub collision: CollisionParams,
    /// Maximum deviation (radians) of the surface-normal/view-ray angle
    /// from perpendicular for a pixel to count as a contour.
    pub occlusion_angle_thresh_rad: f64,
    /// Stop marching at the first collision even when it is not a contour.
    pub stop_after_collision: bool,
}

impl Default for OccContourParams {
    fn default() -> Self {
        Self {
            collision: CollisionParams {
                thresh: 150.0,
                num_backtracking_steps: 0,
            },
            occlusion_angle_thresh_rad: 0.12,
            stop_after_collision: false,
        }
    }
}

/// Per-ray reduction of the line-integral kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineIntKernel {
    /// Sum of interpolated intensities scaled by the step length
    /// (simulated attenuation line integral).
    #[default]
    Sum,
    /// Maximum interpolated intensity along the ray.
    Max,
}
