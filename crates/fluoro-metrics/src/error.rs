use fluoro_raycast::RayCastError;

/// An error type for the similarity-metric layer.
#[derive(thiserror::Error, Debug)]
pub enum SimMetricError {
    /// The metric does not accept the requested moving-image source.
    #[error("moving image source is not supported by this metric")]
    UnsupportedMovImgSource,

    /// No moving-image source has been bound before computing.
    #[error("no moving image source has been bound")]
    NoMovImgSource,

    /// Moving and fixed image shapes differ.
    #[error("moving/fixed image shapes do not match: {0} vs {1} pixels")]
    ShapeMismatch(usize, usize),

    /// The bound projection range exceeds what the ray caster renders.
    #[error("projection range {0}..{1} exceeds the ray caster's {2} projections")]
    ProjRangeOutOfBounds(usize, usize, usize),

    /// A ray-caster capability error surfaced through the binding.
    #[error(transparent)]
    RayCast(#[from] RayCastError),
}
