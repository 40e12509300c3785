/// An error type for the image and volume containers.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// The pixel data length does not match the requested shape.
    #[error("data length ({0}) does not match the image shape ({1})")]
    InvalidShape(usize, usize),

    /// Two images were expected to share a shape but do not.
    #[error("image shapes differ: {0}x{1} vs {2}x{3}")]
    ShapeMismatch(usize, usize, usize, usize),

    /// A resampling factor must be positive.
    #[error("invalid downsample factor: {0}")]
    InvalidDownsampleFactor(f64),

    /// The requested patient-orientation rotation is not handled.
    #[error("unsupported rotation to patient-up: {0} degrees")]
    UnsupportedPatUpRotation(u32),
}
