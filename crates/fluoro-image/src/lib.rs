#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for image and volume containers.
pub mod error;

/// 2D detector image container.
pub mod image2;

/// Camera/image pairs with landmarks and orientation normalization.
pub mod proj_data;

/// Bilinear image resampling.
pub mod resize;

/// 3D voxel grid container.
pub mod volume;

pub use error::ImageError;
pub use image2::{Image2, PixelScalar};
pub use proj_data::{ProjData, RotToPatUp};
pub use volume::Volume;
