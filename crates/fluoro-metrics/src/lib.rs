#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types of the metric layer.
pub mod error;

/// Gradient normalized cross-correlation.
pub mod grad_ncc;

/// The abstract metric contract and shared state.
pub mod metric;

/// Normalized cross-correlation.
pub mod ncc;

/// Sum of squared differences.
pub mod ssd;

mod stats;

pub use error::SimMetricError;
pub use grad_ncc::ImgSimMetric2DGradNCC;
pub use metric::{ImgSimMetric2D, MaskImage, RayCasterBinding, SimMetricBase};
pub use ncc::ImgSimMetric2DNCC;
pub use ssd::ImgSimMetric2DSSD;
