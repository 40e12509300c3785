#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Per-iteration registration debug records.
pub mod debug;

/// The pose-to-score evaluation pipeline.
pub mod eval;

pub use debug::{DebugRegiResultsMultiLevel, SingleRegiDebugResults};
pub use eval::{Intensity2D3DRegiEval, RegiError};
