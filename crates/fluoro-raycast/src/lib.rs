#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Backend selection from configuration strings.
pub mod backend;

/// Recoverable error types.
pub mod error;

/// Volume interpolation methods.
pub mod interp;

mod kernels;

/// Kernel parameter structs.
pub mod params;

/// The forward-projection engine.
pub mod raycaster;

/// Multi-object scene composition.
pub mod scene;

pub use backend::{line_int_ray_caster_from_backend, ray_caster_from_backend};
pub use error::RayCastError;
pub use interp::InterpMethod;
pub use params::{
    CollisionParams, LineIntKernel, OccContourParams, SurRenderParams, SurRenderShadingParams,
};
pub use raycaster::{ProjBufKind, ProjPixelStoreMethod, RayCastKernel, RayCaster};
pub use scene::{RayCastSceneFn, SceneInterFrames};
