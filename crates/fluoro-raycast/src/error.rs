use crate::raycaster::ProjBufKind;

/// Recoverable errors of the ray-casting layer.
///
/// Precondition violations (computing before allocating, projection-count
/// mismatches) are programming errors and assert instead.
#[derive(thiserror::Error, Debug)]
pub enum RayCastError {
    /// The backend string of a configuration is not recognized.
    #[error("unsupported ray caster backend: {0}")]
    UnknownBackend(String),

    /// The requested projection-buffer kind is not provided by this engine.
    ///
    /// Callers may legitimately probe for this; see
    /// [`crate::raycaster::RayCaster::supports_proj_buf`].
    #[error("projection buffer kind {0:?} is not supported")]
    UnsupportedBufferKind(ProjBufKind),
}
