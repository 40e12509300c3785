use crate::error::RayCastError;
use crate::params::LineIntKernel;
use crate::raycaster::{RayCastKernel, RayCaster};

/// Builds a ray caster for a configured backend string.
///
/// `"cpu"` selects the data-parallel host engine. Anything else is a
/// configuration error reported before any ray casting begins; callers at
/// the orchestration layer are expected to catch and report it.
pub fn ray_caster_from_backend(
    backend: &str,
    kernel: RayCastKernel,
) -> Result<RayCaster, RayCastError> {
    match backend {
        "cpu" => Ok(RayCaster::new(kernel)),
        other => Err(RayCastError::UnknownBackend(other.to_string())),
    }
}

/// Builds a line-integral (summation) ray caster for a backend string.
pub fn line_int_ray_caster_from_backend(backend: &str) -> Result<RayCaster, RayCastError> {
    ray_caster_from_backend(backend, RayCastKernel::LineInt(LineIntKernel::Sum))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_backend_recognized() {
        assert!(line_int_ray_caster_from_backend("cpu").is_ok());
    }

    #[test]
    fn test_unknown_backend_is_recoverable() {
        let res = line_int_ray_caster_from_backend("vulkan");
        assert!(matches!(res, Err(RayCastError::UnknownBackend(s)) if s == "vulkan"));
    }
}
