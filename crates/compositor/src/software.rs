//! CPU render backend.
//!
//! Programs are the effects of an [`EffectRegistry`]; building a program is a
//! registry lookup and dispatching a pass runs [`Effect::run_pass`] directly.
//! Used when no device backend is available and as the reference output for
//! the tests.
//!
//! [`Effect::run_pass`]: ps_effects::Effect::run_pass

use std::sync::Arc;

use ps_common::{CanvasSize, EffectId, GpuError, ParamMap, RgbaImage, TimeCode};
use ps_effects::EffectRegistry;
use tracing::debug;

use crate::backend::{GpuBackend, ProgramInfo};

/// Default limit on either surface dimension.
pub const DEFAULT_MAX_DIMENSION: u32 = 16_384;

pub struct SoftwareBackend {
    registry: Arc<EffectRegistry>,
    max_dimension: u32,
}

impl SoftwareBackend {
    pub fn new(registry: Arc<EffectRegistry>) -> Self {
        Self {
            registry,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    /// Backend with the built-in effect set.
    pub fn with_builtins() -> Self {
        Self::new(Arc::new(EffectRegistry::with_builtins()))
    }

    /// Reject surfaces wider or taller than `max_dimension`.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn registry(&self) -> &Arc<EffectRegistry> {
        &self.registry
    }
}

impl GpuBackend for SoftwareBackend {
    fn name(&self) -> &str {
        "software"
    }

    fn build_program(&self, effect: &EffectId) -> Result<ProgramInfo, GpuError> {
        let program = self
            .registry
            .get(effect.as_str())
            .ok_or_else(|| GpuError::ProgramBuild {
                effect: effect.clone(),
                reason: "no such program".to_string(),
            })?;
        debug!(effect = %effect, passes = program.num_passes(), "Built program");
        Ok(ProgramInfo {
            passes: program.num_passes().max(1),
            time_varying: program.is_time_varying(),
        })
    }

    fn dispatch(
        &self,
        effect: &EffectId,
        pass: u32,
        input: &RgbaImage,
        output: &mut RgbaImage,
        params: &ParamMap,
        time: TimeCode,
    ) -> Result<(), GpuError> {
        let program = self
            .registry
            .get(effect.as_str())
            .ok_or_else(|| GpuError::Dispatch {
                effect: effect.clone(),
                reason: "program not built".to_string(),
            })?;
        if input.dimensions() != output.dimensions() {
            return Err(GpuError::Dispatch {
                effect: effect.clone(),
                reason: format!(
                    "surface mismatch: {:?} vs {:?}",
                    input.dimensions(),
                    output.dimensions()
                ),
            });
        }
        self.registry
            .validate(effect.as_str(), params)
            .map_err(|e| e.into_dispatch(effect))?;
        program.run_pass(pass, input, output, params, time);
        Ok(())
    }

    fn alloc_surface(&self, canvas: CanvasSize) -> Result<RgbaImage, GpuError> {
        if canvas.is_empty()
            || canvas.width > self.max_dimension
            || canvas.height > self.max_dimension
        {
            return Err(GpuError::SurfaceAlloc {
                width: canvas.width,
                height: canvas.height,
            });
        }
        Ok(RgbaImage::new(canvas.width, canvas.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_common::{ParamValue, Rgba};

    #[test]
    fn builds_known_programs() {
        let backend = SoftwareBackend::with_builtins();
        let blur = backend
            .build_program(&EffectId::new("gaussian_blur"))
            .unwrap();
        assert_eq!(blur.passes, 2);
        assert!(!blur.time_varying);

        let grain = backend.build_program(&EffectId::new("noise_grain")).unwrap();
        assert!(grain.time_varying);
    }

    #[test]
    fn unknown_program_fails_to_build() {
        let backend = SoftwareBackend::with_builtins();
        let err = backend
            .build_program(&EffectId::new("does_not_exist"))
            .unwrap_err();
        assert!(matches!(err, GpuError::ProgramBuild { .. }));
    }

    #[test]
    fn dispatch_rejects_invalid_params() {
        let backend = SoftwareBackend::with_builtins();
        let input = RgbaImage::from_pixel(2, 2, Rgba([10, 10, 10, 255]));
        let mut output = RgbaImage::new(2, 2);
        let mut params = ParamMap::new();
        params.insert("brightness".into(), ParamValue::Float(50.0));
        let err = backend
            .dispatch(
                &EffectId::new("brightness_contrast"),
                0,
                &input,
                &mut output,
                &params,
                TimeCode::ZERO,
            )
            .unwrap_err();
        assert!(matches!(err, GpuError::Dispatch { .. }));
    }

    #[test]
    fn surface_limits() {
        let backend = SoftwareBackend::with_builtins().with_max_dimension(64);
        assert!(backend.alloc_surface(CanvasSize::new(64, 8)).is_ok());
        assert!(matches!(
            backend.alloc_surface(CanvasSize::new(65, 8)),
            Err(GpuError::SurfaceAlloc { width: 65, height: 8 })
        ));
        assert!(backend.alloc_surface(CanvasSize::new(0, 8)).is_err());
    }
}
