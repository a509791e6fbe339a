//! Effect programs by id.
//!
//! The registry is built once per document and shared (`Arc`) between the
//! editor, which validates parameters on edit, and the render backend, which
//! builds and dispatches programs from it.

use std::collections::HashMap;

use ps_common::{EffectId, ParamMap};
use tracing::info;

use crate::blur::GaussianBlurEffect;
use crate::color::{BrightnessEffect, HslEffect};
use crate::error::EffectError;
use crate::params::validate_params;
use crate::stylize::{NoiseGrainEffect, VignetteEffect};
use crate::traits::Effect;

/// Every program shipped with the crate.
pub fn builtin_effects() -> Vec<Box<dyn Effect>> {
    vec![
        Box::new(BrightnessEffect::new()),
        Box::new(HslEffect::new()),
        Box::new(GaussianBlurEffect::new()),
        Box::new(NoiseGrainEffect::new()),
        Box::new(VignetteEffect::new()),
    ]
}

pub struct EffectRegistry {
    programs: HashMap<String, Box<dyn Effect>>,
}

impl EffectRegistry {
    pub fn with_builtins() -> Self {
        let programs: HashMap<_, _> = builtin_effects()
            .into_iter()
            .map(|fx| (fx.name().to_string(), fx))
            .collect();
        info!(count = programs.len(), "Effect programs registered");
        Self { programs }
    }

    pub fn get(&self, id: &str) -> Option<&dyn Effect> {
        self.programs.get(id).map(|fx| fx.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.programs.contains_key(id)
    }

    /// Check `params` against the definitions of program `id`.
    pub fn validate(&self, id: &str, params: &ParamMap) -> Result<(), EffectError> {
        let fx = self
            .get(id)
            .ok_or_else(|| EffectError::UnknownEffect(EffectId::new(id)))?;
        validate_params(fx.param_defs(), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_common::ParamValue;

    #[test]
    fn builtins_are_registered_by_name() {
        let reg = EffectRegistry::with_builtins();
        for id in [
            "brightness_contrast",
            "hsl_adjust",
            "gaussian_blur",
            "noise_grain",
            "vignette",
        ] {
            assert!(reg.contains(id), "{id} missing");
        }
        assert_eq!(reg.get("gaussian_blur").unwrap().num_passes(), 2);
        assert!(reg.get("swirl").is_none());
    }

    #[test]
    fn validate_against_named_program() {
        let reg = EffectRegistry::with_builtins();
        let mut params = ParamMap::new();
        params.insert("amount".into(), ParamValue::Float(0.4));
        assert!(reg.validate("vignette", &params).is_ok());

        params.insert("amount".into(), ParamValue::Float(9.0));
        assert!(matches!(
            reg.validate("vignette", &params),
            Err(EffectError::OutOfRange { .. })
        ));
        assert_eq!(
            reg.validate("swirl", &ParamMap::new()),
            Err(EffectError::UnknownEffect(EffectId::new("swirl")))
        );
    }
}
