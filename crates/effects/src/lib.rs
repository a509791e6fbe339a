//! `ps-effects` — effect programs, parameter definitions, and the effect registry.
//!
//! This crate provides:
//! - The [`Effect`] trait that all effect programs implement
//! - An [`EffectRegistry`] for lookup by effect id
//! - Parameter validation and conversion helpers
//! - 5 built-in effects across 3 categories:
//!
//! ## Color (2 effects)
//! - Brightness / Contrast
//! - Hue / Saturation / Lightness
//!
//! ## Blur (1 effect)
//! - Gaussian Blur (separable, 2-pass)
//!
//! ## Stylize (2 effects)
//! - Film Grain / Noise (time-varying)
//! - Vignette

pub mod blur;
pub mod color;
pub mod error;
pub mod params;
pub mod registry;
pub mod stylize;
pub mod traits;

// Re-export primary types at crate root.
pub use error::EffectError;
pub use params::{default_params, get_param_or_default, validate_params};
pub use registry::{builtin_effects, EffectRegistry};
pub use traits::{apply_effect, Effect};

// Re-export all effect structs for convenience.
pub use blur::GaussianBlurEffect;
pub use color::{BrightnessEffect, HslEffect};
pub use stylize::{NoiseGrainEffect, VignetteEffect};

#[cfg(test)]
mod tests {
    use ps_common::{ParamMap, ParamValue, Rgba, RgbaImage, TimeCode};

    use super::*;

    #[test]
    fn all_effects_have_unique_names() {
        let programs = builtin_effects();
        let names: Vec<&str> = programs.iter().map(|e| e.name()).collect();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len(), "Duplicate effect names found");
    }

    #[test]
    fn all_effects_have_param_defs() {
        for fx in builtin_effects() {
            let defs = fx.param_defs();
            assert!(
                !defs.is_empty(),
                "Effect '{}' has no parameter definitions",
                fx.name()
            );
            assert!(
                validate_params(defs, &default_params(defs)).is_ok(),
                "Effect '{}' has defaults outside its own ranges",
                fx.name()
            );
        }
    }

    #[test]
    fn all_effects_are_deterministic() {
        let mut input = RgbaImage::from_pixel(12, 10, Rgba([40, 120, 220, 255]));
        input.put_pixel(3, 3, Rgba([255, 0, 0, 128]));
        let t = TimeCode::from_secs(2.0);
        for fx in builtin_effects() {
            let a = apply_effect(fx.as_ref(), &input, &ParamMap::new(), t);
            let b = apply_effect(fx.as_ref(), &input, &ParamMap::new(), t);
            assert_eq!(a, b, "Effect '{}' is not deterministic", fx.name());
            assert_eq!(a.dimensions(), input.dimensions());
        }
    }

    #[test]
    fn validate_brightness_params() {
        let fx = BrightnessEffect::new();
        let mut valid = ParamMap::new();
        valid.insert("brightness".to_string(), ParamValue::Float(0.5));
        valid.insert("contrast".to_string(), ParamValue::Float(1.5));
        assert!(validate_params(fx.param_defs(), &valid).is_ok());

        let mut invalid = ParamMap::new();
        invalid.insert("brightness".to_string(), ParamValue::Float(5.0));
        assert!(validate_params(fx.param_defs(), &invalid).is_err());
    }
}
