//! Vignette effect.

use ps_common::{ParamDef, ParamMap, ParamType, ParamValue, RgbaImage, TimeCode};

use crate::params::get_float;
use crate::traits::{clamp_u8, map_pixels, Effect};

fn param_defs() -> Vec<ParamDef> {
    vec![
        ParamDef {
            name: "amount".to_string(),
            display_name: "Amount".to_string(),
            param_type: ParamType::Float { min: 0.0, max: 2.0 },
            default: ParamValue::Float(0.5),
        },
        ParamDef {
            name: "radius".to_string(),
            display_name: "Radius".to_string(),
            param_type: ParamType::Float { min: 0.0, max: 2.0 },
            default: ParamValue::Float(0.8),
        },
        ParamDef {
            name: "softness".to_string(),
            display_name: "Softness".to_string(),
            param_type: ParamType::Float { min: 0.0, max: 1.0 },
            default: ParamValue::Float(0.3),
        },
    ]
}

/// Vignette effect (darken edges of the frame).
///
/// Distance is measured from the surface center, normalized so the corners
/// sit at 1.0.
pub struct VignetteEffect {
    params: Vec<ParamDef>,
}

impl VignetteEffect {
    pub fn new() -> Self {
        Self {
            params: param_defs(),
        }
    }
}

impl Default for VignetteEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for VignetteEffect {
    fn name(&self) -> &str {
        "vignette"
    }

    fn param_defs(&self) -> &[ParamDef] {
        &self.params
    }

    fn run_pass(
        &self,
        _pass: u32,
        input: &RgbaImage,
        output: &mut RgbaImage,
        params: &ParamMap,
        _time: TimeCode,
    ) {
        let amount = get_float("amount", params, &self.params);
        let radius = get_float("radius", params, &self.params);
        let softness = get_float("softness", params, &self.params).max(1e-3);

        let (width, height) = input.dimensions();
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);

        map_pixels(input, output, |x, y, [r, g, b, a]| {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let dist = (dx * dx + dy * dy).sqrt() / max_dist;
            let t = ((dist - radius) / softness).clamp(0.0, 1.0);
            let falloff = t * t * (3.0 - 2.0 * t);
            let factor = (1.0 - amount * falloff).max(0.0);
            let darken = |c: u8| clamp_u8(f32::from(c) * factor);
            [darken(r), darken(g), darken(b), a]
        });
    }
}
