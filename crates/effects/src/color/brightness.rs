//! Brightness / Contrast effect.

use ps_common::{ParamDef, ParamMap, ParamType, ParamValue, RgbaImage, TimeCode};

use crate::params::get_float;
use crate::traits::{clamp_u8, map_pixels, Effect};

fn param_defs() -> Vec<ParamDef> {
    vec![
        ParamDef {
            name: "brightness".to_string(),
            display_name: "Brightness".to_string(),
            param_type: ParamType::Float {
                min: -1.0,
                max: 1.0,
            },
            default: ParamValue::Float(0.0),
        },
        ParamDef {
            name: "contrast".to_string(),
            display_name: "Contrast".to_string(),
            param_type: ParamType::Float { min: 0.0, max: 3.0 },
            default: ParamValue::Float(1.0),
        },
    ]
}

/// Brightness / Contrast adjustment.
///
/// `out = (in - 0.5) * contrast + 0.5 + brightness` per color channel,
/// alpha untouched.
pub struct BrightnessEffect {
    params: Vec<ParamDef>,
}

impl BrightnessEffect {
    pub fn new() -> Self {
        Self {
            params: param_defs(),
        }
    }
}

impl Default for BrightnessEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for BrightnessEffect {
    fn name(&self) -> &str {
        "brightness_contrast"
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
        let brightness = get_float("brightness", params, &self.params) * 255.0;
        let contrast = get_float("contrast", params, &self.params);

        let adjust = |c: u8| clamp_u8((f32::from(c) - 127.5) * contrast + 127.5 + brightness);
        map_pixels(input, output, |_, _, [r, g, b, a]| {
            [adjust(r), adjust(g), adjust(b), a]
        });
    }
}
