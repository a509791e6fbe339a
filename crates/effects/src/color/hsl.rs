//! Hue / Saturation / Lightness adjustment effect.

use ps_common::{ParamDef, ParamMap, ParamType, ParamValue, RgbaImage, TimeCode};

use crate::params::get_float;
use crate::traits::{clamp_u8, map_pixels, Effect};

fn param_defs() -> Vec<ParamDef> {
    vec![
        ParamDef {
            name: "hue".to_string(),
            display_name: "Hue".to_string(),
            param_type: ParamType::Float {
                min: -180.0,
                max: 180.0,
            },
            default: ParamValue::Float(0.0),
        },
        ParamDef {
            name: "saturation".to_string(),
            display_name: "Saturation".to_string(),
            param_type: ParamType::Float {
                min: -1.0,
                max: 1.0,
            },
            default: ParamValue::Float(0.0),
        },
        ParamDef {
            name: "lightness".to_string(),
            display_name: "Lightness".to_string(),
            param_type: ParamType::Float {
                min: -1.0,
                max: 1.0,
            },
            default: ParamValue::Float(0.0),
        },
    ]
}

/// Hue / Saturation / Lightness adjustment.
pub struct HslEffect {
    params: Vec<ParamDef>,
}

impl HslEffect {
    pub fn new() -> Self {
        Self {
            params: param_defs(),
        }
    }
}

impl Default for HslEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for HslEffect {
    fn name(&self) -> &str {
        "hsl_adjust"
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
        let hue_shift = get_float("hue", params, &self.params) / 360.0;
        let sat = get_float("saturation", params, &self.params);
        let light = get_float("lightness", params, &self.params);

        if hue_shift == 0.0 && sat == 0.0 && light == 0.0 {
            output.copy_from_slice(input);
            return;
        }

        map_pixels(input, output, |_, _, [r, g, b, a]| {
            let (h, s, l) = rgb_to_hsl(
                f32::from(r) / 255.0,
                f32::from(g) / 255.0,
                f32::from(b) / 255.0,
            );
            let h = (h + hue_shift).rem_euclid(1.0);
            let s = (s * (1.0 + sat)).clamp(0.0, 1.0);
            let l = if light >= 0.0 {
                l + (1.0 - l) * light
            } else {
                l * (1.0 + light)
            };
            let (r, g, b) = hsl_to_rgb(h, s, l.clamp(0.0, 1.0));
            [clamp_u8(r * 255.0), clamp_u8(g * 255.0), clamp_u8(b * 255.0), a]
        });
    }
}

/// RGB (0..1) to HSL, hue in turns (0..1).
fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;
    if d == 0.0 {
        return (0.0, 0.0, l);
    }
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h / 6.0, s, l)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        return (l, l, l);
    }
    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    (
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
