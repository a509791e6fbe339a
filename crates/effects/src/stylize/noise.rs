//! Film Grain / Noise effect.

use ps_common::{ParamDef, ParamMap, ParamType, ParamValue, RgbaImage, TimeCode};

use crate::params::{get_bool, get_float, get_int};
use crate::traits::{clamp_u8, map_pixels, Effect};

/// Grain pattern refresh rate.
const GRAIN_FPS: f64 = 24.0;

fn param_defs() -> Vec<ParamDef> {
    vec![
        ParamDef {
            name: "amount".to_string(),
            display_name: "Amount".to_string(),
            param_type: ParamType::Float { min: 0.0, max: 1.0 },
            default: ParamValue::Float(0.1),
        },
        ParamDef {
            name: "monochrome".to_string(),
            display_name: "Monochrome".to_string(),
            param_type: ParamType::Bool,
            default: ParamValue::Bool(false),
        },
        ParamDef {
            name: "seed".to_string(),
            display_name: "Seed".to_string(),
            param_type: ParamType::Int { min: 0, max: 65535 },
            default: ParamValue::Int(0),
        },
    ]
}

/// Film Grain / Noise effect.
///
/// The grain is a hash of (pixel, grain frame, seed, channel), where the grain
/// frame is playback time quantized to [`GRAIN_FPS`]. The pattern animates
/// with time but is identical for identical inputs.
pub struct NoiseGrainEffect {
    params: Vec<ParamDef>,
}

impl NoiseGrainEffect {
    pub fn new() -> Self {
        Self {
            params: param_defs(),
        }
    }
}

impl Default for NoiseGrainEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for NoiseGrainEffect {
    fn name(&self) -> &str {
        "noise_grain"
    }

    fn param_defs(&self) -> &[ParamDef] {
        &self.params
    }

    fn is_time_varying(&self) -> bool {
        true
    }

    fn run_pass(
        &self,
        _pass: u32,
        input: &RgbaImage,
        output: &mut RgbaImage,
        params: &ParamMap,
        time: TimeCode,
    ) {
        let amount = get_float("amount", params, &self.params) * 255.0;
        let monochrome = get_bool("monochrome", params, &self.params);
        let seed = get_int("seed", params, &self.params) as u32;
        let frame = (time.as_secs().max(0.0) * GRAIN_FPS).floor() as u32;

        map_pixels(input, output, |x, y, [r, g, b, a]| {
            let grain = |channel: u32| {
                let h = hash(x, y, frame ^ seed.rotate_left(16), channel);
                (h as f32 / u32::MAX as f32 - 0.5) * 2.0 * amount
            };
            if monochrome {
                let n = grain(0);
                [
                    clamp_u8(f32::from(r) + n),
                    clamp_u8(f32::from(g) + n),
                    clamp_u8(f32::from(b) + n),
                    a,
                ]
            } else {
                [
                    clamp_u8(f32::from(r) + grain(0)),
                    clamp_u8(f32::from(g) + grain(1)),
                    clamp_u8(f32::from(b) + grain(2)),
                    a,
                ]
            }
        });
    }
}

/// Integer hash with good avalanche (lowbias32 finalizer).
fn hash(x: u32, y: u32, frame: u32, channel: u32) -> u32 {
    let mut h = x
        .wrapping_mul(0x8da6_b343)
        .wrapping_add(y.wrapping_mul(0xd816_3841))
        .wrapping_add(frame.wrapping_mul(0xcb1a_b31f))
        .wrapping_add(channel.wrapping_mul(0x1656_67b1));
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^= h >> 16;
    h
}
