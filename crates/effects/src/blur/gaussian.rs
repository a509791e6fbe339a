//! Gaussian Blur effect (separable).

use ps_common::{ParamDef, ParamMap, ParamType, ParamValue, Rgba, RgbaImage, TimeCode};

use crate::params::get_float;
use crate::traits::{clamp_u8, Effect};

fn param_defs() -> Vec<ParamDef> {
    vec![
        ParamDef {
            name: "radius".to_string(),
            display_name: "Radius".to_string(),
            param_type: ParamType::Float {
                min: 0.0,
                max: 100.0,
            },
            default: ParamValue::Float(5.0),
        },
        ParamDef {
            name: "sigma".to_string(),
            display_name: "Sigma".to_string(),
            param_type: ParamType::Float {
                min: 0.1,
                max: 50.0,
            },
            default: ParamValue::Float(2.0),
        },
    ]
}

/// Normalized 1-D Gaussian weights for taps `-radius..=radius`.
pub fn gaussian_kernel(radius: u32, sigma: f32) -> Vec<f32> {
    let sigma = sigma.max(0.01);
    let r = radius as i64;
    let mut weights: Vec<f32> = (-r..=r)
        .map(|i| {
            let d = i as f32;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Gaussian Blur (separable two-pass).
///
/// Pass 0 blurs horizontally, pass 1 vertically. Color is averaged
/// alpha-weighted so transparent neighbours do not bleed black into edges.
/// Samples beyond the surface clamp to the nearest edge pixel.
pub struct GaussianBlurEffect {
    params: Vec<ParamDef>,
}

impl GaussianBlurEffect {
    pub fn new() -> Self {
        Self {
            params: param_defs(),
        }
    }
}

impl Default for GaussianBlurEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for GaussianBlurEffect {
    fn name(&self) -> &str {
        "gaussian_blur"
    }

    fn param_defs(&self) -> &[ParamDef] {
        &self.params
    }

    fn num_passes(&self) -> u32 {
        2 // Horizontal pass + vertical pass (separable)
    }

    fn run_pass(
        &self,
        pass: u32,
        input: &RgbaImage,
        output: &mut RgbaImage,
        params: &ParamMap,
        _time: TimeCode,
    ) {
        let radius = get_float("radius", params, &self.params).round().max(0.0) as u32;
        let sigma = get_float("sigma", params, &self.params);

        if radius == 0 {
            output.copy_from_slice(input);
            return;
        }

        let kernel = gaussian_kernel(radius, sigma);
        let (width, height) = input.dimensions();
        let r = radius as i64;
        let horizontal = pass == 0;

        for y in 0..height {
            for x in 0..width {
                let mut acc = [0.0f32; 3];
                let mut alpha = 0.0f32;
                for (k, w) in kernel.iter().enumerate() {
                    let d = k as i64 - r;
                    let (sx, sy) = if horizontal {
                        ((x as i64 + d).clamp(0, width as i64 - 1) as u32, y)
                    } else {
                        (x, (y as i64 + d).clamp(0, height as i64 - 1) as u32)
                    };
                    let [cr, cg, cb, ca] = input.get_pixel(sx, sy).0;
                    let wa = w * f32::from(ca);
                    acc[0] += wa * f32::from(cr);
                    acc[1] += wa * f32::from(cg);
                    acc[2] += wa * f32::from(cb);
                    alpha += wa;
                }
                let px = if alpha > 0.0 {
                    [
                        clamp_u8(acc[0] / alpha),
                        clamp_u8(acc[1] / alpha),
                        clamp_u8(acc[2] / alpha),
                        clamp_u8(alpha),
                    ]
                } else {
                    [0, 0, 0, 0]
                };
                output.put_pixel(x, y, Rgba(px));
            }
        }
    }
}
