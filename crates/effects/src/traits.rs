//! Effect trait definition.
//!
//! All effects implement [`Effect`], which describes their parameters and
//! provides the pixel program. Programs are pure functions of
//! (input surface, parameters, time): no hidden state, so identical inputs at
//! identical playback time always produce identical output.

use ps_common::{ParamDef, ParamMap, RgbaImage, TimeCode};

/// Trait for all effect programs.
///
/// Effects define their parameters and one or more passes over an RGBA
/// surface. Dispatch (program build, ping-pong between passes) is done by the
/// compositor's backend.
pub trait Effect: Send + Sync {
    /// Unique effect name (registry key).
    fn name(&self) -> &str;

    /// Parameter definitions (for UI generation and validation).
    fn param_defs(&self) -> &[ParamDef];

    /// Whether the output depends on playback time.
    ///
    /// Time-varying effects keep the render loop running continuously.
    fn is_time_varying(&self) -> bool {
        false
    }

    /// Number of passes needed (most effects are single-pass).
    fn num_passes(&self) -> u32 {
        1
    }

    /// Run pass `pass` of the program, reading `input` and writing every
    /// pixel of `output`. Both surfaces have the same dimensions.
    fn run_pass(
        &self,
        pass: u32,
        input: &RgbaImage,
        output: &mut RgbaImage,
        params: &ParamMap,
        time: TimeCode,
    );
}

/// Run every pass of `effect` over `input` and return the final surface.
pub fn apply_effect(
    effect: &dyn Effect,
    input: &RgbaImage,
    params: &ParamMap,
    time: TimeCode,
) -> RgbaImage {
    let (width, height) = input.dimensions();
    let mut src = input.clone();
    let mut dst = RgbaImage::new(width, height);
    for pass in 0..effect.num_passes().max(1) {
        effect.run_pass(pass, &src, &mut dst, params, time);
        std::mem::swap(&mut src, &mut dst);
    }
    src
}

/// Apply `f` to every pixel of `input`, writing the result to `output`.
///
/// Shared driver for the point-wise (single pixel in, single pixel out) effects.
pub(crate) fn map_pixels(
    input: &RgbaImage,
    output: &mut RgbaImage,
    mut f: impl FnMut(u32, u32, [u8; 4]) -> [u8; 4],
) {
    for (x, y, px) in input.enumerate_pixels() {
        output.put_pixel(x, y, ps_common::Rgba(f(x, y, px.0)));
    }
}

/// Clamp a float channel value to the [0, 255] range.
#[inline(always)]
pub(crate) fn clamp_u8(val: f32) -> u8 {
    val.round().clamp(0.0, 255.0) as u8
}
