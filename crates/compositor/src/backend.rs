//! Render backend abstraction.
//!
//! The compositor programs against [`GpuBackend`], never against a concrete
//! device. A backend builds effect programs by id, allocates surfaces and
//! dispatches one pass of a program from an input surface to an output
//! surface. [`SoftwareBackend`](crate::SoftwareBackend) is the CPU
//! implementation on top of the effect registry.

use ps_common::{CanvasSize, EffectId, GpuError, ParamMap, RgbaImage, TimeCode};

/// What the compositor needs to know about a built program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramInfo {
    /// Number of ping-pong passes per dispatch.
    pub passes: u32,
    /// Output depends on playback time.
    pub time_varying: bool,
}

/// Core render backend abstraction.
pub trait GpuBackend: Send {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    // -- Programs --

    /// Build (compile / look up) the program for `effect`.
    fn build_program(&self, effect: &EffectId) -> Result<ProgramInfo, GpuError>;

    /// Run pass `pass` of a built program, reading `input` and writing every
    /// pixel of `output`. Both surfaces have the same dimensions.
    fn dispatch(
        &self,
        effect: &EffectId,
        pass: u32,
        input: &RgbaImage,
        output: &mut RgbaImage,
        params: &ParamMap,
        time: TimeCode,
    ) -> Result<(), GpuError>;

    // -- Memory --

    /// Allocate a transparent surface covering `canvas`.
    fn alloc_surface(&self, canvas: CanvasSize) -> Result<RgbaImage, GpuError>;
}
