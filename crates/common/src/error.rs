//! Shared error types (thiserror-based).
//!
//! Crate-specific failures live next to the code that raises them
//! (`StackError`, `SelectionError`, `CompositorError`, `EditorError`); the
//! types here cross crate boundaries.

use thiserror::Error;

use crate::effect::EffectId;

/// Render backend errors.
///
/// These never escape the compositor: a failing effect program degrades its
/// layer to pass-through.
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("Program build failed for '{effect}': {reason}")]
    ProgramBuild { effect: EffectId, reason: String },

    #[error("Program dispatch failed for '{effect}': {reason}")]
    Dispatch { effect: EffectId, reason: String },

    #[error("Surface allocation failed: {width}x{height}")]
    SurfaceAlloc { width: u32, height: u32 },
}

/// Malformed media or clipboard payload.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Payload is empty")]
    Empty,

    #[error("Image has zero size: {width}x{height}")]
    ZeroSize { width: u32, height: u32 },

    #[error("Raw RGBA payload has {got} bytes, expected {expected}")]
    BufferSize { expected: usize, got: usize },

    #[error("Animated media frames disagree in size: {0}")]
    FrameMismatch(String),

    #[error("Malformed image data: {0}")]
    Malformed(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_build_error_names_effect() {
        let err = GpuError::ProgramBuild {
            effect: EffectId::new("swirl"),
            reason: "unknown program".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("swirl"));
        assert!(msg.contains("unknown program"));
    }

    #[test]
    fn decode_error_messages() {
        assert_eq!(DecodeError::Empty.to_string(), "Payload is empty");
        let err = DecodeError::BufferSize {
            expected: 16,
            got: 3,
        };
        assert!(err.to_string().contains("16"));
    }
}
