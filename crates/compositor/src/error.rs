//! Compositor error types.

use thiserror::Error;

/// Errors that can occur during compositing.
///
/// Effect program failures are not here: they degrade the layer to
/// pass-through instead of failing the frame.
#[derive(Debug, Error)]
pub enum CompositorError {
    /// Surface allocation failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] ps_common::GpuError),

    /// A capture was requested before the first frame was rendered.
    #[error("No frame has been rendered yet")]
    NoFrame,

    /// Encoding the captured frame failed.
    #[error("Frame encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_error_converts() {
        let gpu_err = ps_common::GpuError::SurfaceAlloc {
            width: 0,
            height: 4,
        };
        let err: CompositorError = gpu_err.into();
        assert!(matches!(err, CompositorError::Gpu(_)));
        assert!(err.to_string().contains("0x4"));
    }

    #[test]
    fn no_frame_message() {
        assert_eq!(
            CompositorError::NoFrame.to_string(),
            "No frame has been rendered yet"
        );
    }
}
