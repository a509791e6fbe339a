//! Selection error types.

use ps_common::CanvasSize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The operation needs an active selection.
    #[error("No active selection")]
    NoSelection,

    /// A mask does not cover the canvas exactly.
    #[error("Mask is {width}x{height}, canvas is {canvas}")]
    SizeMismatch {
        width: u32,
        height: u32,
        canvas: CanvasSize,
    },

    /// The background mask worker has shut down.
    #[error("Mask worker is not running")]
    WorkerStopped,
}
