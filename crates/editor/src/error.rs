//! Editor error types.
//!
//! Every lower-level error converts into [`EditorError`] with `?`. Editor
//! operations validate before they mutate, so any error leaves the stack and
//! the selection as they were.

use ps_common::{DecodeError, LayerId};
use ps_compositor::CompositorError;
use ps_effects::EffectError;
use ps_layers::StackError;
use ps_selection::SelectionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Layer stack error: {0}")]
    Stack(#[from] StackError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Compositor error: {0}")]
    Compositor(#[from] CompositorError),

    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),

    /// A canvas or raster size outside `1..=max_canvas_dimension`.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The layer's source can not be used by this operation.
    #[error("Layer {id} is not supported here: {reason}")]
    UnsupportedSource { id: LayerId, reason: String },

    #[error("No active layer")]
    NoActiveLayer,

    #[error("Clipboard holds no image")]
    ClipboardEmpty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        let err: EditorError = SelectionError::NoSelection.into();
        assert!(matches!(err, EditorError::Selection(SelectionError::NoSelection)));

        let err: EditorError = StackError::NotContiguous.into();
        assert!(err.to_string().starts_with("Layer stack error"));

        let err: EditorError = DecodeError::Empty.into();
        assert!(matches!(err, EditorError::Decode(_)));
    }

    #[test]
    fn unsupported_source_names_layer() {
        let err = EditorError::UnsupportedSource {
            id: LayerId(7),
            reason: "effect layers have no pixels".into(),
        };
        assert!(err.to_string().contains("L7"));
    }
}
