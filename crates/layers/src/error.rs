//! Layer stack error types.

use ps_common::LayerId;
use thiserror::Error;

use crate::layer::SourceType;

/// Structural errors raised by [`LayerStack`](crate::LayerStack) operations.
///
/// Every failing operation leaves the stack exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    #[error("Index {index} is not a valid insertion point for a stack of {len} layers")]
    InvalidIndex { index: usize, len: usize },

    #[error("Layer not found: {0}")]
    NotFound(LayerId),

    #[error("Base layer {0} can not be moved")]
    BaseLayerLocked(LayerId),

    #[error("Layers do not form a contiguous run")]
    NotContiguous,

    #[error("Layer {0} is already in the stack")]
    DuplicateId(LayerId),

    #[error("Layer {id} has no {expected} source")]
    WrongSource { id: LayerId, expected: SourceType },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = StackError::InvalidIndex { index: 5, len: 2 };
        assert!(err.to_string().contains('5'));

        let err = StackError::NotFound(LayerId(7));
        assert_eq!(err.to_string(), "Layer not found: L7");

        let err = StackError::WrongSource {
            id: LayerId(3),
            expected: SourceType::Effect,
        };
        assert_eq!(err.to_string(), "Layer L3 has no effect source");
    }
}
