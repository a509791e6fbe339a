//! Explicit state handed to tool and geometry handlers.

use ps_common::{CanvasSize, EditorConfig, TimeCode};
use ps_compositor::Compositor;
use ps_layers::LayerStack;
use ps_selection::SelectionManager;

use crate::error::EditorError;

/// Everything an editing operation may read or mutate.
///
/// Handlers receive this instead of reaching for global state, so the
/// extraction state machine and the geometry operations can be driven in
/// isolation.
pub struct ToolContext<'a> {
    pub stack: &'a mut LayerStack,
    pub selection: &'a mut SelectionManager,
    pub compositor: &'a mut Compositor,
    pub config: &'a EditorConfig,
    /// Playback time used when an operation has to composite.
    pub time: TimeCode,
}

impl ToolContext<'_> {
    pub fn canvas(&self) -> CanvasSize {
        self.stack.canvas()
    }

    /// Validate a requested canvas size against the configured limits.
    pub fn check_canvas(&self, width: u32, height: u32) -> Result<CanvasSize, EditorError> {
        check_canvas(self.config, width, height)
    }
}

/// A canvas size is valid when both sides are in `1..=max_canvas_dimension`.
pub fn check_canvas(
    config: &EditorConfig,
    width: u32,
    height: u32,
) -> Result<CanvasSize, EditorError> {
    let max = config.max_canvas_dimension;
    if width == 0 || height == 0 || width > max || height > max {
        return Err(EditorError::InvalidGeometry(format!(
            "canvas {width}x{height} outside 1..={max}"
        )));
    }
    Ok(CanvasSize::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_limits() {
        let config = EditorConfig {
            max_canvas_dimension: 100,
            ..EditorConfig::default()
        };
        assert_eq!(check_canvas(&config, 100, 1).unwrap(), CanvasSize::new(100, 1));
        assert!(matches!(
            check_canvas(&config, 0, 10),
            Err(EditorError::InvalidGeometry(_))
        ));
        assert!(check_canvas(&config, 10, 101).is_err());
    }
}
