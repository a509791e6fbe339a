//! Paste from the clipboard boundary.

use ps_common::{raster, round_half_up, LayerId};
use ps_layers::Layer;
use tracing::info;

use crate::clipboard::ClipboardSource;
use crate::context::ToolContext;
use crate::error::EditorError;

/// Paste the clipboard image as a new top-of-stack layer and make it active.
///
/// With a selection the image is resampled to the selection bounds and
/// centered on them, and the selection is cleared. Without one it keeps its
/// native size at offset (0, 0). Decode failures create nothing.
pub fn paste(
    ctx: &mut ToolContext<'_>,
    clipboard: &mut dyn ClipboardSource,
) -> Result<LayerId, EditorError> {
    let payload = clipboard.read_image().ok_or(EditorError::ClipboardEmpty)?;
    let image = payload.decode()?;
    let canvas = ctx.canvas();
    let bounds = ctx.selection.bounds();

    let (image, offset) = match bounds {
        Some(sel) => {
            let (cx, cy) = sel.center();
            let offset = (
                round_half_up(cx - f64::from(canvas.width) / 2.0),
                round_half_up(cy - f64::from(canvas.height) / 2.0),
            );
            (raster::resample(&image, sel.width, sel.height), offset)
        }
        None => (image, (0, 0)),
    };

    let (width, height) = image.dimensions();
    let layer = Layer::still(ctx.config.names.pasted.clone(), image).with_offset(offset.0, offset.1);
    let id = ctx.stack.push(layer)?;
    ctx.stack.set_active(Some(id))?;
    if bounds.is_some() {
        ctx.selection.clear();
    }
    info!(layer = %id, width, height, offset_x = offset.0, offset_y = offset.1, "Pasted image");
    Ok(id)
}
