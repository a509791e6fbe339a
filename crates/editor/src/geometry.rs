//! Canvas geometry: resize image, change canvas size, crop to selection.
//!
//! Each operation validates first and then commits through a single
//! [`LayerStack::reshape`](ps_layers::LayerStack::reshape) call, so a failure
//! leaves every layer, the canvas and the selection untouched. The compositor
//! picks up the new canvas at its next frame boundary.

use ps_common::{raster, round_half_up, Anchor, CanvasSize, PixelRect};
use ps_layers::LayerSource;
use ps_selection::SelectionError;
use tracing::info;

use crate::context::ToolContext;
use crate::error::EditorError;

/// Scale the canvas, every media raster (all frames) and every offset.
pub fn resize_image(ctx: &mut ToolContext<'_>, width: u32, height: u32) -> Result<(), EditorError> {
    let canvas = ctx.check_canvas(width, height)?;
    let old = ctx.canvas();
    if canvas == old {
        return Ok(());
    }
    let sx = f64::from(canvas.width) / f64::from(old.width.max(1));
    let sy = f64::from(canvas.height) / f64::from(old.height.max(1));

    ctx.stack.reshape(canvas, |layer| {
        if let LayerSource::Media(media) = &mut layer.source {
            let (w, h) = media.dimensions();
            let (nw, nh) = (scale_dim(w, sx), scale_dim(h, sy));
            *media = media.map_frames(|frame| raster::resample(frame, nw, nh));
        }
        layer.offset_x = round_half_up(f64::from(layer.offset_x) * sx);
        layer.offset_y = round_half_up(f64::from(layer.offset_y) * sy);
    });
    ctx.selection.rescale(canvas);
    info!(from = %old, to = %canvas, layers = ctx.stack.len(), "Image resized");
    Ok(())
}

fn scale_dim(dim: u32, scale: f64) -> u32 {
    ((f64::from(dim) * scale).round() as u32).max(1)
}

/// Displacement of the old frame inside the new one for `anchor`:
/// `(Δw·fx, Δh·fy)` with `fx, fy ∈ {0, ½, 1}`, halves floored.
pub fn anchor_shift(old: CanvasSize, new: CanvasSize, anchor: Anchor) -> (i32, i32) {
    let (hx, hy) = anchor.halves();
    let dw = i64::from(new.width) - i64::from(old.width);
    let dh = i64::from(new.height) - i64::from(old.height);
    ((dw * hx).div_euclid(2) as i32, (dh * hy).div_euclid(2) as i32)
}

/// Change the canvas size without rescaling content.
///
/// Every offset (and the selection) shifts by [`anchor_shift`], so relative
/// positions between layers are preserved exactly.
pub fn change_canvas_size(
    ctx: &mut ToolContext<'_>,
    width: u32,
    height: u32,
    anchor: Anchor,
) -> Result<(), EditorError> {
    let canvas = ctx.check_canvas(width, height)?;
    let old = ctx.canvas();
    let (dx, dy) = anchor_shift(old, canvas, anchor);
    reframe(ctx, canvas, dx, dy);
    ctx.selection.reframe(canvas, dx, dy);
    info!(from = %old, to = %canvas, anchor = ?anchor, dx, dy, "Canvas size changed");
    Ok(())
}

/// Shrink the canvas to the selection bounds and clear the selection.
///
/// Every media layer is re-offset so its pixels keep their position relative
/// to the selection: what was under the selection's top-left corner lands at
/// `(0, 0)` of the new canvas.
pub fn crop_to_selection(ctx: &mut ToolContext<'_>) -> Result<(), EditorError> {
    let bounds = ctx.selection.bounds().ok_or(SelectionError::NoSelection)?;
    let canvas = ctx.check_canvas(bounds.width, bounds.height)?;
    let old = ctx.canvas();
    let (dx, dy) = crop_shift(old, canvas, bounds);
    ctx.stack.reshape(canvas, |layer| {
        let (offset_x, offset_y) = match layer.dimensions() {
            Some((w, h)) => {
                let (left, top) = old.placement(w, h, layer.offset());
                canvas.offset_for(
                    left.saturating_sub(bounds.x),
                    top.saturating_sub(bounds.y),
                    w,
                    h,
                )
            }
            None => (
                layer.offset_x.saturating_add(dx),
                layer.offset_y.saturating_add(dy),
            ),
        };
        layer.offset_x = offset_x;
        layer.offset_y = offset_y;
    });
    ctx.selection.reset(canvas);
    info!(from = %old, to = %canvas, x = bounds.x, y = bounds.y, "Cropped to selection");
    Ok(())
}

/// Offset change that keeps content fixed relative to `sel` when the canvas
/// shrinks from `old` to `new`: `floor((old - new) / 2) - sel` per axis.
///
/// Exact for boxes whose size has the parity of both canvases; media layers
/// are re-placed individually.
pub fn crop_shift(old: CanvasSize, new: CanvasSize, sel: PixelRect) -> (i32, i32) {
    let shift = |old: u32, new: u32, at: i32| {
        let v = (i64::from(old) - i64::from(new)).div_euclid(2) - i64::from(at);
        v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    };
    (shift(old.width, new.width, sel.x), shift(old.height, new.height, sel.y))
}

fn reframe(ctx: &mut ToolContext<'_>, canvas: CanvasSize, dx: i32, dy: i32) {
    ctx.stack.reshape(canvas, |layer| {
        layer.offset_x = layer.offset_x.saturating_add(dx);
        layer.offset_y = layer.offset_y.saturating_add(dy);
    });
}
