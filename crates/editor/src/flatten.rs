//! Flatten: merge layers into one media layer.

use ps_common::LayerId;
use ps_layers::{Layer, StackError};
use tracing::info;

use crate::context::ToolContext;
use crate::error::EditorError;

/// Slot range of `ids` in the stack; they must exist and be contiguous.
fn contiguous_run(ctx: &ToolContext<'_>, ids: &[LayerId]) -> Result<(usize, usize), StackError> {
    let mut indices = ids
        .iter()
        .map(|&id| ctx.stack.index_of(id).ok_or(StackError::NotFound(id)))
        .collect::<Result<Vec<_>, _>>()?;
    indices.sort_unstable();
    indices.dedup();
    match (indices.first(), indices.last()) {
        (Some(&first), Some(&last)) if last - first + 1 == indices.len() => Ok((first, last)),
        _ => Err(StackError::NotContiguous),
    }
}

/// Composite a contiguous run of layers (hidden members skipped) into one
/// canvas-sized media layer named "flattened" that takes the run's slot.
pub fn flatten_selected(ctx: &mut ToolContext<'_>, ids: &[LayerId]) -> Result<LayerId, EditorError> {
    let (first, last) = contiguous_run(ctx, ids)?;
    let canvas = ctx.canvas();
    let image = ctx
        .compositor
        .compose_layers(&ctx.stack.layers()[first..=last], canvas, ctx.time)?;

    let layer = Layer::still(ctx.config.names.flattened.clone(), image);
    let id = layer.id;
    let slot = ctx.stack.replace_run(ids, layer)?;
    ctx.stack.set_active(Some(id))?;
    info!(layer = %id, merged = last - first + 1, slot, "Flattened layers");
    Ok(id)
}

/// Composite every visible layer into a single media layer; the stack is
/// left with exactly that layer.
pub fn flatten_image(ctx: &mut ToolContext<'_>) -> Result<LayerId, EditorError> {
    let canvas = ctx.canvas();
    let image = ctx
        .compositor
        .compose_layers(ctx.stack.layers(), canvas, ctx.time)?;

    let layer = Layer::still(ctx.config.names.flattened_image.clone(), image);
    let id = layer.id;
    let merged = ctx.stack.len();
    if merged == 0 {
        ctx.stack.push(layer)?;
    } else {
        let ids = ctx.stack.ids();
        ctx.stack.replace_run(&ids, layer)?;
    }
    ctx.stack.set_active(Some(id))?;
    info!(layer = %id, merged, "Flattened image");
    Ok(id)
}
