//! Mapping a layer raster onto the canvas.

use ps_common::{CanvasSize, PixelRect};

/// The visible part of a placed raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Canvas-space region covered (always inside the canvas).
    pub dst: PixelRect,
    /// Raster-space origin of `dst`.
    pub src_x: u32,
    pub src_y: u32,
}

impl Placement {
    /// Clip a raster rectangle given in canvas coordinates.
    ///
    /// Returns `None` when the raster lies entirely off the canvas.
    pub fn resolve(canvas: CanvasSize, rect: PixelRect) -> Option<Self> {
        let dst = rect.intersect(&canvas.rect())?;
        Some(Self {
            dst,
            src_x: (dst.x - rect.x) as u32,
            src_y: (dst.y - rect.y) as u32,
        })
    }

    /// Resolve a `width x height` raster with a center offset.
    pub fn for_offset(
        canvas: CanvasSize,
        width: u32,
        height: u32,
        offset: (i32, i32),
    ) -> Option<Self> {
        let (left, top) = canvas.placement(width, height, offset);
        Self::resolve(canvas, PixelRect::new(left, top, width, height))
    }
}
