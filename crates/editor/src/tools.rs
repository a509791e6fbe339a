//! Move and clone tools.
//!
//! Both tools run the same per-gesture state machine:
//!
//! ```text
//! IDLE --press inside--> ARMED --first movement--> EXTRACTED --movement--> DRAGGING
//!   ^                      |                            |                      |
//!   +------release/cancel--+----------release/cancel----+----release/cancel----+
//! ```
//!
//! Extraction happens exactly once per gesture. The move tool cuts the
//! selected pixels out of the active layer, the clone tool copies them; the
//! result is a new top-of-stack layer that follows the pointer. The selection
//! is read but never changed.

use ps_common::{raster, CanvasSize, LayerId, PixelRect, Rgba, RgbaImage};
use ps_layers::{Layer, MediaSource};
use ps_selection::Mask;
use tracing::{debug, info, warn};

use crate::context::ToolContext;
use crate::error::EditorError;

/// Which extraction the tool performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractMode {
    /// Cut: source alpha is reduced by the mask coverage.
    Move,
    /// Copy: the source layer is left untouched.
    Clone,
}

/// Observable gesture phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Armed,
    Extracted,
    Dragging,
}

#[derive(Debug)]
struct Extraction {
    source: LayerId,
    layer: LayerId,
    press: (i32, i32),
    /// Offset of the new layer at extraction time.
    origin: (i32, i32),
    /// Source content before the cut (move only), restored on cancel.
    original: Option<MediaSource>,
}

#[derive(Debug)]
enum Gesture {
    Idle,
    Armed { source: LayerId, press: (i32, i32) },
    Extracted(Extraction),
    Dragging(Extraction),
}

/// Pixels lifted out of a layer.
struct Cutout {
    image: RgbaImage,
    /// Canvas position of the cutout's top-left corner.
    left: i32,
    top: i32,
    /// Source raster after the cut (move only).
    remainder: Option<RgbaImage>,
}

/// `value * coverage / 255`, rounded.
fn scale_alpha(value: u8, coverage: u8) -> u8 {
    ((u32::from(value) * u32::from(coverage) + 127) / 255) as u8
}

/// Lift the pixels of `image` (placed at `placement`) that fall under `mask`,
/// or all of them without a mask. `None` when nothing visible is covered.
fn cut_out(
    image: &RgbaImage,
    placement: PixelRect,
    mask: Option<&Mask>,
    mode: ExtractMode,
) -> Option<Cutout> {
    let mut lifted = RgbaImage::new(image.width(), image.height());
    let mut remainder = (mode == ExtractMode::Move).then(|| image.clone());
    for (x, y, px) in image.enumerate_pixels() {
        let coverage =
            mask.map_or(255, |m| m.coverage(placement.x + x as i32, placement.y + y as i32));
        if coverage == 0 || px[3] == 0 {
            continue;
        }
        let [r, g, b, a] = px.0;
        lifted.put_pixel(x, y, Rgba([r, g, b, scale_alpha(a, coverage)]));
        if let Some(rest) = remainder.as_mut() {
            rest.get_pixel_mut(x, y).0[3] = scale_alpha(a, 255 - coverage);
        }
    }
    let bounds = raster::opaque_bounds(&lifted)?;
    Some(Cutout {
        image: raster::crop(&lifted, bounds),
        left: placement.x + bounds.x,
        top: placement.y + bounds.y,
        remainder,
    })
}

/// The move or clone tool.
#[derive(Debug)]
pub struct ExtractionTool {
    mode: ExtractMode,
    gesture: Gesture,
}

impl ExtractionTool {
    pub fn new(mode: ExtractMode) -> Self {
        Self {
            mode,
            gesture: Gesture::Idle,
        }
    }

    pub fn move_tool() -> Self {
        Self::new(ExtractMode::Move)
    }

    pub fn clone_tool() -> Self {
        Self::new(ExtractMode::Clone)
    }

    pub fn mode(&self) -> ExtractMode {
        self.mode
    }

    pub fn phase(&self) -> GesturePhase {
        match self.gesture {
            Gesture::Idle => GesturePhase::Idle,
            Gesture::Armed { .. } => GesturePhase::Armed,
            Gesture::Extracted(_) => GesturePhase::Extracted,
            Gesture::Dragging(_) => GesturePhase::Dragging,
        }
    }

    /// The layer created by this gesture, once extracted.
    pub fn extracted_layer(&self) -> Option<LayerId> {
        match &self.gesture {
            Gesture::Extracted(e) | Gesture::Dragging(e) => Some(e.layer),
            _ => None,
        }
    }

    /// Pointer down at canvas `(x, y)`. Returns whether the tool armed.
    ///
    /// Arms only from IDLE, only for a still media active layer, and only
    /// inside the selection (or, without one, inside the layer's opaque
    /// bounds).
    pub fn press(&mut self, ctx: &mut ToolContext<'_>, x: i32, y: i32) -> Result<bool, EditorError> {
        if !matches!(self.gesture, Gesture::Idle) {
            return Ok(false);
        }
        let canvas = ctx.canvas();
        let layer = ctx.stack.active_layer().ok_or(EditorError::NoActiveLayer)?;
        let Some(image) = layer.still_image() else {
            return Err(EditorError::UnsupportedSource {
                id: layer.id,
                reason: "extraction needs a still media layer".to_string(),
            });
        };
        let inside = if ctx.selection.has_selection() {
            ctx.selection.coverage(x, y) > 0
        } else {
            opaque_rect(layer, image, canvas).is_some_and(|r| r.contains(x, y))
        };
        if !inside {
            debug!(x, y, layer = %layer.id, "Press outside extractable area");
            return Ok(false);
        }
        self.gesture = Gesture::Armed {
            source: layer.id,
            press: (x, y),
        };
        debug!(x, y, layer = %layer.id, mode = ?self.mode, "Extraction armed");
        Ok(true)
    }

    /// Pointer moved to canvas `(x, y)`.
    ///
    /// The first movement off the press point extracts; later movements
    /// place the new layer at its extraction offset plus the pointer delta.
    pub fn drag(&mut self, ctx: &mut ToolContext<'_>, x: i32, y: i32) -> Result<(), EditorError> {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => Ok(()),
            Gesture::Armed { source, press } => {
                if (x, y) == press {
                    self.gesture = Gesture::Armed { source, press };
                    return Ok(());
                }
                match self.extract(ctx, source, press) {
                    Ok(Some(extraction)) => {
                        self.gesture = Gesture::Extracted(extraction);
                        Ok(())
                    }
                    Ok(None) => Ok(()),
                    Err(err) => Err(err),
                }
            }
            Gesture::Extracted(extraction) | Gesture::Dragging(extraction) => {
                let target = (
                    extraction.origin.0.saturating_add(x.saturating_sub(extraction.press.0)),
                    extraction.origin.1.saturating_add(y.saturating_sub(extraction.press.1)),
                );
                let result = match ctx.stack.get(extraction.layer) {
                    Some(layer) if layer.offset() == target => Ok(()),
                    _ => ctx
                        .stack
                        .set_offset(extraction.layer, target.0, target.1)
                        .map_err(EditorError::from),
                };
                self.gesture = Gesture::Dragging(extraction);
                result
            }
        }
    }

    /// Pointer up: finalize. Returns the extracted layer, if any.
    pub fn release(&mut self, _ctx: &mut ToolContext<'_>) -> Option<LayerId> {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Extracted(e) | Gesture::Dragging(e) => {
                info!(layer = %e.layer, source = %e.source, mode = ?self.mode, "Extraction finalized");
                Some(e.layer)
            }
            Gesture::Armed { .. } | Gesture::Idle => None,
        }
    }

    /// Abort from any state back to IDLE, undoing an extraction.
    pub fn cancel(&mut self, ctx: &mut ToolContext<'_>) {
        let extraction = match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Extracted(e) | Gesture::Dragging(e) => e,
            Gesture::Armed { .. } | Gesture::Idle => return,
        };
        if let Err(err) = ctx.stack.remove(extraction.layer) {
            warn!(layer = %extraction.layer, error = %err, "Extracted layer already gone");
        }
        if let Some(original) = extraction.original {
            if let Err(err) = ctx.stack.replace_media(extraction.source, original) {
                warn!(layer = %extraction.source, error = %err, "Could not restore source layer");
            }
        }
        if ctx.stack.get(extraction.source).is_some() {
            if let Err(err) = ctx.stack.set_active(Some(extraction.source)) {
                warn!(layer = %extraction.source, error = %err, "Could not reactivate source layer");
            }
        }
        info!(source = %extraction.source, mode = ?self.mode, "Extraction cancelled");
    }

    fn extract(
        &self,
        ctx: &mut ToolContext<'_>,
        source: LayerId,
        press: (i32, i32),
    ) -> Result<Option<Extraction>, EditorError> {
        let canvas = ctx.canvas();
        let layer = ctx.stack.get(source).ok_or(ps_layers::StackError::NotFound(source))?;
        let (Some(image), Some(placement)) = (layer.still_image(), layer.placement(canvas)) else {
            return Err(EditorError::UnsupportedSource {
                id: source,
                reason: "extraction needs a still media layer".to_string(),
            });
        };
        let mask = ctx.selection.mask_snapshot();
        let Some(cut) = cut_out(image, placement, mask.as_deref(), self.mode) else {
            debug!(layer = %source, "Nothing to extract, gesture aborted");
            return Ok(None);
        };

        let (width, height) = cut.image.dimensions();
        let origin = canvas.offset_for(cut.left, cut.top, width, height);
        let names = &ctx.config.names;
        let name = match self.mode {
            ExtractMode::Move => names.moved.clone(),
            ExtractMode::Clone => names.cloned.clone(),
        };
        let layer = Layer::still(name, cut.image).with_offset(origin.0, origin.1);
        let new_id = ctx.stack.push(layer)?;

        let original = match cut.remainder {
            Some(rest) => match ctx.stack.replace_media(source, MediaSource::Still(rest)) {
                Ok(old) => Some(old),
                Err(err) => {
                    if let Err(undo) = ctx.stack.remove(new_id) {
                        warn!(layer = %new_id, error = %undo, "Could not drop extracted layer");
                    }
                    return Err(err.into());
                }
            },
            None => None,
        };
        ctx.stack.set_active(Some(new_id))?;
        info!(
            source = %source,
            layer = %new_id,
            mode = ?self.mode,
            width,
            height,
            "Pixels extracted"
        );
        Ok(Some(Extraction {
            source,
            layer: new_id,
            press,
            origin,
            original,
        }))
    }
}

/// Canvas rectangle of the layer's non-transparent pixels.
fn opaque_rect(layer: &Layer, image: &RgbaImage, canvas: CanvasSize) -> Option<PixelRect> {
    let placement = layer.placement(canvas)?;
    let bounds = raster::opaque_bounds(image)?;
    Some(PixelRect::new(
        placement.x + bounds.x,
        placement.y + bounds.y,
        bounds.width,
        bounds.height,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_common::{EditorConfig, OverlayConfig, TimeCode};
    use ps_compositor::{Compositor, SoftwareBackend};
    use ps_layers::LayerStack;
    use ps_selection::{SelectionKind, SelectionManager, SelectionPath};

    struct Fixture {
        stack: LayerStack,
        selection: SelectionManager,
        compositor: Compositor,
        config: EditorConfig,
    }

    impl Fixture {
        /// 8x8 canvas with an opaque 4x4 green layer at (2, 2), active.
        fn new() -> Self {
            let canvas = CanvasSize::new(8, 8);
            let mut stack = LayerStack::new(canvas);
            stack
                .push(Layer::still("base", RgbaImage::new(8, 8)))
                .unwrap();
            let id = stack
                .push(Layer::still(
                    "green",
                    RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255])),
                ))
                .unwrap();
            stack.set_active(Some(id)).unwrap();
            Self {
                stack,
                selection: SelectionManager::new(canvas),
                compositor: Compositor::new(
                    Box::new(SoftwareBackend::with_builtins()),
                    OverlayConfig::default(),
                ),
                config: EditorConfig::default(),
            }
        }

        fn ctx(&mut self) -> ToolContext<'_> {
            ToolContext {
                stack: &mut self.stack,
                selection: &mut self.selection,
                compositor: &mut self.compositor,
                config: &self.config,
                time: TimeCode::ZERO,
            }
        }
    }

    #[test]
    fn scale_alpha_rounds() {
        assert_eq!(scale_alpha(255, 255), 255);
        assert_eq!(scale_alpha(255, 0), 0);
        assert_eq!(scale_alpha(255, 128), 128);
        assert_eq!(scale_alpha(100, 255), 100);
    }

    #[test]
    fn press_outside_does_not_arm() {
        let mut fx = Fixture::new();
        let mut tool = ExtractionTool::move_tool();
        assert!(!tool.press(&mut fx.ctx(), 0, 0).unwrap());
        assert_eq!(tool.phase(), GesturePhase::Idle);
        assert!(tool.press(&mut fx.ctx(), 3, 3).unwrap());
        assert_eq!(tool.phase(), GesturePhase::Armed);
    }

    #[test]
    fn effect_layer_is_rejected() {
        let mut fx = Fixture::new();
        let id = fx
            .stack
            .push(Layer::effect(
                "fx",
                ps_common::EffectId::new("vignette"),
                Default::default(),
            ))
            .unwrap();
        fx.stack.set_active(Some(id)).unwrap();
        let mut tool = ExtractionTool::clone_tool();
        let err = tool.press(&mut fx.ctx(), 3, 3).unwrap_err();
        assert!(matches!(err, EditorError::UnsupportedSource { .. }));
    }

    #[test]
    fn move_cuts_and_follows_pointer() {
        let mut fx = Fixture::new();
        fx.selection.set_selection(SelectionPath::Rect {
            x: 2,
            y: 2,
            width: 2,
            height: 2,
        });
        let source = fx.stack.active().unwrap();
        let mut tool = ExtractionTool::move_tool();
        assert!(tool.press(&mut fx.ctx(), 2, 2).unwrap());

        tool.drag(&mut fx.ctx(), 3, 2).unwrap();
        assert_eq!(tool.phase(), GesturePhase::Extracted);
        let new_id = tool.extracted_layer().unwrap();
        assert_eq!(fx.stack.len(), 3);
        assert_eq!(fx.stack.top().unwrap().id, new_id);
        assert_eq!(fx.stack.active(), Some(new_id));
        let lifted = fx.stack.get(new_id).unwrap();
        assert_eq!(lifted.name, "moved selection");
        assert_eq!(lifted.dimensions(), Some((2, 2)));
        assert_eq!(
            lifted.placement(fx.stack.canvas()),
            Some(PixelRect::new(2, 2, 2, 2))
        );

        // Source pixels under the selection are now transparent.
        let src = fx.stack.get(source).unwrap().still_image().unwrap();
        assert_eq!(src.get_pixel(0, 0)[3], 0);
        assert_eq!(src.get_pixel(1, 1)[3], 0);
        assert_eq!(src.get_pixel(2, 2)[3], 255);

        tool.drag(&mut fx.ctx(), 5, 4).unwrap();
        tool.drag(&mut fx.ctx(), 5, 4).unwrap();
        assert_eq!(tool.phase(), GesturePhase::Dragging);
        assert_eq!(
            fx.stack.get(new_id).unwrap().placement(fx.stack.canvas()),
            Some(PixelRect::new(5, 4, 2, 2))
        );
        assert_eq!(fx.stack.len(), 3);

        assert_eq!(tool.release(&mut fx.ctx()), Some(new_id));
        assert_eq!(tool.phase(), GesturePhase::Idle);
        assert_eq!(fx.selection.kind(), SelectionKind::Rect);
        assert_eq!(fx.selection.rect(), Some(PixelRect::new(2, 2, 2, 2)));
    }

    #[test]
    fn clone_leaves_source_intact() {
        let mut fx = Fixture::new();
        let source = fx.stack.active().unwrap();
        let before = fx.stack.get(source).unwrap().clone();
        let mut tool = ExtractionTool::clone_tool();
        assert!(tool.press(&mut fx.ctx(), 4, 4).unwrap());
        tool.drag(&mut fx.ctx(), 6, 6).unwrap();
        let new_id = tool.extracted_layer().unwrap();
        let cloned = fx.stack.get(new_id).unwrap();
        assert_eq!(cloned.name, "cloned");
        assert_eq!(cloned.dimensions(), Some((4, 4)));
        assert_eq!(fx.stack.get(source).unwrap(), &before);
    }

    #[test]
    fn cancel_restores_everything() {
        let mut fx = Fixture::new();
        let source = fx.stack.active().unwrap();
        let before = fx.stack.get(source).unwrap().clone();
        let mut tool = ExtractionTool::move_tool();
        tool.press(&mut fx.ctx(), 3, 3).unwrap();
        tool.drag(&mut fx.ctx(), 4, 4).unwrap();
        tool.drag(&mut fx.ctx(), 5, 5).unwrap();
        assert_eq!(fx.stack.len(), 3);

        tool.cancel(&mut fx.ctx());
        assert_eq!(tool.phase(), GesturePhase::Idle);
        assert_eq!(fx.stack.len(), 2);
        assert_eq!(fx.stack.get(source).unwrap(), &before);
        assert_eq!(fx.stack.active(), Some(source));
    }

    #[test]
    fn empty_region_aborts_to_idle() {
        let mut fx = Fixture::new();
        let source = fx.stack.active().unwrap();
        // Make the covered pixel transparent, then select only that pixel.
        let mut img = fx.stack.get(source).unwrap().still_image().unwrap().clone();
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        fx.stack
            .replace_media(source, MediaSource::Still(img))
            .unwrap();
        fx.selection.set_selection(SelectionPath::Rect {
            x: 2,
            y: 2,
            width: 1,
            height: 1,
        });
        let mut tool = ExtractionTool::move_tool();
        assert!(!tool.press(&mut fx.ctx(), 2, 3).unwrap());
        assert!(tool.press(&mut fx.ctx(), 2, 2).unwrap());
        tool.drag(&mut fx.ctx(), 4, 4).unwrap();
        assert_eq!(tool.phase(), GesturePhase::Idle);
        assert_eq!(fx.stack.len(), 2);
    }

    #[test]
    fn duplicate_press_position_does_not_extract() {
        let mut fx = Fixture::new();
        let mut tool = ExtractionTool::clone_tool();
        tool.press(&mut fx.ctx(), 3, 3).unwrap();
        tool.drag(&mut fx.ctx(), 3, 3).unwrap();
        assert_eq!(tool.phase(), GesturePhase::Armed);
        assert_eq!(fx.stack.len(), 2);
    }
}
