//! The ordered layer stack.
//!
//! Index 0 is the bottom (base) layer. Every mutation bumps the revision and
//! notifies subscribers over crossbeam channels; the compositor and UI list
//! chrome rebuild from those notifications.

use crossbeam::channel::{self, Receiver, Sender};
use ps_common::{CanvasSize, LayerId, ParamValue};
use tracing::debug;

use crate::error::StackError;
use crate::layer::{Layer, LayerSource, MediaSource, SourceType};

/// Change notification emitted by [`LayerStack`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackEvent {
    /// Layers were inserted, removed or reordered.
    Structure,
    /// A single layer changed in place (offset, parameters, visibility, pixels).
    LayerChanged(LayerId),
    /// The canvas dimensions changed.
    CanvasResized(CanvasSize),
    /// The layer targeted by the editing tools changed.
    ActiveChanged(Option<LayerId>),
}

/// Ordered collection of layers sharing one canvas.
#[derive(Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    canvas: CanvasSize,
    active: Option<LayerId>,
    revision: u64,
    subscribers: Vec<Sender<StackEvent>>,
}

impl LayerStack {
    /// Create an empty stack on a canvas of the given size.
    pub fn new(canvas: CanvasSize) -> Self {
        Self {
            layers: Vec::new(),
            canvas,
            active: None,
            revision: 0,
            subscribers: Vec::new(),
        }
    }

    // --- Notifications ---

    /// Subscribe to change notifications. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<StackEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn emit(&mut self, event: StackEvent) {
        self.revision += 1;
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // --- Queries ---

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers bottom-to-top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    /// The bottom layer.
    pub fn base(&self) -> Option<&Layer> {
        self.layers.first()
    }

    /// The top layer.
    pub fn top(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// The layer targeted by the editing tools.
    pub fn active(&self) -> Option<LayerId> {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.and_then(|id| self.get(id))
    }

    /// Whether any visible media layer is animated.
    pub fn has_animated_media(&self) -> bool {
        self.layers.iter().any(|l| l.visible && l.is_animated())
    }

    fn require_index(&self, id: LayerId) -> Result<usize, StackError> {
        self.index_of(id).ok_or(StackError::NotFound(id))
    }

    fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer, StackError> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(StackError::NotFound(id))
    }

    // --- Structural mutations ---

    /// Insert `layer` at `index` (0 = bottom).
    ///
    /// Valid indices are `0..=len`, except that index 0 of a non-empty stack
    /// would displace the base layer.
    pub fn insert(&mut self, layer: Layer, index: usize) -> Result<(), StackError> {
        let len = self.layers.len();
        if index > len || (index == 0 && len > 0) {
            return Err(StackError::InvalidIndex { index, len });
        }
        if self.index_of(layer.id).is_some() {
            return Err(StackError::DuplicateId(layer.id));
        }
        debug!(id = %layer.id, name = %layer.name, index, "Inserting layer");
        self.layers.insert(index, layer);
        self.emit(StackEvent::Structure);
        Ok(())
    }

    /// Insert `layer` on top of the stack and return its id.
    pub fn push(&mut self, layer: Layer) -> Result<LayerId, StackError> {
        let id = layer.id;
        self.insert(layer, self.layers.len())?;
        Ok(id)
    }

    /// Remove a layer by id and return it.
    ///
    /// Removing the last layer leaves the stack empty; the caller must seed a
    /// new base layer before rendering.
    pub fn remove(&mut self, id: LayerId) -> Result<Layer, StackError> {
        let index = self.require_index(id)?;
        let layer = self.layers.remove(index);
        debug!(id = %id, index, remaining = self.layers.len(), "Removed layer");
        if self.active == Some(id) {
            self.active = None;
            self.emit(StackEvent::ActiveChanged(None));
        }
        self.emit(StackEvent::Structure);
        Ok(layer)
    }

    /// Move `id` so it sits immediately below `before_id`.
    pub fn reorder(&mut self, id: LayerId, before_id: LayerId) -> Result<(), StackError> {
        let from = self.require_index(id)?;
        let before = self.require_index(before_id)?;
        if id == before_id {
            return Ok(());
        }
        if from == 0 {
            return Err(StackError::BaseLayerLocked(id));
        }
        if before == 0 {
            return Err(StackError::InvalidIndex {
                index: 0,
                len: self.layers.len(),
            });
        }
        let to = if before > from { before - 1 } else { before };
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        debug!(id = %id, from, to, "Reordered layer");
        self.emit(StackEvent::Structure);
        Ok(())
    }

    /// Move a non-base layer to the top of the stack.
    pub fn raise_to_top(&mut self, id: LayerId) -> Result<(), StackError> {
        let from = self.require_index(id)?;
        if from == 0 && self.layers.len() > 1 {
            return Err(StackError::BaseLayerLocked(id));
        }
        if from + 1 == self.layers.len() {
            return Ok(());
        }
        let layer = self.layers.remove(from);
        self.layers.push(layer);
        debug!(id = %id, from, "Raised layer to top");
        self.emit(StackEvent::Structure);
        Ok(())
    }

    /// Replace a contiguous run of layers with a single layer at the run's
    /// lowest slot. Returns that slot.
    ///
    /// `ids` may be given in any order; they must all exist and occupy
    /// consecutive indices.
    pub fn replace_run(&mut self, ids: &[LayerId], layer: Layer) -> Result<usize, StackError> {
        let mut indices = ids
            .iter()
            .map(|&id| self.require_index(id))
            .collect::<Result<Vec<_>, _>>()?;
        indices.sort_unstable();
        indices.dedup();
        let (first, last) = match (indices.first(), indices.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => return Err(StackError::NotContiguous),
        };
        if last - first + 1 != indices.len() {
            return Err(StackError::NotContiguous);
        }
        if self
            .layers
            .iter()
            .enumerate()
            .any(|(i, l)| l.id == layer.id && !(first..=last).contains(&i))
        {
            return Err(StackError::DuplicateId(layer.id));
        }

        let removed: Vec<Layer> = self.layers.splice(first..=last, [layer]).collect();
        debug!(slot = first, merged = removed.len(), "Replaced layer run");
        if self
            .active
            .is_some_and(|a| removed.iter().any(|l| l.id == a))
        {
            self.active = None;
            self.emit(StackEvent::ActiveChanged(None));
        }
        self.emit(StackEvent::Structure);
        Ok(first)
    }

    /// Remove every layer and start over on a new canvas.
    pub fn reset(&mut self, canvas: CanvasSize) {
        self.layers.clear();
        self.active = None;
        self.canvas = canvas;
        debug!(canvas = %canvas, "Reset layer stack");
        self.emit(StackEvent::CanvasResized(canvas));
        self.emit(StackEvent::Structure);
    }

    // --- Active layer ---

    /// Target a layer for the editing tools, or clear the target with `None`.
    pub fn set_active(&mut self, id: Option<LayerId>) -> Result<(), StackError> {
        if let Some(id) = id {
            self.require_index(id)?;
        }
        if self.active != id {
            self.active = id;
            self.emit(StackEvent::ActiveChanged(id));
        }
        Ok(())
    }

    // --- In-place mutations ---

    fn modify(&mut self, id: LayerId, f: impl FnOnce(&mut Layer)) -> Result<(), StackError> {
        f(self.layer_mut(id)?);
        self.emit(StackEvent::LayerChanged(id));
        Ok(())
    }

    pub fn set_offset(&mut self, id: LayerId, offset_x: i32, offset_y: i32) -> Result<(), StackError> {
        self.modify(id, |l| {
            l.offset_x = offset_x;
            l.offset_y = offset_y;
        })
    }

    pub fn translate(&mut self, id: LayerId, dx: i32, dy: i32) -> Result<(), StackError> {
        self.modify(id, |l| {
            l.offset_x = l.offset_x.saturating_add(dx);
            l.offset_y = l.offset_y.saturating_add(dy);
        })
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> Result<(), StackError> {
        self.modify(id, |l| l.visible = visible)
    }

    pub fn set_name(&mut self, id: LayerId, name: impl Into<String>) -> Result<(), StackError> {
        let name = name.into();
        self.modify(id, |l| l.name = name)
    }

    /// Set layer opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) -> Result<(), StackError> {
        let opacity = if opacity.is_nan() {
            1.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
        self.modify(id, |l| l.opacity = opacity)
    }

    /// Set one parameter of an effect layer.
    pub fn set_param(
        &mut self,
        id: LayerId,
        name: impl Into<String>,
        value: ParamValue,
    ) -> Result<(), StackError> {
        let layer = self.layer_mut(id)?;
        match &mut layer.source {
            LayerSource::Effect(effect) => {
                effect.params.insert(name.into(), value);
            }
            LayerSource::Media(_) => {
                return Err(StackError::WrongSource {
                    id,
                    expected: SourceType::Effect,
                })
            }
        }
        self.emit(StackEvent::LayerChanged(id));
        Ok(())
    }

    /// Replace the raster content of a media layer, returning the old content.
    pub fn replace_media(&mut self, id: LayerId, media: MediaSource) -> Result<MediaSource, StackError> {
        let layer = self.layer_mut(id)?;
        let old = match &mut layer.source {
            LayerSource::Media(current) => std::mem::replace(current, media),
            LayerSource::Effect(_) => {
                return Err(StackError::WrongSource {
                    id,
                    expected: SourceType::Media,
                })
            }
        };
        self.emit(StackEvent::LayerChanged(id));
        Ok(old)
    }

    /// Change the canvas dimensions without touching any layer.
    pub fn set_canvas_size(&mut self, canvas: CanvasSize) {
        self.reshape(canvas, |_| {});
    }

    /// Change the canvas dimensions and rewrite every layer in one step.
    ///
    /// Used by the canvas geometry operations, which validate and precompute
    /// everything before calling in so the commit itself can not fail.
    pub fn reshape(&mut self, canvas: CanvasSize, mut f: impl FnMut(&mut Layer)) {
        for layer in &mut self.layers {
            f(layer);
        }
        let old = self.canvas;
        self.canvas = canvas;
        debug!(from = %old, to = %canvas, "Canvas reshaped");
        self.emit(StackEvent::CanvasResized(canvas));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_common::{EffectId, ParamMap, Rgba, RgbaImage};

    fn still(name: &str) -> Layer {
        Layer::still(name, RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])))
    }

    fn stack_of(n: usize) -> (LayerStack, Vec<LayerId>) {
        let mut stack = LayerStack::new(CanvasSize::new(64, 64));
        let ids = (0..n)
            .map(|i| stack.push(still(&format!("layer {i}"))).unwrap())
            .collect();
        (stack, ids)
    }

    #[test]
    fn insert_validates_index() {
        let (mut stack, _) = stack_of(2);
        assert_eq!(
            stack.insert(still("x"), 3),
            Err(StackError::InvalidIndex { index: 3, len: 2 })
        );
        assert_eq!(
            stack.insert(still("x"), 0),
            Err(StackError::InvalidIndex { index: 0, len: 2 })
        );
        assert_eq!(stack.len(), 2);
        assert!(stack.insert(still("x"), 1).is_ok());
        assert!(stack.insert(still("y"), 3).is_ok());
        assert_eq!(stack.len(), 4);
    }

    #[test]
    fn insert_into_empty_stack_at_zero() {
        let mut stack = LayerStack::new(CanvasSize::new(8, 8));
        assert!(stack.insert(still("base"), 0).is_ok());
        assert_eq!(stack.base().map(|l| l.name.as_str()), Some("base"));
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let (mut stack, _) = stack_of(1);
        let layer = still("dup");
        stack.push(layer.clone()).unwrap();
        assert_eq!(stack.push(layer.clone()), Err(StackError::DuplicateId(layer.id)));
    }

    #[test]
    fn remove_missing_is_not_found() {
        let (mut stack, _) = stack_of(1);
        let ghost = LayerId(u64::MAX);
        assert_eq!(stack.remove(ghost).unwrap_err(), StackError::NotFound(ghost));
    }

    #[test]
    fn removing_only_layer_empties_stack() {
        let (mut stack, ids) = stack_of(1);
        stack.remove(ids[0]).unwrap();
        assert!(stack.is_empty());
        assert!(stack.base().is_none());
    }

    #[test]
    fn removing_active_layer_clears_active() {
        let (mut stack, ids) = stack_of(3);
        stack.set_active(Some(ids[2])).unwrap();
        stack.remove(ids[2]).unwrap();
        assert_eq!(stack.active(), None);
    }

    #[test]
    fn reorder_moves_below_target() {
        let (mut stack, ids) = stack_of(4);
        // [0, 1, 2, 3] -> move 3 below 1 -> [0, 3, 1, 2]
        stack.reorder(ids[3], ids[1]).unwrap();
        assert_eq!(stack.ids(), vec![ids[0], ids[3], ids[1], ids[2]]);
        // move 3 below 2 -> [0, 1, 3, 2]
        stack.reorder(ids[3], ids[2]).unwrap();
        assert_eq!(stack.ids(), vec![ids[0], ids[1], ids[3], ids[2]]);
    }

    #[test]
    fn reorder_protects_base() {
        let (mut stack, ids) = stack_of(3);
        assert_eq!(
            stack.reorder(ids[0], ids[2]),
            Err(StackError::BaseLayerLocked(ids[0]))
        );
        assert!(matches!(
            stack.reorder(ids[2], ids[0]),
            Err(StackError::InvalidIndex { .. })
        ));
        assert_eq!(stack.ids(), ids);
        assert!(stack.reorder(ids[1], ids[1]).is_ok());
    }

    #[test]
    fn replace_run_requires_contiguity() {
        let (mut stack, ids) = stack_of(4);
        let merged = still("merged");
        assert_eq!(
            stack.replace_run(&[ids[1], ids[3]], merged.clone()),
            Err(StackError::NotContiguous)
        );
        assert_eq!(stack.len(), 4);
        let slot = stack.replace_run(&[ids[2], ids[1]], merged.clone()).unwrap();
        assert_eq!(slot, 1);
        assert_eq!(stack.ids(), vec![ids[0], merged.id, ids[3]]);
    }

    #[test]
    fn notifications_and_revision() {
        let (mut stack, ids) = stack_of(2);
        let rx = stack.subscribe();
        let rev = stack.revision();

        stack.translate(ids[1], 3, -2).unwrap();
        stack.push(still("new")).unwrap();
        stack.set_canvas_size(CanvasSize::new(10, 10));

        assert_eq!(rx.try_recv(), Ok(StackEvent::LayerChanged(ids[1])));
        assert_eq!(rx.try_recv(), Ok(StackEvent::Structure));
        assert_eq!(
            rx.try_recv(),
            Ok(StackEvent::CanvasResized(CanvasSize::new(10, 10)))
        );
        assert_eq!(stack.revision(), rev + 3);
        assert_eq!(stack.get(ids[1]).unwrap().offset(), (3, -2));
    }

    #[test]
    fn translate_saturates_at_the_offset_range() {
        let (mut stack, ids) = stack_of(1);
        stack.set_offset(ids[0], i32::MAX - 1, i32::MIN + 1).unwrap();
        stack.translate(ids[0], 5, -5).unwrap();
        assert_eq!(stack.get(ids[0]).unwrap().offset(), (i32::MAX, i32::MIN));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let (mut stack, ids) = stack_of(1);
        let rx = stack.subscribe();
        drop(rx);
        stack.set_visible(ids[0], false).unwrap();
        assert!(stack.subscribers.is_empty());
    }

    #[test]
    fn set_param_requires_effect_layer() {
        let (mut stack, ids) = stack_of(1);
        let fx = stack
            .push(Layer::effect("fx", EffectId::new("vignette"), ParamMap::new()))
            .unwrap();
        stack
            .set_param(fx, "amount", ParamValue::Float(0.9))
            .unwrap();
        assert_eq!(
            stack.get(fx).unwrap().as_effect().unwrap().params.get("amount"),
            Some(&ParamValue::Float(0.9))
        );
        assert_eq!(
            stack.set_param(ids[0], "amount", ParamValue::Float(0.9)),
            Err(StackError::WrongSource {
                id: ids[0],
                expected: SourceType::Effect
            })
        );
    }

    #[test]
    fn set_active_unknown_is_not_found() {
        let (mut stack, _) = stack_of(1);
        assert!(matches!(
            stack.set_active(Some(LayerId(u64::MAX))),
            Err(StackError::NotFound(_))
        ));
        assert_eq!(stack.active(), None);
    }

    #[test]
    fn opacity_is_clamped() {
        let (mut stack, ids) = stack_of(1);
        stack.set_opacity(ids[0], 4.0).unwrap();
        assert_eq!(stack.get(ids[0]).unwrap().opacity, 1.0);
        stack.set_opacity(ids[0], -1.0).unwrap();
        assert_eq!(stack.get(ids[0]).unwrap().opacity, 0.0);
    }
}
