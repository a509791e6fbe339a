//! `ps-layers` — the layer model and the ordered layer stack.
//!
//! - [`Layer`] is a tagged record: [`LayerSource::Media`] (still or animated
//!   raster) or [`LayerSource::Effect`] (effect id plus parameters).
//! - [`LayerStack`] owns the canvas size, the bottom-to-top layer order and
//!   the active layer, and broadcasts [`StackEvent`]s on every mutation.

pub mod error;
pub mod layer;
pub mod stack;

pub use error::StackError;
pub use layer::{
    next_layer_id, Animation, EffectLayer, Layer, LayerInfo, LayerSource, MediaSource, SourceType,
};
pub use stack::{LayerStack, StackEvent};
