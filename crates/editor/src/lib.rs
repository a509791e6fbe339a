//! `ps-editor` — the pixelstack editing surface.
//!
//! [`Document`] owns the layer stack, selection, compositor and render
//! scheduler and exposes every editing operation:
//!
//! - [`geometry`]: resize image, change canvas size, crop to selection
//! - [`tools`]: move/clone extraction gesture state machine
//! - [`paste`]: clipboard image to a new layer
//! - [`flatten`]: merge a layer run, or the whole image
//! - [`project`]: base layer for a fresh document
//!
//! Handlers take an explicit [`ToolContext`] rather than global state.

pub mod clipboard;
pub mod context;
pub mod document;
pub mod flatten;
pub mod geometry;
pub mod paste;
pub mod project;
pub mod tools;

mod error;

pub use clipboard::{ClipboardPayload, ClipboardSource, MemoryClipboard};
pub use context::ToolContext;
pub use document::Document;
pub use error::EditorError;
pub use project::BaseLayer;
pub use tools::{ExtractMode, ExtractionTool, GesturePhase};
