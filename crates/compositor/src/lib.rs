//! `ps-compositor` — layer compositing for pixelstack.
//!
//! This crate turns a [`LayerStack`] into frames through the
//! backend-agnostic [`GpuBackend`] trait.
//!
//! The compositing loop per frame:
//! 1. **Surfaces** — rebuilt at the frame boundary when the canvas changed
//! 2. **Media** — source-over blend at each layer's placement ([`blend`])
//! 3. **Effects** — ping-pong program passes over the accumulation ([`pipeline`])
//! 4. **Overlay** — marching ants on the presented copy ([`overlay`])
//!
//! [`RenderScheduler`] decides when a frame is needed.
//!
//! [`LayerStack`]: ps_layers::LayerStack

pub mod backend;
pub mod blend;
pub mod compositor;
pub mod overlay;
pub mod pipeline;
pub mod placement;
pub mod scheduler;
pub mod software;

mod error;

// Re-export primary API
pub use backend::{GpuBackend, ProgramInfo};
pub use compositor::Compositor;
pub use error::CompositorError;
pub use overlay::Outline;
pub use pipeline::RenderPipeline;
pub use placement::Placement;
pub use scheduler::{RenderScheduler, TickOutcome};
pub use software::SoftwareBackend;
