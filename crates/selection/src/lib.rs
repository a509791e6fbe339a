//! `ps-selection` — the selection subsystem.
//!
//! - [`Mask`]: versioned full-canvas alpha buffer (255 = selected)
//! - [`morphology`]: invert / expand / contract / feather / border / smooth
//! - [`SelectionManager`]: NONE → RECT → MASK state machine with lazy
//!   rasterization and canvas geometry hooks
//! - [`MaskWorker`]: background thread for long-running mask ops

pub mod error;
pub mod manager;
pub mod mask;
pub mod morphology;
pub mod worker;

pub use error::SelectionError;
pub use manager::{SelectionKind, SelectionManager, SelectionPath};
pub use mask::{Mask, THRESHOLD};
pub use morphology::MaskOp;
pub use worker::{JobInput, MaskJob, MaskResult, MaskWorker};
