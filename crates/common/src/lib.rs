//! `ps-common` — Shared types, parameters, errors and configuration for pixelstack.
//!
//! This crate is the foundation that all other editor crates depend on:
//!
//! - **Types**: `LayerId`, `CanvasSize`, `PixelRect`, `Anchor`, `TimeCode`
//! - **Effects**: `EffectId`, `ParamDef`, `ParamValue`, `ParamMap`
//! - **Raster**: RGBA helpers on top of `image::RgbaImage`
//! - **Errors**: `GpuError`, `DecodeError` (thiserror-based)
//! - **Config**: `EditorConfig` and its sections

pub mod config;
pub mod effect;
pub mod error;
pub mod raster;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{
    ConfigError, EditorConfig, LayerNames, OverlayConfig, RenderConfig, SelectionConfig,
};
pub use effect::{EffectId, ParamDef, ParamMap, ParamType, ParamValue};
pub use error::{DecodeError, GpuError};
pub use image::{GrayImage, Luma, Rgba, RgbaImage};
pub use types::{round_half_up, Anchor, CanvasSize, LayerId, PixelRect, TimeCode};
