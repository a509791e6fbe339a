//! Stylize effects.
//!
//! - [`NoiseGrainEffect`] — Film grain / noise (time-varying)
//! - [`VignetteEffect`] — Vignette

pub mod noise;
pub mod vignette;

pub use noise::NoiseGrainEffect;
pub use vignette::VignetteEffect;
