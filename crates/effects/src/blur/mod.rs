//! Blur effects.
//!
//! - [`GaussianBlurEffect`] — Separable Gaussian blur (2-pass)

pub mod gaussian;

pub use gaussian::{gaussian_kernel, GaussianBlurEffect};
