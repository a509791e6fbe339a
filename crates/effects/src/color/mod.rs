//! Color adjustment effects.
//!
//! - [`BrightnessEffect`] — Brightness and contrast
//! - [`HslEffect`] — Hue, saturation, lightness

pub mod brightness;
pub mod hsl;

pub use brightness::BrightnessEffect;
pub use hsl::HslEffect;
