//! Editor configuration: canvas defaults, render loop and selection settings.
//!
//! Every section has a `Default`, and missing JSON fields fall back to it,
//! so a partial config file is always valid.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CanvasSize;

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level editor configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Canvas size used for a fresh project.
    pub default_canvas: CanvasSize,
    /// Largest accepted canvas width or height.
    pub max_canvas_dimension: u32,
    pub render: RenderConfig,
    pub selection: SelectionConfig,
    pub names: LayerNames,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_canvas: CanvasSize::new(1024, 1024),
            max_canvas_dimension: 16_384,
            render: RenderConfig::default(),
            selection: SelectionConfig::default(),
            names: LayerNames::default(),
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), "Loaded editor config");
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_canvas.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "default canvas must be non-empty, got {}",
                self.default_canvas
            )));
        }
        if self.default_canvas.width > self.max_canvas_dimension
            || self.default_canvas.height > self.max_canvas_dimension
        {
            return Err(ConfigError::Invalid(format!(
                "default canvas {} exceeds max dimension {}",
                self.default_canvas, self.max_canvas_dimension
            )));
        }
        if self.render.target_fps == 0 {
            return Err(ConfigError::Invalid("target_fps must be positive".into()));
        }
        if self.render.overlay.dash_length == 0 {
            return Err(ConfigError::Invalid("dash_length must be positive".into()));
        }
        Ok(())
    }
}

/// Render loop configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Frame rate the continuous loop is paced to.
    pub target_fps: u32,
    pub overlay: OverlayConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            overlay: OverlayConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Minimum interval between two continuous frames, in seconds.
    pub fn frame_interval_secs(&self) -> f64 {
        1.0 / f64::from(self.target_fps.max(1))
    }
}

/// Marching-ants selection overlay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Length of one dash in pixels.
    pub dash_length: u32,
    /// Dash travel speed in pixels per second.
    pub speed: f32,
    /// Whether the ants march; a static overlay does not keep the loop running.
    pub animate: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            dash_length: 4,
            speed: 8.0,
            animate: true,
        }
    }
}

/// Selection manager settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Masks with at least this many pixels are worth handing to the mask worker.
    pub offload_threshold_pixels: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            offload_threshold_pixels: 4_000_000,
        }
    }
}

/// Display names given to layers created by editor operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerNames {
    pub moved: String,
    pub cloned: String,
    pub pasted: String,
    pub flattened: String,
    pub flattened_image: String,
    pub base: String,
}

impl Default for LayerNames {
    fn default() -> Self {
        Self {
            moved: "moved selection".to_string(),
            cloned: "cloned".to_string(),
            pasted: "pasted".to_string(),
            flattened: "flattened".to_string(),
            flattened_image: "flattened image".to_string(),
            base: "background".to_string(),
        }
    }
}
