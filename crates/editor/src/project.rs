//! Project initialization: the base layer a fresh document starts with.

use ps_common::{raster, CanvasSize, RgbaImage};
use ps_layers::{Layer, MediaSource};

/// Contents of the bottom layer of a new project.
#[derive(Clone, Debug, PartialEq)]
pub enum BaseLayer {
    /// Canvas-sized fill of one color.
    Solid([u8; 4]),
    /// Canvas-sized two-color linear gradient.
    Gradient {
        from: [u8; 4],
        to: [u8; 4],
        vertical: bool,
    },
    /// Canvas-sized fully transparent raster.
    Transparent,
    /// Opened media at its native size, centered.
    Media(MediaSource),
}

impl BaseLayer {
    pub fn white() -> Self {
        Self::Solid([255, 255, 255, 255])
    }

    /// Build the base layer for `canvas`.
    pub fn into_layer(self, canvas: CanvasSize, name: impl Into<String>) -> Layer {
        let (w, h) = (canvas.width, canvas.height);
        match self {
            Self::Solid(color) => Layer::still(name, raster::solid(w, h, color)),
            Self::Gradient { from, to, vertical } => {
                Layer::still(name, raster::gradient(w, h, from, to, vertical))
            }
            Self::Transparent => Layer::still(name, RgbaImage::new(w, h)),
            Self::Media(media) => Layer::media(name, media),
        }
    }
}
