//! Layer records: a closed set of sources (media or effect) plus placement.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use ps_common::{CanvasSize, DecodeError, EffectId, LayerId, ParamMap, PixelRect, RgbaImage, TimeCode};
use serde::{Deserialize, Serialize};

static NEXT_LAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh process-unique layer id.
pub fn next_layer_id() -> LayerId {
    LayerId(NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed))
}

/// Which kind of source a layer carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Media,
    Effect,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Media => write!(f, "media"),
            Self::Effect => write!(f, "effect"),
        }
    }
}

/// A looping frame sequence. Construct with [`MediaSource::animated`].
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    frames: Vec<RgbaImage>,
    fps: f64,
}

impl Animation {
    pub fn frames(&self) -> &[RgbaImage] {
        &self.frames
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

/// Raster content owned by a media layer.
#[derive(Clone, Debug, PartialEq)]
pub enum MediaSource {
    /// A single still raster.
    Still(RgbaImage),
    /// At least one frame, all of the same dimensions.
    Animated(Animation),
}

impl MediaSource {
    /// Build an animated source, checking the frames agree in size.
    pub fn animated(frames: Vec<RgbaImage>, fps: f64) -> Result<Self, DecodeError> {
        let first = frames.first().ok_or(DecodeError::Empty)?;
        let dims = first.dimensions();
        if dims.0 == 0 || dims.1 == 0 {
            return Err(DecodeError::ZeroSize {
                width: dims.0,
                height: dims.1,
            });
        }
        if let Some((i, f)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.dimensions() != dims)
        {
            return Err(DecodeError::FrameMismatch(format!(
                "frame {i} is {}x{}, frame 0 is {}x{}",
                f.width(),
                f.height(),
                dims.0,
                dims.1
            )));
        }
        if !(fps.is_finite() && fps > 0.0) {
            return Err(DecodeError::FrameMismatch(format!("invalid frame rate {fps}")));
        }
        Ok(Self::Animated(Animation { frames, fps }))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.first_frame().dimensions()
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Animated(anim) if anim.frames.len() > 1)
    }

    pub fn frame_count(&self) -> usize {
        match self {
            Self::Still(_) => 1,
            Self::Animated(anim) => anim.frames.len(),
        }
    }

    /// The raster shown at playback `time`. Animated sources loop.
    pub fn frame_at(&self, time: TimeCode) -> &RgbaImage {
        match self {
            Self::Still(image) => image,
            Self::Animated(anim) => {
                let index = (time.as_secs().max(0.0) * anim.fps).floor() as usize;
                &anim.frames[index % anim.frames.len()]
            }
        }
    }

    pub fn first_frame(&self) -> &RgbaImage {
        match self {
            Self::Still(image) => image,
            Self::Animated(anim) => &anim.frames[0],
        }
    }

    /// The raster if this is a still source.
    pub fn as_still(&self) -> Option<&RgbaImage> {
        match self {
            Self::Still(image) => Some(image),
            Self::Animated(_) => None,
        }
    }

    /// Apply `f` to every frame, keeping the frame rate.
    pub fn map_frames(&self, mut f: impl FnMut(&RgbaImage) -> RgbaImage) -> Self {
        match self {
            Self::Still(image) => Self::Still(f(image)),
            Self::Animated(anim) => Self::Animated(Animation {
                frames: anim.frames.iter().map(f).collect(),
                fps: anim.fps,
            }),
        }
    }
}

/// Procedural layer: an effect program plus its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectLayer {
    pub effect_id: EffectId,
    pub params: ParamMap,
}

/// The content of a layer.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerSource {
    Media(MediaSource),
    Effect(EffectLayer),
}

impl LayerSource {
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Media(_) => SourceType::Media,
            Self::Effect(_) => SourceType::Effect,
        }
    }
}

/// One entry of the layer stack.
///
/// `offset_x` / `offset_y` place the content's center relative to the canvas
/// center; see [`CanvasSize::placement`].
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub source: LayerSource,
    pub offset_x: i32,
    pub offset_y: i32,
    pub visible: bool,
    /// 0.0 = fully transparent, 1.0 = opaque.
    pub opacity: f32,
}

impl Layer {
    /// A visible media layer centered on the canvas.
    pub fn media(name: impl Into<String>, media: MediaSource) -> Self {
        Self::with_source(name, LayerSource::Media(media))
    }

    /// A visible still-image layer centered on the canvas.
    pub fn still(name: impl Into<String>, image: RgbaImage) -> Self {
        Self::media(name, MediaSource::Still(image))
    }

    /// A visible effect layer.
    pub fn effect(name: impl Into<String>, effect_id: EffectId, params: ParamMap) -> Self {
        Self::with_source(name, LayerSource::Effect(EffectLayer { effect_id, params }))
    }

    fn with_source(name: impl Into<String>, source: LayerSource) -> Self {
        Self {
            id: next_layer_id(),
            name: name.into(),
            source,
            offset_x: 0,
            offset_y: 0,
            visible: true,
            opacity: 1.0,
        }
    }

    /// Builder-style offset.
    pub fn with_offset(mut self, offset_x: i32, offset_y: i32) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }

    pub fn source_type(&self) -> SourceType {
        self.source.source_type()
    }

    pub fn as_media(&self) -> Option<&MediaSource> {
        match &self.source {
            LayerSource::Media(media) => Some(media),
            LayerSource::Effect(_) => None,
        }
    }

    pub fn as_effect(&self) -> Option<&EffectLayer> {
        match &self.source {
            LayerSource::Effect(effect) => Some(effect),
            LayerSource::Media(_) => None,
        }
    }

    /// The raster of a still media layer.
    pub fn still_image(&self) -> Option<&RgbaImage> {
        self.as_media().and_then(MediaSource::as_still)
    }

    /// Raster dimensions of a media layer.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.as_media().map(MediaSource::dimensions)
    }

    pub fn is_animated(&self) -> bool {
        self.as_media().is_some_and(MediaSource::is_animated)
    }

    /// Absolute canvas rectangle covered by a media layer's raster.
    ///
    /// Effect layers cover the whole canvas and return `None`.
    pub fn placement(&self, canvas: CanvasSize) -> Option<PixelRect> {
        let (width, height) = self.dimensions()?;
        let (left, top) = canvas.placement(width, height, self.offset());
        Some(PixelRect::new(left, top, width, height))
    }

    /// Serializable summary for list rendering.
    pub fn info(&self) -> LayerInfo {
        LayerInfo {
            id: self.id,
            name: self.name.clone(),
            source_type: self.source_type(),
            effect_id: self.as_effect().map(|e| e.effect_id.clone()),
            size: self.dimensions(),
            offset: self.offset(),
            visible: self.visible,
            opacity: self.opacity,
            animated: self.is_animated(),
        }
    }
}

/// Layer metadata without pixel data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub effect_id: Option<EffectId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size: Option<(u32, u32)>,
    pub offset: (i32, i32),
    pub visible: bool,
    pub opacity: f32,
    pub animated: bool,
}
