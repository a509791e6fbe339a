//! Clipboard boundary.
//!
//! The host owns the system clipboard; the editor only reads one image from
//! it through [`ClipboardSource`].

use ps_common::{raster, DecodeError, RgbaImage};

/// An image as it comes off the clipboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClipboardPayload {
    /// An encoded still (PNG).
    Encoded(Vec<u8>),
    /// Straight-alpha RGBA bytes.
    Rgba {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
}

impl ClipboardPayload {
    pub fn decode(self) -> Result<RgbaImage, DecodeError> {
        match self {
            Self::Encoded(bytes) => raster::decode(&bytes),
            Self::Rgba {
                width,
                height,
                data,
            } => raster::from_raw_rgba(width, height, data),
        }
    }
}

/// Read-only access to the system clipboard.
pub trait ClipboardSource {
    /// The current clipboard image, if any.
    fn read_image(&mut self) -> Option<ClipboardPayload>;
}

/// In-process clipboard holding at most one payload.
#[derive(Clone, Debug, Default)]
pub struct MemoryClipboard {
    payload: Option<ClipboardPayload>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(payload: ClipboardPayload) -> Self {
        Self {
            payload: Some(payload),
        }
    }

    pub fn set(&mut self, payload: ClipboardPayload) {
        self.payload = Some(payload);
    }

    pub fn clear(&mut self) {
        self.payload = None;
    }
}

impl ClipboardSource for MemoryClipboard {
    fn read_image(&mut self) -> Option<ClipboardPayload> {
        self.payload.clone()
    }
}
