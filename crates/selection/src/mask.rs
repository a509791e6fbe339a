//! Full-canvas single-channel selection mask.
//!
//! 255 = selected, 0 = unselected, intermediate values after feathering.
//! Masks are immutable once built: every transform returns a new buffer with
//! a fresh version number, so a renderer holding an `Arc<Mask>` snapshot never
//! observes a torn write.

use std::sync::atomic::{AtomicU64, Ordering};

use image::imageops::{self, FilterType};
use ps_common::{CanvasSize, GrayImage, Luma, PixelRect};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// Binary threshold used by the morphological operators.
pub const THRESHOLD: u8 = 127;

#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    image: GrayImage,
    version: u64,
}

impl Mask {
    /// An all-unselected mask.
    pub fn empty(canvas: CanvasSize) -> Self {
        Self::from_image(GrayImage::new(canvas.width, canvas.height))
    }

    /// An all-selected mask.
    pub fn full(canvas: CanvasSize) -> Self {
        Self::from_image(GrayImage::from_pixel(canvas.width, canvas.height, Luma([255])))
    }

    /// Rasterize a rectangle (clipped to the canvas).
    pub fn from_rect(canvas: CanvasSize, rect: PixelRect) -> Self {
        let mut image = GrayImage::new(canvas.width, canvas.height);
        if let Some(r) = rect.intersect(&canvas.rect()) {
            for y in r.y..r.bottom() as i32 {
                for x in r.x..r.right() as i32 {
                    image.put_pixel(x as u32, y as u32, Luma([255]));
                }
            }
        }
        Self::from_image(image)
    }

    /// Rasterize an axis-aligned ellipse by pixel-center inclusion.
    pub fn from_ellipse(canvas: CanvasSize, cx: f64, cy: f64, rx: f64, ry: f64) -> Self {
        if !(rx > 0.0 && ry > 0.0) {
            return Self::empty(canvas);
        }
        let image = GrayImage::from_fn(canvas.width, canvas.height, |x, y| {
            let dx = (f64::from(x) + 0.5 - cx) / rx;
            let dy = (f64::from(y) + 0.5 - cy) / ry;
            Luma([if dx * dx + dy * dy <= 1.0 { 255 } else { 0 }])
        });
        Self::from_image(image)
    }

    /// Wrap an existing buffer.
    pub fn from_image(image: GrayImage) -> Self {
        Self {
            image,
            version: next_version(),
        }
    }

    /// Process-unique version; changes whenever the content may have changed.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn canvas(&self) -> CanvasSize {
        CanvasSize::new(self.image.width(), self.image.height())
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Sample at canvas coordinates; outside the canvas is unselected.
    pub fn coverage(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return 0;
        }
        self.image.get_pixel(x as u32, y as u32).0[0]
    }

    /// Whether the sample passes the binary threshold.
    pub fn is_selected(&self, x: i32, y: i32) -> bool {
        self.coverage(x, y) > THRESHOLD
    }

    /// True when every sample is zero.
    pub fn is_empty(&self) -> bool {
        self.image.as_raw().iter().all(|&v| v == 0)
    }

    /// Bounding box of all non-zero samples.
    pub fn bounds(&self) -> Option<PixelRect> {
        let (w, h) = (self.width() as usize, self.height() as usize);
        let raw = self.image.as_raw();
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (usize::MAX, usize::MAX, 0, 0);
        for y in 0..h {
            let row = &raw[y * w..(y + 1) * w];
            let (Some(first), Some(last)) = (
                row.iter().position(|&v| v > 0),
                row.iter().rposition(|&v| v > 0),
            ) else {
                continue;
            };
            min_x = min_x.min(first);
            max_x = max_x.max(last);
            min_y = min_y.min(y);
            max_y = y;
        }
        (min_x != usize::MAX).then(|| {
            PixelRect::new(
                min_x as i32,
                min_y as i32,
                (max_x - min_x + 1) as u32,
                (max_y - min_y + 1) as u32,
            )
        })
    }

    /// Binary threshold as a flat row-major bitmap.
    pub fn binary(&self) -> Vec<bool> {
        self.image.as_raw().iter().map(|&v| v > THRESHOLD).collect()
    }

    /// Build a mask from a flat row-major bitmap.
    pub fn from_binary(canvas: CanvasSize, bits: &[bool]) -> Self {
        let data = bits.iter().map(|&b| if b { 255 } else { 0 }).collect();
        let image = GrayImage::from_raw(canvas.width, canvas.height, data)
            .unwrap_or_else(|| GrayImage::new(canvas.width, canvas.height));
        Self::from_image(image)
    }

    /// Per-sample transform.
    pub fn map(&self, f: impl Fn(u8) -> u8) -> Self {
        let mut image = self.image.clone();
        for px in image.pixels_mut() {
            px.0[0] = f(px.0[0]);
        }
        Self::from_image(image)
    }

    /// Place this mask on a canvas of a new size, moving content by `(dx, dy)`.
    /// Content pushed off the canvas is dropped; uncovered area is unselected.
    pub fn reframe(&self, canvas: CanvasSize, dx: i32, dy: i32) -> Self {
        let image = GrayImage::from_fn(canvas.width, canvas.height, |x, y| {
            Luma([self.coverage(x as i32 - dx, y as i32 - dy)])
        });
        Self::from_image(image)
    }

    /// Resample to a new canvas size.
    pub fn rescale(&self, canvas: CanvasSize) -> Self {
        if canvas == self.canvas() {
            return Self::from_image(self.image.clone());
        }
        if canvas.is_empty() {
            return Self::empty(canvas);
        }
        Self::from_image(imageops::resize(
            &self.image,
            canvas.width,
            canvas.height,
            FilterType::Triangle,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: CanvasSize = CanvasSize::new(10, 8);

    #[test]
    fn versions_are_unique() {
        let a = Mask::empty(CANVAS);
        let b = Mask::empty(CANVAS);
        assert_ne!(a.version(), b.version());
        assert_ne!(a.map(|v| v).version(), a.version());
    }

    #[test]
    fn rect_is_clipped_to_canvas() {
        let m = Mask::from_rect(CANVAS, PixelRect::new(-2, 6, 5, 5));
        assert_eq!(m.bounds(), Some(PixelRect::new(0, 6, 3, 2)));
        assert_eq!(m.coverage(2, 7), 255);
        assert_eq!(m.coverage(3, 7), 0);
        assert_eq!(m.coverage(-1, 7), 0);
    }

    #[test]
    fn ellipse_rasterization() {
        let m = Mask::from_ellipse(CANVAS, 5.0, 4.0, 3.0, 2.0);
        assert!(m.is_selected(5, 4));
        assert!(!m.is_selected(0, 0));
        assert_eq!(m.bounds(), Some(PixelRect::new(2, 2, 6, 4)));
        assert!(Mask::from_ellipse(CANVAS, 5.0, 4.0, 0.0, 2.0).is_empty());
    }

    #[test]
    fn reframe_moves_content() {
        let m = Mask::from_rect(CANVAS, PixelRect::new(1, 1, 2, 2));
        let moved = m.reframe(CanvasSize::new(20, 20), 5, 3);
        assert_eq!(moved.canvas(), CanvasSize::new(20, 20));
        assert_eq!(moved.bounds(), Some(PixelRect::new(6, 4, 2, 2)));
    }

    #[test]
    fn rescale_doubles_bounds() {
        let m = Mask::from_rect(CANVAS, PixelRect::new(0, 0, 5, 8));
        let big = m.rescale(CanvasSize::new(20, 16));
        assert_eq!(big.canvas(), CanvasSize::new(20, 16));
        assert!(big.is_selected(2, 8));
        assert!(!big.is_selected(18, 8));
    }

    #[test]
    fn binary_roundtrip() {
        let m = Mask::from_rect(CANVAS, PixelRect::new(2, 2, 3, 3));
        let bits = m.binary();
        assert_eq!(Mask::from_binary(CANVAS, &bits).as_raw(), m.as_raw());
    }
}
