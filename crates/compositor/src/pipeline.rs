//! Multi-pass render pipeline with ping-pong surface management.
//!
//! The [`RenderPipeline`] owns two canvas-sized surfaces that alternate as
//! source and destination. Effect passes read the current surface and write
//! the back surface, then [`swap`](RenderPipeline::swap). A third `saved`
//! surface holds a layer's input while a multi-pass or translucent effect
//! runs, so the input can be restored or mixed back in.

use ps_common::{CanvasSize, RgbaImage};
use tracing::debug;

use crate::backend::GpuBackend;
use crate::blend::mix_into;
use crate::CompositorError;

pub struct RenderPipeline {
    surfaces: [RgbaImage; 2],
    /// Index of the current (front) surface.
    current: usize,
    saved: RgbaImage,
    size: CanvasSize,
}

impl RenderPipeline {
    /// Allocate the surfaces for `size` through `backend`.
    pub fn new(backend: &dyn GpuBackend, size: CanvasSize) -> Result<Self, CompositorError> {
        debug!(
            width = size.width,
            height = size.height,
            backend = backend.name(),
            "Allocating ping-pong render pipeline"
        );
        let front = backend.alloc_surface(size)?;
        let back = backend.alloc_surface(size)?;
        let saved = backend.alloc_surface(size)?;
        Ok(Self {
            surfaces: [front, back],
            current: 0,
            saved,
            size,
        })
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    /// The surface holding the composited result so far.
    pub fn current(&self) -> &RgbaImage {
        &self.surfaces[self.current]
    }

    pub fn current_mut(&mut self) -> &mut RgbaImage {
        &mut self.surfaces[self.current]
    }

    /// Current surface for reading, back surface for writing.
    pub fn split(&mut self) -> (&RgbaImage, &mut RgbaImage) {
        let (a, b) = self.surfaces.split_at_mut(1);
        if self.current == 0 {
            (&a[0], &mut b[0])
        } else {
            (&b[0], &mut a[0])
        }
    }

    /// Flip front and back.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    /// Clear the current surface to transparent black.
    pub fn clear(&mut self) {
        self.current_mut().fill(0);
    }

    /// Copy the current surface into the saved slot.
    pub fn save(&mut self) {
        let current = &self.surfaces[self.current];
        self.saved.copy_from_slice(current);
    }

    /// Overwrite the current surface with the saved slot.
    pub fn restore(&mut self) {
        let saved = &self.saved;
        self.surfaces[self.current].copy_from_slice(saved);
    }

    /// Blend the saved slot back over the current surface:
    /// `current = saved + (current - saved) * amount`.
    pub fn mix_saved(&mut self, amount: f32) {
        let saved = &self.saved;
        mix_into(&mut self.surfaces[self.current], saved, amount);
    }

    /// Take the current surface out, leaving a blank one of the same size.
    pub fn take_current(&mut self) -> RgbaImage {
        let blank = RgbaImage::new(self.size.width, self.size.height);
        std::mem::replace(&mut self.surfaces[self.current], blank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SoftwareBackend;
    use ps_common::Rgba;

    fn pipeline(w: u32, h: u32) -> RenderPipeline {
        RenderPipeline::new(&SoftwareBackend::with_builtins(), CanvasSize::new(w, h)).unwrap()
    }

    #[test]
    fn split_reads_front_writes_back() {
        let mut p = pipeline(2, 2);
        p.current_mut().put_pixel(0, 0, Rgba([9, 9, 9, 9]));
        {
            let (front, back) = p.split();
            back.put_pixel(0, 0, Rgba([front.get_pixel(0, 0).0[0] + 1, 0, 0, 255]));
        }
        assert_eq!(p.current().get_pixel(0, 0).0, [9, 9, 9, 9]);
        p.swap();
        assert_eq!(p.current().get_pixel(0, 0).0, [10, 0, 0, 255]);
        p.swap();
        assert_eq!(p.current().get_pixel(0, 0).0, [9, 9, 9, 9]);
    }

    #[test]
    fn save_and_restore() {
        let mut p = pipeline(3, 1);
        p.current_mut().put_pixel(1, 0, Rgba([1, 2, 3, 4]));
        p.save();
        p.clear();
        assert_eq!(p.current().get_pixel(1, 0).0, [0, 0, 0, 0]);
        p.restore();
        assert_eq!(p.current().get_pixel(1, 0).0, [1, 2, 3, 4]);
    }

    #[test]
    fn mix_saved_halfway() {
        let mut p = pipeline(1, 1);
        p.current_mut().put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        p.save();
        p.current_mut().put_pixel(0, 0, Rgba([200, 100, 0, 255]));
        p.mix_saved(0.5);
        assert_eq!(p.current().get_pixel(0, 0).0, [100, 50, 0, 255]);
    }

    #[test]
    fn zero_canvas_fails() {
        let err = RenderPipeline::new(&SoftwareBackend::with_builtins(), CanvasSize::new(0, 4));
        assert!(matches!(err, Err(CompositorError::Gpu(_))));
    }
}
