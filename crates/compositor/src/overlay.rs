//! Marching-ants selection overlay.
//!
//! The outline of a mask is every selected sample with at least one
//! 4-neighbour that is unselected (the canvas edge counts as unselected).
//! Tracing is cached per mask version; drawing alternates black and white
//! dashes along `x + y`, shifted by `time * speed` when animation is on.

use ps_common::{OverlayConfig, Rgba, RgbaImage, TimeCode};
use ps_selection::Mask;

const INK_DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const INK_LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Boundary samples of one mask version.
#[derive(Debug)]
pub struct Outline {
    version: u64,
    points: Vec<(u32, u32)>,
}

impl Outline {
    pub fn trace(mask: &Mask) -> Self {
        let mut points = Vec::new();
        for y in 0..mask.height() {
            for x in 0..mask.width() {
                let (xi, yi) = (x as i32, y as i32);
                if !mask.is_selected(xi, yi) {
                    continue;
                }
                let edge = !mask.is_selected(xi - 1, yi)
                    || !mask.is_selected(xi + 1, yi)
                    || !mask.is_selected(xi, yi - 1)
                    || !mask.is_selected(xi, yi + 1);
                if edge {
                    points.push((x, y));
                }
            }
        }
        Self {
            version: mask.version(),
            points,
        }
    }

    /// Version of the mask this outline was traced from.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn points(&self) -> &[(u32, u32)] {
        &self.points
    }

    /// Stamp the dashes onto `frame`. Points outside `frame` are skipped.
    pub fn draw(&self, frame: &mut RgbaImage, config: &OverlayConfig, time: TimeCode) {
        let dash = config.dash_length.max(1) as f64;
        let shift = if config.animate {
            time.as_secs() * f64::from(config.speed)
        } else {
            0.0
        };
        let (width, height) = frame.dimensions();
        for &(x, y) in &self.points {
            if x >= width || y >= height {
                continue;
            }
            let phase = ((f64::from(x + y) + shift) / dash).floor() as i64;
            let ink = if phase.rem_euclid(2) == 0 {
                INK_DARK
            } else {
                INK_LIGHT
            };
            frame.put_pixel(x, y, ink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_common::{CanvasSize, PixelRect};

    #[test]
    fn outline_is_the_rect_border() {
        let mask = Mask::from_rect(CanvasSize::new(10, 10), PixelRect::new(2, 2, 4, 3));
        let outline = Outline::trace(&mask);
        // 4x3 rect: every sample except the two interior ones.
        assert_eq!(outline.points().len(), 10);
        assert!(outline.points().contains(&(2, 2)));
        assert!(!outline.points().contains(&(3, 3)));
        assert_eq!(outline.version(), mask.version());
    }

    #[test]
    fn canvas_edge_counts_as_boundary() {
        let mask = Mask::full(CanvasSize::new(3, 3));
        let outline = Outline::trace(&mask);
        assert_eq!(outline.points().len(), 8);
    }

    #[test]
    fn dashes_march_with_time() {
        let mask = Mask::from_rect(CanvasSize::new(16, 16), PixelRect::new(0, 0, 16, 1));
        let outline = Outline::trace(&mask);
        let config = OverlayConfig {
            dash_length: 4,
            speed: 4.0,
            animate: true,
        };
        let mut a = RgbaImage::new(16, 16);
        let mut b = RgbaImage::new(16, 16);
        outline.draw(&mut a, &config, TimeCode::ZERO);
        outline.draw(&mut b, &config, TimeCode::from_secs(1.0));
        assert_eq!(a.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(a.get_pixel(4, 0).0, [255, 255, 255, 255]);
        // One dash length later the pattern has flipped.
        assert_eq!(b.get_pixel(0, 0).0, [255, 255, 255, 255]);

        let still = OverlayConfig {
            animate: false,
            ..config
        };
        let mut c = RgbaImage::new(16, 16);
        outline.draw(&mut c, &still, TimeCode::from_secs(1.0));
        assert_eq!(c, a);
    }
}
