//! Mask algebra: invert, expand, contract, feather, border, smooth.
//!
//! Expand/contract/border/smooth work on the binary threshold of the input
//! (sample > 127) and produce 0/255 output. Samples outside the canvas count
//! as unselected.

use ps_common::CanvasSize;
use serde::{Deserialize, Serialize};

use crate::mask::Mask;

/// A single per-pixel selection transform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", content = "radius", rename_all = "snake_case")]
pub enum MaskOp {
    Invert,
    Expand(u32),
    Contract(u32),
    Feather(u32),
    Border(u32),
    Smooth(u32),
}

impl MaskOp {
    pub fn apply(self, mask: &Mask) -> Mask {
        match self {
            Self::Invert => invert(mask),
            Self::Expand(n) => dilate(mask, n),
            Self::Contract(n) => erode(mask, n),
            Self::Feather(n) => feather(mask, n),
            Self::Border(n) => border(mask, n),
            Self::Smooth(n) => smooth(mask, n),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Invert => "invert",
            Self::Expand(_) => "expand",
            Self::Contract(_) => "contract",
            Self::Feather(_) => "feather",
            Self::Border(_) => "border",
            Self::Smooth(_) => "smooth",
        }
    }
}

/// `a -> 255 - a` for every sample.
pub fn invert(mask: &Mask) -> Mask {
    mask.map(|v| 255 - v)
}

/// Dilation by a Euclidean disk of radius `n`.
pub fn dilate(mask: &Mask, n: u32) -> Mask {
    let grid = Bits::of(mask);
    Mask::from_binary(mask.canvas(), &grid.dilate(n))
}

/// Erosion by a Euclidean disk of radius `n`.
pub fn erode(mask: &Mask, n: u32) -> Mask {
    let grid = Bits::of(mask);
    Mask::from_binary(mask.canvas(), &grid.erode(n))
}

/// The band within `n` pixels of the selection edge, on both sides:
/// `(A and not erode(A)) or (dilate(A) and not A)`.
pub fn border(mask: &Mask, n: u32) -> Mask {
    let grid = Bits::of(mask);
    let inner = grid.erode(n);
    let outer = grid.dilate(n);
    let band: Vec<bool> = grid
        .bits
        .iter()
        .zip(inner.iter().zip(&outer))
        .map(|(&a, (&e, &d))| (a && !e) || (d && !a))
        .collect();
    Mask::from_binary(mask.canvas(), &band)
}

/// Majority filter over the `(2n+1)^2` window (in-canvas samples only).
/// Ties keep the sample's own value.
pub fn smooth(mask: &Mask, n: u32) -> Mask {
    let grid = Bits::of(mask);
    let (w, h) = (grid.width, grid.height);
    if w == 0 || h == 0 {
        return mask.map(|v| v);
    }

    // Summed-area table, (w+1) x (h+1).
    let stride = w + 1;
    let mut sat = vec![0u32; stride * (h + 1)];
    for y in 0..h {
        let mut row = 0u32;
        for x in 0..w {
            row += u32::from(grid.bits[y * w + x]);
            sat[(y + 1) * stride + x + 1] = sat[y * stride + x + 1] + row;
        }
    }

    let r = n as usize;
    let out: Vec<bool> = (0..w * h)
        .map(|i| {
            let (x, y) = (i % w, i / w);
            let (x0, x1) = (x.saturating_sub(r), (x + r).min(w - 1) + 1);
            let (y0, y1) = (y.saturating_sub(r), (y + r).min(h - 1) + 1);
            let selected = sat[y1 * stride + x1] + sat[y0 * stride + x0]
                - sat[y0 * stride + x1]
                - sat[y1 * stride + x0];
            let total = ((x1 - x0) * (y1 - y0)) as u32;
            match (2 * selected).cmp(&total) {
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Less => false,
                std::cmp::Ordering::Equal => grid.bits[i],
            }
        })
        .collect();
    Mask::from_binary(mask.canvas(), &out)
}

/// Separable Gaussian blur of the mask (radius `n`, sigma `n / 2`).
/// Samples beyond the edge repeat the nearest edge sample.
pub fn feather(mask: &Mask, n: u32) -> Mask {
    if n == 0 {
        return mask.map(|v| v);
    }
    let CanvasSize { width, height } = mask.canvas();
    let (w, h) = (width as usize, height as usize);
    let kernel = gaussian_weights(n);
    let r = n as i64;

    let src: Vec<f32> = mask.as_raw().iter().map(|&v| f32::from(v)).collect();
    let mut tmp = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            tmp[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, wt)| {
                    let sx = (x as i64 + k as i64 - r).clamp(0, w as i64 - 1) as usize;
                    wt * src[y * w + sx]
                })
                .sum();
        }
    }
    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let v: f32 = kernel
                .iter()
                .enumerate()
                .map(|(k, wt)| {
                    let sy = (y as i64 + k as i64 - r).clamp(0, h as i64 - 1) as usize;
                    wt * tmp[sy * w + x]
                })
                .sum();
            out[y * w + x] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    let image = ps_common::GrayImage::from_raw(width, height, out)
        .unwrap_or_else(|| ps_common::GrayImage::new(width, height));
    Mask::from_image(image)
}

fn gaussian_weights(n: u32) -> Vec<f32> {
    let sigma = (n as f32 / 2.0).max(0.5);
    let r = n as i64;
    let mut weights: Vec<f32> = (-r..=r)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Half-width of the disk at each row offset: `(dy, floor(sqrt(n^2 - dy^2)))`.
fn disk_spans(n: u32) -> Vec<(i64, i64)> {
    let n = i64::from(n);
    (-n..=n)
        .map(|dy| {
            let rem = n * n - dy * dy;
            let mut half = (rem as f64).sqrt() as i64;
            while half * half > rem {
                half -= 1;
            }
            while (half + 1) * (half + 1) <= rem {
                half += 1;
            }
            (dy, half)
        })
        .collect()
}

/// Thresholded mask with per-row prefix counts for O(1) span queries.
struct Bits {
    bits: Vec<bool>,
    prefix: Vec<u32>,
    width: usize,
    height: usize,
}

impl Bits {
    fn of(mask: &Mask) -> Self {
        let (width, height) = (mask.width() as usize, mask.height() as usize);
        let bits = mask.binary();
        let stride = width + 1;
        let mut prefix = vec![0u32; stride * height];
        for y in 0..height {
            for x in 0..width {
                prefix[y * stride + x + 1] = prefix[y * stride + x] + u32::from(bits[y * width + x]);
            }
        }
        Self {
            bits,
            prefix,
            width,
            height,
        }
    }

    /// Selected samples in row `y`, columns `lo..=hi`.
    fn count(&self, y: usize, lo: usize, hi: usize) -> u32 {
        let row = y * (self.width + 1);
        self.prefix[row + hi + 1] - self.prefix[row + lo]
    }

    fn dilate(&self, n: u32) -> Vec<bool> {
        let spans = disk_spans(n);
        let (w, h) = (self.width as i64, self.height as i64);
        (0..self.width * self.height)
            .map(|i| {
                let (x, y) = ((i % self.width) as i64, (i / self.width) as i64);
                spans.iter().any(|&(dy, half)| {
                    let sy = y + dy;
                    if sy < 0 || sy >= h {
                        return false;
                    }
                    let lo = (x - half).max(0) as usize;
                    let hi = (x + half).min(w - 1) as usize;
                    self.count(sy as usize, lo, hi) > 0
                })
            })
            .collect()
    }

    fn erode(&self, n: u32) -> Vec<bool> {
        let spans = disk_spans(n);
        let (w, h) = (self.width as i64, self.height as i64);
        (0..self.width * self.height)
            .map(|i| {
                let (x, y) = ((i % self.width) as i64, (i / self.width) as i64);
                spans.iter().all(|&(dy, half)| {
                    let sy = y + dy;
                    if sy < 0 || sy >= h || x - half < 0 || x + half >= w {
                        return false;
                    }
                    self.count(sy as usize, (x - half) as usize, (x + half) as usize)
                        == (2 * half + 1) as u32
                })
            })
            .collect()
    }
}
