//! RGBA raster helpers shared by layers, compositor and tools.
//!
//! Rasters are straight-alpha `image::RgbaImage` buffers.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::DecodeError;
use crate::types::PixelRect;

/// A raster filled with a single color.
pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

/// A linear two-color gradient, left-to-right or top-to-bottom.
pub fn gradient(width: u32, height: u32, from: [u8; 4], to: [u8; 4], vertical: bool) -> RgbaImage {
    let span = if vertical { height } else { width };
    let denom = span.saturating_sub(1).max(1) as f32;
    RgbaImage::from_fn(width, height, |x, y| {
        let t = if vertical { y } else { x } as f32 / denom;
        let mut px = [0u8; 4];
        for c in 0..4 {
            let v = f32::from(from[c]) + (f32::from(to[c]) - f32::from(from[c])) * t;
            px[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        Rgba(px)
    })
}

/// Wrap raw straight-alpha RGBA bytes.
pub fn from_raw_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<RgbaImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::ZeroSize { width, height });
    }
    let expected = width as usize * height as usize * 4;
    let got = data.len();
    RgbaImage::from_raw(width, height, data).ok_or(DecodeError::BufferSize { expected, got })
}

/// Decode an encoded still (PNG) into RGBA.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let image = image::load_from_memory(bytes)?.to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(DecodeError::ZeroSize {
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(image)
}

/// Encode a raster as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Resample to exactly `width x height` (bilinear). Dimensions are clamped to 1.
pub fn resample(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let (width, height) = (width.max(1), height.max(1));
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Copy out `rect` (raster coordinates), clipped to the raster.
pub fn crop(image: &RgbaImage, rect: PixelRect) -> RgbaImage {
    let bounds = PixelRect::new(0, 0, image.width(), image.height());
    match rect.intersect(&bounds) {
        Some(r) => imageops::crop_imm(image, r.x as u32, r.y as u32, r.width, r.height).to_image(),
        None => RgbaImage::new(0, 0),
    }
}

/// Bounding box of all pixels with non-zero alpha, in raster coordinates.
pub fn opaque_bounds(image: &RgbaImage) -> Option<PixelRect> {
    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    let (mut max_x, mut max_y) = (0u32, 0u32);
    let mut any = false;
    for (x, y, px) in image.enumerate_pixels() {
        if px[3] > 0 {
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    any.then(|| {
        PixelRect::new(
            min_x as i32,
            min_y as i32,
            max_x - min_x + 1,
            max_y - min_y + 1,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_fills_every_pixel() {
        let img = solid(3, 2, [10, 20, 30, 40]);
        assert!(img.pixels().all(|p| p.0 == [10, 20, 30, 40]));
    }

    #[test]
    fn gradient_endpoints() {
        let img = gradient(5, 1, [0, 0, 0, 255], [255, 255, 255, 255], false);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(4, 0).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(2, 0).0[0], 128);
    }

    #[test]
    fn raw_rgba_size_checked() {
        assert!(from_raw_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            from_raw_rgba(2, 2, vec![0; 15]),
            Err(DecodeError::BufferSize { expected: 16, got: 15 })
        ));
        assert!(matches!(
            from_raw_rgba(0, 2, vec![]),
            Err(DecodeError::ZeroSize { .. })
        ));
    }

    #[test]
    fn png_encode_then_decode() {
        let img = solid(4, 3, [200, 10, 10, 255]);
        let bytes = encode_png(&img).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back.dimensions(), (4, 3));
        assert_eq!(back.get_pixel(1, 1).0, [200, 10, 10, 255]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode(&[]), Err(DecodeError::Empty)));
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn resample_hits_exact_size() {
        let img = solid(10, 10, [1, 2, 3, 255]);
        let out = resample(&img, 150, 7);
        assert_eq!(out.dimensions(), (150, 7));
        assert_eq!(out.get_pixel(75, 3).0, [1, 2, 3, 255]);
    }

    #[test]
    fn crop_clips_to_raster() {
        let mut img = solid(4, 4, [0, 0, 0, 255]);
        img.put_pixel(3, 3, Rgba([9, 9, 9, 255]));
        let out = crop(&img, PixelRect::new(2, 2, 5, 5));
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(out.get_pixel(1, 1).0, [9, 9, 9, 255]);
        assert_eq!(crop(&img, PixelRect::new(8, 8, 2, 2)).dimensions(), (0, 0));
    }

    #[test]
    fn opaque_bounds_finds_content() {
        let mut img = solid(8, 8, [0, 0, 0, 0]);
        assert_eq!(opaque_bounds(&img), None);
        img.put_pixel(2, 3, Rgba([255, 0, 0, 255]));
        img.put_pixel(5, 6, Rgba([255, 0, 0, 1]));
        assert_eq!(opaque_bounds(&img), Some(PixelRect::new(2, 3, 4, 4)));
    }
}
