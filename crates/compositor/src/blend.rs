//! Straight-alpha blending.
//!
//! Source-over of a placed layer raster onto the accumulation surface, and
//! the linear mix used to apply a translucent effect layer.

use ps_common::RgbaImage;

use crate::placement::Placement;

/// Composite `src` over `dst` (Porter-Duff source-over, straight alpha),
/// scaled by `opacity`, inside the clipped region `placement`.
pub fn blend_over(dst: &mut RgbaImage, src: &RgbaImage, placement: &Placement, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }
    let region = placement.dst;
    for row in 0..region.height {
        let sy = placement.src_y + row;
        let dy = region.y as u32 + row;
        for col in 0..region.width {
            let sx = placement.src_x + col;
            let dx = region.x as u32 + col;
            let s = src.get_pixel(sx, sy).0;
            let d = dst.get_pixel_mut(dx, dy);
            d.0 = over(s, d.0, opacity);
        }
    }
}

/// Source-over of one straight-alpha pixel.
#[inline]
pub fn over(src: [u8; 4], dst: [u8; 4], opacity: f32) -> [u8; 4] {
    if src[3] == 255 && opacity >= 1.0 {
        return src;
    }
    let sa = f32::from(src[3]) / 255.0 * opacity;
    if sa <= 0.0 {
        return dst;
    }
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return [0; 4];
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (f32::from(src[c]) * sa + f32::from(dst[c]) * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    out
}

/// `dst = base + (dst - base) * amount`, per channel.
pub fn mix_into(dst: &mut RgbaImage, base: &RgbaImage, amount: f32) {
    let amount = amount.clamp(0.0, 1.0);
    if amount >= 1.0 {
        return;
    }
    for (d, b) in dst.iter_mut().zip(base.iter()) {
        let (dv, bv) = (f32::from(*d), f32::from(*b));
        *d = (bv + (dv - bv) * amount).round().clamp(0.0, 255.0) as u8;
    }
}
