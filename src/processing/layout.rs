use image::{RgbImage, imageops};

use crate::config::Viewport;

/// Canvas pixel size for a viewport: full device width, height following the
/// viewport's aspect ratio.
pub fn canvas_size(viewport: &Viewport) -> (u32, u32) {
    let w = (viewport.width.max(1) as f32 * viewport.device_pixel_ratio).round();
    let ratio = viewport.width.max(1) as f32 / viewport.height.max(1) as f32;
    let h = (w / ratio).round();
    (w.max(1.0) as u32, h.max(1.0) as u32)
}

pub fn center_offset(inner_w: u32, inner_h: u32, outer_w: u32, outer_h: u32) -> (u32, u32) {
    let ox = outer_w.saturating_sub(inner_w) / 2;
    let oy = outer_h.saturating_sub(inner_h) / 2;
    (ox, oy)
}

/// Longest side a prepared surface may have.
pub const MAX_SURFACE_EXTENT: u32 = 8192;

/// Crop-fit `src` to `aspect` (width / height), keeping its native width and
/// centering the excess.
///
/// The source is cropped before any scaling, so no intermediate buffer is
/// larger than the result. Surfaces are capped at [`MAX_SURFACE_EXTENT`].
pub fn cover_to_aspect(src: &RgbImage, aspect: f32) -> RgbImage {
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 {
        return src.clone();
    }
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    };
    let (tw, th) = surface_size(sw, aspect);
    let (cw, ch) = crop_extent(sw, sh, aspect);
    if (cw, ch) == (sw, sh) && (tw, th) == (sw, sh) {
        return src.clone();
    }

    let (ox, oy) = center_offset(cw, ch, sw, sh);
    let cropped = imageops::crop_imm(src, ox, oy, cw, ch).to_image();
    if (cw, ch) == (tw, th) {
        cropped
    } else {
        imageops::resize(&cropped, tw, th, imageops::FilterType::Triangle)
    }
}

fn surface_size(src_w: u32, aspect: f32) -> (u32, u32) {
    let mut w = src_w as f32;
    let mut h = w / aspect;
    let longest = w.max(h);
    let limit = MAX_SURFACE_EXTENT as f32;
    if longest > limit {
        w *= limit / longest;
        h *= limit / longest;
    }
    (w.round().max(1.0) as u32, h.round().max(1.0) as u32)
}

/// Largest centered window of the source with the target aspect.
fn crop_extent(src_w: u32, src_h: u32, aspect: f32) -> (u32, u32) {
    let (w, h) = (src_w as f32, src_h as f32);
    if w / h > aspect {
        (((h * aspect).round() as u32).clamp(1, src_w), src_h)
    } else {
        (src_w, ((w / aspect).round() as u32).clamp(1, src_h))
    }
}
