//! Per-pixel enhancement kernels.
//!
//! Every adjustment is a linear blend between the image and a *degenerate*
//! version of it:
//!
//! ```text
//! out = degenerate + factor × (image − degenerate)
//! ```
//!
//! | Adjustment | Degenerate image |
//! |---|---|
//! | brightness | black |
//! | contrast | flat gray at the mean luminance |
//! | saturation | per-pixel luminance (grayscale) |
//! | sharpness | 3×3 smoothed copy, borders untouched |
//!
//! Results are clamped to `0..=255`. Alpha is never modified. Kernels work
//! on 8-bit RGBA; [`with_rgba8`] converts in and back out so the caller's
//! colour family (gray / colour, with / without alpha) is preserved.

use image::{ColorType, DynamicImage, Rgb, RgbaImage};

/// Luminance weights (ITU-R 601), the same ones the gray degenerates use.
const LUMA: [f32; 3] = [0.299, 0.587, 0.114];

/// 3×3 smoothing kernel (sum 13).
const SMOOTH: [[f32; 3]; 3] = [[1.0, 1.0, 1.0], [1.0, 5.0, 1.0], [1.0, 1.0, 1.0]];

fn blend(degenerate: f32, value: f32, factor: f32) -> u8 {
    (degenerate + factor * (value - degenerate))
        .round()
        .clamp(0.0, 255.0) as u8
}

fn luma(r: u8, g: u8, b: u8) -> f32 {
    LUMA[0] * r as f32 + LUMA[1] * g as f32 + LUMA[2] * b as f32
}

/// Whether the kernels can run on this colour type without losing range.
pub fn is_enhanceable(color: ColorType) -> bool {
    !matches!(color, ColorType::Rgb32F | ColorType::Rgba32F)
}

/// Run an RGBA8 kernel and convert back to the input's colour family.
///
/// 16-bit inputs come back as 8-bit.
pub fn with_rgba8(image: DynamicImage, kernel: impl FnOnce(&mut RgbaImage)) -> DynamicImage {
    let color = image.color();
    let mut buf = image.into_rgba8();
    kernel(&mut buf);
    let rgba = DynamicImage::ImageRgba8(buf);
    match (color.has_color(), color.has_alpha()) {
        (true, true) => rgba,
        (true, false) => DynamicImage::ImageRgb8(rgba.into_rgb8()),
        (false, true) => DynamicImage::ImageLumaA8(rgba.into_luma_alpha8()),
        (false, false) => DynamicImage::ImageLuma8(rgba.into_luma8()),
    }
}

pub fn brightness(buf: &mut RgbaImage, factor: f32) {
    for px in buf.pixels_mut() {
        for c in 0..3 {
            px[c] = blend(0.0, px[c] as f32, factor);
        }
    }
}

pub fn contrast(buf: &mut RgbaImage, factor: f32) {
    let count = (buf.width() as u64 * buf.height() as u64).max(1);
    let total: f64 = buf
        .pixels()
        .map(|px| luma(px[0], px[1], px[2]).round() as f64)
        .sum();
    let mean = (total / count as f64 + 0.5).floor() as f32;
    for px in buf.pixels_mut() {
        for c in 0..3 {
            px[c] = blend(mean, px[c] as f32, factor);
        }
    }
}

pub fn saturation(buf: &mut RgbaImage, factor: f32) {
    for px in buf.pixels_mut() {
        let gray = luma(px[0], px[1], px[2]).round();
        for c in 0..3 {
            px[c] = blend(gray, px[c] as f32, factor);
        }
    }
}

pub fn sharpness(buf: &mut RgbaImage, factor: f32) {
    let (w, h) = buf.dimensions();
    if w < 3 || h < 3 {
        // No interior pixels: the smoothed copy equals the original.
        return;
    }
    let source = buf.clone();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = [0.0f32; 3];
            for (ky, row) in SMOOTH.iter().enumerate() {
                for (kx, weight) in row.iter().enumerate() {
                    let px = source.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                    for c in 0..3 {
                        acc[c] += weight * px[c] as f32;
                    }
                }
            }
            let original = source.get_pixel(x, y);
            let out = buf.get_pixel_mut(x, y);
            for c in 0..3 {
                let smoothed = (acc[c] / 13.0).round();
                out[c] = blend(smoothed, original[c] as f32, factor);
            }
        }
    }
}

/// Composite an image with alpha onto an opaque background.
///
/// Gray images stay gray when the background is gray too; otherwise the
/// result is RGB8. Images without alpha are returned unchanged.
pub fn flatten_alpha(image: DynamicImage, background: Rgb<u8>) -> DynamicImage {
    let color = image.color();
    if !color.has_alpha() {
        return image;
    }
    let gray_background = background[0] == background[1] && background[1] == background[2];
    let rgba = image.into_rgba8();
    let (w, h) = rgba.dimensions();
    let flat = image::RgbImage::from_fn(w, h, |x, y| {
        let px = rgba.get_pixel(x, y);
        let a = px[3] as u32;
        let mut out = [0u8; 3];
        for c in 0..3 {
            out[c] = ((px[c] as u32 * a + background[c] as u32 * (255 - a) + 127) / 255) as u8;
        }
        Rgb(out)
    });
    let flat = DynamicImage::ImageRgb8(flat);
    if !color.has_color() && gray_background {
        DynamicImage::ImageLuma8(flat.into_luma8())
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba};

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn brightness_scales_and_clamps() {
        let mut buf = solid(2, 2, [100, 200, 50, 77]);
        brightness(&mut buf, 1.5);
        assert_eq!(buf.get_pixel(0, 0), &Rgba([150, 255, 75, 77]));
    }

    #[test]
    fn brightness_zero_is_black_with_alpha_kept() {
        let mut buf = solid(1, 1, [10, 20, 30, 40]);
        brightness(&mut buf, 0.0);
        assert_eq!(buf.get_pixel(0, 0), &Rgba([0, 0, 0, 40]));
    }

    #[test]
    fn contrast_zero_collapses_to_mean() {
        let mut buf = RgbaImage::new(2, 1);
        buf.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        buf.put_pixel(1, 0, Rgba([200, 200, 200, 255]));
        contrast(&mut buf, 0.0);
        assert_eq!(buf.get_pixel(0, 0), &Rgba([100, 100, 100, 255]));
        assert_eq!(buf.get_pixel(1, 0), &Rgba([100, 100, 100, 255]));
    }

    #[test]
    fn contrast_one_is_identity() {
        let original = solid(3, 3, [12, 34, 56, 255]);
        let mut buf = original.clone();
        contrast(&mut buf, 1.0);
        assert_eq!(buf, original);
    }

    #[test]
    fn saturation_zero_is_gray() {
        let mut buf = solid(1, 1, [255, 0, 0, 255]);
        saturation(&mut buf, 0.0);
        let px = buf.get_pixel(0, 0);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_eq!(px[0], 76);
    }

    #[test]
    fn sharpness_leaves_flat_images_alone() {
        let original = solid(5, 5, [90, 90, 90, 255]);
        let mut buf = original.clone();
        sharpness(&mut buf, 2.0);
        assert_eq!(buf, original);
    }

    #[test]
    fn sharpness_boosts_a_peak() {
        let mut buf = solid(3, 3, [100, 100, 100, 255]);
        buf.put_pixel(1, 1, Rgba([200, 200, 200, 255]));
        sharpness(&mut buf, 2.0);
        // smoothed centre = (8*100 + 5*200) / 13 ≈ 138 → 138 + 2*(200-138) = 262 → 255
        assert_eq!(buf.get_pixel(1, 1)[0], 255);
        // border pixels are not touched
        assert_eq!(buf.get_pixel(0, 0)[0], 100);
    }

    #[test]
    fn with_rgba8_preserves_gray_family() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([80])));
        let out = with_rgba8(gray, |buf| brightness(buf, 2.0));
        assert_eq!(out.color(), ColorType::L8);
        assert_eq!(out.as_luma8().unwrap().get_pixel(0, 0), &Luma([160]));
    }

    #[test]
    fn float_images_are_not_enhanceable() {
        assert!(!is_enhanceable(ColorType::Rgba32F));
        assert!(is_enhanceable(ColorType::Rgb16));
        assert!(is_enhanceable(ColorType::La8));
    }

    #[test]
    fn flatten_blends_onto_white() {
        let img = DynamicImage::ImageRgba8(solid(1, 1, [0, 0, 0, 0]));
        let flat = flatten_alpha(img, Rgb([255, 255, 255]));
        assert_eq!(flat.color(), ColorType::Rgb8);
        assert_eq!(flat.as_rgb8().unwrap().get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn flatten_keeps_opaque_pixels() {
        let img = DynamicImage::ImageRgba8(solid(1, 1, [10, 20, 30, 255]));
        let flat = flatten_alpha(img, Rgb([255, 0, 0]));
        assert_eq!(flat.as_rgb8().unwrap().get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn flatten_gray_alpha_stays_gray() {
        let img = DynamicImage::ImageLumaA8(image::GrayAlphaImage::from_pixel(
            1,
            1,
            image::LumaA([0, 128]),
        ));
        let flat = flatten_alpha(img, Rgb([255, 255, 255]));
        assert_eq!(flat.color(), ColorType::L8);
        assert_eq!(flat.as_luma8().unwrap().get_pixel(0, 0), &Luma([127]));
    }
}
