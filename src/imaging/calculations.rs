//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::ResizeSpec;

/// Calculate output dimensions for a resize.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `spec` - Requested box and aspect handling
///
/// # Returns
/// * `None` - Nothing to do (no edge requested, or the image already fits)
/// * `Some((width, height))` - Final dimensions, each at least 1
///
/// # Rules
/// - keep aspect, both edges: fit inside the box, never upscale
/// - keep aspect, one edge: scale so that edge matches (may upscale)
/// - exact: missing edge is taken from the source
///
/// # Examples
/// ```
/// # use simple_convert::imaging::{ResizeSpec, calculate_resize_dimensions};
/// // 4000x3000 fitted into 1920x1080 → height-bound
/// assert_eq!(
///     calculate_resize_dimensions((4000, 3000), &ResizeSpec::fit(1920, 1080)),
///     Some((1440, 1080))
/// );
/// ```
pub fn calculate_resize_dimensions(source: (u32, u32), spec: &ResizeSpec) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 || spec.is_noop() {
        return None;
    }

    let dims = if spec.keep_aspect {
        match (spec.width, spec.height) {
            (Some(box_w), Some(box_h)) => {
                if src_w <= box_w && src_h <= box_h {
                    return None;
                }
                let scale = (box_w as f64 / src_w as f64).min(box_h as f64 / src_h as f64);
                (scaled(src_w, scale), scaled(src_h, scale))
            }
            (Some(w), None) => {
                let ratio = w as f64 / src_w as f64;
                (w, scaled(src_h, ratio))
            }
            (None, Some(h)) => {
                let ratio = h as f64 / src_h as f64;
                (scaled(src_w, ratio), h)
            }
            (None, None) => return None,
        }
    } else {
        (spec.width.unwrap_or(src_w), spec.height.unwrap_or(src_h))
    };

    let dims = (dims.0.max(1), dims.1.max(1));
    if dims == source { None } else { Some(dims) }
}

fn scaled(edge: u32, ratio: f64) -> u32 {
    (edge as f64 * ratio).round() as u32
}

/// Megapixel count for display.
pub fn megapixels(width: u32, height: u32) -> f64 {
    (width as f64 * height as f64) / 1_000_000.0
}
