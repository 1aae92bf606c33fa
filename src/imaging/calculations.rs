//! Pure calculation functions for image dimensions and encode search.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{Quality, ResizeMode};

/// `side * factor`, rounded and at least 1. Products that do not fit a `u32`
/// (or are not finite) come back as `u32::MAX` so the output size check
/// rejects them.
fn scaled(side: u32, factor: f64) -> u32 {
    let value = (side as f64 * factor).round();
    if value.is_finite() && value < u32::MAX as f64 {
        (value as u32).max(1)
    } else {
        u32::MAX
    }
}

/// Calculate dimensions that fit entirely inside a target box (letterbox / contain).
///
/// One dimension matches the target exactly, the other is equal or smaller.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target box dimensions (width, height)
///
/// # Examples
/// ```
/// # use scale_hub::imaging::calculate_fit_dimensions;
/// // 800x600 into a 1080 square → width-limited
/// assert_eq!(calculate_fit_dimensions((800, 600), (1080, 1080)), (1080, 810));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: width matches, height shrinks
        (tgt_w, scaled(tgt_w, src_h as f64 / src_w as f64))
    } else {
        // Source is taller: height matches, width shrinks
        (scaled(tgt_h, src_aspect), tgt_h)
    }
}

/// Calculate dimensions needed to fill a target area (cover).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        (scaled(tgt_h, src_aspect).max(tgt_w), tgt_h)
    } else {
        // Source is taller: width will match, height will exceed
        (tgt_w, scaled(tgt_w, src_h as f64 / src_w as f64).max(tgt_h))
    }
}

/// Source crop and scaled size of a letterbox background layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverLayer {
    /// Centered crop of the source: (x, y, width, height).
    pub crop: (u32, u32, u32, u32),
    /// Size the crop is scaled to. Covers the target on both axes.
    pub size: (u32, u32),
}

/// Plan the cover-scaled background layer for a target canvas.
///
/// The full cover layer can be far larger than the canvas on one axis (a
/// 4000x1 strip covering a square). Only the part within `margin` pixels of
/// the canvas edge can influence the visible result once blurred, so the
/// source is cropped to that band before scaling.
pub fn calculate_cover_layer(source: (u32, u32), target: (u32, u32), margin: u32) -> CoverLayer {
    let (src_w, src_h) = source;
    let (fill_w, fill_h) = calculate_fill_dimensions(source, target);

    let layer_w = fill_w.min(target.0.saturating_add(margin.saturating_mul(2)));
    let layer_h = fill_h.min(target.1.saturating_add(margin.saturating_mul(2)));

    let crop_w = ((layer_w as f64 * src_w as f64 / fill_w as f64).round() as u32).clamp(1, src_w);
    let crop_h = ((layer_h as f64 * src_h as f64 / fill_h as f64).round() as u32).clamp(1, src_h);

    CoverLayer {
        crop: ((src_w - crop_w) / 2, (src_h - crop_h) / 2, crop_w, crop_h),
        size: (layer_w, layer_h),
    }
}

/// Offset that centers a layer of size `inner` on a canvas of size `outer`.
///
/// Negative when the layer overflows; the overflow is cropped evenly.
pub fn center_offset(outer: (u32, u32), inner: (u32, u32)) -> (i64, i64) {
    (
        (outer.0 as i64 - inner.0 as i64) / 2,
        (outer.1 as i64 - inner.1 as i64) / 2,
    )
}

/// Calculate the output dimensions of a resize.
///
/// `mode` must already have passed [`ResizeMode::check`]. Computed sides are
/// never smaller than one pixel. Bounding boxes never upscale.
pub fn calculate_resize_dimensions(source: (u32, u32), mode: &ResizeMode) -> (u32, u32) {
    let (src_w, src_h) = source;
    match *mode {
        ResizeMode::Percentage(p) => (scaled(src_w, p / 100.0), scaled(src_h, p / 100.0)),
        ResizeMode::Exact { width, height } => (width, height),
        ResizeMode::ExactWidth(w) => (w, scaled(src_h, w as f64 / src_w as f64)),
        ResizeMode::ExactHeight(h) => (scaled(src_w, h as f64 / src_h as f64), h),
        ResizeMode::BoundingBox {
            max_width,
            max_height,
        } => {
            let scale_w = max_width.map(|w| w as f64 / src_w as f64);
            let scale_h = max_height.map(|h| h as f64 / src_h as f64);
            let scale = match (scale_w, scale_h) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => 1.0,
            };
            if scale >= 1.0 {
                (src_w, src_h)
            } else {
                (scaled(src_w, scale), scaled(src_h, scale))
            }
        }
    }
}

/// Binary-search the highest quality whose encoding fits in `target` bytes.
///
/// `encode` is called once per probe (at most seven times over 1–100). When
/// even quality 1 is too large, the quality-1 encoding is returned anyway; the
/// caller tells the two cases apart by comparing the size with the target.
pub fn search_quality<E>(
    target: usize,
    mut encode: impl FnMut(Quality) -> Result<Vec<u8>, E>,
) -> Result<(Vec<u8>, Quality), E> {
    let (mut lo, mut hi) = (Quality::MIN.value(), Quality::MAX.value());
    let mut best: Option<(Vec<u8>, Quality)> = None;
    let mut floor: Option<Vec<u8>> = None;

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let quality = Quality(mid);
        let data = encode(quality)?;
        log::trace!("quality search {quality}: {} bytes (target {target})", data.len());

        if data.len() <= target {
            best = Some((data, quality));
            lo = mid + 1;
        } else {
            if mid == Quality::MIN.value() {
                floor = Some(data);
                break;
            }
            hi = mid - 1;
        }
    }

    match (best, floor) {
        (Some(found), _) => Ok(found),
        (None, Some(data)) => Ok((data, Quality::MIN)),
        (None, None) => Ok((encode(Quality::MIN)?, Quality::MIN)),
    }
}
