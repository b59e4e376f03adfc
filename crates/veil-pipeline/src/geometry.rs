//! Mapping normalized detection boxes into pixel rectangles.
//!
//! Boxes come from an untrusted model, so every edge may be inverted,
//! negative, or beyond `1000`. The mapping is:
//!
//! ```text
//! x      = round(x_min / 1000 * width)
//! y      = round(y_min / 1000 * height)
//! width  = round((x_max - x_min) / 1000 * width)
//! height = round((y_max - y_min) / 1000 * height)
//! ```
//!
//! Boxes that do not overlap `[0, 1000]` on both axes are rejected
//! before any of this. The rest are clamped: the origin is pulled into
//! the image, the size shrinks to the remaining space, and anything left
//! with zero or negative area is rejected. The result is either a
//! rectangle that is safe to crop or nothing at all.

use crate::types::{Dimensions, NORMALIZED_SCALE, NormalizedBox, PixelRegion};

/// Map a normalized box onto an image of the given dimensions.
///
/// Returns `None` for degenerate boxes (zero or negative extent after
/// rounding), boxes lying wholly outside the normalized frame, boxes
/// that end up with no area inside the image, and zero-sized images.
#[must_use]
pub fn map_to_pixels(normalized: &NormalizedBox, dimensions: Dimensions) -> Option<PixelRegion> {
    let image_w = i64::from(dimensions.width);
    let image_h = i64::from(dimensions.height);
    if image_w == 0 || image_h == 0 {
        return None;
    }
    if normalized.x_max <= 0.0
        || normalized.x_min >= NORMALIZED_SCALE
        || normalized.y_max <= 0.0
        || normalized.y_min >= NORMALIZED_SCALE
    {
        return None;
    }

    let x = scale(normalized.x_min, dimensions.width).clamp(0, image_w - 1);
    let y = scale(normalized.y_min, dimensions.height).clamp(0, image_h - 1);
    let width = scale(normalized.x_max - normalized.x_min, dimensions.width).min(image_w - x);
    let height = scale(normalized.y_max - normalized.y_min, dimensions.height).min(image_h - y);

    if width <= 0 || height <= 0 {
        return None;
    }

    Some(PixelRegion {
        x: u32::try_from(x).ok()?,
        y: u32::try_from(y).ok()?,
        width: u32::try_from(width).ok()?,
        height: u32::try_from(height).ok()?,
    })
}

/// Scale a normalized coordinate to pixels and round to the nearest
/// integer.
///
/// Saturates at the `i64` range, which the clamps downstream then pull
/// back into the image.
#[allow(clippy::cast_possible_truncation)]
fn scale(normalized: f64, extent: u32) -> i64 {
    (normalized / NORMALIZED_SCALE * f64::from(extent)).round() as i64
}
