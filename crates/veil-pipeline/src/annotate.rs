//! Preview rendering: outline what would be redacted.
//!
//! Lets a user check the detector's regions before committing to a
//! destructive blur. The source buffer is never modified.

use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::geometry::map_to_pixels;
use crate::types::{Detection, Dimensions, PixelRegion, RgbaImage};

/// How detection outlines are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineStyle {
    /// Outline thickness in pixels, drawn inward from the region edge.
    pub width: u32,
    /// Outline colour as RGBA.
    pub color: [u8; 4],
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            width: 3,
            color: [255, 0, 0, 255],
        }
    }
}

/// Return a copy of `image` with every mappable detection outlined.
#[must_use = "returns the annotated copy"]
pub fn annotate(image: &RgbaImage, detections: &[Detection], style: OutlineStyle) -> RgbaImage {
    let mut out = image.clone();
    let dimensions = Dimensions::of(image);
    for region in detections
        .iter()
        .filter_map(|d| map_to_pixels(&d.normalized_box, dimensions))
    {
        outline_region(&mut out, region, style);
    }
    out
}

fn outline_region(image: &mut RgbaImage, region: PixelRegion, style: OutlineStyle) {
    let color = image::Rgba(style.color);
    for inset in 0..style.width.max(1) {
        let (Some(width), Some(height)) = (
            region.width.checked_sub(2 * inset).filter(|w| *w > 0),
            region.height.checked_sub(2 * inset).filter(|h| *h > 0),
        ) else {
            break;
        };
        let (Ok(x), Ok(y)) = (
            i32::try_from(region.x + inset),
            i32::try_from(region.y + inset),
        ) else {
            break;
        };
        draw_hollow_rect_mut(image, Rect::at(x, y).of_size(width, height), color);
    }
}
