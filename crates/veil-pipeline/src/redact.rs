//! In-memory redaction: blur every mappable detection in place.
//!
//! Regions are processed in input order against one shared buffer.
//! Each region is cropped, blurred on its own, and pasted back over the
//! same rectangle, so overlapping regions blur whatever is already
//! there, including pixels an earlier region blurred.

use image::imageops;
use serde::{Deserialize, Serialize};

use crate::blur;
use crate::geometry::map_to_pixels;
use crate::types::{Detection, Dimensions, PixelRegion, RedactionConfig, RgbaImage};

/// What a redaction pass did to the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionOutcome {
    /// Regions that were blurred, in the order they were applied.
    pub regions: Vec<PixelRegion>,
    /// Detections that produced no valid region and were left alone.
    pub skipped: usize,
}

impl RedactionOutcome {
    /// Number of regions actually blurred.
    #[must_use]
    pub const fn regions_redacted(&self) -> usize {
        self.regions.len()
    }
}

/// Blur every detection that maps to a valid region of `image`.
///
/// Detections whose boxes are degenerate or fall outside the image are
/// counted in [`RedactionOutcome::skipped`] and otherwise ignored.
pub fn redact_image(
    image: &mut RgbaImage,
    detections: &[Detection],
    config: &RedactionConfig,
) -> RedactionOutcome {
    let dimensions = Dimensions::of(image);
    let sigma = blur::sigma_for_radius(config.blur_radius());
    let mut outcome = RedactionOutcome::default();

    for detection in detections {
        let Some(region) = map_to_pixels(&detection.normalized_box, dimensions) else {
            tracing::debug!(
                kind = %detection.kind,
                bbox = ?detection.normalized_box,
                "skipping detection with no valid region"
            );
            outcome.skipped += 1;
            continue;
        };

        blur_region(image, region, sigma);
        outcome.regions.push(region);
    }

    outcome
}

/// Blur one rectangle of `image` in place.
///
/// `region` must lie inside `image`, as every region produced by
/// [`map_to_pixels`] does.
pub fn blur_region(image: &mut RgbaImage, region: PixelRegion, sigma: f32) {
    let patch = imageops::crop_imm(&*image, region.x, region.y, region.width, region.height).to_image();
    let blurred = blur::gaussian_blur_rgba(&patch, sigma);
    imageops::replace(image, &blurred, i64::from(region.x), i64::from(region.y));
}
