//! veil-pipeline: Pure detection parsing and region redaction (sans-IO).
//!
//! Turns a vision model's free-form answer into validated detections,
//! maps their normalized boxes onto real pixel rectangles, and blurs
//! those rectangles:
//!
//! response text -> parse -> validate -> map to pixels -> blur -> encode
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and image buffers. Backups, file writes, and locking
//! live in `veil-io`.

pub mod annotate;
pub mod blur;
pub mod codec;
pub mod geometry;
pub mod parse;
pub mod prompt;
pub mod redact;
pub mod types;
pub mod validate;

pub use annotate::{OutlineStyle, annotate};
pub use geometry::map_to_pixels;
pub use parse::{ParsedResponse, parse_response};
pub use prompt::build_detection_prompt;
pub use redact::{RedactionOutcome, redact_image};
pub use types::{
    Detection, Dimensions, NormalizedBox, PipelineError, PixelRegion, RedactionConfig, RgbaImage,
};
pub use validate::validate_records;

/// Parse and validate a model response in one step.
///
/// Malformed responses and malformed records both degrade to fewer
/// (possibly zero) detections; this never fails.
#[must_use]
pub fn detections_from_response(text: &str) -> Vec<Detection> {
    let parsed = parse_response(text);
    validate_records(&parsed.into_records())
}

/// Result of redacting an encoded image in memory.
#[derive(Debug, Clone)]
pub struct Redaction {
    /// Regions blurred and detections skipped.
    pub outcome: RedactionOutcome,
    /// Dimensions of the decoded image.
    pub dimensions: Dimensions,
    /// The re-encoded image, in the source format. `None` when no
    /// region was blurred, in which case the source should be left
    /// exactly as it is.
    pub encoded: Option<Vec<u8>>,
}

/// Blur `detections` in an encoded image.
///
/// # Steps
///
/// 1. Decode once and record the true dimensions
/// 2. Map each detection to a pixel region, skipping invalid ones
/// 3. Blur each region in order on a shared RGBA8 working copy
/// 4. Copy the blurred regions back in the source colour type
/// 5. Re-encode in the source format, only if anything was blurred
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image cannot be decoded.
/// Returns [`PipelineError::ImageEncode`] if the result cannot be encoded.
pub fn redact_bytes(
    image_bytes: &[u8],
    detections: &[Detection],
    config: &RedactionConfig,
) -> Result<Redaction, PipelineError> {
    let mut decoded = codec::decode(image_bytes)?;
    let dimensions = decoded.dimensions();

    let mut working = decoded.to_rgba8();
    let outcome = redact_image(&mut working, detections, config);

    let encoded = if outcome.regions_redacted() == 0 {
        None
    } else {
        decoded.apply_regions(&working, &outcome.regions);
        Some(codec::encode(&decoded.image, decoded.format)?)
    };

    Ok(Redaction {
        outcome,
        dimensions,
        encoded,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode a vertical black/white stripe pattern as PNG.
    fn striped_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, _y| {
            if x % 2 == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn detections_from_fenced_response() {
        let text = "Found one:\n```json\n[{\"label\": \"email\", \"box_2d\": [0, 0, 100, 100]}, {\"label\": \"bad\"}]\n```";
        let detections = detections_from_response(text);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].kind, "email");
    }

    #[test]
    fn detections_from_garbage_is_empty() {
        assert!(detections_from_response("sorry, I can't help with that").is_empty());
    }

    #[test]
    fn redact_bytes_empty_input() {
        let result = redact_bytes(&[], &[], &RedactionConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn redact_bytes_corrupt_input() {
        let result = redact_bytes(&[0xFF, 0x00], &[], &RedactionConfig::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn redact_bytes_without_valid_regions_encodes_nothing() {
        let png = striped_png(20, 10);
        let detections = [Detection::new("x", NormalizedBox::new(500.0, 500.0, 500.0, 500.0))];
        let result = redact_bytes(&png, &detections, &RedactionConfig::default()).unwrap();
        assert!(result.encoded.is_none());
        assert_eq!(result.outcome.regions_redacted(), 0);
        assert_eq!(result.outcome.skipped, 1);
        assert_eq!(
            result.dimensions,
            Dimensions {
                width: 20,
                height: 10
            }
        );
    }

    #[test]
    fn redact_bytes_blurs_only_the_region() {
        let png = striped_png(20, 10);
        let detections = [Detection::new("x", NormalizedBox::new(0.0, 0.0, 1000.0, 500.0))];
        let result = redact_bytes(&png, &detections, &RedactionConfig::default()).unwrap();
        assert_eq!(
            result.outcome.regions,
            vec![PixelRegion {
                x: 0,
                y: 0,
                width: 10,
                height: 10
            }]
        );

        let before = codec::decode(&png).unwrap().to_rgba8();
        let decoded = codec::decode(&result.encoded.unwrap()).unwrap();
        assert_eq!(decoded.format, image::ImageFormat::Png);
        let after = decoded.to_rgba8();
        assert_ne!(after.get_pixel(4, 5), before.get_pixel(4, 5));
        assert_eq!(after.get_pixel(4, 5).0[3], 255, "opaque input must stay opaque");
        for y in 0..10 {
            for x in 10..20 {
                assert_eq!(after.get_pixel(x, y), before.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn redact_bytes_keeps_sixteen_bit_depth_outside_regions() {
        let src = image::ImageBuffer::from_fn(20, 10, |x, y| {
            let x = u16::try_from(x).unwrap();
            let y = u16::try_from(y).unwrap();
            image::Rgb([1105 + x, 305 + y * 3, 65_001 - x * 2])
        });
        let png = codec::encode(
            &image::DynamicImage::ImageRgb16(src.clone()),
            image::ImageFormat::Png,
        )
        .unwrap();

        // Left tenth of the image.
        let detections = [Detection::new("x", NormalizedBox::new(0.0, 0.0, 1000.0, 100.0))];
        let result = redact_bytes(&png, &detections, &RedactionConfig::default()).unwrap();
        assert_eq!(result.outcome.regions_redacted(), 1);

        let decoded = codec::decode(&result.encoded.unwrap()).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb16);
        let after = decoded.image.as_rgb16().unwrap();
        for (x, y, pixel) in after.enumerate_pixels() {
            if x >= 2 {
                assert_eq!(pixel, src.get_pixel(x, y), "pixel ({x},{y}) changed");
            }
        }
    }
}
