//! Image decoding and re-encoding.
//!
//! Redacted images are written back over their source file, so the
//! encoder must reproduce the source container format and colour type.
//! The format is sniffed from the magic bytes rather than trusted from
//! a file name.
//!
//! Blurring happens on an RGBA8 working copy. Only the redacted
//! rectangles are copied back into the decoded image, converted to its
//! own colour type, so pixels outside them keep their exact values even
//! in 16-bit or greyscale sources.

use std::io::Cursor;

use image::{ColorType, DynamicImage, ImageFormat, imageops};

use crate::types::{Dimensions, PipelineError, PixelRegion, RgbaImage};

/// A decoded image in its source colour type, plus its container format.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Pixels as decoded, without any colour or depth conversion.
    pub image: DynamicImage,
    /// Container format of the source bytes.
    pub format: ImageFormat,
}

impl DecodedImage {
    /// Dimensions of the decoded buffer.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// Colour type of the source.
    #[must_use]
    pub fn color(&self) -> ColorType {
        self.image.color()
    }

    /// RGBA8 working copy for blurring and annotation.
    #[must_use]
    pub fn to_rgba8(&self) -> RgbaImage {
        self.image.to_rgba8()
    }

    /// Copy `regions` of `edited` back into the decoded image.
    ///
    /// `edited` must have the same dimensions as the decoded image, and
    /// every region must lie inside it. Pixels outside the regions are
    /// left exactly as decoded.
    pub fn apply_regions(&mut self, edited: &RgbaImage, regions: &[PixelRegion]) {
        for region in regions {
            let patch = DynamicImage::ImageRgba8(
                imageops::crop_imm(edited, region.x, region.y, region.width, region.height)
                    .to_image(),
            );
            paste_converted(&mut self.image, &patch, *region);
        }
    }
}

/// Paste `patch` into `target` at `region`, converting it to the
/// target's colour type.
fn paste_converted(target: &mut DynamicImage, patch: &DynamicImage, region: PixelRegion) {
    let (x, y) = (i64::from(region.x), i64::from(region.y));
    match target {
        DynamicImage::ImageLuma8(img) => imageops::replace(img, &patch.to_luma8(), x, y),
        DynamicImage::ImageLumaA8(img) => imageops::replace(img, &patch.to_luma_alpha8(), x, y),
        DynamicImage::ImageRgb8(img) => imageops::replace(img, &patch.to_rgb8(), x, y),
        DynamicImage::ImageRgba8(img) => imageops::replace(img, &patch.to_rgba8(), x, y),
        DynamicImage::ImageLuma16(img) => imageops::replace(img, &patch.to_luma16(), x, y),
        DynamicImage::ImageLumaA16(img) => imageops::replace(img, &patch.to_luma_alpha16(), x, y),
        DynamicImage::ImageRgb16(img) => imageops::replace(img, &patch.to_rgb16(), x, y),
        DynamicImage::ImageRgba16(img) => imageops::replace(img, &patch.to_rgba16(), x, y),
        DynamicImage::ImageRgb32F(img) => imageops::replace(img, &patch.to_rgb32f(), x, y),
        DynamicImage::ImageRgba32F(img) => imageops::replace(img, &patch.to_rgba32f(), x, y),
        other => {
            let mut rgba = other.to_rgba8();
            imageops::replace(&mut rgba, &patch.to_rgba8(), x, y);
            *other = DynamicImage::ImageRgba8(rgba);
        }
    }
}

/// Decode raw image bytes (PNG, JPEG, BMP, WebP).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the format is unrecognized
/// or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let format = image::guess_format(bytes)?;
    let image = image::load_from_memory_with_format(bytes, format)?;
    Ok(DecodedImage { image, format })
}

/// Encode `image` in `format`, keeping its colour type.
///
/// # Errors
///
/// Returns [`PipelineError::ImageEncode`] if the encoder rejects the
/// buffer.
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, PipelineError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, format)
        .map_err(PipelineError::ImageEncode)?;
    Ok(out.into_inner())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        encode(image, ImageFormat::Png).unwrap()
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(decode(&[]), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_are_a_decode_error() {
        assert!(matches!(
            decode(&[0xFF, 0xFE, 0x00, 0x01]),
            Err(PipelineError::ImageDecode(_))
        ));
    }

    #[test]
    fn png_with_alpha_keeps_format_and_colour_type() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 4])));
        let decoded = decode(&png_bytes(&src)).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!(decoded.color(), ColorType::Rgba8);
        assert_eq!(decoded.dimensions(), Dimensions { width: 3, height: 2 });
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0, [1, 2, 3, 4]);
    }

    #[test]
    fn rgb_png_working_copy_is_opaque() {
        let src = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(2, 2, image::Rgb([9, 9, 9])));
        let decoded = decode(&png_bytes(&src)).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgb8);
        assert_eq!(decoded.to_rgba8().get_pixel(1, 1).0, [9, 9, 9, 255]);
    }

    #[test]
    fn jpeg_round_trips_as_jpeg() {
        let src = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(8, 8, image::Rgb([200, 100, 50])));
        let bytes = encode(&src, ImageFormat::Jpeg).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.format, ImageFormat::Jpeg);
        assert_eq!(decoded.dimensions(), Dimensions { width: 8, height: 8 });
    }

    #[test]
    fn sixteen_bit_pixels_outside_regions_are_exact() {
        let src = image::ImageBuffer::from_fn(20, 10, |x, y| {
            let x = u16::try_from(x).unwrap();
            let y = u16::try_from(y).unwrap();
            image::Rgb([1000 + x * 7 + y, 300 + y * 11, 65_001 - x])
        });
        let mut decoded = decode(&png_bytes(&DynamicImage::ImageRgb16(src.clone()))).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgb16);

        let mut edited = decoded.to_rgba8();
        for pixel in edited.pixels_mut() {
            *pixel = image::Rgba([0, 0, 0, 255]);
        }
        let region = PixelRegion {
            x: 0,
            y: 0,
            width: 2,
            height: 10,
        };
        decoded.apply_regions(&edited, &[region]);

        let reread = decode(&encode(&decoded.image, decoded.format).unwrap()).unwrap();
        assert_eq!(reread.color(), ColorType::Rgb16);
        let out = reread.image.as_rgb16().unwrap();
        assert_eq!(out.get_pixel(15, 5), src.get_pixel(15, 5));
        assert_eq!(out.get_pixel(2, 0), src.get_pixel(2, 0));
        assert_eq!(out.get_pixel(1, 9).0, [0, 0, 0]);
    }

    #[test]
    fn greyscale_stays_greyscale() {
        let src = DynamicImage::ImageLuma8(image::GrayImage::from_fn(6, 6, |x, _| {
            image::Luma([u8::try_from(x * 40).unwrap()])
        }));
        let mut decoded = decode(&png_bytes(&src)).unwrap();
        let edited = decoded.to_rgba8();
        decoded.apply_regions(
            &edited,
            &[PixelRegion {
                x: 1,
                y: 1,
                width: 2,
                height: 2,
            }],
        );
        assert_eq!(decoded.color(), ColorType::L8);
        let out = decoded.image.as_luma8().unwrap();
        let before = src.as_luma8().unwrap();
        for (x, y, pixel) in out.enumerate_pixels() {
            if !((1..3).contains(&x) && (1..3).contains(&y)) {
                assert_eq!(pixel, before.get_pixel(x, y), "pixel ({x},{y}) changed");
            }
        }
    }
}
