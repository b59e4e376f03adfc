//! Gaussian blur used to obscure redacted regions.
//!
//! `imageproc::filter::gaussian_blur_f32` is applied to each of the
//! R/G/B channels separately and the channels are reassembled. Alpha is
//! copied from the source unchanged.

use image::GrayImage;

use crate::types::RgbaImage;

/// Gaussian sigma used for a given redaction blur radius.
///
/// The radius is already clamped to `1..=100` by
/// [`RedactionConfig::blur_radius`](crate::RedactionConfig::blur_radius),
/// so this is always positive.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sigma_for_radius(radius: u32) -> f32 {
    radius as f32
}

/// Blur the colour channels of an RGBA image, keeping its alpha.
///
/// Non-positive `sigma` returns the image unchanged, since `imageproc`
/// panics on `sigma <= 0.0`.
#[must_use = "returns the blurred RGBA image"]
pub fn gaussian_blur_rgba(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    let (w, h) = image.dimensions();
    let blurred: [GrayImage; 3] = std::array::from_fn(|c| {
        let channel = GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]));
        imageproc::filter::gaussian_blur_f32(&channel, sigma)
    });

    RgbaImage::from_fn(w, h, |x, y| {
        let [r, g, b] = std::array::from_fn(|c| blurred[c].get_pixel(x, y).0[0]);
        image::Rgba([r, g, b, image.get_pixel(x, y).0[3]])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Alternating black/white columns: maximal high-frequency detail.
    fn stripes(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, _| {
            if x % 2 == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn sigma_tracks_radius() {
        assert!((sigma_for_radius(1) - 1.0).abs() < f32::EPSILON);
        assert!((sigma_for_radius(25) - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn non_positive_sigma_is_identity() {
        let img = stripes(6, 4);
        assert_eq!(gaussian_blur_rgba(&img, 0.0), img);
        assert_eq!(gaussian_blur_rgba(&img, -3.0), img);
    }

    #[test]
    fn dimensions_preserved() {
        let blurred = gaussian_blur_rgba(&stripes(17, 9), 2.0);
        assert_eq!(blurred.dimensions(), (17, 9));
    }

    #[test]
    fn stripes_are_flattened_towards_grey() {
        let blurred = gaussian_blur_rgba(&stripes(20, 20), 3.0);
        let centre = blurred.get_pixel(10, 10).0;
        for c in 0..3 {
            assert!(
                (64..=192).contains(&centre[c]),
                "channel {c} should be mid-grey after blur, got {}",
                centre[c],
            );
        }
        assert_eq!(centre[3], 255, "opaque alpha must stay opaque");
    }

    #[test]
    fn alpha_is_copied_not_blurred() {
        let img = RgbaImage::from_fn(12, 12, |x, _| {
            let alpha = if x < 6 { 255 } else { 40 };
            image::Rgba([200, 10, 10, alpha])
        });
        let blurred = gaussian_blur_rgba(&img, 5.0);
        for (x, y, pixel) in blurred.enumerate_pixels() {
            assert_eq!(pixel.0[3], img.get_pixel(x, y).0[3], "alpha changed at ({x},{y})");
        }
    }

    #[test]
    fn uniform_colour_survives_blur() {
        let img = RgbaImage::from_pixel(8, 8, image::Rgba([10, 120, 230, 255]));
        let blurred = gaussian_blur_rgba(&img, 4.0);
        for pixel in blurred.pixels() {
            for (c, expected) in [10u8, 120, 230, 255].into_iter().enumerate() {
                let diff = i16::from(pixel.0[c]) - i16::from(expected);
                assert!(diff.abs() <= 1, "channel {c}: expected ~{expected}, got {}", pixel.0[c]);
            }
        }
    }

    #[test]
    fn sigma_larger_than_image_is_fine() {
        let blurred = gaussian_blur_rgba(&stripes(2, 1), 50.0);
        assert_eq!(blurred.dimensions(), (2, 1));
    }
}
