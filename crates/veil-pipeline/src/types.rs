//! Shared types for the veil redaction pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can hold decoded image
/// buffers without depending on `image` directly.
pub use image::RgbaImage;

/// Scale of normalized detection coordinates: `1000` is the full
/// width or height of the image.
pub const NORMALIZED_SCALE: f64 = 1000.0;

/// A bounding box in normalized coordinates, as produced by the
/// detection model.
///
/// Serialized as the model emits it: a 4-element array in
/// `[y_min, x_min, y_max, x_max]` order. Values are nominally integers
/// in `[0, 1000]`, but nothing here enforces that: ordering and range
/// are only dealt with when mapping to pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct NormalizedBox {
    /// Top edge.
    pub y_min: f64,
    /// Left edge.
    pub x_min: f64,
    /// Bottom edge.
    pub y_max: f64,
    /// Right edge.
    pub x_max: f64,
}

impl NormalizedBox {
    /// Create a box from its four edges in model order.
    #[must_use]
    pub const fn new(y_min: f64, x_min: f64, y_max: f64, x_max: f64) -> Self {
        Self {
            y_min,
            x_min,
            y_max,
            x_max,
        }
    }
}

impl From<[f64; 4]> for NormalizedBox {
    fn from([y_min, x_min, y_max, x_max]: [f64; 4]) -> Self {
        Self::new(y_min, x_min, y_max, x_max)
    }
}

impl From<NormalizedBox> for [f64; 4] {
    fn from(b: NormalizedBox) -> Self {
        [b.y_min, b.x_min, b.y_max, b.x_max]
    }
}

/// A single region of sensitive content reported by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Producer-defined category such as `"email"` or `"face"`.
    #[serde(rename = "label", alias = "type")]
    pub kind: String,

    /// Region location in normalized coordinates.
    #[serde(rename = "box_2d")]
    pub normalized_box: NormalizedBox,

    /// The literal content the detector associated with the region,
    /// e.g. the email address it read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Detection {
    /// Create a detection without an associated value.
    #[must_use]
    pub fn new(kind: impl Into<String>, normalized_box: NormalizedBox) -> Self {
        Self {
            kind: kind.into(),
            normalized_box,
            value: None,
        }
    }

    /// Attach the detected content.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Human-readable label: `kind`, or `"kind: value"` when a
    /// non-empty value is present.
    #[must_use]
    pub fn display_label(&self) -> String {
        match self.value.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => format!("{}: {value}", self.kind),
            _ => self.kind.clone(),
        }
    }
}

/// A detection mapped into concrete image space.
///
/// Always non-empty and fully inside the image it was mapped against:
/// `x + width <= image width` and `y + height <= image height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRegion {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels (> 0).
    pub width: u32,
    /// Height in pixels (> 0).
    pub height: u32,
}

impl fmt::Display for PixelRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing image buffer.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Configuration for the redaction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// User-facing blur strength. Halved and clamped into
    /// [`Self::MIN_BLUR_RADIUS`]..=[`Self::MAX_BLUR_RADIUS`] to obtain
    /// the blur radius.
    pub blur_intensity: u32,
}

impl RedactionConfig {
    /// Default value for [`blur_intensity`](Self::blur_intensity).
    pub const DEFAULT_BLUR_INTENSITY: u32 = 50;
    /// Smallest blur radius ever applied.
    pub const MIN_BLUR_RADIUS: u32 = 1;
    /// Largest blur radius ever applied.
    pub const MAX_BLUR_RADIUS: u32 = 100;

    /// Blur radius derived from the configured intensity.
    #[must_use]
    pub fn blur_radius(&self) -> u32 {
        self.blur_intensity
            .div_ceil(2)
            .clamp(Self::MIN_BLUR_RADIUS, Self::MAX_BLUR_RADIUS)
    }
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            blur_intensity: Self::DEFAULT_BLUR_INTENSITY,
        }
    }
}

/// Errors that can occur while decoding, redacting, or re-encoding
/// an image in memory.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Failed to encode the redacted image.
    #[error("failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),
}
