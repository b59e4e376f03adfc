//! The seam between veil and whatever vision model finds sensitive
//! regions.
//!
//! Callers hand a [`DetectionSource`] to [`detect_and_offer_redaction`]
//! explicitly; there is no global client. The model's answer is treated
//! as opaque text and run through the tolerant parser, so a rambling or
//! malformed answer means "nothing found" rather than an error.

use std::error::Error;
use std::fs;
use std::path::Path;

use veil_pipeline::{Detection, detections_from_response};

use crate::error::{VeilError, io_error};

/// Failure reported by a [`DetectionSource`].
#[derive(Debug, thiserror::Error)]
#[error("detection request failed: {message}")]
pub struct SourceError {
    message: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl SourceError {
    /// A failure described only by a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// A failure caused by another error.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Something that can be asked to find sensitive regions in an image.
pub trait DetectionSource {
    /// Send `prompt` together with the image at `image` and return the
    /// model's raw text answer.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if no answer could be obtained.
    fn request(&self, image: &Path, prompt: &str) -> Result<String, SourceError>;
}

impl<F> DetectionSource for F
where
    F: Fn(&Path, &str) -> Result<String, SourceError>,
{
    fn request(&self, image: &Path, prompt: &str) -> Result<String, SourceError> {
        self(image, prompt)
    }
}

/// A previously captured model answer, replayed for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResponse {
    text: String,
}

impl RecordedResponse {
    /// Replay `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Replay the contents of a file.
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Io`] if the file cannot be read as UTF-8 text.
    pub fn from_file(path: &Path) -> Result<Self, VeilError> {
        fs::read_to_string(path)
            .map(Self::new)
            .map_err(io_error(path))
    }

    /// The recorded text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl DetectionSource for RecordedResponse {
    fn request(&self, _image: &Path, _prompt: &str) -> Result<String, SourceError> {
        Ok(self.text.clone())
    }
}

/// Ask `source` for sensitive regions in `image` and return the
/// well-formed detections, possibly none.
///
/// # Errors
///
/// Returns [`VeilError::Source`] if the source itself fails. An
/// unparseable answer is not an error.
pub fn detect_and_offer_redaction(
    source: &dyn DetectionSource,
    image: &Path,
    prompt: &str,
) -> Result<Vec<Detection>, VeilError> {
    let text = source.request(image, prompt)?;
    let detections = detections_from_response(&text);

    if detections.is_empty() {
        tracing::info!(image = %image.display(), "no sensitive data found");
    } else {
        tracing::info!(
            image = %image.display(),
            detections = detections.len(),
            "sensitive regions detected"
        );
    }
    Ok(detections)
}
