//! Construction of the detection request sent to the vision model.

/// Sensitive-data categories asked for when none are configured.
pub const DEFAULT_SENSITIVE_TYPES: &[&str] = &[
    "faces",
    "email addresses",
    "phone numbers",
    "license plates",
    "credit card numbers",
    "street addresses",
    "personal names",
    "ID documents",
];

/// Build the instruction text for a sensitive-region detection request.
///
/// Blank entries in `sensitive_types` are ignored; if nothing remains,
/// [`DEFAULT_SENSITIVE_TYPES`] is used instead.
#[must_use]
pub fn build_detection_prompt<S: AsRef<str>>(sensitive_types: &[S]) -> String {
    let mut types: Vec<&str> = sensitive_types
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect();
    if types.is_empty() {
        types = DEFAULT_SENSITIVE_TYPES.to_vec();
    }

    format!(
        "Detect all sensitive information visible in this image, including: {}.\n\
         Return ONLY a JSON array with no surrounding text. Each element must be an object with:\n\
         - \"box_2d\": [ymin, xmin, ymax, xmax] with each coordinate an integer normalized to 0-1000\n\
         - \"label\": a short category such as \"email\", \"face\" or \"license_plate\"\n\
         - \"value\": the detected text, if any\n\
         If nothing sensitive is visible, return [].",
        types.join(", ")
    )
}
