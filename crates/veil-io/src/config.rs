//! User configuration, read from a TOML file.
//!
//! ```toml
//! blur_intensity = 50
//! sensitive_types = ["faces", "email addresses"]
//!
//! [preview]
//! width = 3
//! color = [255, 0, 0, 255]
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use veil_pipeline::prompt::DEFAULT_SENSITIVE_TYPES;
use veil_pipeline::{OutlineStyle, RedactionConfig, build_detection_prompt};

use crate::error::{VeilError, io_error};

/// Name of the config file inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// veil settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Blur strength; see [`RedactionConfig::blur_intensity`].
    pub blur_intensity: u32,

    /// Categories of sensitive data to ask the model for.
    pub sensitive_types: Vec<String>,

    /// How previews outline detections.
    pub preview: OutlineStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blur_intensity: RedactionConfig::DEFAULT_BLUR_INTENSITY,
            sensitive_types: DEFAULT_SENSITIVE_TYPES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            preview: OutlineStyle::default(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// With an explicit `path` the file must exist. Without one, the
    /// platform default location is used if a file is there; otherwise
    /// defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Io`] if an explicit file cannot be read.
    /// Returns [`VeilError::Config`] if the file is not valid TOML for
    /// this schema.
    pub fn load(path: Option<&Path>) -> Result<Self, VeilError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Io`] or [`VeilError::Config`].
    pub fn from_file(path: &Path) -> Result<Self, VeilError> {
        let content = fs::read_to_string(path).map_err(io_error(path))?;
        let config = toml::from_str(&content).map_err(|e| VeilError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Platform config location, e.g. `~/.config/veil/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "veil")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Redaction settings derived from this config.
    #[must_use]
    pub const fn redaction(&self) -> RedactionConfig {
        RedactionConfig {
            blur_intensity: self.blur_intensity,
        }
    }

    /// Detection prompt built from [`sensitive_types`](Self::sensitive_types).
    #[must_use]
    pub fn detection_prompt(&self) -> String {
        build_detection_prompt(&self.sensitive_types)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.blur_intensity, 50);
        assert_eq!(config.redaction().blur_radius(), 25);
        assert!(!config.sensitive_types.is_empty());
        assert_eq!(config.preview, OutlineStyle::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str("blur_intensity = 10\n[preview]\nwidth = 1\n").unwrap();
        assert_eq!(config.blur_intensity, 10);
        assert_eq!(config.preview.width, 1);
        assert_eq!(config.preview.color, OutlineStyle::default().color);
        assert_eq!(config.sensitive_types, Config::default().sensitive_types);
    }

    #[test]
    fn serialization_round_trip() {
        let config = Config {
            blur_intensity: 80,
            sensitive_types: vec!["badges".to_owned()],
            ..Config::default()
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn prompt_uses_configured_types() {
        let config = Config {
            sensitive_types: vec!["badges".to_owned()],
            ..Config::default()
        };
        assert!(config.detection_prompt().contains("including: badges."));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veil.toml");
        fs::write(&path, "sensitive_types = [\"faces\"]\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sensitive_types, vec!["faces".to_owned()]);
        assert_eq!(config.blur_intensity, 50);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, VeilError::Io { .. }));
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "blur_intensity = \"very\"\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, VeilError::Config { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }
}
