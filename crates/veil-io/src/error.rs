//! Error type for filesystem-level veil operations.

use std::io;
use std::path::{Path, PathBuf};

use veil_pipeline::PipelineError;

use crate::source::SourceError;

/// Errors surfaced by redaction, restore, detection, and config loading.
///
/// Malformed model output and malformed detections never show up here:
/// they degrade to fewer detections instead.
#[derive(Debug, thiserror::Error)]
pub enum VeilError {
    /// Reading, writing, copying, or deleting a file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// The file being operated on.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The image could not be decoded or re-encoded.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A restore was requested for a path that is not named like a backup.
    #[error(
        "not a backup file: {} (expected a name ending in `_backup` before the extension)",
        .0.display()
    )]
    InvalidBackupReference(PathBuf),

    /// Another destructive operation on the same file is in flight.
    #[error("another operation is already in progress on {}", .0.display())]
    Busy(PathBuf),

    /// The detection source failed to produce a response.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A configuration file could not be parsed.
    #[error("invalid configuration in {}: {message}", .path.display())]
    Config {
        /// The configuration file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

/// Adapter for `map_err` that tags an [`io::Error`] with its path.
pub(crate) fn io_error(path: &Path) -> impl FnOnce(io::Error) -> VeilError + '_ {
    move |source| VeilError::Io {
        path: path.to_path_buf(),
        source,
    }
}
