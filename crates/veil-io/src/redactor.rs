//! File-level redaction: backup, decode, blur, and write back in place.

use std::fs;
use std::path::{Path, PathBuf};

use veil_pipeline::{Detection, Dimensions, RedactionConfig, RedactionOutcome, redact_bytes};

use crate::backup::{self, BackupStatus};
use crate::error::{VeilError, io_error};
use crate::lock::PathLocks;
use crate::write::replace_file;

/// Summary of one [`Redactor::redact`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionReport {
    /// The redacted image.
    pub path: PathBuf,
    /// The backup guarding `path`.
    pub backup: BackupStatus,
    /// Regions blurred and detections skipped.
    pub outcome: RedactionOutcome,
    /// Dimensions of the image.
    pub dimensions: Dimensions,
}

impl RedactionReport {
    /// Number of regions actually blurred. Zero means the file was not
    /// rewritten.
    #[must_use]
    pub const fn regions_redacted(&self) -> usize {
        self.outcome.regions_redacted()
    }
}

/// Applies redactions to image files, one operation per file at a time.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    config: RedactionConfig,
    locks: PathLocks,
}

impl Redactor {
    /// Create a redactor with its own lock table.
    #[must_use]
    pub fn new(config: RedactionConfig) -> Self {
        Self::with_locks(config, PathLocks::new())
    }

    /// Create a redactor sharing an existing lock table.
    #[must_use]
    pub const fn with_locks(config: RedactionConfig, locks: PathLocks) -> Self {
        Self { config, locks }
    }

    /// The redaction settings in use.
    #[must_use]
    pub const fn config(&self) -> &RedactionConfig {
        &self.config
    }

    /// Blur `detections` in the image at `path`, overwriting it.
    ///
    /// # Steps
    ///
    /// 1. Claim `path` against concurrent operations
    /// 2. Ensure a pristine backup exists (never refreshed)
    /// 3. Decode, blur every valid region, re-encode
    /// 4. If at least one region was blurred, replace the file
    ///
    /// With no valid region the file is left byte-for-byte untouched.
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::Busy`] if another operation holds `path`.
    /// Returns [`VeilError::Io`] if the backup, read, or write fails.
    /// Returns [`VeilError::Pipeline`] if the image cannot be decoded or
    /// encoded. In every error case the original file is unchanged.
    pub fn redact(
        &self,
        path: &Path,
        detections: &[Detection],
    ) -> Result<RedactionReport, VeilError> {
        let _lease = self.locks.acquire(path)?;

        let backup = backup::ensure_backup(path)?;
        let bytes = fs::read(path).map_err(io_error(path))?;
        let redaction = redact_bytes(&bytes, detections, &self.config)?;

        if let Some(encoded) = &redaction.encoded {
            replace_file(path, encoded)?;
        }

        tracing::info!(
            path = %path.display(),
            redacted = redaction.outcome.regions_redacted(),
            skipped = redaction.outcome.skipped,
            "redaction finished"
        );

        Ok(RedactionReport {
            path: path.to_path_buf(),
            backup,
            outcome: redaction.outcome,
            dimensions: redaction.dimensions,
        })
    }

    /// Restore an original from its backup and delete the backup.
    ///
    /// Returns the restored original's path.
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::InvalidBackupReference`] if `backup` is not
    /// named like a backup; nothing is touched in that case.
    /// Returns [`VeilError::Busy`] if the original is being redacted.
    /// Returns [`VeilError::Io`] if copying or deleting fails.
    pub fn restore_from_backup(&self, backup: &Path) -> Result<PathBuf, VeilError> {
        let original = backup::original_path_for(backup)?;
        let _lease = self.locks.acquire(&original)?;
        backup::restore(backup)
    }
}
