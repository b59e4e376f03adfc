//! Backup guardian: keep one pristine copy of every image before its
//! first redaction, and put it back on request.
//!
//! The backup of `dir/name.ext` is `dir/name_backup.ext`. It is taken
//! lazily the first time a file is redacted and is never refreshed by
//! later redactions, so it always holds the pre-redaction bytes rather
//! than an already-blurred intermediate. Restoring copies it back over
//! the original and deletes it.
//!
//! Backups are recognized by name alone. An original that happens to
//! be called `report_backup.png` gets the backup
//! `report_backup_backup.png`, which restores correctly, but passing
//! `report_backup.png` itself to [`restore`] treats it as the backup of
//! `report.png`.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{VeilError, io_error};
use crate::write::replace_file;

/// Marker inserted between the file stem and the extension.
pub const BACKUP_SUFFIX: &str = "_backup";

/// What [`ensure_backup`] found or did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupStatus {
    /// A new backup was written from the current file.
    Created(PathBuf),
    /// A backup already existed and was left untouched.
    Existing(PathBuf),
}

impl BackupStatus {
    /// Location of the backup.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(path) | Self::Existing(path) => path,
        }
    }

    /// Returns `true` if this call created the backup.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Backup location for `original`.
#[must_use]
pub fn backup_path_for(original: &Path) -> PathBuf {
    let mut name = original.file_stem().unwrap_or_default().to_os_string();
    name.push(BACKUP_SUFFIX);
    push_extension(&mut name, original.extension());
    original.with_file_name(name)
}

/// Original location that `backup` was taken from.
///
/// # Errors
///
/// Returns [`VeilError::InvalidBackupReference`] if the file stem does
/// not end in [`BACKUP_SUFFIX`], is nothing but the suffix, or is not
/// valid UTF-8.
pub fn original_path_for(backup: &Path) -> Result<PathBuf, VeilError> {
    let invalid = || VeilError::InvalidBackupReference(backup.to_path_buf());

    let stem = backup
        .file_stem()
        .and_then(OsStr::to_str)
        .ok_or_else(invalid)?;
    let original_stem = stem
        .strip_suffix(BACKUP_SUFFIX)
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid)?;

    let mut name = OsString::from(original_stem);
    push_extension(&mut name, backup.extension());
    Ok(backup.with_file_name(name))
}

fn push_extension(name: &mut OsString, extension: Option<&OsStr>) {
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
}

/// Make sure a backup of `original` exists, creating it from the
/// current file contents if it does not.
///
/// An existing backup is never overwritten.
///
/// # Errors
///
/// Returns [`VeilError::Io`] if `original` cannot be read or the backup
/// cannot be written. A partially written backup is removed.
pub fn ensure_backup(original: &Path) -> Result<BackupStatus, VeilError> {
    let backup = backup_path_for(original);
    if backup.try_exists().map_err(io_error(&backup))? {
        tracing::debug!(backup = %backup.display(), "backup already present");
        return Ok(BackupStatus::Existing(backup));
    }

    let bytes = fs::read(original).map_err(io_error(original))?;

    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&backup)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(BackupStatus::Existing(backup));
        }
        Err(e) => return Err(io_error(&backup)(e)),
    };

    let written = file.write_all(&bytes).and_then(|()| file.sync_all());
    drop(file);
    if let Err(e) = written {
        let _ = fs::remove_file(&backup);
        return Err(io_error(&backup)(e));
    }

    tracing::info!(
        original = %original.display(),
        backup = %backup.display(),
        bytes = bytes.len(),
        "created backup"
    );
    Ok(BackupStatus::Created(backup))
}

/// Copy `backup` back over its original and delete it.
///
/// Returns the path of the restored original.
///
/// # Errors
///
/// Returns [`VeilError::InvalidBackupReference`] without touching the
/// filesystem if `backup` is not named like a backup.
/// Returns [`VeilError::Io`] if the backup cannot be read, the original
/// cannot be written, or the backup cannot be removed.
pub fn restore(backup: &Path) -> Result<PathBuf, VeilError> {
    let original = original_path_for(backup)?;

    let bytes = fs::read(backup).map_err(io_error(backup))?;
    replace_file(&original, &bytes)?;
    fs::remove_file(backup).map_err(io_error(backup))?;

    tracing::info!(
        original = %original.display(),
        backup = %backup.display(),
        "restored original from backup"
    );
    Ok(original)
}
