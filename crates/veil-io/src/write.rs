//! Whole-file replacement that never leaves a half-written target.
//!
//! Bytes go to a hidden sibling file first, which is then renamed over
//! the destination. A failure at any point leaves the destination as
//! it was and removes the temporary file.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{VeilError, io_error};

/// Replace the contents of `path` with `bytes`.
///
/// Permissions of an existing `path` are carried over to the new file.
///
/// # Errors
///
/// Returns [`VeilError::Io`] if the temporary file cannot be written or
/// renamed into place.
pub fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), VeilError> {
    let tmp = temp_path_for(path);
    let result = write_then_rename(path, &tmp, bytes);
    if result.is_err() {
        // Best effort: the original error is what matters.
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_then_rename(path: &Path, tmp: &Path, bytes: &[u8]) -> Result<(), VeilError> {
    let mut file = fs::File::create(tmp).map_err(io_error(tmp))?;
    file.write_all(bytes).map_err(io_error(tmp))?;
    file.sync_all().map_err(io_error(tmp))?;
    drop(file);

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp, metadata.permissions()).map_err(io_error(tmp))?;
    }

    fs::rename(tmp, path).map_err(io_error(path))
}

/// `dir/.name.veil-tmp` next to `path`.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".veil-tmp");
    path.with_file_name(name)
}
