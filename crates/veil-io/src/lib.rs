//! veil-io: Filesystem side of veil.
//!
//! Wraps the pure `veil-pipeline` in the operations that touch disk:
//! pristine backups before the first redaction, in-place rewrites,
//! restore from backup, per-file exclusion, configuration loading, and
//! the seam to the vision model that produces detections.

pub mod backup;
pub mod config;
pub mod error;
pub mod lock;
pub mod redactor;
pub mod source;
pub mod write;

pub use backup::{BackupStatus, backup_path_for, ensure_backup, original_path_for, restore};
pub use config::Config;
pub use error::VeilError;
pub use lock::{PathLease, PathLocks};
pub use redactor::{RedactionReport, Redactor};
pub use source::{DetectionSource, RecordedResponse, SourceError, detect_and_offer_redaction};
pub use write::replace_file;
