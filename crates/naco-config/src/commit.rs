//! Promotion of transaction files over their originals

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::error::ConfigResult;
use crate::session::{with_suffix, TRANSACTION_SUFFIX};

/// Per-path result of a commit attempt. The skip variants represent
/// "nothing to do", not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The transaction file now replaces the original
    Promoted,
    /// The original was modified after the transaction file was written
    SkippedOriginalNewer,
    /// No transaction file exists for this path
    NoTransaction,
}

impl fmt::Display for CommitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitOutcome::Promoted => write!(f, "promoted"),
            CommitOutcome::SkippedOriginalNewer => {
                write!(f, "skipped: original file newer than transaction file")
            }
            CommitOutcome::NoTransaction => write!(f, "skipped: no transaction file"),
        }
    }
}

/// Promote `path`'s transaction file over `path`, if one exists.
///
/// With `check_mtime` set, the promotion is skipped when the original has
/// been modified since the transaction file was written. The check is a
/// best-effort guard against clobbering concurrent edits, not a lock. A
/// missing original does not block promotion.
///
/// # Errors
/// Propagates metadata and rename failures; a missing transaction file is
/// a [`CommitOutcome::NoTransaction`] skip, not an error.
pub fn commit_path(path: &Path, check_mtime: bool) -> ConfigResult<CommitOutcome> {
    let transaction = with_suffix(path, TRANSACTION_SUFFIX);
    let Ok(transaction_meta) = fs::metadata(&transaction) else {
        return Ok(CommitOutcome::NoTransaction);
    };
    if check_mtime {
        if let Ok(original_meta) = fs::metadata(path) {
            let original = modified(&original_meta);
            let proposed = modified(&transaction_meta);
            if let (Some(original), Some(proposed)) = (original, proposed) {
                if original >= proposed {
                    return Ok(CommitOutcome::SkippedOriginalNewer);
                }
            }
        }
    }
    fs::rename(&transaction, path)?;
    Ok(CommitOutcome::Promoted)
}

fn modified(meta: &fs::Metadata) -> Option<SystemTime> {
    meta.modified().ok()
}
