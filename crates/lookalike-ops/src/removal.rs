//! Deleting or moving the members a policy selected.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::operation::{OperationComplete, OperationError, OperationType};

/// What happens to a selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalMode {
    /// Leave the file alone; only count it.
    DryRun,
    /// Delete the file.
    Delete,
    /// Move the file into this directory, never overwriting.
    MoveTo(PathBuf),
}

impl RemovalMode {
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::DryRun => OperationType::DryRun,
            Self::Delete => OperationType::Delete,
            Self::MoveTo(_) => OperationType::Move,
        }
    }
}

/// Apply `mode` to every path, collecting per-file failures.
pub fn remove_files(paths: &[PathBuf], mode: &RemovalMode) -> OperationComplete {
    let mut outcome = OperationComplete::new(mode.operation_type());

    for path in paths {
        let size = fs::symlink_metadata(path).map(|m| m.len()).unwrap_or(0);
        let result = match mode {
            RemovalMode::DryRun => Ok(()),
            RemovalMode::Delete => fs::remove_file(path),
            RemovalMode::MoveTo(dir) => move_without_overwrite(path, dir).map(|target| {
                tracing::debug!(from = %path.display(), to = %target.display(), "moved");
            }),
        };

        match result {
            Ok(()) => outcome.record_success(size),
            Err(err) => {
                tracing::warn!(path = %path.display(), "{err}");
                outcome.record_failure(OperationError::new(path.clone(), err.to_string()));
            }
        }
    }

    outcome
}

/// Move `path` into `dir` under its own name, or `name.0`, `name.1`, ... if
/// that is taken. Returns the final location.
pub fn move_without_overwrite(path: &Path, dir: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;

    let mut target = dir.join(name);
    let mut attempt = 0u64;
    while target.try_exists()? {
        let mut numbered = name.to_os_string();
        numbered.push(format!(".{attempt}"));
        target = dir.join(numbered);
        attempt += 1;
    }

    // Try rename first (fast path for same filesystem)
    if fs::rename(path, &target).is_ok() {
        return Ok(target);
    }

    // Fall back to copy + delete for cross-filesystem moves
    fs::copy(path, &target)?;
    if let Err(err) = fs::remove_file(path) {
        let _ = fs::remove_file(&target);
        return Err(err);
    }
    Ok(target)
}
