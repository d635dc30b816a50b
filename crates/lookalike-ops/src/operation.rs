//! Outcome of a batch of removals.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What a batch did to its files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    /// Nothing touched; files were only listed.
    DryRun,
    Delete,
    Move,
}

/// An error that occurred while removing one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    pub fn new(path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Summary of a completed batch. Failures never stop the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationComplete {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Number of files successfully processed.
    pub succeeded: usize,
    /// Number of files that failed.
    pub failed: usize,
    /// Total bytes of the processed files.
    pub bytes_processed: u64,
    /// Errors that occurred.
    pub errors: Vec<OperationError>,
}

impl OperationComplete {
    /// Empty summary for a batch of the given type.
    pub fn new(operation_type: OperationType) -> Self {
        Self {
            operation_type,
            succeeded: 0,
            failed: 0,
            bytes_processed: 0,
            errors: Vec::new(),
        }
    }

    pub(crate) fn record_success(&mut self, bytes: u64) {
        self.succeeded += 1;
        self.bytes_processed += bytes;
    }

    pub(crate) fn record_failure(&mut self, error: OperationError) {
        self.failed += 1;
        self.errors.push(error);
    }

    /// Fold another batch of the same type into this one.
    pub fn merge(&mut self, other: OperationComplete) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.bytes_processed += other.bytes_processed;
        self.errors.extend(other.errors);
    }

    /// Check if the operation was fully successful.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self) -> String {
        let action = match self.operation_type {
            OperationType::DryRun => "Would delete",
            OperationType::Delete => "Deleted",
            OperationType::Move => "Moved",
        };

        if self.failed == 0 {
            format!("{} {} files", action, self.succeeded)
        } else {
            format!("{} {} files, {} failed", action, self.succeeded, self.failed)
        }
    }
}
