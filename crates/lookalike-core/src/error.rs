//! Error types for scanning, hashing and snapshot handling.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that stop a walk before it starts.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory entry.
    ReadError,
    /// Error reading metadata.
    MetadataError,
}

/// Non-fatal warning encountered while walking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }
}

/// Per-file hashing failure. Never aborts the pipeline.
#[derive(Debug, Error)]
pub enum HashError {
    /// The file could not be opened or read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not a decodable image (unsupported or corrupt format).
    #[error("Cannot decode image {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Any other image processing failure.
    #[error("Image error at {path}: {message}")]
    Image { path: PathBuf, message: String },
}

impl HashError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure is an expected outcome of speculative hashing
    /// and should be dropped without a diagnostic.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Path of the file that failed.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. } | Self::Decode { path, .. } | Self::Image { path, .. } => path,
        }
    }
}

/// Errors that abort an engine run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A worker thread could not be started.
    #[error("Failed to spawn {pool} worker: {source}")]
    Spawn {
        pool: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked.
    #[error("A {pool} worker panicked")]
    WorkerPanicked { pool: &'static str },

    /// Work was submitted to a pool that no longer accepts input.
    #[error("The {pool} pool is closed")]
    PoolClosed { pool: &'static str },
}

/// Errors reading or writing a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot file could not be read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file is not in a recognized format.
    #[error("Invalid snapshot {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot could not be encoded.
    #[error("Failed to encode snapshot: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}
