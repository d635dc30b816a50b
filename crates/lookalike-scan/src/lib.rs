//! Directory walking for lookalike.
//!
//! Produces a lazy, finite stream of [`WalkEntry`] values across one or more
//! roots using jwalk for parallel directory reads. Files below the configured
//! minimum size and entries matching ignore globs never leave the walker.
//!
//! # Example
//!
//! ```rust,no_run
//! use lookalike_scan::{FileWalker, ScanConfig};
//!
//! let walker = FileWalker::new(ScanConfig::new("/path/to/scan")).unwrap();
//! for entry in walker.walk().unwrap() {
//!     if !entry.is_dir {
//!         println!("{} ({} bytes)", entry.path.display(), entry.size);
//!     }
//! }
//! ```

mod walker;

pub use walker::{FileWalker, Walk};

// Re-export core types for convenience
pub use lookalike_core::{ScanConfig, ScanError, ScanWarning, WalkEntry, WarningKind};
