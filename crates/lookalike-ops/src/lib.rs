//! Retention and removal for lookalike.
//!
//! The engine only reports duplicate groups and image clusters; this crate
//! decides which members of a group to drop and then removes them:
//!
//! - **Retention** - report only, drop everything under a path prefix, or ask
//!   which member to keep
//! - **Removal** - dry run, delete, or move into a folder without ever
//!   overwriting an existing file
//!
//! ```rust,ignore
//! use lookalike_ops::{Decision, RemovalMode, RetentionPolicy, remove_files};
//!
//! let policy = RetentionPolicy::DeleteIn("/backup".into());
//! if let Decision::Remove(victims) = policy.decide(&group.paths, &mut chooser) {
//!     let outcome = remove_files(&victims, &RemovalMode::DryRun);
//!     println!("{}", outcome.summary());
//! }
//! ```

mod operation;
mod removal;
mod retention;

pub use operation::{OperationComplete, OperationError, OperationType};
pub use removal::{RemovalMode, move_without_overwrite, remove_files};
pub use retention::{Decision, KeepChoice, KeepChooser, RetentionPolicy, lexical_clean};
