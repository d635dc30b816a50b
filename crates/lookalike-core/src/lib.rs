//! Core types and configuration for lookalike.
//!
//! This crate provides the data model shared by the walker, the duplicate
//! detection engine and the retention tooling: file and image records,
//! aggregated duplicate groups, image clusters, configuration, and the
//! on-disk snapshot format.

mod config;
mod error;
mod groups;
mod record;
pub mod snapshot;

pub use config::{
    DEFAULT_SIMILARITY_THRESHOLD, EngineConfig, EngineConfigBuilder, ScanConfig, ScanConfigBuilder,
};
pub use error::{EngineError, HashError, ScanError, ScanWarning, SnapshotError, WarningKind};
pub use groups::{ClusterMember, DuplicateGroup, DuplicateGroups, HashBucket, ImageCluster};
pub use record::{ContentHash, FileRecord, HashedFile, ImageRecord, WalkEntry, hamming_distance};
pub use snapshot::{SNAPSHOT_FORMAT, Snapshot};
