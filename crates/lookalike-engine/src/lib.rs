//! Duplicate and near-duplicate detection engine for lookalike.
//!
//! This crate turns a walk into two kinds of findings:
//!
//! - **Exact duplicates** - byte-identical files, found with BLAKE3
//! - **Near-duplicate images** - visually similar images, found with a
//!   gradient perceptual hash
//!
//! # Pipeline
//!
//! 1. A size index holds back every file whose size has been seen only
//!    once; unique sizes are never opened
//! 2. A content hashing pool digests every file released by the index
//! 3. An image hashing pool fingerprints every image-typed file
//! 4. One aggregator thread merges both result queues
//! 5. Grouping and clustering run over the finished maps
//!
//! ```rust,ignore
//! use lookalike_engine::{Engine, EngineConfig};
//! use lookalike_scan::{FileWalker, ScanConfig};
//!
//! let walker = FileWalker::new(ScanConfig::new("/path/to/scan")).unwrap();
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let report = engine.run(walker.walk().unwrap()).unwrap();
//!
//! println!("Found {} duplicate groups", report.duplicates.group_count);
//! println!("Found {} similar image clusters", report.clusters.len());
//! ```

mod aggregator;
pub mod cluster;
mod grouper;
mod hasher;
mod image_hash;
pub mod pool;
mod pipeline;
mod progress;
pub mod size_index;

pub use cluster::{cluster_by, cluster_images};
pub use grouper::{DuplicateReport, exact_duplicates};
pub use hasher::{Blake3Hasher, ContentHasher, FileDigest};
pub use image_hash::{GradientHasher, PerceptualHasher};
pub use pipeline::{Engine, EngineReport};
pub use pool::{PoolState, WorkerPool};
pub use progress::{EngineProgress, ProgressCounters};
pub use size_index::{Dispatch, SizeIndex, SizeSlot};

// Re-export core types
pub use lookalike_core::{
    ContentHash, DuplicateGroup, DuplicateGroups, EngineConfig, EngineError, HashError,
    ImageCluster, ImageRecord, WalkEntry,
};
