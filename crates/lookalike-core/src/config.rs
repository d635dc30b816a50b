//! Walker and engine configuration types.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Configuration for directory walking.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root paths to walk, in order.
    pub roots: Vec<PathBuf>,

    /// Files smaller than this are never reported.
    #[builder(default = "0")]
    #[serde(default)]
    pub min_size: u64,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Glob patterns matched against file names and full paths.
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Number of threads for walking (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,
}

fn default_true() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.roots {
            Some(ref roots) if roots.is_empty() => Err("At least one root path is required".to_string()),
            Some(ref roots) if roots.iter().any(|r| r.as_os_str().is_empty()) => {
                Err("Root path cannot be empty".to_string())
            }
            Some(_) => Ok(()),
            None => Err("At least one root path is required".to_string()),
        }
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for walking a single path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
            min_size: 0,
            follow_symlinks: false,
            include_hidden: true,
            ignore_patterns: Vec::new(),
            threads: 0,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Default Hamming distance at or below which two images are near-duplicates.
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 5;

/// Parameters of the duplicate detection engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Content hashing workers (0 = available parallelism).
    #[builder(default = "0")]
    #[serde(default)]
    pub hash_workers: usize,

    /// Perceptual hashing workers (0 = available parallelism).
    #[builder(default = "0")]
    #[serde(default)]
    pub image_workers: usize,

    /// Maximum Hamming distance from a cluster seed.
    #[builder(default = "DEFAULT_SIMILARITY_THRESHOLD")]
    #[serde(default = "default_threshold")]
    pub similarity_threshold: u32,

    /// Perceptual hash grid width.
    #[builder(default = "8")]
    #[serde(default = "default_hash_side")]
    pub image_hash_width: u32,

    /// Perceptual hash grid height.
    #[builder(default = "8")]
    #[serde(default = "default_hash_side")]
    pub image_hash_height: u32,

    /// Run the perceptual hashing pipeline at all.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub detect_images: bool,

    /// Lowercase extensions forwarded to the image pipeline.
    /// Empty means every file is forwarded speculatively.
    #[builder(default = "default_image_extensions()")]
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Broadcast a progress update every this many completed files.
    #[builder(default = "256")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_threshold() -> u32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_hash_side() -> u32 {
    8
}

fn default_progress_interval() -> u64 {
    256
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn check_hash_geometry(width: u32, height: u32, threshold: u32) -> Result<(), String> {
    let bits = width as u64 * height as u64;
    if bits == 0 || bits > 64 {
        return Err(format!(
            "Perceptual hash must have between 1 and 64 bits, got {width}x{height}"
        ));
    }
    if threshold as u64 > bits {
        return Err(format!(
            "Similarity threshold {threshold} exceeds the {bits}-bit hash width"
        ));
    }
    Ok(())
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        check_hash_geometry(
            self.image_hash_width.unwrap_or(8),
            self.image_hash_height.unwrap_or(8),
            self.similarity_threshold
                .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD),
        )
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate a config that was not produced by the builder.
    pub fn validate(&self) -> Result<(), EngineError> {
        check_hash_geometry(
            self.image_hash_width,
            self.image_hash_height,
            self.similarity_threshold,
        )
        .map_err(|message| EngineError::InvalidConfig { message })
    }

    /// Number of bits in a perceptual hash.
    pub fn hash_bits(&self) -> u32 {
        self.image_hash_width * self.image_hash_height
    }

    /// Resolved content hashing worker count.
    pub fn effective_hash_workers(&self) -> usize {
        resolve_workers(self.hash_workers)
    }

    /// Resolved perceptual hashing worker count.
    pub fn effective_image_workers(&self) -> usize {
        resolve_workers(self.image_workers)
    }

    /// Whether a file should be sent to the image pipeline.
    pub fn is_image_candidate(&self, path: &Path) -> bool {
        if !self.detect_images {
            return false;
        }
        if self.image_extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.image_extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_workers: 0,
            image_workers: 0,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            image_hash_width: 8,
            image_hash_height: 8,
            detect_images: true,
            image_extensions: default_image_extensions(),
            progress_interval: 256,
        }
    }
}

fn resolve_workers(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}
