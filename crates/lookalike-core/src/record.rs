//! File and image records flowing through the detection pipeline.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One entry produced by the directory walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Full path of the entry.
    pub path: PathBuf,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Whether this entry is a directory.
    pub is_dir: bool,
}

impl WalkEntry {
    /// Create a file entry.
    pub fn file(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            is_dir: false,
        }
    }

    /// Create a directory entry.
    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: 0,
            is_dir: true,
        }
    }
}

/// Content digest identity.
///
/// Stored as an opaque string so digests written by other tools (or older
/// snapshot formats) compare by identity without being re-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an already encoded digest.
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Hex-encode raw digest bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Get the encoded digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty digest (never produced by a hasher).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A regular file selected for hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Full path of the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

impl FileRecord {
    /// Create a new file record.
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    /// Attach a computed content hash, consuming the record.
    pub fn into_hashed(self, hash: ContentHash) -> HashedFile {
        HashedFile {
            path: self.path,
            size: self.size,
            hash,
        }
    }

    /// Attach a computed perceptual hash, consuming the record.
    pub fn into_image(self, perceptual_hash: u64) -> ImageRecord {
        ImageRecord {
            path: self.path,
            size: self.size,
            perceptual_hash,
        }
    }
}

/// A file whose content digest has been computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedFile {
    pub path: PathBuf,
    pub size: u64,
    pub hash: ContentHash,
}

/// A decodable image and its perceptual fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Full path of the image.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// 64-bit perceptual hash.
    pub perceptual_hash: u64,
}

impl ImageRecord {
    /// Create a new image record.
    pub fn new(path: impl Into<PathBuf>, size: u64, perceptual_hash: u64) -> Self {
        Self {
            path: path.into(),
            size,
            perceptual_hash,
        }
    }

    /// Hamming distance between this image's hash and another's.
    pub fn distance_to(&self, other: &ImageRecord) -> u32 {
        hamming_distance(self.perceptual_hash, other.perceptual_hash)
    }
}

/// Count of differing bits between two 64-bit fingerprints.
#[inline]
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}
