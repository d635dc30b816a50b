//! Persisted duplicate groups.
//!
//! A snapshot lets a later run act on earlier results (delete, move, prompt)
//! without walking and hashing again. Two JSON layouts are accepted:
//!
//! - the current one, `{"format": 2, "created_at": ..., "groups": {hash: [paths]}, "sizes": {hash: size}}`
//! - the legacy two-level one, `{size: {hash: [paths]}}`, where an empty hash
//!   key marks a file that was never hashed and is skipped.
//!
//! Only the current layout is written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::groups::{DuplicateGroups, HashBucket};
use crate::record::ContentHash;

/// Version tag written into current snapshots.
pub const SNAPSHOT_FORMAT: u32 = 2;

/// Duplicate groups loaded from, or about to be written to, disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// When the snapshot was produced (absent for legacy files).
    pub created_at: Option<DateTime<Utc>>,
    /// The aggregated groups.
    pub groups: DuplicateGroups,
}

#[derive(Debug, Serialize, Deserialize)]
struct CurrentLayout {
    format: u32,
    created_at: DateTime<Utc>,
    groups: IndexMap<ContentHash, Vec<PathBuf>>,
    #[serde(default)]
    sizes: IndexMap<ContentHash, u64>,
}

// Sizes stay string keys here: untagged buffering cannot turn an object key
// into an integer, so they are parsed by hand.
type LegacyLayout = BTreeMap<String, IndexMap<String, Vec<PathBuf>>>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnyLayout {
    Current(CurrentLayout),
    Legacy(LegacyLayout),
}

impl Snapshot {
    /// Wrap freshly aggregated groups, stamped with the current time.
    pub fn new(groups: DuplicateGroups) -> Self {
        Self {
            created_at: Some(Utc::now()),
            groups,
        }
    }

    /// Parse a snapshot from JSON text.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<AnyLayout>(text)? {
            AnyLayout::Current(layout) => {
                if layout.format != SNAPSHOT_FORMAT {
                    return Err(serde::de::Error::custom(format!(
                        "unsupported snapshot format {}",
                        layout.format
                    )));
                }
                let CurrentLayout {
                    created_at,
                    groups,
                    sizes,
                    ..
                } = layout;
                let groups = groups
                    .into_iter()
                    .map(|(hash, paths)| {
                        let size = sizes.get(&hash).copied().unwrap_or(0);
                        (hash, HashBucket { size, paths })
                    })
                    .collect();
                Ok(Self {
                    created_at: Some(created_at),
                    groups,
                })
            }
            AnyLayout::Legacy(layout) => {
                let mut groups = DuplicateGroups::new();
                for (size, by_hash) in layout {
                    let size: u64 = size.parse().map_err(|_| {
                        serde::de::Error::custom(format!("invalid size key {size:?} in legacy snapshot"))
                    })?;
                    for (hash, paths) in by_hash {
                        if hash.is_empty() {
                            continue;
                        }
                        let hash = ContentHash::new(hash);
                        for path in paths {
                            groups.insert(hash.clone(), size, path);
                        }
                    }
                }
                Ok(Self {
                    created_at: None,
                    groups,
                })
            }
        }
    }

    /// Encode in the current layout.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        let mut groups = IndexMap::with_capacity(self.groups.len());
        let mut sizes = IndexMap::with_capacity(self.groups.len());
        for (hash, bucket) in self.groups.iter() {
            groups.insert(hash.clone(), bucket.paths.clone());
            sizes.insert(hash.clone(), bucket.size);
        }
        let layout = CurrentLayout {
            format: SNAPSHOT_FORMAT,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            groups,
            sizes,
        };
        serde_json::to_string_pretty(&layout).map_err(|source| SnapshotError::Serialize { source })
    }

    /// Read a snapshot file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Self::parse(&text).map_err(|source| SnapshotError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            path = %path.display(),
            hashes = snapshot.groups.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Write a snapshot file, replacing any existing one.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
