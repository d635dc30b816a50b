//! Aggregated duplicate groups and image clusters.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};

use crate::record::ContentHash;

/// Files sharing one content hash, in hashing completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashBucket {
    /// Size shared by every member.
    pub size: u64,
    /// Member paths.
    pub paths: Vec<PathBuf>,
}

/// Content hash → member paths, built by the aggregator.
///
/// Hash keys keep their first-insertion order and paths keep their
/// completion order, so the structure round-trips through a snapshot
/// without reordering group contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateGroups {
    buckets: IndexMap<ContentHash, HashBucket>,
}

impl DuplicateGroups {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hashed file to the bucket for `hash`.
    pub fn insert(&mut self, hash: ContentHash, size: u64, path: PathBuf) {
        match self.buckets.entry(hash) {
            Entry::Occupied(mut entry) => entry.get_mut().paths.push(path),
            Entry::Vacant(entry) => {
                entry.insert(HashBucket {
                    size,
                    paths: vec![path],
                });
            }
        }
    }

    /// Number of distinct hashes (including single-member buckets).
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no file has been aggregated.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of paths across all buckets.
    pub fn file_count(&self) -> usize {
        self.buckets.values().map(|b| b.paths.len()).sum()
    }

    /// Look up the bucket for a hash.
    pub fn get(&self, hash: &ContentHash) -> Option<&HashBucket> {
        self.buckets.get(hash)
    }

    /// Iterate over all buckets in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ContentHash, &HashBucket)> {
        self.buckets.iter()
    }
}

impl FromIterator<(ContentHash, HashBucket)> for DuplicateGroups {
    fn from_iter<I: IntoIterator<Item = (ContentHash, HashBucket)>>(iter: I) -> Self {
        Self {
            buckets: iter.into_iter().collect(),
        }
    }
}

/// A group of byte-identical files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by all files in this group.
    pub hash: ContentHash,

    /// Size of each file in bytes.
    pub size: u64,

    /// Paths to all duplicate files.
    pub paths: Vec<PathBuf>,

    /// Wasted space: size * (count - 1).
    pub wasted_bytes: u64,
}

impl DuplicateGroup {
    /// Build a group from a bucket, computing wasted space.
    pub fn new(hash: ContentHash, size: u64, paths: Vec<PathBuf>) -> Self {
        let wasted_bytes = size.saturating_mul((paths.len() as u64).saturating_sub(1));
        Self {
            hash,
            size,
            paths,
            wasted_bytes,
        }
    }

    /// Get the number of duplicate files.
    pub fn count(&self) -> usize {
        self.paths.len()
    }

    /// Check if keeping one file, how many could be deleted.
    pub fn deletable_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }
}

/// One image inside a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    /// Image path.
    pub path: PathBuf,
    /// Hamming distance to the cluster seed (0 for the seed itself).
    pub distance: u32,
}

/// Visually similar images grouped around a seed image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCluster {
    /// Members; the seed is always first.
    pub members: Vec<ClusterMember>,
}

impl ImageCluster {
    /// Start a cluster from its seed.
    pub fn with_seed(path: PathBuf) -> Self {
        Self {
            members: vec![ClusterMember { path, distance: 0 }],
        }
    }

    /// Add a member at the given distance from the seed.
    pub fn push(&mut self, path: PathBuf, distance: u32) {
        self.members.push(ClusterMember { path, distance });
    }

    /// The seed image.
    pub fn seed(&self) -> Option<&Path> {
        self.members.first().map(|m| m.path.as_path())
    }

    /// Number of images in the cluster.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member paths in cluster order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|m| m.path.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_appends_in_order() {
        let mut groups = DuplicateGroups::new();
        groups.insert(ContentHash::new("h1"), 10, PathBuf::from("/b"));
        groups.insert(ContentHash::new("h2"), 10, PathBuf::from("/c"));
        groups.insert(ContentHash::new("h1"), 10, PathBuf::from("/a"));

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.file_count(), 3);
        let bucket = groups.get(&ContentHash::new("h1")).unwrap();
        assert_eq!(bucket.paths, vec![PathBuf::from("/b"), PathBuf::from("/a")]);

        let keys: Vec<_> = groups.iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(keys, vec!["h1", "h2"]);
    }

    #[test]
    fn test_duplicate_group_wasted_bytes() {
        let group = DuplicateGroup::new(
            ContentHash::new("h"),
            100,
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")],
        );
        assert_eq!(group.count(), 3);
        assert_eq!(group.deletable_count(), 2);
        assert_eq!(group.wasted_bytes, 200);
    }

    #[test]
    fn test_wasted_bytes_saturates_on_huge_size() {
        let group = DuplicateGroup::new(
            ContentHash::new("h"),
            u64::MAX,
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")],
        );
        assert_eq!(group.wasted_bytes, u64::MAX);
    }

    #[test]
    fn test_cluster_seed_first() {
        let mut cluster = ImageCluster::with_seed(PathBuf::from("/seed.png"));
        cluster.push(PathBuf::from("/near.png"), 3);
        assert_eq!(cluster.seed(), Some(Path::new("/seed.png")));
        assert_eq!(cluster.members[0].distance, 0);
        assert_eq!(cluster.len(), 2);
    }
}
