//! Exact-duplicate grouping over the aggregated hash map.

use serde::{Deserialize, Serialize};

use lookalike_core::{DuplicateGroup, DuplicateGroups};

/// Keep every hash shared by at least two paths.
///
/// Pure and order-preserving: groups come out in the order their hashes
/// were first aggregated, members in completion order.
pub fn exact_duplicates(groups: &DuplicateGroups) -> Vec<DuplicateGroup> {
    groups
        .iter()
        .filter(|(_, bucket)| bucket.paths.len() > 1)
        .map(|(hash, bucket)| DuplicateGroup::new(hash.clone(), bucket.size, bucket.paths.clone()))
        .collect()
}

/// Exact duplicate groups with reclaimable-space totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Groups of duplicate files, sorted by wasted space descending.
    pub groups: Vec<DuplicateGroup>,

    /// Total size of all duplicate files.
    pub total_duplicate_size: u64,

    /// Total wasted space (could be reclaimed).
    pub total_wasted_space: u64,

    /// Number of files that made it into the aggregated map.
    pub files_analyzed: u64,

    /// Number of files that have duplicates.
    pub files_with_duplicates: u64,

    /// Number of duplicate groups.
    pub group_count: usize,
}

impl DuplicateReport {
    /// Summarize an aggregated map.
    pub fn from_groups(groups: &DuplicateGroups) -> Self {
        let mut duplicates = exact_duplicates(groups);
        duplicates.sort_by(|a, b| b.wasted_bytes.cmp(&a.wasted_bytes));

        let total_duplicate_size = duplicates
            .iter()
            .map(|g| g.size.saturating_mul(g.paths.len() as u64))
            .fold(0u64, u64::saturating_add);
        let total_wasted_space = duplicates
            .iter()
            .map(|g| g.wasted_bytes)
            .fold(0u64, u64::saturating_add);
        let files_with_duplicates = duplicates.iter().map(|g| g.paths.len() as u64).sum();
        let group_count = duplicates.len();

        Self {
            groups: duplicates,
            total_duplicate_size,
            total_wasted_space,
            files_analyzed: groups.file_count() as u64,
            files_with_duplicates,
            group_count,
        }
    }

    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }
}
