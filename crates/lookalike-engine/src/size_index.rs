//! Size-based pre-filter in front of content hashing.
//!
//! A file can only have a byte-identical twin if another file has the same
//! length, so a size seen once is held back until a sibling turns up.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;

use lookalike_core::FileRecord;

/// State of one size bucket. A missing key is the absent state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeSlot {
    /// Exactly one file of this size seen, not hashed.
    Pending(PathBuf),
    /// Two or more files seen; every later file goes straight to hashing.
    Dispatched,
}

/// What the driver should send to the hashing pool after an observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing yet.
    Hold,
    /// The held file and the new one, in discovery order.
    Pair(FileRecord, FileRecord),
    /// Just the new file.
    Single(FileRecord),
}

impl Dispatch {
    /// Number of records to hash.
    pub fn len(&self) -> usize {
        match self {
            Self::Hold => 0,
            Self::Pair(..) => 2,
            Self::Single(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Hold)
    }
}

impl IntoIterator for Dispatch {
    type Item = FileRecord;
    type IntoIter = std::iter::Flatten<std::array::IntoIter<Option<FileRecord>, 2>>;

    fn into_iter(self) -> Self::IntoIter {
        let pair = match self {
            Self::Hold => [None, None],
            Self::Pair(first, second) => [Some(first), Some(second)],
            Self::Single(record) => [Some(record), None],
        };
        pair.into_iter().flatten()
    }
}

/// Single-writer map from file size to bucket state.
///
/// Owned by the thread driving the walk; it is never shared, so the
/// pending-to-dispatched transition cannot race.
#[derive(Debug, Default)]
pub struct SizeIndex {
    slots: HashMap<u64, SizeSlot>,
}

impl SizeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file and decide what, if anything, to hash.
    pub fn observe(&mut self, record: FileRecord) -> Dispatch {
        match self.slots.entry(record.size) {
            Entry::Vacant(slot) => {
                slot.insert(SizeSlot::Pending(record.path));
                Dispatch::Hold
            }
            Entry::Occupied(mut slot) => match slot.insert(SizeSlot::Dispatched) {
                SizeSlot::Pending(first) => Dispatch::Pair(FileRecord::new(first, record.size), record),
                SizeSlot::Dispatched => Dispatch::Single(record),
            },
        }
    }

    /// Current state for a size, `None` if never seen.
    pub fn slot(&self, size: u64) -> Option<&SizeSlot> {
        self.slots.get(&size)
    }

    /// Files still held back because their size is unique so far.
    pub fn pending_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, SizeSlot::Pending(_)))
            .count()
    }

    /// Number of distinct sizes seen.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
